//! Time-limited edges between particles, and the store that guards their invariants.
//!
//! Connections refer to particles by their index in the simulation's particle arena. The arena
//! and the network are always rebuilt together, so an index can never dangle.

use std::collections::HashSet;

use glam::Vec2;
use rand::Rng as _;

use super::colours::{Colour, Colours};
use super::particle::Particle;

/// Brightest a connection ever gets.
const MAX_OPACITY: f32 = 0.8;

/// How much a connection's width swells with its pulse.
const WIDTH_PULSE_AMPLITUDE: f32 = 0.3;

/// The furthest a regular connection's curve bows out from a straight line.
const MAX_CURVE_OFFSET: f32 = 30.0;

/// Edges shorter than this are considered to have no direction.
const DEGENERATE_LENGTH: f32 = 0.001;

/// An undirected pair of particle indices, stored smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge(usize, usize);

impl Edge {
    /// Normalise the pair so that `(a, b)` and `(b, a)` are the same edge.
    #[must_use]
    pub fn new(first: usize, second: usize) -> Self {
        Self(first.min(second), first.max(second))
    }
}

/// The shape of a connection's curve.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum Kind {
    /// Bows out proportionally to its length.
    Regular,
    /// A flow line with a fixed bend, in canvas units.
    Flow {
        /// Offset of the control point along the edge's normal.
        bend: f32,
    },
}

/// A highlight that travels along a connection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub struct Transfer {
    /// Position along the curve, from 0.0 to 1.0.
    pub progress: f32,
    /// Progress made per frame.
    pub speed: f32,
    /// Radius of the dot.
    pub size: f32,
    /// Colour of the dot.
    pub colour: Colour,
}

/// Whether a connection survived a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Still has life left.
    Alive,
    /// Ran out of life and must be removed.
    Expired,
}

/// A connection
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Connection {
    /// Index of one endpoint.
    pub from: usize,
    /// Index of the other endpoint.
    pub to: usize,
    /// Frames left to live.
    pub life: u32,
    /// The life the connection started with.
    pub max_life: u32,
    /// Stroke colour.
    pub colour: Colour,
    /// Resting stroke width.
    pub width: f32,
    /// How quickly the width pulse advances.
    pub pulse_rate: f32,
    /// Phase of the width pulse.
    pub pulse_phase: f32,
    /// Derived every frame from the remaining life.
    pub opacity: f32,
    /// Derived every frame from the pulse phase.
    pub width_factor: f32,
    /// The optional travelling highlight.
    pub transfer: Option<Transfer>,
    /// Regular or flow line.
    pub kind: Kind,
}

impl Connection {
    /// A regular connection with randomised looks.
    pub fn regular(
        rng: &mut impl rand::Rng,
        colours: &Colours,
        edge: Edge,
        lifespan: u32,
    ) -> Self {
        let transfer = rng.gen_bool(0.4).then(|| Transfer {
            progress: 0.0,
            speed: rng.gen_range(0.005..0.025),
            size: rng.gen_range(2.0..5.0),
            colour: colours.random(rng),
        });

        Self {
            from: edge.0,
            to: edge.1,
            life: lifespan,
            max_life: lifespan,
            colour: colours.random(rng),
            width: rng.gen_range(0.5..2.0),
            pulse_rate: rng.gen_range(0.01..0.04),
            pulse_phase: rng.gen_range(0.0..std::f32::consts::TAU),
            opacity: MAX_OPACITY,
            width_factor: 1.0,
            transfer,
            kind: Kind::Regular,
        }
    }

    /// A longer, thicker line with a fixed bend.
    pub fn flow(rng: &mut impl rand::Rng, colours: &Colours, edge: Edge) -> Self {
        let lifespan = rng.gen_range(60..=120);
        let mut connection = Self::regular(rng, colours, edge, lifespan);
        connection.width = rng.gen_range(1.0..3.0);
        connection.transfer = None;
        connection.kind = Kind::Flow {
            bend: rng.gen_range(-15.0..15.0),
        };
        connection
    }

    /// The undirected edge this connection occupies.
    #[must_use]
    pub fn edge(&self) -> Edge {
        Edge::new(self.from, self.to)
    }

    /// Age by one frame and refresh the derived visuals.
    pub fn tick(&mut self) -> Status {
        self.life = self.life.saturating_sub(1);
        if self.life == 0 {
            return Status::Expired;
        }

        self.opacity = self.life_fraction() * MAX_OPACITY;
        self.pulse_phase += self.pulse_rate;
        self.width_factor = WIDTH_PULSE_AMPLITUDE.mul_add(self.pulse_phase.sin(), 1.0);

        if let Some(transfer) = &mut self.transfer {
            transfer.progress += transfer.speed;
            if transfer.progress > 1.0 {
                transfer.progress = 0.0;
            }
        }

        Status::Alive
    }

    /// Remaining life as a fraction of the starting life.
    #[must_use]
    pub fn life_fraction(&self) -> f32 {
        if self.max_life == 0 {
            return 0.0;
        }

        #[expect(
            clippy::as_conversions,
            clippy::cast_precision_loss,
            reason = "Lifespans are a few hundred frames at most"
        )]
        let fraction = self.life as f32 / self.max_life as f32;
        fraction
    }

    /// The stroke width to draw with this frame.
    #[must_use]
    pub fn stroke_width(&self) -> f32 {
        self.width * self.width_factor * (self.life_fraction() + 0.5)
    }

    /// The quadratic Bézier control point for a curve between the two endpoints. `None` when the
    /// geometry can't produce a sensible curve.
    #[must_use]
    pub fn control_point(&self, from: Vec2, to: Vec2) -> Option<Vec2> {
        if !from.is_finite() || !to.is_finite() {
            return None;
        }

        let delta = to - from;
        let distance = delta.length();
        if !distance.is_finite() || distance < DEGENERATE_LENGTH {
            return None;
        }

        let normal = delta.perp() / distance;
        let offset = match self.kind {
            Kind::Regular => (distance * 0.2).min(MAX_CURVE_OFFSET),
            Kind::Flow { bend } => bend,
        };

        Some((from + to) * 0.5 + normal * offset)
    }

    /// Where the travelling highlight currently sits on the curve.
    #[must_use]
    pub fn transfer_point(&self, from: Vec2, control: Vec2, to: Vec2) -> Option<Vec2> {
        let transfer = self.transfer?;
        let point = quadratic_bezier(from, control, to, transfer.progress);
        point.is_finite().then_some(point)
    }

    /// Turn off the travelling highlight when the edge can't carry it.
    pub fn disable_transfer_if_degenerate(&mut self, from: Vec2, to: Vec2) {
        let distance = from.distance(to);
        if !distance.is_finite() || distance < DEGENERATE_LENGTH {
            self.transfer = None;
        }
    }
}

/// Evaluate a quadratic Bézier curve at `t`.
#[must_use]
pub fn quadratic_bezier(from: Vec2, control: Vec2, to: Vec2, t: f32) -> Vec2 {
    let inverse = 1.0 - t;
    from * (inverse * inverse) + control * (2.0 * inverse * t) + to * (t * t)
}

/// Why a connection couldn't be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Refusal {
    /// Both endpoints are the same particle.
    SelfLink,
    /// An endpoint isn't in the particle arena.
    UnknownParticle,
    /// The pair is already connected.
    Duplicate,
    /// An endpoint has no capacity left.
    Saturated,
    /// The whole network is at its connection cap.
    AtCap,
}

/// All the live connections.
#[derive(Debug, Default, Clone)]
pub struct Network {
    /// Live connections, in creation order.
    connections: Vec<Connection>,
    /// Mirrors `connections` for quick duplicate checks.
    edges: HashSet<Edge>,
    /// The global connection limit.
    cap: usize,
}

impl Network {
    /// An empty network with the given global limit.
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self {
            connections: Vec::new(),
            edges: HashSet::new(),
            cap,
        }
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Are there no live connections?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// The global connection limit.
    #[must_use]
    pub const fn cap(&self) -> usize {
        self.cap
    }

    /// How many more connections fit under the cap.
    #[must_use]
    pub fn free(&self) -> usize {
        self.cap.saturating_sub(self.connections.len())
    }

    /// Is the network full?
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.free() == 0
    }

    /// Are the two particles already connected?
    #[must_use]
    pub fn contains(&self, first: usize, second: usize) -> bool {
        self.edges.contains(&Edge::new(first, second))
    }

    /// Iterate over the live connections.
    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Check every rule for a new connection without making it.
    pub fn check(
        &self,
        particles: &[Particle],
        first: usize,
        second: usize,
    ) -> Result<Edge, Refusal> {
        if first == second {
            return Err(Refusal::SelfLink);
        }
        let (Some(a), Some(b)) = (particles.get(first), particles.get(second)) else {
            return Err(Refusal::UnknownParticle);
        };
        if self.is_full() {
            return Err(Refusal::AtCap);
        }
        let edge = Edge::new(first, second);
        if self.edges.contains(&edge) {
            return Err(Refusal::Duplicate);
        }
        if a.is_saturated() || b.is_saturated() {
            return Err(Refusal::Saturated);
        }
        Ok(edge)
    }

    /// Add a connection, updating both endpoints' counters. This is the only way connections
    /// enter the network.
    pub fn link(
        &mut self,
        particles: &mut [Particle],
        connection: Connection,
    ) -> Result<(), Refusal> {
        let edge = self.check(particles, connection.from, connection.to)?;
        for index in [edge.0, edge.1] {
            if let Some(particle) = particles.get_mut(index) {
                particle.connections += 1;
            }
        }
        self.edges.insert(edge);
        self.connections.push(connection);
        Ok(())
    }

    /// Age every connection by a frame. Expired connections are removed and both of their
    /// endpoints lose a connection. Returns how many expired.
    pub fn tick(&mut self, particles: &mut [Particle]) -> usize {
        let mut expired = 0;
        let edges = &mut self.edges;
        self.connections.retain_mut(|connection| {
            if let Some(from) = particles.get(connection.from) {
                if let Some(to) = particles.get(connection.to) {
                    connection.disable_transfer_if_degenerate(from.position, to.position);
                }
            }

            match connection.tick() {
                Status::Alive => true,
                Status::Expired => {
                    for index in [connection.from, connection.to] {
                        if let Some(particle) = particles.get_mut(index) {
                            particle.connections = particle.connections.saturating_sub(1);
                        }
                    }
                    edges.remove(&connection.edge());
                    expired += 1;
                    false
                }
            }
        });
        expired
    }

    /// Drop every connection. The caller is responsible for the particles' counters, which is
    /// why this is only used when the particles are being replaced too.
    pub fn clear(&mut self, cap: usize) {
        self.connections.clear();
        self.edges.clear();
        self.cap = cap;
    }
}

#[cfg(test)]
#[expect(clippy::indexing_slicing, reason = "Tests aren't so strict")]
mod test {
    use rand::SeedableRng as _;

    use super::*;
    use crate::effects::network::particle::Kind as ParticleKind;

    fn setup(count: usize) -> (rand::rngs::StdRng, Colours, Vec<Particle>) {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let colours = Colours::from_hex(&[]);
        let white = Colour::new(1.0, 1.0, 1.0);
        let particles = (0..count)
            .map(|index| {
                #[expect(
                    clippy::as_conversions,
                    clippy::cast_precision_loss,
                    reason = "Tests aren't so strict"
                )]
                let x = index as f32 * 10.0;
                let mut particle = Particle::spawn(&mut rng, Vec2::new(x, 0.0), 0, white, white);
                particle.kind = ParticleKind::Fast;
                particle
            })
            .collect();
        (rng, colours, particles)
    }

    #[test]
    fn link_enforces_every_rule() {
        let (mut rng, colours, mut particles) = setup(6);
        let mut network = Network::new(4);

        let make = |rng: &mut rand::rngs::StdRng, a, b| {
            Connection::regular(rng, &colours, Edge::new(a, b), 10)
        };

        assert_eq!(network.link(&mut particles, make(&mut rng, 0, 1)), Ok(()));
        assert_eq!(
            network.link(&mut particles, make(&mut rng, 1, 0)),
            Err(Refusal::Duplicate)
        );
        assert_eq!(
            network.link(&mut particles, make(&mut rng, 2, 2)),
            Err(Refusal::SelfLink)
        );
        assert_eq!(
            network.link(&mut particles, make(&mut rng, 2, 99)),
            Err(Refusal::UnknownParticle)
        );

        network.link(&mut particles, make(&mut rng, 0, 2)).unwrap();
        network.link(&mut particles, make(&mut rng, 0, 3)).unwrap();
        assert_eq!(particles[0].connections, 3);
        assert_eq!(
            network.link(&mut particles, make(&mut rng, 0, 4)),
            Err(Refusal::Saturated)
        );

        network.link(&mut particles, make(&mut rng, 4, 5)).unwrap();
        assert!(network.is_full());
        assert_eq!(
            network.link(&mut particles, make(&mut rng, 1, 5)),
            Err(Refusal::AtCap)
        );
    }

    #[test]
    fn connection_expires_on_its_last_frame() {
        let (mut rng, colours, mut particles) = setup(2);
        let mut network = Network::new(10);
        let connection = Connection::regular(&mut rng, &colours, Edge::new(0, 1), 180);
        network.link(&mut particles, connection).unwrap();

        for frame in 1..180 {
            assert_eq!(network.tick(&mut particles), 0, "expired early on {frame}");
            let life = network.iter().next().unwrap().life;
            assert_eq!(life, 180 - frame);
        }

        assert_eq!(network.tick(&mut particles), 1);
        assert!(network.is_empty());
        assert!(!network.contains(0, 1));
        assert_eq!(particles[0].connections, 0);
        assert_eq!(particles[1].connections, 0);
    }

    #[test]
    fn opacity_fades_with_life() {
        let (mut rng, colours, _) = setup(0);
        let mut connection = Connection::regular(&mut rng, &colours, Edge::new(0, 1), 4);
        connection.tick();
        assert!((connection.opacity - 0.6).abs() < 1e-6);
        connection.tick();
        assert!((connection.opacity - 0.4).abs() < 1e-6);
    }

    #[test]
    fn degenerate_edges_have_no_curve() {
        let (mut rng, colours, _) = setup(0);
        let connection = Connection::regular(&mut rng, &colours, Edge::new(0, 1), 4);
        let point = Vec2::new(5.0, 5.0);
        assert!(connection.control_point(point, point).is_none());
        assert!(connection
            .control_point(point, Vec2::new(f32::NAN, 0.0))
            .is_none());

        let control = connection
            .control_point(Vec2::ZERO, Vec2::new(100.0, 0.0))
            .unwrap();
        assert!((control.x - 50.0).abs() < 1e-4);
        assert!((control.y - 20.0).abs() < 1e-4);
    }

    #[test]
    fn bezier_hits_its_endpoints() {
        let from = Vec2::new(0.0, 0.0);
        let control = Vec2::new(5.0, 10.0);
        let to = Vec2::new(10.0, 0.0);
        assert_eq!(quadratic_bezier(from, control, to, 0.0), from);
        assert_eq!(quadratic_bezier(from, control, to, 1.0), to);
        assert_eq!(quadratic_bezier(from, control, to, 0.5), Vec2::new(5.0, 5.0));
    }
}

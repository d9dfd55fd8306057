//! A single moving point in the network

use glam::Vec2;
use rand::Rng as _;

use super::colours::Colour;
use super::config::Boundary;

/// How much a particle's size swells and shrinks with its pulse.
const PULSE_AMPLITUDE: f32 = 0.2;

/// How much the pointer's emphasis grows a particle.
const EMPHASIS_SIZE_BOOST: f32 = 3.0;

/// The flavour of a particle. It decides speed, size, opacity and how many connections the
/// particle can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Kind {
    /// The common case.
    Normal,
    /// Small, quick and not very sociable.
    Fast,
    /// Big, slow, and a natural hub.
    Slow,
}

impl Kind {
    /// 70% normal, the rest split evenly between fast and slow.
    pub fn random(rng: &mut impl rand::Rng) -> Self {
        if rng.gen_bool(0.7) {
            Self::Normal
        } else if rng.gen_bool(0.5) {
            Self::Fast
        } else {
            Self::Slow
        }
    }

    /// The spread of the initial velocity on each axis.
    #[must_use]
    pub const fn speed(self) -> f32 {
        match self {
            Self::Normal => 0.5,
            Self::Fast => 0.8,
            Self::Slow => 0.3,
        }
    }

    /// The smallest size a particle of this kind can have.
    #[must_use]
    pub const fn size(self) -> f32 {
        match self {
            Self::Normal => 2.5,
            Self::Fast => 2.0,
            Self::Slow => 3.5,
        }
    }

    /// The lowest opacity a particle of this kind can have.
    #[must_use]
    pub const fn opacity(self) -> f32 {
        match self {
            Self::Normal => 0.5,
            Self::Fast => 0.6,
            Self::Slow => 0.8,
        }
    }

    /// The maximum number of live connections.
    #[must_use]
    pub const fn capacity(self) -> usize {
        match self {
            Self::Normal => 5,
            Self::Fast => 3,
            Self::Slow => 8,
        }
    }
}

/// A particle
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Particle {
    /// Position in canvas units.
    pub position: Vec2,
    /// Distance moved per frame.
    pub velocity: Vec2,
    /// Speed, size and capacity class.
    pub kind: Kind,
    /// Index of the cluster this particle was seeded in.
    pub cluster: usize,
    /// Size before any pulsing or emphasis.
    pub base_size: f32,
    /// Resting opacity.
    pub opacity: f32,
    /// The colour inherited from its cluster.
    pub colour: Colour,
    /// The particle's own colour, which neighbour influence blends from.
    pub base_colour: Colour,
    /// Colour blended from nearby particles, if any.
    pub influenced_colour: Option<Colour>,
    /// Size blended from nearby particles, if any.
    pub influenced_size: Option<f32>,
    /// The frame on which neighbour influence last touched this particle.
    pub last_influenced: Option<u64>,
    /// Number of live connections that have this particle as an endpoint.
    pub connections: usize,
    /// Phase of the size pulse.
    pub pulse: f32,
    /// How quickly the pulse phase advances.
    pub pulse_speed: f32,
    /// Visual boost from the pointer, from 0.0 to 1.0.
    pub emphasis: f32,
}

impl Particle {
    /// Create a particle with randomised kind, velocity and looks.
    pub fn spawn(
        rng: &mut impl rand::Rng,
        position: Vec2,
        cluster: usize,
        colour: Colour,
        base_colour: Colour,
    ) -> Self {
        let kind = Kind::random(rng);
        let speed = kind.speed();
        let velocity = Vec2::new(
            (rng.gen::<f32>() - 0.5) * speed,
            (rng.gen::<f32>() - 0.5) * speed,
        );

        Self {
            position,
            velocity,
            kind,
            cluster,
            base_size: rng.gen_range(0.0..1.5) + kind.size(),
            opacity: rng.gen_range(0.0..0.3) + kind.opacity(),
            colour,
            base_colour,
            influenced_colour: None,
            influenced_size: None,
            last_influenced: None,
            connections: 0,
            pulse: rng.gen_range(0.0..std::f32::consts::TAU),
            pulse_speed: rng.gen_range(0.05..0.1),
            emphasis: 0.0,
        }
    }

    /// The most connections this particle may hold.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.kind.capacity()
    }

    /// Can this particle take no more connections?
    #[must_use]
    pub const fn is_saturated(&self) -> bool {
        self.connections >= self.capacity()
    }

    /// The colour to actually draw with.
    #[must_use]
    pub fn display_colour(&self) -> Colour {
        self.influenced_colour.unwrap_or(self.colour)
    }

    /// The pulsing, pointer-boosted size to draw with.
    #[must_use]
    pub fn display_size(&self) -> f32 {
        let size = self.influenced_size.unwrap_or(self.base_size);
        let pulse = PULSE_AMPLITUDE.mul_add(self.pulse.sin(), 1.0);
        EMPHASIS_SIZE_BOOST.mul_add(self.emphasis, size) * pulse
    }

    /// The opacity to draw with, boosted by the pointer.
    #[must_use]
    pub fn display_opacity(&self) -> f32 {
        0.3f32.mul_add(self.emphasis, self.opacity).min(1.0)
    }

    /// Move one frame's worth and keep inside the canvas.
    pub fn advance(&mut self, boundary: Boundary, width: f32, height: f32) {
        self.pulse += self.pulse_speed;
        self.position += self.velocity;
        self.keep_inside(boundary, width, height);
    }

    /// Apply the edge policy. Afterwards the position is always within `[0, width] x [0, height]`.
    pub fn keep_inside(&mut self, boundary: Boundary, width: f32, height: f32) {
        if !self.position.is_finite() {
            tracing::trace!("Recovering particle from non-finite position");
            self.position = Vec2::new(width / 2.0, height / 2.0);
        }
        if !self.velocity.is_finite() {
            self.velocity = Vec2::ZERO;
        }

        match boundary {
            Boundary::Wrap => {
                if self.position.x < 0.0 {
                    self.position.x = width;
                } else if self.position.x > width {
                    self.position.x = 0.0;
                }
                if self.position.y < 0.0 {
                    self.position.y = height;
                } else if self.position.y > height {
                    self.position.y = 0.0;
                }
            }
            Boundary::Bounce => {
                if self.position.x < 0.0 || self.position.x > width {
                    self.velocity.x = -self.velocity.x;
                }
                if self.position.y < 0.0 || self.position.y > height {
                    self.velocity.y = -self.velocity.y;
                }
                self.position = self
                    .position
                    .clamp(Vec2::ZERO, Vec2::new(width.max(0.0), height.max(0.0)));
            }
        }
    }
}

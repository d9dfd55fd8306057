//! The different shapes new connections are grown in.
//!
//! Every strategy tolerates finding nothing to connect: it just reports that zero connections
//! were made. All connections go through `Network::link`, so none of the network's rules can be
//! broken here.

use std::collections::BTreeSet;

use rand::seq::SliceRandom as _;
use rand::Rng as _;

use super::colours::Colours;
use super::connection::{Connection, Network};
use super::particle::{self, Particle};

/// Same-cluster partners must be this close, as a fraction of the connection threshold.
const REGULAR_REACH: f32 = 0.6;

/// Partners from other clusters must be much closer.
const CROSS_CLUSTER_REACH: f32 = 0.3;

/// The chance that a candidate from another cluster isn't even considered.
const CROSS_CLUSTER_SKIP: f64 = 0.75;

/// Spokes must be within this fraction of the threshold from their hub.
const HUB_REACH: f32 = 0.5;

/// Only hubs with at most this many links can sprout spokes.
const HUB_MAX_EXISTING: usize = 1;

/// Mesh members must be within this fraction of the threshold from the seed.
const MESH_REACH: f32 = 0.4;

/// The chance that any pair in a mesh is linked.
const MESH_LINK_CHANCE: f64 = 0.7;

/// The initial connector stops topping up a particle once it has this many links.
const INITIAL_LINKS: usize = 3;

/// Flow lines are only drawn between particles at least this far apart.
const FLOW_MIN_DISTANCE: f32 = 50.0;

/// Attempts at finding two particles far enough apart for a flow line.
const FLOW_ATTEMPTS: usize = 10;

/// The chance of each flow line actually being created.
const FLOW_CHANCE: f64 = 0.15;

/// The most flow lines created per run of the generator.
const MAX_FLOWS: usize = 2;

/// Which shape to grow new connections in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Strategy {
    /// A single pair of nearby particles.
    Regular,
    /// A slow particle with 2 to 4 spokes.
    Hub,
    /// A small group of particles, each pair linked with some probability.
    Mesh,
}

impl Strategy {
    /// 60% regular, 20% hub, 20% mesh.
    pub fn random(rng: &mut impl rand::Rng) -> Self {
        let roll: f32 = rng.gen();
        if roll < 0.6 {
            Self::Regular
        } else if roll < 0.8 {
            Self::Hub
        } else {
            Self::Mesh
        }
    }
}

/// Everything a strategy needs to read and grow the network.
pub struct Topology<'sim, R: rand::Rng> {
    /// Shared with the rest of the simulation.
    pub rng: &'sim mut R,
    /// The particle arena.
    pub particles: &'sim mut [Particle],
    /// The live connections.
    pub network: &'sim mut Network,
    /// For colouring new connections.
    pub colours: &'sim Colours,
    /// The base distance under which particles may connect.
    pub threshold: f32,
    /// Life of new regular connections.
    pub lifespan: u32,
    /// How many particles take part in a mesh.
    pub mesh_size: usize,
}

impl<R: rand::Rng> Topology<'_, R> {
    /// Try to grow the network once with a randomly chosen strategy.
    pub fn connect(&mut self) -> usize {
        if self.network.is_full() {
            return 0;
        }

        let strategy = Strategy::random(self.rng);
        let created = match strategy {
            Strategy::Regular => self.connect_regular(),
            Strategy::Hub => self.connect_hub(),
            Strategy::Mesh => self.connect_mesh(),
        };
        tracing::trace!("{strategy:?} strategy created {created} connection(s)");
        created
    }

    /// Link a random unsaturated particle with a random nearby partner.
    pub fn connect_regular(&mut self) -> usize {
        let available = self.unsaturated();
        let Some(&first) = available.choose(self.rng) else {
            return 0;
        };
        if available.len() < 2 {
            return 0;
        }

        let mut candidates = Vec::new();
        for &index in &available {
            if index == first {
                continue;
            }
            let same_cluster = self.cluster_of(index) == self.cluster_of(first);
            if !same_cluster && self.rng.gen_bool(CROSS_CLUSTER_SKIP) {
                continue;
            }
            let reach = if same_cluster {
                REGULAR_REACH
            } else {
                CROSS_CLUSTER_REACH
            };
            if self.distance(first, index) < self.threshold * reach {
                candidates.push(index);
            }
        }

        match candidates.choose(self.rng) {
            Some(&second) => usize::from(self.link(first, second)),
            None => 0,
        }
    }

    /// Give a lightly connected slow particle a few spokes within its cluster.
    pub fn connect_hub(&mut self) -> usize {
        let hubs: Vec<usize> = self
            .particles
            .iter()
            .enumerate()
            .filter(|(_, particle)| {
                particle.kind == particle::Kind::Slow && particle.connections <= HUB_MAX_EXISTING
            })
            .map(|(index, _)| index)
            .collect();
        let Some(&hub) = hubs.choose(self.rng) else {
            return 0;
        };

        let mut spokes = self.neighbours(hub, self.threshold * HUB_REACH);
        if spokes.len() < 2 {
            return 0;
        }

        let wanted = self.rng.gen_range(2..=4).min(spokes.len());
        let mut created = 0;
        for _ in 0..wanted {
            if self.is_saturated(hub) {
                break;
            }
            let pick = self.rng.gen_range(0..spokes.len());
            let spoke = spokes.swap_remove(pick);
            created += usize::from(self.link(hub, spoke));
        }
        created
    }

    /// Gather a seed and its closest cluster-mates and link most of the pairs.
    pub fn connect_mesh(&mut self) -> usize {
        let Some(&seed) = self.unsaturated().choose(self.rng) else {
            return 0;
        };

        let mut nearby = self.neighbours(seed, self.threshold * MESH_REACH);
        let wanted = self.mesh_size.saturating_sub(1);
        if nearby.len() < wanted {
            return 0;
        }

        let mut members = vec![seed];
        for _ in 0..wanted {
            if nearby.is_empty() {
                break;
            }
            let pick = self.rng.gen_range(0..nearby.len());
            members.push(nearby.swap_remove(pick));
        }

        let mut created = 0;
        for (position, &first) in members.iter().enumerate() {
            for &second in members.iter().skip(position + 1) {
                if self.is_saturated(first) || self.is_saturated(second) {
                    continue;
                }
                if self.network.contains(first, second) {
                    continue;
                }
                if self.rng.gen_bool(MESH_LINK_CHANCE) {
                    created += usize::from(self.link(first, second));
                }
            }
        }
        created
    }

    /// The first links made after seeding: every particle is joined to one or two of its nearest
    /// cluster-mates.
    pub fn connect_within_clusters(&mut self) -> usize {
        let mut created = 0;
        for index in 0..self.particles.len() {
            let Some(particle) = self.particles.get(index) else {
                continue;
            };
            let wanted_total = INITIAL_LINKS.min(particle.capacity());
            if particle.connections >= wanted_total {
                continue;
            }
            let room = particle.capacity() - particle.connections;

            let mut nearby: Vec<(usize, f32)> = self
                .neighbours(index, self.threshold * REGULAR_REACH)
                .into_iter()
                .filter(|other| !self.network.contains(index, *other))
                .map(|other| (other, self.distance(index, other)))
                .collect();
            nearby.sort_by(|first, second| first.1.total_cmp(&second.1));

            let wanted = self.rng.gen_range(1..=2).min(nearby.len()).min(room);
            for (other, _) in nearby.into_iter().take(wanted) {
                created += usize::from(self.link(index, other));
            }
        }
        created
    }

    /// Occasionally draw long-lived, gently bent lines across a cluster.
    pub fn spawn_flow_lines(&mut self) -> usize {
        let attempts = MAX_FLOWS.min(self.network.free());
        let clusters: Vec<usize> = self
            .particles
            .iter()
            .map(|particle| particle.cluster)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut created = 0;
        for _ in 0..attempts {
            if !self.rng.gen_bool(FLOW_CHANCE) {
                continue;
            }
            let Some(&cluster) = clusters.choose(self.rng) else {
                continue;
            };
            let members: Vec<usize> = self
                .particles
                .iter()
                .enumerate()
                .filter(|(_, particle)| particle.cluster == cluster)
                .map(|(index, _)| index)
                .collect();
            if members.len() < 2 {
                continue;
            }
            let Some((start, end)) = self.distant_pair(&members) else {
                continue;
            };

            let Ok(edge) = self.network.check(self.particles, start, end) else {
                continue;
            };
            let connection = Connection::flow(self.rng, self.colours, edge);
            if self.network.link(self.particles, connection).is_ok() {
                created += 1;
            }
        }

        if created > 0 {
            tracing::debug!("Spawned {created} flow line(s)");
        }
        created
    }

    /// Randomly look for two particles that are far enough apart for a flow line.
    fn distant_pair(&mut self, members: &[usize]) -> Option<(usize, usize)> {
        for _ in 0..FLOW_ATTEMPTS {
            let (Some(&start), Some(&end)) = (members.choose(self.rng), members.choose(self.rng))
            else {
                return None;
            };
            if start == end {
                continue;
            }
            if self.distance(start, end) >= FLOW_MIN_DISTANCE {
                return Some((start, end));
            }
        }
        None
    }

    /// Make a regular connection if the network allows it.
    fn link(&mut self, first: usize, second: usize) -> bool {
        let Ok(edge) = self.network.check(self.particles, first, second) else {
            return false;
        };
        let connection = Connection::regular(self.rng, self.colours, edge, self.lifespan);
        self.network.link(self.particles, connection).is_ok()
    }

    /// Indices of every particle that can take another connection.
    fn unsaturated(&self) -> Vec<usize> {
        self.particles
            .iter()
            .enumerate()
            .filter(|(_, particle)| !particle.is_saturated())
            .map(|(index, _)| index)
            .collect()
    }

    /// Unsaturated particles in the same cluster and within `reach` of `index`.
    fn neighbours(&self, index: usize, reach: f32) -> Vec<usize> {
        let cluster = self.cluster_of(index);
        self.particles
            .iter()
            .enumerate()
            .filter(|(other, particle)| {
                *other != index
                    && Some(particle.cluster) == cluster
                    && !particle.is_saturated()
                    && self.distance(index, *other) < reach
            })
            .map(|(other, _)| other)
            .collect()
    }

    /// The cluster a particle belongs to.
    fn cluster_of(&self, index: usize) -> Option<usize> {
        self.particles.get(index).map(|particle| particle.cluster)
    }

    /// Is the particle out of capacity?
    fn is_saturated(&self, index: usize) -> bool {
        self.particles
            .get(index)
            .is_none_or(Particle::is_saturated)
    }

    /// Distance between two particles. Unknown particles are infinitely far away.
    fn distance(&self, first: usize, second: usize) -> f32 {
        match (self.particles.get(first), self.particles.get(second)) {
            (Some(a), Some(b)) => a.position.distance(b.position),
            _ => f32::INFINITY,
        }
    }
}

//! The whole particle network: seeding it, and advancing it one frame at a time.

use glam::Vec2;
use rand::Rng as _;
use rand::SeedableRng as _;

use super::cluster::Cluster;
use super::colours::Colours;
use super::config::Config;
use super::connection::Network;
use super::influence;
use super::interaction::Interaction;
use super::orb::Orb;
use super::particle::Particle;
use super::ripple::Ripples;
use super::topology::Topology;

/// The smallest number of connection attempts in a burst.
const MIN_BURST: usize = 2;

/// The largest number of connection attempts in a burst.
const MAX_BURST: usize = 4;

/// Owns every entity in the network. Nothing else mutates them.
#[derive(Debug)]
pub struct Simulation {
    /// All the tunable values.
    config: Config,
    /// Canvas width in canvas units.
    width: f32,
    /// Canvas height in canvas units.
    height: f32,
    /// The single source of randomness, so that a seed reproduces a whole run.
    rng: rand::rngs::StdRng,
    /// Parsed brand colours.
    colours: Colours,
    /// The particle arena. Connections index into it.
    particles: Vec<Particle>,
    /// Live connections.
    network: Network,
    /// Background blobs.
    orbs: Vec<Orb>,
    /// Rings left by clicks.
    ripples: Ripples,
    /// Pointer state.
    interaction: Interaction,
    /// Bumped on every (re)initialisation.
    generation: u64,
    /// Frames advanced since the last (re)initialisation.
    frame: u64,
}

impl Simulation {
    /// Create and seed a simulation for a canvas of the given size.
    #[must_use]
    pub fn new(config: Config, width: f32, height: f32) -> Self {
        let rng = Self::make_rng(&config);
        let colours = Colours::from_hex(&config.colours);
        let mut simulation = Self {
            network: Network::new(config.connection_cap),
            config,
            width,
            height,
            rng,
            colours,
            particles: Vec::new(),
            orbs: Vec::new(),
            ripples: Ripples::default(),
            interaction: Interaction::default(),
            generation: 0,
            frame: 0,
        };
        simulation.initialise();
        simulation
    }

    /// The configured seed, or one from the OS.
    fn make_rng(config: &Config) -> rand::rngs::StdRng {
        match config.seed {
            Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
            None => rand::rngs::StdRng::from_entropy(),
        }
    }

    /// Throw away everything and seed a new network at the current size. Returns the clusters
    /// that the particles were seeded in. They aren't kept by the simulation.
    pub fn initialise(&mut self) -> Vec<Cluster> {
        self.particles.clear();
        self.orbs.clear();
        self.ripples.clear();
        self.network.clear(self.config.connection_cap);
        self.interaction = Interaction::default();
        self.generation += 1;
        self.frame = 0;

        if !self.has_area() {
            tracing::debug!(
                "Not seeding network for empty canvas: {}x{}",
                self.width,
                self.height
            );
            return Vec::new();
        }

        let clusters: Vec<Cluster> = (0..self.config.cluster_count)
            .map(|_| Cluster::random(&mut self.rng, &self.colours, self.width, self.height))
            .collect();

        if !clusters.is_empty() {
            for _ in 0..self.config.particle_count {
                let index = self.rng.gen_range(0..clusters.len());
                let Some(cluster) = clusters.get(index) else {
                    continue;
                };
                let position = cluster.scatter(&mut self.rng);
                let base_colour = self.colours.random(&mut self.rng);
                let particle =
                    Particle::spawn(&mut self.rng, position, index, cluster.colour, base_colour);
                self.particles.push(particle);
            }
        }

        for index in 0..self.config.orb_count {
            let orb = Orb::random(&mut self.rng, &self.colours, index, self.width, self.height);
            self.orbs.push(orb);
        }

        let linked = self.topology().connect_within_clusters();

        tracing::debug!(
            "Seeded network generation {}: {} particles, {} clusters, {} orbs, {linked} connections",
            self.generation,
            self.particles.len(),
            clusters.len(),
            self.orbs.len()
        );

        clusters
    }

    /// Change the canvas size and reseed.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.initialise();
    }

    /// Apply new settings and reseed.
    pub fn reconfigure(&mut self, config: Config) {
        if config.seed != self.config.seed {
            self.rng = Self::make_rng(&config);
        }
        self.colours = Colours::from_hex(&config.colours);
        self.config = config;
        self.initialise();
    }

    /// Advance the whole network by one frame.
    pub fn tick(&mut self) {
        self.frame += 1;

        self.interaction
            .apply(&mut self.particles, &self.config.interaction);

        if self.rng.gen_bool(influence::CHANCE_PER_FRAME) {
            influence::apply(
                &mut self.rng,
                &mut self.particles,
                self.config.connection_threshold,
                self.frame,
            );
        }

        for particle in &mut self.particles {
            particle.advance(self.config.boundary, self.width, self.height);
        }

        for orb in &mut self.orbs {
            orb.advance(self.width, self.height);
        }

        self.ripples.advance();

        let expired = self.network.tick(&mut self.particles);
        if expired > 0 {
            tracing::trace!("{expired} connection(s) expired");
        }

        self.churn();
    }

    /// Randomly grow the network, now and then in a burst.
    fn churn(&mut self) {
        if self.network.is_full() {
            return;
        }

        if roll(&mut self.rng, self.config.connect_chance) {
            self.topology().connect();
        }

        if roll(&mut self.rng, self.config.burst_chance) {
            let attempts = self.rng.gen_range(MIN_BURST..=MAX_BURST);
            let mut created = 0;
            for _ in 0..attempts {
                created += self.topology().connect();
            }
            tracing::trace!("Burst of {attempts} attempts created {created} connection(s)");
        }
    }

    /// Run the flow line generator once.
    pub fn spawn_flow_lines(&mut self) -> usize {
        if !self.has_area() {
            return 0;
        }
        self.topology().spawn_flow_lines()
    }

    /// The pointer moved to a new position in canvas units.
    pub fn pointer_moved(&mut self, position: Vec2) {
        if !self.config.interaction.enabled {
            return;
        }
        self.interaction
            .pointer_moved(position, &self.config.interaction);
    }

    /// The pointer was clicked at a position in canvas units.
    pub fn pointer_clicked(&mut self, position: Vec2) {
        if !self.config.interaction.enabled || !position.is_finite() {
            return;
        }
        let colour = self.colours.random(&mut self.rng);
        self.ripples.spawn(&mut self.rng, position, colour);
    }

    /// Borrow everything the connection strategies need.
    fn topology(&mut self) -> Topology<'_, rand::rngs::StdRng> {
        Topology {
            rng: &mut self.rng,
            particles: &mut self.particles,
            network: &mut self.network,
            colours: &self.colours,
            threshold: self.config.connection_threshold,
            lifespan: self.config.connection_lifespan,
            mesh_size: self.config.mesh_size,
        }
    }

    /// Is there anywhere to put things?
    fn has_area(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// The current settings.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Canvas width in canvas units.
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.width
    }

    /// Canvas height in canvas units.
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.height
    }

    /// The particle arena.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// The live connections.
    #[must_use]
    pub const fn network(&self) -> &Network {
        &self.network
    }

    /// The background orbs.
    #[must_use]
    pub fn orbs(&self) -> &[Orb] {
        &self.orbs
    }

    /// The live ripples.
    #[must_use]
    pub const fn ripples(&self) -> &Ripples {
        &self.ripples
    }

    /// The pointer state.
    #[must_use]
    pub const fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// How many times the network has been seeded.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Frames since the network was last seeded.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }
}

/// A coin flip that tolerates nonsensical probabilities from config files.
fn roll(rng: &mut impl rand::Rng, chance: f64) -> bool {
    if !chance.is_finite() || chance <= 0.0 {
        return false;
    }
    rng.gen_bool(chance.min(1.0))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::effects::network::config::Boundary;

    fn config() -> Config {
        Config {
            seed: Some(42),
            ..Config::default()
        }
    }

    #[test]
    fn same_seed_same_network() {
        let mut first = Simulation::new(config(), 800.0, 600.0);
        let mut second = Simulation::new(config(), 800.0, 600.0);
        for _ in 0..100 {
            first.tick();
            second.tick();
        }
        let positions = |simulation: &Simulation| -> Vec<Vec2> {
            simulation
                .particles()
                .iter()
                .map(|particle| particle.position)
                .collect()
        };
        assert_eq!(positions(&first), positions(&second));
        assert_eq!(first.network().len(), second.network().len());
    }

    #[test]
    fn empty_canvas_has_nothing_in_it() {
        let mut simulation = Simulation::new(config(), 0.0, 600.0);
        assert!(simulation.particles().is_empty());
        simulation.tick();
        assert_eq!(simulation.spawn_flow_lines(), 0);
        assert!(simulation.network().is_empty());
    }

    #[test]
    fn resizing_reseeds() {
        let mut simulation = Simulation::new(config(), 800.0, 600.0);
        simulation.pointer_clicked(Vec2::new(10.0, 10.0));
        simulation.tick();
        simulation.resize(400.0, 300.0);

        assert_eq!(simulation.generation(), 2);
        assert_eq!(simulation.frame(), 0);
        assert!(simulation.ripples().is_empty());
        assert_eq!(simulation.particles().len(), 45);
        for particle in simulation.particles() {
            assert!((0.0..=400.0).contains(&particle.position.x));
            assert!((0.0..=300.0).contains(&particle.position.y));
        }
    }

    #[test]
    fn clicks_make_ripples_only_when_interactive() {
        let mut simulation = Simulation::new(config(), 800.0, 600.0);
        simulation.pointer_clicked(Vec2::new(100.0, 100.0));
        assert_eq!(simulation.ripples().len(), 1);

        let mut config = config();
        config.interaction.enabled = false;
        config.boundary = Boundary::Bounce;
        simulation.reconfigure(config);
        simulation.pointer_clicked(Vec2::new(100.0, 100.0));
        simulation.pointer_moved(Vec2::new(100.0, 100.0));
        assert!(simulation.ripples().is_empty());
        assert!(simulation.interaction().pointer.is_none());
    }

    #[test]
    fn silly_chances_dont_panic() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        assert!(!roll(&mut rng, f64::NAN));
        assert!(!roll(&mut rng, -1.0));
        assert!(roll(&mut rng, 7.0));
    }
}

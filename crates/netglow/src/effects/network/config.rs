//! All the variables that can be configured for the particle network

/// What a particle does when it reaches the edge of the canvas.
#[derive(
    serde::Serialize, serde::Deserialize, clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq,
)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Boundary {
    /// Reappear on the opposite edge.
    Wrap,
    /// Invert the velocity component that crossed the edge.
    Bounce,
}

/// Pointer interaction settings.
#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
#[non_exhaustive]
pub struct Interaction {
    /// Whether particles react to the mouse at all.
    pub enabled: bool,
    /// The radius, in canvas units, around the pointer in which particles are repelled.
    pub radius: f32,
    /// The strength of the interaction immediately after the pointer moves.
    pub strength_on_move: f32,
    /// How much strength is lost every frame that the pointer doesn't move.
    pub decay: f32,
}

impl Default for Interaction {
    fn default() -> Self {
        Self {
            enabled: true,
            radius: 150.0,
            strength_on_move: 0.8,
            decay: 0.02,
        }
    }
}

/// All the config for the particle network
#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
#[non_exhaustive]
pub struct Config {
    /// How many particles to seed on every (re)initialisation.
    pub particle_count: usize,
    /// The maximum number of live connections across the whole network.
    pub connection_cap: usize,
    /// How many spatial clusters particles are grouped into.
    pub cluster_count: usize,
    /// How many decorative orbs float in the background.
    pub orb_count: usize,
    /// The base distance, in canvas units, under which particles may connect.
    pub connection_threshold: f32,
    /// How many frames a regular connection lives for.
    pub connection_lifespan: u32,
    /// The number of particles that take part in a mesh.
    pub mesh_size: usize,
    /// Edge behaviour for particles.
    pub boundary: Boundary,
    /// Pointer interaction.
    pub interaction: Interaction,
    /// The chance, per frame, of trying to create a new connection.
    pub connect_chance: f64,
    /// The chance, per frame, of a burst of 2 to 4 connection attempts.
    pub burst_chance: f64,
    /// Milliseconds between runs of the flow line generator.
    pub flow_interval_ms: u64,
    /// Milliseconds to wait for resizing to settle before reinitialising.
    pub resize_debounce_ms: u64,
    /// How many canvas units fit in one rendered terminal pixel.
    pub scale: f32,
    /// Seed for the random number generator. A random seed is used when not set.
    pub seed: Option<u64>,
    /// The brand colours as hex strings, eg `#4E7CFF`.
    pub colours: Vec<String>,
    /// The opacity of the whole rendered layer.
    pub opacity: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            particle_count: 45,
            connection_cap: 25,
            cluster_count: 4,
            orb_count: 4,
            connection_threshold: 150.0,
            connection_lifespan: 180,
            mesh_size: 3,
            boundary: Boundary::Wrap,
            interaction: Interaction::default(),
            connect_chance: 0.02,
            burst_chance: 0.0005,
            flow_interval_ms: 3000,
            resize_debounce_ms: 250,
            scale: 8.0,
            seed: None,
            colours: vec![
                "#4E7CFF".to_owned(),
                "#7B61FF".to_owned(),
                "#B4C9F9".to_owned(),
                "#d4a650".to_owned(),
            ],
            opacity: 0.8,
        }
    }
}

impl Config {
    /// The flow line generator's period.
    #[must_use]
    pub const fn flow_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.flow_interval_ms)
    }

    /// How long resizing has to settle for.
    #[must_use]
    pub const fn resize_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.resize_debounce_ms)
    }
}

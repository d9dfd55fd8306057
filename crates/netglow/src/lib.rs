//! Netglow: a drifting particle-network backdrop for your terminal

pub mod canvas;
pub mod cli_args;
/// All the user-configurable settings.
pub mod config {
    pub mod main;
}
pub mod input;
pub mod renderer;
pub mod run;
pub mod shared_state;
pub mod surface;
pub mod utils;

/// Everything that draws moving things to the terminal.
pub mod effects {
    pub mod effect;

    /// Particles drifting in clusters, joined by short-lived curved connections
    pub mod network {
        pub mod cluster;
        pub mod colours;
        pub mod config;
        pub mod connection;
        pub mod influence;
        pub mod interaction;
        pub mod main;
        pub mod orb;
        pub mod particle;
        pub mod render;
        pub mod ripple;
        pub mod simulation;
        pub mod topology;
    }
}

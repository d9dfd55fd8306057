//! All the CLI arguments for Netglow

/// The default name of the main config file.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "netglow.toml";

/// A drifting particle-network backdrop for your terminal.
#[derive(clap::Parser, Debug, Clone, Default)]
#[command(version, about, long_about = None)]
#[non_exhaustive]
pub struct CliArgs {
    /// Use a custom config directory. Defaults to `netglow` in your OS's standard config location.
    #[arg(long)]
    pub config_dir: Option<std::path::PathBuf>,

    /// The name of the main config file inside the config directory.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE_NAME)]
    pub main_config: std::path::PathBuf,

    /// Override the log level from the config file.
    #[arg(long)]
    pub log_level: Option<crate::config::main::LogLevel>,

    /// Override the path of the log file.
    #[arg(long)]
    pub log_path: Option<std::path::PathBuf>,

    /// Seed the random number generator, for reproducible animations.
    #[arg(long)]
    pub seed: Option<u64>,

    /// What particles do when they reach the edge of the terminal.
    #[arg(long)]
    pub boundary: Option<crate::effects::network::config::Boundary>,

    /// Don't let the mouse push particles around.
    #[arg(long)]
    pub no_pointer: bool,

    /// Override the target frame rate.
    #[arg(long)]
    pub frame_rate: Option<u32>,
}

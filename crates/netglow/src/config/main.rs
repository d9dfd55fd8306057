//! All of the user config for Netglow.

use color_eyre::eyre::ContextCompat as _;
use color_eyre::eyre::Result;
use color_eyre::eyre::WrapErr as _;

/// A copy of the default config file. It gets copied to the user's config folder the first time
/// they start Netglow.
static DEFAULT_CONFIG: &str = include_str!("../../default_config.toml");

/// The valid log levels. Based on our `tracing` crate.
#[derive(serde::Serialize, serde::Deserialize, clap::ValueEnum, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum LogLevel {
    /// Error
    Error,
    /// Warnings
    Warn,
    /// Info
    Info,
    /// Debug
    Debug,
    /// Trace
    Trace,
    /// No logging
    Off,
}

/// Managing user config.
#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
#[non_exhaustive]
pub struct Config {
    /// The maximum log level
    pub log_level: LogLevel,
    /// The location of the log file.
    pub log_path: std::path::PathBuf,
    /// Target frame rate
    pub frame_rate: u32,
    /// The particle network
    pub network: crate::effects::network::config::Config,
}

impl Default for Config {
    fn default() -> Self {
        let log_directory = match dirs::state_dir() {
            Some(directory) => directory,
            None => std::path::PathBuf::new().join("./"),
        };
        let log_path = log_directory.join("netglow").join("netglow.log");

        Self {
            log_level: LogLevel::Off,
            log_path,
            frame_rate: 30,
            network: crate::effects::network::config::Config::default(),
        }
    }
}

impl Config {
    /// Canonical path to the config directory.
    pub async fn directory(
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) -> std::path::PathBuf {
        state.config_path.read().await.clone()
    }

    /// Get the stable location of Netglow's config directory on the user's system.
    ///
    /// # Errors
    /// When the OS doesn't have a standard config location.
    pub fn default_directory() -> Result<std::path::PathBuf> {
        Ok(dirs::config_dir()
            .context("Couldn't get standard config directory")?
            .join("netglow"))
    }

    /// Figure out where our config is being stored, and create the directory if needed.
    ///
    /// # Errors
    /// When the directory can't be created.
    pub async fn setup_directory(
        maybe_custom_path: Option<std::path::PathBuf>,
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) -> Result<()> {
        let path = match maybe_custom_path {
            None => Self::default_directory()?,
            Some(path_string) => std::path::PathBuf::new().join(path_string),
        };

        std::fs::create_dir_all(&path)?;
        *state.config_path.write().await = path;

        Ok(())
    }

    /// Canonical path to the main config file.
    pub async fn main_config_path(
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) -> std::path::PathBuf {
        let directory = Self::directory(state).await;
        let main_config_file = state.main_config_file.read().await.clone();
        directory.join(main_config_file)
    }

    /// Load the main config, writing the default one first if the user doesn't have one yet.
    ///
    /// # Errors
    /// When the file can't be read or isn't valid config.
    pub async fn load(state: &std::sync::Arc<crate::shared_state::SharedState>) -> Result<Self> {
        let config_path = Self::main_config_path(state).await;
        let config_file_name = config_path
            .file_name()
            .context("Couldn't get file name from config path")?;
        let is_default_config = config_file_name == crate::cli_args::DEFAULT_CONFIG_FILE_NAME;
        if is_default_config && !config_path.exists() {
            tracing::info!("Writing default config to: {config_path:?}");
            std::fs::write(&config_path, DEFAULT_CONFIG)?;
        }

        tracing::info!("(Re)loading the main Netglow config from: {config_path:?}");
        let result = std::fs::read_to_string(&config_path);
        match result {
            Ok(data) => {
                tracing::trace!("Using config file:\n{data}");
                let mut config = Self::parse(&data, &config_path)?;
                config.apply_cli_overrides(&*state.cli_args.read().await);
                Ok(config)
            }
            Err(err) => {
                tracing::error!("Loading config: {err:?}");
                color_eyre::eyre::bail!(
                    "Couldn't load config at {config_path:?}: {}",
                    err.to_string()
                );
            }
        }
    }

    /// Parse config file contents. Errors name the file they came from.
    ///
    /// # Errors
    /// When the TOML is invalid or has values of the wrong type.
    pub fn parse(data: &str, path: &std::path::Path) -> Result<Self> {
        toml::from_str::<Self>(data)
            .wrap_err_with(|| format!("Invalid config in {}", path.display()))
    }

    /// Command line arguments always win over the config file.
    pub fn apply_cli_overrides(&mut self, cli_args: &crate::cli_args::CliArgs) {
        if let Some(level) = &cli_args.log_level {
            self.log_level = level.clone();
        }
        if let Some(path) = &cli_args.log_path {
            self.log_path.clone_from(path);
        }
        if let Some(frame_rate) = cli_args.frame_rate {
            self.frame_rate = frame_rate;
        }
        if let Some(seed) = cli_args.seed {
            self.network.seed = Some(seed);
        }
        if let Some(boundary) = cli_args.boundary {
            self.network.boundary = boundary;
        }
        if cli_args.no_pointer {
            self.network.interaction.enabled = false;
        }
    }

    /// Load the main config
    ///
    /// # Errors
    /// When the config can't be loaded, in which case the shared state is left untouched.
    pub async fn load_config_into_shared_state(
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) -> Result<Self> {
        let new_config = Self::load(state).await?;
        let mut config_state = state.config.write().await;
        *config_state = new_config.clone();
        drop(config_state);

        Ok(new_config)
    }

    /// Watch the config file for any changes and then automatically update the shared state with
    /// the contents of the new config file.
    #[must_use]
    pub fn watch(
        state: std::sync::Arc<crate::shared_state::SharedState>,
    ) -> tokio::task::JoinHandle<Result<()>> {
        let mut protocol_rx = state.protocol_tx.subscribe();
        tokio::spawn(async move {
            let path = Self::directory(&state).await;
            tracing::debug!("Watching config ({path:?}) for changes.");

            let (config_file_change_tx, mut config_file_change_rx) = tokio::sync::mpsc::channel(1);

            let mut debouncer = notify_debouncer_full::new_debouncer(
                std::time::Duration::from_millis(100),
                None,
                move |result: notify_debouncer_full::DebounceEventResult| match result {
                    Ok(events) => {
                        for event in events {
                            let send_result = config_file_change_tx.blocking_send(event.clone());
                            if let Err(error) = send_result {
                                tracing::error!(
                                    "Sending config file watcher notification: {error:?}"
                                );
                            }
                        }
                    }
                    Err(error) => tracing::error!("File watcher: {error:?}"),
                },
            )?;
            debouncer.watch(
                &path,
                notify_debouncer_full::notify::RecursiveMode::NonRecursive,
            )?;

            #[expect(
                clippy::integer_division_remainder_used,
                reason = "This is caused by the `tokio::select!`"
            )]
            loop {
                tokio::select! {
                    Some(event) = config_file_change_rx.recv() => {
                        Self::handle_file_change_event(event, &state).await;
                    },
                    result = protocol_rx.recv() => {
                        if matches!(
                            result,
                            Ok(crate::run::Protocol::End)
                                | Err(tokio::sync::broadcast::error::RecvError::Closed)
                        ) {
                            break;
                        }
                    }
                }
            }

            tracing::debug!("Leaving config watcher loop");
            Ok(())
        })
    }

    /// Handle an event from the config file watcher. Should normally be a notification that the
    /// config file has changed.
    pub async fn handle_file_change_event(
        event: notify_debouncer_full::DebouncedEvent,
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) {
        use notify_debouncer_full::notify::event as notify_event;
        let notify_event::EventKind::Modify(kind) = event.kind else {
            return;
        };
        let notify_event::ModifyKind::Data(_) = kind else {
            return;
        };

        tracing::debug!(
            "Config file change detected ({:?}), updating shared state.",
            event.paths
        );

        match Self::load_config_into_shared_state(state).await {
            Ok(config) => {
                state
                    .protocol_tx
                    .send(crate::run::Protocol::Config(config))
                    .unwrap_or_else(|send_error| {
                        tracing::error!(
                            "Couldn't send config update on protocol channel: {send_error:?}"
                        );
                        0
                    });
            }
            Err(error) => {
                tracing::error!("Ignoring bad config update: {error:?}");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::effects::network::config::Boundary;

    async fn state_in(directory: &std::path::Path) -> std::sync::Arc<crate::shared_state::SharedState> {
        let state = crate::shared_state::SharedState::init();
        Config::setup_directory(Some(directory.to_path_buf()), &state)
            .await
            .unwrap();
        state
    }

    fn modified_event() -> notify_debouncer_full::DebouncedEvent {
        use notify_debouncer_full::notify::event as notify_event;
        let event = notify_event::Event::new(notify_event::EventKind::Modify(
            notify_event::ModifyKind::Data(notify_event::DataChange::Content),
        ));
        notify_debouncer_full::DebouncedEvent::new(event, std::time::Instant::now())
    }

    #[test]
    fn default_config_file_matches_defaults() {
        let config = Config::parse(DEFAULT_CONFIG, std::path::Path::new("default.toml")).unwrap();
        assert_eq!(config.frame_rate, 30);
        assert_eq!(config.log_level, LogLevel::Off);
        assert_eq!(
            config.network,
            crate::effects::network::config::Config::default()
        );
    }

    #[test]
    fn parse_errors_name_the_file() {
        let error = Config::parse("frame_rate = \"fast\"", std::path::Path::new("/tmp/bad.toml"))
            .unwrap_err();
        assert!(format!("{error}").contains("/tmp/bad.toml"));
    }

    #[test]
    fn cli_overrides_win() {
        let mut config = Config::default();
        let cli_args = crate::cli_args::CliArgs {
            seed: Some(7),
            boundary: Some(Boundary::Bounce),
            no_pointer: true,
            frame_rate: Some(12),
            log_level: Some(LogLevel::Debug),
            ..Default::default()
        };
        config.apply_cli_overrides(&cli_args);

        assert_eq!(config.network.seed, Some(7));
        assert_eq!(config.network.boundary, Boundary::Bounce);
        assert!(!config.network.interaction.enabled);
        assert_eq!(config.frame_rate, 12);
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[tokio::test]
    async fn first_load_writes_the_default_config() {
        let directory = tempfile::tempdir().unwrap();
        let state = state_in(directory.path()).await;

        let config = Config::load_config_into_shared_state(&state).await.unwrap();

        let path = directory.path().join(crate::cli_args::DEFAULT_CONFIG_FILE_NAME);
        assert_eq!(std::fs::read_to_string(path).unwrap(), DEFAULT_CONFIG);
        assert_eq!(*state.config.read().await, config);
    }

    #[tokio::test]
    async fn reload_broadcasts_new_config() {
        let directory = tempfile::tempdir().unwrap();
        let state = state_in(directory.path()).await;
        let path = directory.path().join(crate::cli_args::DEFAULT_CONFIG_FILE_NAME);
        std::fs::write(&path, "frame_rate = 10\n[network]\nparticle_count = 5\n").unwrap();
        *state.cli_args.write().await = crate::cli_args::CliArgs {
            seed: Some(3),
            ..Default::default()
        };
        let mut protocol_rx = state.protocol_tx.subscribe();

        Config::handle_file_change_event(modified_event(), &state).await;

        let Ok(crate::run::Protocol::Config(config)) = protocol_rx.recv().await else {
            panic!("Expected a config message");
        };
        assert_eq!(config.frame_rate, 10);
        assert_eq!(config.network.particle_count, 5);
        assert_eq!(config.network.seed, Some(3));
        assert_eq!(state.config.read().await.frame_rate, 10);
    }

    #[tokio::test]
    async fn bad_reload_keeps_the_old_config() {
        let directory = tempfile::tempdir().unwrap();
        let state = state_in(directory.path()).await;
        Config::load_config_into_shared_state(&state).await.unwrap();
        let path = directory.path().join(crate::cli_args::DEFAULT_CONFIG_FILE_NAME);
        std::fs::write(&path, "frame_rate = [").unwrap();
        let mut protocol_rx = state.protocol_tx.subscribe();

        Config::handle_file_change_event(modified_event(), &state).await;

        assert!(protocol_rx.try_recv().is_err());
        assert_eq!(state.config.read().await.frame_rate, 30);
    }
}

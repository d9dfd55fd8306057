//! Here we store all the shared data that the app's tasks and threads might use.
//! Access is mediated with locks to support asynchronicity

use std::sync::Arc;

use tokio::sync::RwLock;

/// How many protocol messages a slow listener can fall behind by before it starts missing them.
const PROTOCOL_CHANNEL_SIZE: usize = 1024;

/// The size of the user's terminal
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[expect(
    clippy::exhaustive_structs,
    reason = "It's very unlikely that this is going to have any more fields added to it"
)]
pub struct TTYSize {
    /// Width of the TTY
    pub width: u16,
    /// Height of the TTY
    pub height: u16,
}

/// All the shared data the app uses
#[non_exhaustive]
pub struct SharedState {
    /// The channel on which all Netglow protocol messages are sent.
    pub protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    /// Location of the config directory.
    pub config_path: RwLock<std::path::PathBuf>,
    /// Name of the main config file.
    pub main_config_file: RwLock<std::path::PathBuf>,
    /// User config, with any CLI overrides already applied.
    pub config: RwLock<crate::config::main::Config>,
    /// The CLI arguments, kept so that they can be re-applied whenever the config reloads.
    pub cli_args: RwLock<crate::cli_args::CliArgs>,
    /// Just the size of the user's terminal.
    pub tty_size: RwLock<TTYSize>,
    /// Is the application logging?
    pub is_logging: RwLock<bool>,
}

impl SharedState {
    /// Initialise the shared state
    #[must_use]
    pub fn init() -> Arc<Self> {
        let (protocol_tx, _) = tokio::sync::broadcast::channel(PROTOCOL_CHANNEL_SIZE);
        Arc::new(Self {
            protocol_tx,
            config_path: RwLock::default(),
            main_config_file: RwLock::new(crate::cli_args::DEFAULT_CONFIG_FILE_NAME.into()),
            config: RwLock::default(),
            cli_args: RwLock::default(),
            tty_size: RwLock::default(),
            is_logging: RwLock::default(),
        })
    }

    /// Get a read lock and return the current TTY size
    pub async fn get_tty_size(&self) -> TTYSize {
        let tty_size = self.tty_size.read().await;
        *tty_size
    }

    /// Get a write lock and set the a new TTY size
    pub async fn set_tty_size(&self, width: u16, height: u16) {
        let mut tty_size = self.tty_size.write().await;
        *tty_size = TTYSize { width, height };
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn tty_size_round_trips() {
        let state = SharedState::init();
        assert_eq!(state.get_tty_size().await, TTYSize::default());

        state.set_tty_size(80, 24).await;
        assert_eq!(
            state.get_tty_size().await,
            TTYSize {
                width: 80,
                height: 24
            }
        );
    }
}

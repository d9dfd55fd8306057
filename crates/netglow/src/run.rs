//! Main entrypoint for running Netglow

use std::sync::Arc;

use clap::Parser as _;
use color_eyre::eyre::{ContextCompat as _, Result};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, Layer as _};

use crate::cli_args::CliArgs;
use crate::input::Input;
use crate::renderer::Renderer;
use crate::shared_state::SharedState;

/// The env var that, when set, replaces all the log filter directives.
const LOG_FILTER_ENV_VAR: &str = "NETGLOW_LOG";

/// How many finished frames can queue up before the effect waits for the renderer.
const SURFACE_CHANNEL_SIZE: usize = 4;

/// Commands to control the various tasks/threads
#[non_exhaustive]
#[derive(Clone, Debug)]
pub enum Protocol {
    /// The entire application is exiting.
    End,
    /// User's TTY is resized.
    Resize {
        /// Width of new terminal.
        width: u16,
        /// Height of new terminal.
        height: u16,
    },
    /// Parsed input from STDIN.
    Input(crate::input::ParsedInput),
    /// Netglow's configuration.
    Config(crate::config::main::Config),
}

/// Main entrypoint
///
/// # Errors
/// When setup fails, or when any of the long-running tasks fail.
pub async fn run(state_arc: &Arc<SharedState>) -> Result<()> {
    let protocol_tx = state_arc.protocol_tx.clone();
    let mut protocol_rx = protocol_tx.subscribe();
    setup(state_arc).await?;

    let (surfaces_tx, surfaces_rx) = tokio::sync::mpsc::channel(SURFACE_CHANNEL_SIZE);
    let renderer = Renderer::start(Arc::clone(state_arc), surfaces_rx, protocol_tx.clone());
    let config_handle = crate::config::main::Config::watch(Arc::clone(state_arc));
    let input_thread_handle = Input::start(protocol_tx.clone());

    override_on_panic_behaviour();
    let effect_handle =
        crate::effects::network::main::NetworkEffect::start(surfaces_tx, Arc::clone(state_arc));

    let tty_size = state_arc.get_tty_size().await;
    protocol_tx.send(Protocol::Resize {
        width: tty_size.width,
        height: tty_size.height,
    })?;

    wait_for_end(&mut protocol_rx).await;
    tracing::debug!("🏁 Received protocol end, exiting Netglow...");

    effect_handle.await??;
    if input_thread_handle.is_finished() {
        // The STDIN loop blocks on reads so it can't listen to the protocol. Therefore we
        // should only join it if it finished on its own.
        input_thread_handle
            .join()
            .map_err(|err| color_eyre::eyre::eyre!("STDIN handle: {err:?}"))??;
    }
    renderer.await??;
    config_handle.await??;

    tracing::trace!("Leaving Netglow's main `run()` function");
    Ok(())
}

/// Block until something asks the whole app to exit.
async fn wait_for_end(protocol_rx: &mut tokio::sync::broadcast::Receiver<Protocol>) {
    loop {
        match protocol_rx.recv().await {
            Ok(Protocol::End) | Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            Ok(_) | Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => (),
        }
    }
}

/// The default behaviour prints all panics to the CLI. But that would corrupt the user's
/// terminal whilst it's in raw mode. So we log them instead.
fn override_on_panic_behaviour() {
    std::panic::set_hook(Box::new(|info| {
        let message = if let Some(message) = info.payload().downcast_ref::<String>() {
            message
        } else if let Some(message) = info.payload().downcast_ref::<&str>() {
            message
        } else {
            "Caught a panic with an unknown type."
        };
        let location = match info.location() {
            Some(location) => format!(
                "{}@{}:{}",
                location.file(),
                location.line(),
                location.column()
            ),
            None => "Unknown location".to_owned(),
        };
        tracing::error!("Caught panic ({}): {message:?}", location);
    }));
}

/// Signal all task/thread loops to exit.
///
/// We keep it in its own function because we need to handle the error separately. If the error
/// were to be bubbled with `?` as usual, there's a chance it would never be logged, because the
/// protocol end signal is itself what allows the central error handler to even be reached.
pub fn broadcast_protocol_end(protocol_tx: &tokio::sync::broadcast::Sender<Protocol>) {
    tracing::debug!("Broadcasting the protocol `End` message to all listeners");
    let result = protocol_tx.send(Protocol::End);
    if let Err(error) = result {
        tracing::error!("{error:?}");
    }
}

/// Prepare the application to start.
async fn setup(state: &Arc<SharedState>) -> Result<()> {
    let cli_args = CliArgs::parse();

    let mut main_config_file = state.main_config_file.write().await;
    (*main_config_file).clone_from(&cli_args.main_config);
    drop(main_config_file);
    *state.cli_args.write().await = cli_args.clone();

    let directory_result =
        crate::config::main::Config::setup_directory(cli_args.config_dir.clone(), state).await;
    if let Err(directory_error) = directory_result {
        color_eyre::eyre::bail!("Error setting up config directory: {directory_error:?}");
    }

    let config_result = crate::config::main::Config::load_config_into_shared_state(state).await;
    if let Err(config_error) = config_result {
        let path = crate::config::main::Config::main_config_path(state).await;
        color_eyre::eyre::bail!(
            "Bad config file: {config_error:?}\n\nConfig path: {}",
            path.display()
        );
    }

    setup_logging(state).await?;

    tracing::info!("Starting Netglow");
    tracing::debug!("Loaded config: {:?}", state.config.read().await);

    let tty_size = Renderer::get_users_tty_size()?;
    state
        .set_tty_size(tty_size.cols.try_into()?, tty_size.rows.try_into()?)
        .await;

    Ok(())
}

/// Setup logging. The CLI overrides have already been merged into the config.
async fn setup_logging(state: &Arc<SharedState>) -> Result<()> {
    let are_log_filters_manually_set = std::env::var(LOG_FILTER_ENV_VAR).is_ok();
    let config = state.config.read().await.clone();
    let level_as_string = format!("{:?}", config.log_level).to_lowercase();

    let is_loggable = !matches!(config.log_level, crate::config::main::LogLevel::Off)
        || are_log_filters_manually_set;

    if !is_loggable {
        return Ok(());
    }

    let directory = config
        .log_path
        .parent()
        .context("Couldn't get log path's parent")?;
    std::fs::create_dir_all(directory)?;
    let file = std::fs::File::create(&config.log_path)?;

    let filters = if are_log_filters_manually_set {
        tracing_subscriber::EnvFilter::builder()
            .with_default_directive("error".parse()?)
            .with_env_var(LOG_FILTER_ENV_VAR)
            .from_env_lossy()
    } else {
        tracing_subscriber::EnvFilter::builder()
            .with_default_directive("off".parse()?)
            .parse_lossy("")
            .add_directive(format!("netglow={level_as_string}").parse()?)
            .add_directive(format!("tests={level_as_string}").parse()?)
    };

    let logfile_layer = tracing_subscriber::fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_filter(filters);

    tracing_subscriber::registry().with(logfile_layer).init();

    let mut is_logging = state.is_logging.write().await;
    *is_logging = true;
    drop(is_logging);

    Ok(())
}

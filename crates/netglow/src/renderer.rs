//! Render finished frames to the user's terminal

use std::io::Write as _;
use std::sync::Arc;

use color_eyre::eyre::Result;
use tokio::sync::mpsc;

use termwiz::escape::csi::{DecPrivateMode, DecPrivateModeCode, Mode, CSI};
use termwiz::surface::Change as TermwizChange;
use termwiz::terminal::buffered::BufferedTerminal;
use termwiz::terminal::{ScreenSize, Terminal as TermwizTerminal};

use crate::shared_state::SharedState;

/// How often to check for a resized terminal when no frames are arriving.
const RESIZE_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(250);

/// `Render`
pub struct Renderer {
    /// Shared app state
    pub state: Arc<SharedState>,
    /// The terminal's width
    pub width: u16,
    /// The terminal's height
    pub height: u16,
}

impl Renderer {
    /// Create a renderer to render to a user's terminal
    ///
    /// # Errors
    /// When there's no terminal to render to.
    pub fn new(state: Arc<SharedState>) -> Result<Self> {
        let size = Self::get_users_tty_size()?;
        Ok(Self {
            state,
            width: size.cols.try_into()?,
            height: size.rows.try_into()?,
        })
    }

    /// Instantiate and run
    #[must_use]
    pub fn start(
        state: Arc<SharedState>,
        surfaces_rx: mpsc::Receiver<crate::surface::Surface>,
        protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> tokio::task::JoinHandle<Result<()>> {
        let protocol_rx = protocol_tx.subscribe();
        tokio::spawn(async move {
            // This would be much simpler if async closures where stable, because then we could use
            // the `?` syntax.
            match Self::new(Arc::clone(&state)) {
                Ok(mut renderer) => {
                    let result = renderer
                        .run(surfaces_rx, protocol_rx, protocol_tx.clone())
                        .await;

                    if let Err(error) = result {
                        tracing::error!("Renderer: {error:?}");
                        crate::run::broadcast_protocol_end(&protocol_tx);
                        return Err(error);
                    };
                }
                Err(error) => {
                    tracing::error!("Couldn't acquire the user's terminal: {error:?}");
                    crate::run::broadcast_protocol_end(&protocol_tx);
                    return Err(error);
                }
            };

            Ok(())
        })
    }

    /// We need this just because I can't figure out how to pass `Box<dyn Terminal>` to
    /// `BufferedTerminal::new()`
    fn get_termwiz_terminal() -> Result<impl TermwizTerminal> {
        let capabilities = termwiz::caps::Capabilities::new_from_env()?;
        Ok(termwiz::terminal::new_terminal(capabilities)?)
    }

    /// Just for initialisation
    ///
    /// # Errors
    /// When there's no terminal, or it won't tell us its size.
    pub fn get_users_tty_size() -> Result<ScreenSize> {
        let mut terminal = Self::get_termwiz_terminal()?;
        Ok(terminal.get_screen_size()?)
    }

    /// Get the user's current terminal size and propogate it
    async fn handle_resize<T: TermwizTerminal + Send>(
        &mut self,
        terminal: &mut BufferedTerminal<T>,
        protocol_tx: &tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> Result<()> {
        let is_resized = terminal.check_for_resize()?;
        if !is_resized {
            return Ok(());
        }

        terminal.repaint()?;

        let (width, height) = terminal.dimensions();
        self.width = width.try_into()?;
        self.height = height.try_into()?;
        tracing::debug!("Terminal resized to {}x{}", self.width, self.height);
        self.state.set_tty_size(self.width, self.height).await;
        protocol_tx.send(crate::run::Protocol::Resize {
            width: self.width,
            height: self.height,
        })?;

        Ok(())
    }

    /// Listen for finished frames. It lives in its own method so that we can catch any errors
    /// and ensure that the user's terminal is always returned to cooked mode.
    async fn run(
        &mut self,
        mut surfaces: mpsc::Receiver<crate::surface::Surface>,
        mut protocol_rx: tokio::sync::broadcast::Receiver<crate::run::Protocol>,
        protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> Result<()> {
        tracing::debug!("Putting user's terminal into raw mode");
        let mut users_terminal = Self::get_termwiz_terminal()?;
        users_terminal.set_raw_mode()?;
        users_terminal.enter_alternate_screen()?;
        let mut terminal = BufferedTerminal::new(users_terminal)?;
        Self::prepare(&mut terminal)?;

        let result = self
            .render_loop(&mut terminal, &mut surfaces, &mut protocol_rx, &protocol_tx)
            .await;

        tracing::debug!("Restoring user's terminal");
        Self::restore(&mut terminal)?;

        result
    }

    /// The main loop.
    async fn render_loop<T: TermwizTerminal + Send>(
        &mut self,
        terminal: &mut BufferedTerminal<T>,
        surfaces: &mut mpsc::Receiver<crate::surface::Surface>,
        protocol_rx: &mut tokio::sync::broadcast::Receiver<crate::run::Protocol>,
        protocol_tx: &tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> Result<()> {
        let mut resize_poll = tokio::time::interval(RESIZE_POLL_INTERVAL);
        resize_poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::debug!("Starting render loop");
        #[expect(
            clippy::integer_division_remainder_used,
            reason = "`tokio::select! generates this.`"
        )]
        loop {
            tokio::select! {
                Some(surface) = surfaces.recv() => {
                    self.handle_resize(terminal, protocol_tx).await?;
                    self.render(&surface, terminal)?;
                }
                _ = resize_poll.tick() => {
                    self.handle_resize(terminal, protocol_tx).await?;
                }
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
        tracing::debug!("Exited render loop");

        Ok(())
    }

    /// Hide the cursor and ask for every mouse movement, in SGR format.
    fn prepare(terminal: &mut BufferedTerminal<impl TermwizTerminal>) -> Result<()> {
        terminal.add_change(TermwizChange::CursorVisibility(
            termwiz::surface::CursorVisibility::Hidden,
        ));
        terminal.add_change(TermwizChange::ClearScreen(
            termwiz::color::ColorAttribute::Default,
        ));
        terminal.flush()?;
        Self::mouse_reporting(true)
    }

    /// Put everything back how we found it.
    fn restore(terminal: &mut BufferedTerminal<impl TermwizTerminal>) -> Result<()> {
        Self::mouse_reporting(false)?;
        terminal.add_change(TermwizChange::CursorVisibility(
            termwiz::surface::CursorVisibility::Visible,
        ));
        terminal.flush()?;
        terminal.terminal().exit_alternate_screen()?;
        terminal.terminal().set_cooked_mode()?;
        Ok(())
    }

    /// Turn on or off any-event mouse tracking with SGR coordinates.
    fn mouse_reporting(is_enabled: bool) -> Result<()> {
        let mode = |code| {
            let mode = DecPrivateMode::Code(code);
            if is_enabled {
                CSI::Mode(Mode::SetDecPrivateMode(mode))
            } else {
                CSI::Mode(Mode::ResetDecPrivateMode(mode))
            }
        };

        let mut stdout = std::io::stdout();
        write!(
            stdout,
            "{}{}",
            mode(DecPrivateModeCode::AnyEventMouse),
            mode(DecPrivateModeCode::SGRMouse)
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Do a single render to the user's actual terminal. It uses a diffing algorithm to make
    /// the minimum number of changes.
    fn render(
        &self,
        surface: &crate::surface::Surface,
        terminal: &mut BufferedTerminal<impl TermwizTerminal + Send>,
    ) -> Result<()> {
        let expected = (usize::from(self.width), usize::from(self.height));
        if surface.surface.dimensions() != expected {
            tracing::trace!(
                "Skipping stale {}x{} frame for {}x{} terminal",
                surface.width,
                surface.height,
                self.width,
                self.height
            );
            return Ok(());
        }

        terminal.draw_from_screen(&surface.surface, 0, 0);

        // This is where we actually render to the user's real terminal.
        terminal.flush()?;

        Ok(())
    }
}

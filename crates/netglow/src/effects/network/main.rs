//! The particle network effect: owns the simulation, drives it from the frame clock and turns it
//! into terminal frames.

use std::sync::Arc;

use color_eyre::eyre::Result;
use glam::Vec2;
use termwiz::input::{InputEvent, MouseButtons, MouseEvent};

use crate::canvas::PixelCanvas;
use crate::effects::effect::Effect;
use crate::shared_state::SharedState;

use super::config::Config;
use super::simulation::Simulation;

/// The effect's ID, mostly for logging.
const ID: &str = "network";

/// A resize that is waiting for the terminal to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingResize {
    /// Columns
    width: u16,
    /// Rows
    height: u16,
}

/// `NetworkEffect`
pub struct NetworkEffect {
    /// Shared behaviour for all effects.
    effect: Effect,
    /// The particle network itself.
    simulation: Simulation,
    /// Whether the left mouse button was down in the last mouse event.
    is_left_button_down: bool,
}

impl NetworkEffect {
    /// Instantiate. There's nothing to draw on until the first resize.
    #[must_use]
    pub fn new(
        output_channel: tokio::sync::mpsc::Sender<crate::surface::Surface>,
        config: &crate::config::main::Config,
    ) -> Self {
        Self {
            effect: Effect::new(ID.to_owned(), output_channel, config.frame_rate),
            simulation: Simulation::new(config.network.clone(), 0.0, 0.0),
            is_left_button_down: false,
        }
    }

    /// Our main entrypoint.
    #[must_use]
    pub fn start(
        output: tokio::sync::mpsc::Sender<crate::surface::Surface>,
        state: Arc<SharedState>,
    ) -> tokio::task::JoinHandle<Result<()>> {
        let protocol_rx = state.protocol_tx.subscribe();
        tokio::spawn(async move {
            let config = state.config.read().await.clone();
            let mut network = Self::new(output, &config);
            if let Err(error) = network.run(protocol_rx).await {
                tracing::error!("Network effect: {error:?}");
                crate::run::broadcast_protocol_end(&state.protocol_tx);
                return Err(error);
            }
            Ok(())
        })
    }

    /// Drive the simulation until the protocol says to stop.
    ///
    /// # Errors
    /// When the renderer has gone away.
    pub async fn run(
        &mut self,
        mut protocol: tokio::sync::broadcast::Receiver<crate::run::Protocol>,
    ) -> Result<()> {
        let mut flow = Self::flow_timer(self.simulation.config());
        let debounce = tokio::time::sleep(std::time::Duration::ZERO);
        tokio::pin!(debounce);
        let mut pending_resize: Option<PendingResize> = None;

        tracing::debug!("Starting the network effect loop");
        #[expect(
            clippy::integer_division_remainder_used,
            reason = "This is caused by the `tokio::select!`"
        )]
        loop {
            tokio::select! {
                () = self.effect.sleep_until_next_frame_tick(), if self.effect.is_ready() => {
                    self.render().await?;
                },
                _ = flow.tick() => {
                    let created = self.simulation.spawn_flow_lines();
                    tracing::trace!("Flow timer created {created} flow line(s)");
                },
                () = &mut debounce, if pending_resize.is_some() => {
                    if let Some(resize) = pending_resize.take() {
                        self.resize_simulation(resize);
                        flow = Self::flow_timer(self.simulation.config());
                    }
                },
                result = protocol.recv() => {
                    let message = match result {
                        Ok(crate::run::Protocol::End)
                        | Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                            tracing::warn!("Network effect missed {missed} protocol messages");
                            continue;
                        }
                        Ok(message) => message,
                    };

                    self.effect.handle_common_protocol_messages(&message);
                    #[expect(
                        clippy::wildcard_enum_match_arm,
                        reason = "The common messages are handled above"
                    )]
                    match message {
                        crate::run::Protocol::Resize { width, height } => {
                            let resize = PendingResize { width, height };
                            if self.has_canvas() {
                                let wait = self.simulation.config().resize_debounce();
                                debounce.as_mut().reset(tokio::time::Instant::now() + wait);
                                pending_resize = Some(resize);
                            } else {
                                pending_resize = None;
                                self.resize_simulation(resize);
                                flow = Self::flow_timer(self.simulation.config());
                            }
                        }
                        crate::run::Protocol::Config(config) => {
                            tracing::debug!("Reinitialising the network with new config");
                            self.simulation.reconfigure(config.network);
                            flow = Self::flow_timer(self.simulation.config());
                        }
                        crate::run::Protocol::Input(input) => self.handle_input(&input.event),
                        _ => (),
                    }
                }
            }
        }

        tracing::debug!("Leaving the network effect loop");
        Ok(())
    }

    /// A fresh flow line timer. Its first tick is a whole period away.
    fn flow_timer(config: &Config) -> tokio::time::Interval {
        let period = config.flow_interval().max(std::time::Duration::from_millis(1));
        let mut interval =
            tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval
    }

    /// Does the simulation have anywhere to put particles yet?
    fn has_canvas(&self) -> bool {
        self.simulation.width() > 0.0 && self.simulation.height() > 0.0
    }

    /// The canvas size, in canvas units, for a terminal size.
    fn canvas_size(&self, width: u16, height: u16) -> Vec2 {
        let scale = self.simulation.config().scale;
        Vec2::new(f32::from(width), f32::from(height) * 2.0) * scale
    }

    /// Rebuild the network for a new terminal size.
    fn resize_simulation(&mut self, resize: PendingResize) {
        let size = self.canvas_size(resize.width, resize.height);
        tracing::debug!(
            "Reinitialising the network for a {}x{} terminal",
            resize.width,
            resize.height
        );
        self.simulation.resize(size.x, size.y);
    }

    /// Feed mouse events into the simulation.
    fn handle_input(&mut self, event: &InputEvent) {
        let InputEvent::Mouse(MouseEvent {
            x,
            y,
            mouse_buttons,
            ..
        }) = event
        else {
            return;
        };

        let position = self.cell_to_canvas(*x, *y);
        let is_left_button_down = mouse_buttons.contains(MouseButtons::LEFT);
        if is_left_button_down && !self.is_left_button_down {
            self.simulation.pointer_clicked(position);
        }
        self.is_left_button_down = is_left_button_down;
        self.simulation.pointer_moved(position);
    }

    /// Mouse reports are 1-based cell coordinates. We aim for the middle of the cell.
    fn cell_to_canvas(&self, x: u16, y: u16) -> Vec2 {
        let scale = self.simulation.config().scale;
        let column = f32::from(x.saturating_sub(1)) + 0.5;
        let row = f32::from(y.saturating_sub(1));
        Vec2::new(column, row.mul_add(2.0, 1.0)) * scale
    }

    /// Advance one frame and send it to the renderer.
    async fn render(&mut self) -> Result<()> {
        self.simulation.tick();

        let mut canvas = PixelCanvas::new(
            self.effect.width.into(),
            usize::from(self.effect.height) * 2,
            self.simulation.config().scale,
        );
        self.simulation.render(&mut canvas);
        let surface = crate::surface::Surface::from_canvas(&canvas);
        self.effect.send_output(surface).await
    }

    /// The simulation being drawn.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.simulation
    }
}

#[cfg(test)]
#[expect(clippy::indexing_slicing, reason = "Tests aren't so strict")]
mod test {
    use super::*;

    fn config() -> crate::config::main::Config {
        let mut config = crate::config::main::Config::default();
        config.network.seed = Some(1);
        config.frame_rate = 200;
        config
    }

    fn mouse(x: u16, y: u16, mouse_buttons: MouseButtons) -> InputEvent {
        InputEvent::Mouse(MouseEvent {
            x,
            y,
            mouse_buttons,
            modifiers: termwiz::input::Modifiers::NONE,
        })
    }

    #[test]
    fn waits_for_a_size() {
        let (output_tx, _output_rx) = tokio::sync::mpsc::channel(1);
        let network = NetworkEffect::new(output_tx, &config());
        assert!(!network.has_canvas());
        assert!(network.simulation().particles().is_empty());
    }

    #[test]
    fn mouse_cells_map_to_canvas_units() {
        let (output_tx, _output_rx) = tokio::sync::mpsc::channel(1);
        let network = NetworkEffect::new(output_tx, &config());
        assert_eq!(network.cell_to_canvas(1, 1), Vec2::new(4.0, 8.0));
        assert_eq!(network.cell_to_canvas(3, 2), Vec2::new(20.0, 24.0));
        assert_eq!(network.cell_to_canvas(0, 0), Vec2::new(4.0, 8.0));
    }

    #[test]
    fn clicks_only_ripple_on_press() {
        let (output_tx, _output_rx) = tokio::sync::mpsc::channel(1);
        let mut network = NetworkEffect::new(output_tx, &config());
        network.resize_simulation(PendingResize {
            width: 80,
            height: 24,
        });

        network.handle_input(&mouse(10, 10, MouseButtons::NONE));
        assert!(network.simulation().ripples().is_empty());
        assert!(network.simulation().interaction().pointer.is_some());

        network.handle_input(&mouse(10, 10, MouseButtons::LEFT));
        network.handle_input(&mouse(11, 10, MouseButtons::LEFT));
        assert_eq!(network.simulation().ripples().len(), 1);

        network.handle_input(&mouse(11, 10, MouseButtons::NONE));
        network.handle_input(&mouse(11, 10, MouseButtons::LEFT));
        assert_eq!(network.simulation().ripples().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn first_resize_renders_then_end_stops() {
        let (output_tx, mut output_rx) = tokio::sync::mpsc::channel(8);
        let (protocol_tx, protocol_rx) = tokio::sync::broadcast::channel(8);
        let mut network = NetworkEffect::new(output_tx, &config());

        protocol_tx
            .send(crate::run::Protocol::Resize {
                width: 20,
                height: 10,
            })
            .unwrap();
        let handle = tokio::spawn(async move {
            network.run(protocol_rx).await.unwrap();
            network
        });

        let surface = output_rx.recv().await.unwrap();
        assert_eq!((surface.width, surface.height), (20, 10));

        protocol_tx.send(crate::run::Protocol::End).unwrap();
        let network = handle.await.unwrap();
        assert_eq!(network.simulation().width(), 160.0);
        assert_eq!(network.simulation().height(), 160.0);
        assert!(!network.simulation().particles().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn later_resizes_are_debounced() {
        let (output_tx, mut output_rx) = tokio::sync::mpsc::channel(64);
        let (protocol_tx, protocol_rx) = tokio::sync::broadcast::channel(8);
        let mut config = config();
        config.frame_rate = 10;
        let mut network = NetworkEffect::new(output_tx, &config);
        let handle = tokio::spawn(async move {
            network.run(protocol_rx).await.unwrap();
            network
        });

        protocol_tx
            .send(crate::run::Protocol::Resize {
                width: 10,
                height: 5,
            })
            .unwrap();
        output_rx.recv().await.unwrap();

        for width in [30, 40, 50] {
            protocol_tx
                .send(crate::run::Protocol::Resize { width, height: 5 })
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;

        protocol_tx.send(crate::run::Protocol::End).unwrap();
        let network = handle.await.unwrap();
        assert_eq!(network.simulation().width(), 400.0);
        assert_eq!(network.simulation().generation(), 3);
        while let Ok(surface) = output_rx.try_recv() {
            assert!([10, 30, 40, 50].contains(&surface.width));
        }
    }

    #[tokio::test]
    async fn closed_protocol_stops_the_loop() {
        let (output_tx, _output_rx) = tokio::sync::mpsc::channel(1);
        let (protocol_tx, protocol_rx) = tokio::sync::broadcast::channel(8);
        let mut network = NetworkEffect::new(output_tx, &config());
        drop(protocol_tx);

        network.run(protocol_rx).await.unwrap();
        assert_eq!(network.simulation().generation(), 1);
    }

    #[test]
    fn ripples_need_the_interaction_layer() {
        let (output_tx, _output_rx) = tokio::sync::mpsc::channel(1);
        let mut config = config();
        config.network.interaction.enabled = false;
        let mut network = NetworkEffect::new(output_tx, &config);
        network.resize_simulation(PendingResize {
            width: 80,
            height: 24,
        });

        network.handle_input(&mouse(10, 10, MouseButtons::LEFT));
        assert!(network.simulation().ripples().is_empty());
        assert_eq!(network.simulation().particles()[0].emphasis, 0.0);
    }
}

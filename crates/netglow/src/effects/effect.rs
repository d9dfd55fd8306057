//! Shared state and behaviour useful to all effects.

/// Shared state and behaviour useful to all effects.
pub struct Effect {
    /// A unique identifier.
    pub id: String,
    /// A channel to send final rendered output.
    pub output_channel: tokio::sync::mpsc::Sender<crate::surface::Surface>,
    /// TTY width
    pub width: u16,
    /// TTY height
    pub height: u16,
    /// The target frame rate.
    pub frame_rate: u32,
    /// The time at which the previous frame was rendererd.
    pub last_frame_tick: std::time::Instant,
}

impl Effect {
    /// Instantiate
    #[must_use]
    pub fn new(
        id: String,
        output_channel: tokio::sync::mpsc::Sender<crate::surface::Surface>,
        frame_rate: u32,
    ) -> Self {
        Self {
            id,
            output_channel,
            width: 0,
            height: 0,
            frame_rate,
            last_frame_tick: std::time::Instant::now(),
        }
    }

    /// Is there anywhere to draw?
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Keep track of the size of the user's terminal.
    pub const fn set_tty_size(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    /// Handle common protocol messages, like resizing and config changes.
    pub fn handle_common_protocol_messages(&mut self, message: &crate::run::Protocol) {
        tracing::trace!("'{}' effect received protocol message: {message:?}", self.id);

        #[expect(
            clippy::wildcard_enum_match_arm,
            reason = "We're just handling the common cases here."
        )]
        match message {
            crate::run::Protocol::Resize { width, height } => {
                self.set_tty_size(*width, *height);
            }
            crate::run::Protocol::Config(config) => self.frame_rate = config.frame_rate,
            _ => (),
        }
    }

    /// Send a finished frame to the renderer.
    ///
    /// # Errors
    /// When the renderer has gone away.
    pub async fn send_output(
        &self,
        surface: crate::surface::Surface,
    ) -> color_eyre::eyre::Result<()> {
        self.output_channel.send(surface).await?;
        Ok(())
    }

    /// How long a single frame should take.
    #[must_use]
    pub fn frame_duration(&self) -> std::time::Duration {
        let target = crate::utils::ONE_MICROSECOND.wrapping_div(self.frame_rate.max(1).into());
        std::time::Duration::from_micros(target)
    }

    /// Sleep until the next frame render is due.
    pub async fn sleep_until_next_frame_tick(&mut self) {
        if let Some(wait) = self
            .frame_duration()
            .checked_sub(self.last_frame_tick.elapsed())
        {
            tokio::time::sleep(wait).await;
        }
        self.last_frame_tick = std::time::Instant::now();
    }
}

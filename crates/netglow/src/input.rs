//! Handle all the raw input directly from the end user.

use std::io::Read as _;

use color_eyre::eyre::Result;
use termwiz::input::{InputEvent, KeyCode, KeyEvent, Modifiers};

/// Bytes from STDIN
pub type BytesFromSTDIN = [u8; 128];

/// Input from STDIN that has been parsed into known mouse/keyboard/etc events.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ParsedInput {
    /// The raw bytes that made up the parsed event
    pub bytes: BytesFromSTDIN,
    /// The parsed event
    pub event: InputEvent,
}

impl ParsedInput {
    /// Wrap an already parsed event.
    #[must_use]
    pub const fn new(event: InputEvent, bytes: BytesFromSTDIN) -> Self {
        Self { bytes, event }
    }
}

/// Handle input from the user
pub struct Input {
    /// The main Netglow protocol channel.
    protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
}

impl Input {
    /// Start a thread to listen and parse the end user's STDIN and forward it to the rest of the
    /// application.
    #[must_use]
    pub fn start(
        protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> std::thread::JoinHandle<Result<()>> {
        // The Tokio docs actually suggest using `std::thread` to listen on STDIN for interactive
        // applications.
        std::thread::spawn(move || -> Result<()> {
            let protocol_for_shutdown = protocol_tx.clone();
            let input = Self { protocol_tx };
            let result = input.consume_stdin();
            if let Err(error) = result {
                crate::run::broadcast_protocol_end(&protocol_for_shutdown);
                return Err(error);
            }
            Ok(())
        })
    }

    /// Listen to the end user's STDIN until they ask to quit.
    fn consume_stdin(&self) -> Result<()> {
        tracing::debug!("Starting to listen on STDIN");

        let stdin = std::io::stdin();
        let mut reader = std::io::BufReader::new(stdin);
        let mut parser = termwiz::input::InputParser::new();
        let mut is_quitting = false;

        while !is_quitting {
            let mut buffer: BytesFromSTDIN = [0; 128];
            let n = reader.read(&mut buffer[..])?;
            if n == 0 {
                tracing::debug!("STDIN closed");
                crate::run::broadcast_protocol_end(&self.protocol_tx);
                break;
            }

            let Some(bytes) = buffer.get(0..n) else {
                tracing::warn!("Couldn't get bytes from STDIN input buffer");
                continue;
            };
            tracing::trace!("Received STDIN input: {bytes:x?}");

            parser.parse(
                bytes,
                |event| {
                    if is_quitting {
                        return;
                    }
                    if is_quit_event(&event) {
                        tracing::debug!("User asked to quit: {event:?}");
                        crate::run::broadcast_protocol_end(&self.protocol_tx);
                        is_quitting = true;
                        return;
                    }
                    self.parsed_bytes_callback(event, buffer);
                },
                false,
            );
        }

        Ok(())
    }

    /// The callback for when the input parser detects known keyboard/mouse events.
    fn parsed_bytes_callback(&self, event: InputEvent, bytes: BytesFromSTDIN) {
        tracing::trace!("Parsed input event: {event:?}");

        let result = self
            .protocol_tx
            .send(crate::run::Protocol::Input(ParsedInput::new(event, bytes)));
        if let Err(error) = result {
            tracing::error!("Error sending input event from thread to task: {error:?}");
        }
    }
}

/// Is this one of the keys that exits Netglow: `q`, Escape or Ctrl+C?
#[must_use]
#[expect(
    clippy::wildcard_enum_match_arm,
    reason = "Every other key is just forwarded"
)]
pub fn is_quit_event(event: &InputEvent) -> bool {
    let InputEvent::Key(KeyEvent { key, modifiers }) = event else {
        return false;
    };

    match key {
        KeyCode::Char('q') => !modifiers.intersects(Modifiers::CTRL | Modifiers::ALT),
        KeyCode::Escape => true,
        KeyCode::Char('c' | 'C') => modifiers.contains(Modifiers::CTRL),
        KeyCode::Char('\u{3}') => true,
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn key(key: KeyCode, modifiers: Modifiers) -> InputEvent {
        InputEvent::Key(KeyEvent { key, modifiers })
    }

    #[test]
    fn quit_keys() {
        assert!(is_quit_event(&key(KeyCode::Char('q'), Modifiers::NONE)));
        assert!(is_quit_event(&key(KeyCode::Escape, Modifiers::NONE)));
        assert!(is_quit_event(&key(KeyCode::Char('c'), Modifiers::CTRL)));
    }

    #[test]
    fn other_keys_are_forwarded() {
        assert!(!is_quit_event(&key(KeyCode::Char('c'), Modifiers::NONE)));
        assert!(!is_quit_event(&key(KeyCode::Char('q'), Modifiers::CTRL)));
        assert!(!is_quit_event(&key(KeyCode::Enter, Modifiers::NONE)));
        assert!(!is_quit_event(&InputEvent::Wake));
    }

    #[test]
    fn parsed_ctrl_c_quits() {
        let mut parser = termwiz::input::InputParser::new();
        let mut events = Vec::new();
        parser.parse(b"\x03", |event| events.push(event), false);
        assert!(events.iter().any(is_quit_event));
    }
}

//! Generally useful shared code.

/// Reset the terminal's colours and clear the screen.
pub const RESET_SCREEN: &str = "\x1b[0m\x1b[2J\x1b[H";

/// Nanoseconds are too fine-grained for frame timing, so we count in microseconds.
pub const ONE_MICROSECOND: u64 = 1_000_000;

//! Text shown on the status display.
//!
//! A mode is rendered as one line per device command, each prefixed with
//! one field of the current time: hours on the first line, minutes on the
//! second, seconds on the third.

use crate::clock::WallClock;
use crate::schedule::Mode;

pub fn startup_banner() -> Vec<String> {
    vec![
        "................".to_string(),
        "..starting up...".to_string(),
        "................".to_string(),
    ]
}

pub fn describe(mode: &Mode, now: &WallClock) -> Vec<String> {
    let stamps = [now.hour, now.minute, now.second];
    stamps
        .iter()
        .zip(mode.commands())
        .map(|(stamp, cmd)| format!("{stamp:02}  {cmd}"))
        .collect()
}

// ===========================================================================
// Tests
// ===========================================================================

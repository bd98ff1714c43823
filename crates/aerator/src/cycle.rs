//! Fixed on/off duty cycle, counted in whole ticks.
//!
//! ```text
//! On ──[on_ticks]──▶ Off ──[off_ticks]──▶ On ...
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    On,
    Off,
}

impl Phase {
    pub fn is_on(self) -> bool {
        self == Phase::On
    }

    fn flipped(self) -> Self {
        match self {
            Phase::On => Phase::Off,
            Phase::Off => Phase::On,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_on() { "ON" } else { "OFF" })
    }
}

#[derive(Debug)]
pub struct DutyCycle {
    on_ticks: u64,
    off_ticks: u64,
    phase: Phase,
    elapsed: u64,
}

impl DutyCycle {
    /// A cycle that starts at the beginning of its on phase.  Both lengths
    /// must be positive.
    pub fn new(on_ticks: u64, off_ticks: u64) -> Self {
        Self {
            on_ticks,
            off_ticks,
            phase: Phase::On,
            elapsed: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Count one tick.  Returns the new phase when this tick completes the
    /// current one.
    pub fn tick(&mut self) -> Option<Phase> {
        self.elapsed += 1;
        let length = match self.phase {
            Phase::On => self.on_ticks,
            Phase::Off => self.off_ticks,
        };
        if self.elapsed < length {
            return None;
        }
        self.elapsed = 0;
        self.phase = self.phase.flipped();
        Some(self.phase)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

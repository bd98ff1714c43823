//! Day/night LED channel driver.
//!
//! The lamp has no control input besides its power line: every time it is
//! powered on it steps to the next of its three lighting programs.  Software
//! keeps a mirror of that position and reaches a target program by cycling
//! power, one settle delay after each edge so the lamp registers it.
//!
//! ```text
//!   Off ──▶ Day ──▶ Evening ──▶ Night
//!            ▲                    │
//!            └────────────────────┘
//! ```
//!
//! A lamp left unpowered for longer than the reset timeout forgets its
//! position and comes back as `Day`; the mirror is reset to `Off` to match.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::error::Result;
use crate::hw::{set_with_retry, BinaryOutput};

/// Pause after each power edge.
pub const SETTLE_TIME: Duration = Duration::from_secs(1);

/// Continuous off time after which the lamp has forgotten its program.
pub const SETTINGS_RESET_TIME: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedState {
    Off,
    Day,
    Evening,
    Night,
}

impl LedState {
    /// The program the lamp shows after the next power-on.
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::Day,
            Self::Day => Self::Evening,
            Self::Evening => Self::Night,
            Self::Night => Self::Day,
        }
    }
}

impl fmt::Display for LedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Off => "off",
            Self::Day => "day",
            Self::Evening => "evening",
            Self::Night => "night",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LedTiming {
    pub settle: Duration,
    pub reset_after: Duration,
}

impl Default for LedTiming {
    fn default() -> Self {
        Self {
            settle: SETTLE_TIME,
            reset_after: SETTINGS_RESET_TIME,
        }
    }
}

pub struct DayNightLed {
    name: &'static str,
    output: Box<dyn BinaryOutput>,
    state: LedState,
    lit: bool,
    off_since: Instant,
    timing: LedTiming,
}

impl DayNightLed {
    /// Take ownership of the channel output and switch it off.
    pub fn new(
        name: &'static str,
        output: Box<dyn BinaryOutput>,
        timing: LedTiming,
    ) -> Result<Self> {
        let mut led = Self {
            name,
            output,
            state: LedState::Off,
            lit: false,
            off_since: Instant::now(),
            timing,
        };
        set_with_retry(led.output.as_mut(), name, false)?;
        Ok(led)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> LedState {
        self.state
    }

    #[cfg(test)]
    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Cycle power until the lamp shows `target`, visiting every program in
    /// between.  Blocks the caller for two settle delays per step.  A dark
    /// lamp is never already in its target program: powering it on moves
    /// it one step, so it goes round the cycle to get back.
    pub async fn advance_to(&mut self, target: LedState) -> Result<()> {
        if target == LedState::Off {
            return self.force_off();
        }

        self.forget_if_idle();

        let mut steps = 0;
        while !(self.lit && self.state == target) {
            self.cycle().await?;
            steps += 1;
        }

        if steps > 0 {
            info!(led = self.name, state = %self.state, steps, "day/night led set");
        }
        Ok(())
    }

    /// Exactly one power cycle, moving to the next program.
    pub async fn advance_one(&mut self) -> Result<()> {
        self.forget_if_idle();
        self.cycle().await?;
        info!(led = self.name, state = %self.state, "day/night led advanced");
        Ok(())
    }

    /// Power the lamp down.  The remembered program is kept so a short
    /// outage resumes the cycle where it left off.
    pub fn force_off(&mut self) -> Result<()> {
        self.power(false)
    }

    async fn cycle(&mut self) -> Result<()> {
        self.power(false)?;
        sleep(self.timing.settle).await;
        self.state = self.state.next();
        self.power(true)?;
        sleep(self.timing.settle).await;
        debug!(led = self.name, state = %self.state, "power cycled");
        Ok(())
    }

    fn power(&mut self, on: bool) -> Result<()> {
        set_with_retry(self.output.as_mut(), self.name, on)?;
        if self.lit && !on {
            self.off_since = Instant::now();
        }
        self.lit = on;
        Ok(())
    }

    fn forget_if_idle(&mut self) {
        let idle = self.off_since.elapsed();
        if !self.lit && self.state != LedState::Off && idle > self.timing.reset_after {
            info!(
                led = self.name,
                was = %self.state,
                off_secs = idle.as_secs(),
                "day/night led idle too long, position reset"
            );
            self.state = LedState::Off;
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::fakes::RecordingOutput;

    fn led() -> (DayNightLed, RecordingOutput) {
        let out = RecordingOutput::default();
        let led = DayNightLed::new("day-night-1", Box::new(out.clone()), LedTiming::default())
            .unwrap();
        out.clear();
        (led, out)
    }

    // -- Successor function -------------------------------------------------

    #[test]
    fn next_cycles_through_lit_states() {
        assert_eq!(LedState::Off.next(), LedState::Day);
        assert_eq!(LedState::Day.next(), LedState::Evening);
        assert_eq!(LedState::Evening.next(), LedState::Night);
        assert_eq!(LedState::Night.next(), LedState::Day);
    }

    // -- Construction -------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn new_switches_output_off() {
        let out = RecordingOutput::default();
        let led = DayNightLed::new("day-night-1", Box::new(out.clone()), LedTiming::default())
            .unwrap();
        assert_eq!(out.writes(), vec![false]);
        assert_eq!(led.state(), LedState::Off);
        assert!(!led.is_lit());
    }

    // -- advance_to ---------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn off_to_night_takes_three_cycles() {
        let (mut led, out) = led();
        let start = Instant::now();

        led.advance_to(LedState::Night).await.unwrap();

        assert_eq!(led.state(), LedState::Night);
        assert!(led.is_lit());
        assert_eq!(out.on_count(), 3);
        assert_eq!(out.writes(), vec![false, true, false, true, false, true]);
        assert_eq!(out.last(), Some(true));
        // Two settle delays per cycle.
        assert!(start.elapsed() >= SETTLE_TIME * 6);
    }

    #[tokio::test(start_paused = true)]
    async fn advance_to_current_state_is_noop() {
        let (mut led, out) = led();
        led.advance_to(LedState::Evening).await.unwrap();
        out.clear();

        led.advance_to(LedState::Evening).await.unwrap();

        assert!(out.writes().is_empty());
        assert_eq!(led.state(), LedState::Evening);
    }

    #[tokio::test(start_paused = true)]
    async fn night_to_day_wraps_in_one_cycle() {
        let (mut led, out) = led();
        led.advance_to(LedState::Night).await.unwrap();
        out.clear();

        led.advance_to(LedState::Day).await.unwrap();

        assert_eq!(out.on_count(), 1);
        assert_eq!(led.state(), LedState::Day);
    }

    #[tokio::test(start_paused = true)]
    async fn day_to_night_visits_evening() {
        let (mut led, out) = led();
        led.advance_to(LedState::Day).await.unwrap();
        out.clear();

        led.advance_to(LedState::Night).await.unwrap();

        assert_eq!(out.on_count(), 2);
        assert_eq!(led.state(), LedState::Night);
    }

    #[tokio::test(start_paused = true)]
    async fn advance_to_off_powers_down() {
        let (mut led, out) = led();
        led.advance_to(LedState::Day).await.unwrap();
        out.clear();

        led.advance_to(LedState::Off).await.unwrap();

        assert_eq!(out.writes(), vec![false]);
        assert!(!led.is_lit());
        // Position is remembered.
        assert_eq!(led.state(), LedState::Day);
    }

    // -- Idle reset ---------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn long_outage_resets_position() {
        let (mut led, out) = led();
        led.advance_to(LedState::Day).await.unwrap();
        led.force_off().unwrap();
        tokio::time::advance(SETTINGS_RESET_TIME + Duration::from_secs(1)).await;
        out.clear();

        led.advance_to(LedState::Day).await.unwrap();

        // Restarted from Off: exactly one cycle to reach Day.
        assert_eq!(out.on_count(), 1);
        assert_eq!(led.state(), LedState::Day);
        assert!(led.is_lit());
    }

    #[tokio::test(start_paused = true)]
    async fn short_outage_keeps_position() {
        let (mut led, out) = led();
        led.advance_to(LedState::Day).await.unwrap();
        led.force_off().unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;
        out.clear();

        led.advance_to(LedState::Night).await.unwrap();

        // Day → Evening → Night; the lamp still remembers Day.
        assert_eq!(out.on_count(), 2);
        assert_eq!(led.state(), LedState::Night);
    }

    #[tokio::test(start_paused = true)]
    async fn short_outage_same_target_cycles_round() {
        // Powering back on steps the lamp past its remembered program, so
        // returning to it takes a full lap.
        let (mut led, out) = led();
        led.advance_to(LedState::Day).await.unwrap();
        led.force_off().unwrap();
        out.clear();

        led.advance_to(LedState::Day).await.unwrap();

        assert_eq!(out.writes(), vec![false, true, false, true, false, true]);
        assert_eq!(led.state(), LedState::Day);
        assert!(led.is_lit());
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_force_off_does_not_restart_idle_timer() {
        let (mut led, out) = led();
        led.advance_to(LedState::Evening).await.unwrap();
        led.force_off().unwrap();
        tokio::time::advance(Duration::from_secs(200)).await;
        led.force_off().unwrap();
        tokio::time::advance(Duration::from_secs(200)).await;
        out.clear();

        led.advance_to(LedState::Day).await.unwrap();

        // 400 s continuously off: reset to Off, one cycle to Day.
        assert_eq!(out.on_count(), 1);
    }

    // -- advance_one --------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn advance_one_moves_a_single_step() {
        let (mut led, out) = led();
        led.advance_to(LedState::Evening).await.unwrap();
        out.clear();

        led.advance_one().await.unwrap();

        assert_eq!(out.writes(), vec![false, true]);
        assert_eq!(led.state(), LedState::Night);

        led.advance_one().await.unwrap();
        assert_eq!(led.state(), LedState::Day);
    }

    #[tokio::test(start_paused = true)]
    async fn advance_one_after_long_outage_restarts_at_day() {
        let (mut led, out) = led();
        led.advance_to(LedState::Evening).await.unwrap();
        led.force_off().unwrap();
        tokio::time::advance(SETTINGS_RESET_TIME + Duration::from_secs(1)).await;
        out.clear();

        led.advance_one().await.unwrap();

        // Without the reset this step would land on Night.
        assert_eq!(out.writes(), vec![false, true]);
        assert_eq!(led.state(), LedState::Day);
    }

    #[tokio::test(start_paused = true)]
    async fn advance_one_from_off_lights_day() {
        let (mut led, _out) = led();
        led.advance_one().await.unwrap();
        assert_eq!(led.state(), LedState::Day);
        assert!(led.is_lit());
    }

    // -- Failures -----------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn persistent_write_failure_propagates() {
        let (mut led, out) = led();
        out.fail_next(crate::hw::MAX_WRITE_ATTEMPTS);

        let err = led.advance_to(LedState::Day).await.unwrap_err();
        assert!(err.to_string().contains("day-night-1"), "{err}");
        assert_eq!(led.state(), LedState::Off);
    }
}

//! Push-button edge detection.
//!
//! One raw sample per controller tick; the tick period is the debounce
//! interval.  A press is latched on the released → held edge and stays
//! pending until the controller consumes it, so every physical press is seen
//! exactly once however often the button is polled.

use crate::error::Result;
use crate::hw::DigitalInput;

pub struct Button {
    name: &'static str,
    input: Box<dyn DigitalInput>,
    held: bool,
    pending: bool,
}

impl Button {
    pub fn new(name: &'static str, input: Box<dyn DigitalInput>) -> Self {
        Self {
            name,
            input,
            held: false,
            pending: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Sample the input once.
    pub fn tick(&mut self) -> Result<()> {
        let down = self.input.is_low()?;
        if !self.held && down {
            self.held = true;
            self.pending = true;
        } else if self.held && !down {
            self.held = false;
        }
        Ok(())
    }

    /// Whether a press happened since the last call.
    pub fn consume_pressed(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::fakes::FakeInput;

    fn button() -> (Button, FakeInput) {
        let input = FakeInput::default();
        (Button::new("up", Box::new(input.clone())), input)
    }

    #[test]
    fn idle_button_reports_nothing() {
        let (mut b, _input) = button();
        for _ in 0..5 {
            b.tick().unwrap();
            assert!(!b.consume_pressed());
        }
    }

    #[test]
    fn held_button_fires_once() {
        let (mut b, input) = button();
        input.press();

        b.tick().unwrap();
        assert!(b.consume_pressed());

        for _ in 0..10 {
            b.tick().unwrap();
            assert!(!b.consume_pressed());
        }
    }

    #[test]
    fn release_and_press_again_fires_again() {
        let (mut b, input) = button();
        input.press();
        b.tick().unwrap();
        assert!(b.consume_pressed());

        input.release();
        b.tick().unwrap();
        assert!(!b.consume_pressed());

        input.press();
        b.tick().unwrap();
        assert!(b.consume_pressed());
    }

    #[test]
    fn press_survives_until_consumed() {
        let (mut b, input) = button();
        input.press();
        b.tick().unwrap();
        input.release();
        b.tick().unwrap();
        b.tick().unwrap();

        assert!(b.consume_pressed());
        assert!(!b.consume_pressed());
    }

    #[test]
    fn bounce_between_samples_is_invisible() {
        // A press and release that both happen between two ticks is never
        // sampled.
        let (mut b, input) = button();
        input.press();
        input.release();
        b.tick().unwrap();
        assert!(!b.consume_pressed());
    }

    #[test]
    fn two_presses_before_consume_count_once() {
        let (mut b, input) = button();
        input.press();
        b.tick().unwrap();
        input.release();
        b.tick().unwrap();
        input.press();
        b.tick().unwrap();

        assert!(b.consume_pressed());
        assert!(!b.consume_pressed());
    }
}

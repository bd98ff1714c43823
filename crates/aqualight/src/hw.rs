//! Device access.  The `gpio` feature gates the real rppal drivers for the
//! relay outputs and buttons; without it, mock pins log state changes.
//!
//! The status display and the indicator LED are driven through traits as
//! well; the shipped implementations log what would be shown.

use tracing::{debug, info, warn};

use crate::button::Button;
use crate::clock::Clock;
use crate::day_night::DayNightLed;
use crate::error::{Error, Result};
use crate::schedule::IndicatorColor;

#[cfg(feature = "gpio")]
use rppal::gpio::{Gpio, InputPin, OutputPin};

/// Attempts made for a binary output write before giving up.
pub const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Lines the status display can show at once.
pub const DISPLAY_LINES: usize = 3;

// ---------------------------------------------------------------------------
// Device traits
// ---------------------------------------------------------------------------

pub trait BinaryOutput {
    fn set(&mut self, on: bool) -> Result<()>;
}

pub trait DigitalInput {
    /// Raw level; buttons pull the line low while pressed.
    fn is_low(&mut self) -> Result<bool>;
}

pub trait StatusDisplay {
    /// Show up to [`DISPLAY_LINES`] lines.  Showing the same lines again is
    /// a no-op.
    fn show(&mut self, lines: &[String]) -> Result<()>;
}

pub trait Indicator {
    fn set_color(&mut self, color: IndicatorColor) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// Write `on` to an idempotent output, retrying transient failures.
pub fn set_with_retry(output: &mut dyn BinaryOutput, device: &str, on: bool) -> Result<()> {
    let mut attempt = 1;
    loop {
        match output.set(on) {
            Ok(()) => return Ok(()),
            Err(e) if attempt < MAX_WRITE_ATTEMPTS => {
                warn!(device, attempt, "output write failed, retrying: {e}");
                attempt += 1;
            }
            Err(e) => {
                return Err(Error::WriteFailed {
                    device: device.to_string(),
                    attempts: attempt,
                    reason: e.to_string(),
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Device bundle
// ---------------------------------------------------------------------------

/// Every device the controller drives, constructed once at startup.
pub struct Devices {
    pub clock: Box<dyn Clock>,
    pub co2_valve: Box<dyn BinaryOutput>,
    pub plant_lights: Box<dyn BinaryOutput>,
    /// Day/night LED channels; index 0 follows the up button, 1 the down
    /// button.
    pub lights: [DayNightLed; 2],
    pub up_button: Button,
    pub down_button: Button,
    pub display: Box<dyn StatusDisplay>,
    pub indicator: Box<dyn Indicator>,
}

impl Devices {
    pub fn poll_buttons(&mut self) -> Result<()> {
        self.up_button.tick()?;
        self.down_button.tick()
    }

    /// Fail-safe: CO2 and every light off.
    pub fn all_off(&mut self) -> Result<()> {
        set_with_retry(self.co2_valve.as_mut(), "co2-valve", false)?;
        set_with_retry(self.plant_lights.as_mut(), "plant-lights", false)?;
        for led in &mut self.lights {
            led.force_off()?;
        }
        self.indicator.clear()
    }
}

// ---------------------------------------------------------------------------
// Real GPIO pins (production: requires rppal + Raspberry Pi hardware)
// ---------------------------------------------------------------------------

#[cfg(feature = "gpio")]
pub struct PinFactory {
    gpio: Gpio,
    active_low: bool, // relay boards and LED drivers on this build are active-low
}

#[cfg(feature = "gpio")]
impl PinFactory {
    pub fn new(active_low: bool) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| Error::device("gpio", e))?;
        Ok(Self { gpio, active_low })
    }

    pub fn output(&self, name: &'static str, pin: u8) -> Result<Box<dyn BinaryOutput>> {
        let pin = self
            .gpio
            .get(pin)
            .map_err(|e| Error::device(name, e))?
            .into_output();
        let mut output = GpioOutput {
            pin,
            active_low: self.active_low,
        };
        // Fail-safe: ensure "OFF" at startup
        output.set(false)?;
        Ok(Box::new(output))
    }

    pub fn input(&self, name: &'static str, pin: u8) -> Result<Box<dyn DigitalInput>> {
        let pin = self
            .gpio
            .get(pin)
            .map_err(|e| Error::device(name, e))?
            .into_input_pullup();
        Ok(Box::new(GpioInput { pin }))
    }
}

#[cfg(feature = "gpio")]
struct GpioOutput {
    pin: OutputPin,
    active_low: bool,
}

#[cfg(feature = "gpio")]
impl BinaryOutput for GpioOutput {
    fn set(&mut self, on: bool) -> Result<()> {
        // active-low: LOW = ON, HIGH = OFF
        if on != self.active_low {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        Ok(())
    }
}

#[cfg(feature = "gpio")]
struct GpioInput {
    pin: InputPin,
}

#[cfg(feature = "gpio")]
impl DigitalInput for GpioInput {
    fn is_low(&mut self) -> Result<bool> {
        Ok(self.pin.is_low())
    }
}

// ---------------------------------------------------------------------------
// Mock pins (development: no hardware, logs state)
// ---------------------------------------------------------------------------

#[cfg(not(feature = "gpio"))]
pub struct PinFactory {
    active_low: bool,
}

#[cfg(not(feature = "gpio"))]
impl PinFactory {
    pub fn new(active_low: bool) -> Result<Self> {
        info!(active_low, "[mock-gpio] pin factory initialised (no hardware)");
        Ok(Self { active_low })
    }

    pub fn output(&self, name: &'static str, pin: u8) -> Result<Box<dyn BinaryOutput>> {
        info!(
            device = name,
            pin,
            active_low = self.active_low,
            "[mock-gpio] registered output (not wired)"
        );
        Ok(Box::new(MockOutput { name, on: None }))
    }

    pub fn input(&self, name: &'static str, pin: u8) -> Result<Box<dyn DigitalInput>> {
        info!(device = name, pin, "[mock-gpio] registered input (never pressed)");
        Ok(Box::new(MockInput))
    }
}

#[cfg(not(feature = "gpio"))]
struct MockOutput {
    name: &'static str,
    on: Option<bool>,
}

#[cfg(not(feature = "gpio"))]
impl BinaryOutput for MockOutput {
    fn set(&mut self, on: bool) -> Result<()> {
        if self.on != Some(on) {
            info!(
                device = self.name,
                "[mock-gpio] set {}",
                if on { "ON" } else { "OFF" }
            );
            self.on = Some(on);
        }
        Ok(())
    }
}

#[cfg(not(feature = "gpio"))]
struct MockInput;

#[cfg(not(feature = "gpio"))]
impl DigitalInput for MockInput {
    fn is_low(&mut self) -> Result<bool> {
        Ok(false)
    }
}

// ---------------------------------------------------------------------------
// Logging display + indicator
// ---------------------------------------------------------------------------

/// Status display that writes its content to the log.
#[derive(Default)]
pub struct LogDisplay {
    lines: Vec<String>,
}

impl StatusDisplay for LogDisplay {
    fn show(&mut self, lines: &[String]) -> Result<()> {
        let lines = &lines[..lines.len().min(DISPLAY_LINES)];
        if self.lines == lines {
            return Ok(());
        }
        self.lines = lines.to_vec();
        info!(text = ?self.lines, "display");
        Ok(())
    }
}

/// Indicator LED that logs colour changes.
#[derive(Default)]
pub struct LogIndicator {
    color: Option<IndicatorColor>,
}

impl Indicator for LogIndicator {
    fn set_color(&mut self, color: IndicatorColor) -> Result<()> {
        if self.color != Some(color) {
            let (r, g, b) = color.rgb();
            debug!(%color, r, g, b, "indicator");
            self.color = Some(color);
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        if self.color.take().is_some() {
            debug!("indicator off");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Recording fakes shared by the unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod fakes {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::clock::WallClock;

    /// Output that records every successful write and can be told to fail.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingOutput {
        writes: Rc<RefCell<Vec<bool>>>,
        failures: Rc<Cell<u32>>,
    }

    impl RecordingOutput {
        pub(crate) fn writes(&self) -> Vec<bool> {
            self.writes.borrow().clone()
        }

        pub(crate) fn last(&self) -> Option<bool> {
            self.writes.borrow().last().copied()
        }

        /// Number of times the output was switched on.
        pub(crate) fn on_count(&self) -> usize {
            self.writes.borrow().iter().filter(|&&on| on).count()
        }

        pub(crate) fn clear(&self) {
            self.writes.borrow_mut().clear();
        }

        pub(crate) fn fail_next(&self, n: u32) {
            self.failures.set(n);
        }
    }

    impl BinaryOutput for RecordingOutput {
        fn set(&mut self, on: bool) -> Result<()> {
            let left = self.failures.get();
            if left > 0 {
                self.failures.set(left - 1);
                return Err(Error::device("recording", "injected failure"));
            }
            self.writes.borrow_mut().push(on);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    pub(crate) struct FakeInput {
        low: Rc<Cell<bool>>,
    }

    impl FakeInput {
        pub(crate) fn press(&self) {
            self.low.set(true);
        }

        pub(crate) fn release(&self) {
            self.low.set(false);
        }
    }

    impl DigitalInput for FakeInput {
        fn is_low(&mut self) -> Result<bool> {
            Ok(self.low.get())
        }
    }

    #[derive(Clone)]
    pub(crate) struct FakeClock {
        now: Rc<Cell<WallClock>>,
    }

    impl FakeClock {
        /// A winter Monday, so no daylight shift applies.
        pub(crate) fn winter(hour: u8, minute: u8, second: u8) -> Self {
            Self {
                now: Rc::new(Cell::new(WallClock {
                    year: 2024,
                    month: 1,
                    day: 15,
                    weekday: 0,
                    hour,
                    minute,
                    second,
                })),
            }
        }

        pub(crate) fn set_time(&self, hour: u8, minute: u8, second: u8) {
            let now = self.now.get();
            self.now.set(WallClock {
                hour,
                minute,
                second,
                ..now
            });
        }

        pub(crate) fn set_date(&self, month: u8, day: u8, weekday: u8) {
            let now = self.now.get();
            self.now.set(WallClock {
                month,
                day,
                weekday,
                ..now
            });
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Result<WallClock> {
            Ok(self.now.get())
        }
    }

    #[derive(Clone, Default)]
    pub(crate) struct RecordingDisplay {
        frames: Rc<RefCell<Vec<Vec<String>>>>,
    }

    impl RecordingDisplay {
        pub(crate) fn frames(&self) -> Vec<Vec<String>> {
            self.frames.borrow().clone()
        }
    }

    impl StatusDisplay for RecordingDisplay {
        fn show(&mut self, lines: &[String]) -> Result<()> {
            self.frames.borrow_mut().push(lines.to_vec());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    pub(crate) struct RecordingIndicator {
        shown: Rc<RefCell<Vec<Option<IndicatorColor>>>>,
    }

    impl RecordingIndicator {
        pub(crate) fn last(&self) -> Option<Option<IndicatorColor>> {
            self.shown.borrow().last().copied()
        }
    }

    impl Indicator for RecordingIndicator {
        fn set_color(&mut self, color: IndicatorColor) -> Result<()> {
            self.shown.borrow_mut().push(Some(color));
            Ok(())
        }

        fn clear(&mut self) -> Result<()> {
            self.shown.borrow_mut().push(None);
            Ok(())
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

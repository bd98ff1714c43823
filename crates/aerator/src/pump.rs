//! Air pump relay via GPIO. The `gpio` feature gates the real rppal driver;
//! without it, a mock implementation logs state changes.

use anyhow::Result;
use tracing::info;

#[cfg(feature = "gpio")]
use anyhow::Context;
#[cfg(feature = "gpio")]
use rppal::gpio::{Gpio, OutputPin};

// ---------------------------------------------------------------------------
// Real GPIO relay (production: requires rppal + Raspberry Pi hardware)
// ---------------------------------------------------------------------------
#[cfg(feature = "gpio")]
pub(crate) struct Pump {
    pin: OutputPin,
    active_low: bool,
}

#[cfg(feature = "gpio")]
impl Pump {
    pub(crate) fn new(gpio_pin: u8, active_low: bool) -> Result<Self> {
        let gpio = Gpio::new().context("failed to open GPIO")?;
        let pin = gpio
            .get(gpio_pin)
            .with_context(|| format!("GPIO {gpio_pin} unavailable"))?
            .into_output();
        let mut pump = Self { pin, active_low };
        // Fail-safe: ensure "OFF" at startup
        pump.set(false);
        info!(gpio = gpio_pin, active_low, "pump relay ready");
        Ok(pump)
    }

    pub(crate) fn set(&mut self, on: bool) {
        // active-low relay: LOW = ON, HIGH = OFF
        if on != self.active_low {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        info!("pump set {}", if on { "ON" } else { "OFF" });
    }
}

// ---------------------------------------------------------------------------
// Mock relay (development: no hardware, logs state)
// ---------------------------------------------------------------------------
#[cfg(not(feature = "gpio"))]
pub(crate) struct Pump {
    pub(super) on: bool,
}

#[cfg(not(feature = "gpio"))]
impl Pump {
    pub(crate) fn new(gpio_pin: u8, _active_low: bool) -> Result<Self> {
        info!(gpio = gpio_pin, "[mock-gpio] pump relay registered (not wired)");
        Ok(Self { on: false })
    }

    pub(crate) fn set(&mut self, on: bool) {
        self.on = on;
        info!("[mock-gpio] pump set {}", if on { "ON" } else { "OFF" });
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(all(test, not(feature = "gpio")))]
mod tests {
    use super::*;

    #[test]
    fn new_pump_is_off() {
        let pump = Pump::new(17, true).unwrap();
        assert!(!pump.on);
    }

    #[test]
    fn set_on_then_off() {
        let mut pump = Pump::new(17, true).unwrap();
        pump.set(true);
        assert!(pump.on);
        pump.set(false);
        assert!(!pump.on);
    }
}

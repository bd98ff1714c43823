//! The control loop: once per tick, read the clock, look up the schedule
//! window, and drive the devices into that window's mode when it changes.
//!
//! ```text
//!  ┌─────────── tick ───────────┐
//!  │ poll buttons               │
//!  │ clock ─▶ time of day       │
//!  │   ─▶ schedule entry        │
//!  │   ─▶ mode changed? apply   │
//!  │ heartbeat indicator        │
//!  │ button presses ─▶ LED step │
//!  └──────── sleep(tick) ───────┘
//! ```
//!
//! Everything runs on one task.  LED transitions await their settle delays
//! inline, so a tick that changes the lights takes several seconds and the
//! next tick simply starts late.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::clock;
use crate::error::Result;
use crate::hw::{set_with_retry, Devices};
use crate::schedule::{self, DeviceCommand, IndicatorColor, Mode, Schedule};
use crate::status;

pub struct Controller {
    devices: Devices,
    schedule: Schedule,
    /// Last applied mode; `None` until `start` has run.
    mode: Option<Mode>,
    tick_interval: Duration,
}

impl Controller {
    pub fn new(devices: Devices, schedule: Schedule, tick_interval: Duration) -> Self {
        Self {
            devices,
            schedule,
            mode: None,
            tick_interval,
        }
    }

    #[cfg(test)]
    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    /// Bring the devices into a known state and apply the current window.
    pub async fn start(&mut self, self_test: Option<Duration>) -> Result<()> {
        self.devices.display.show(&status::startup_banner())?;
        self.devices.all_off()?;

        if let Some(hold) = self_test {
            self.self_test(hold).await?;
        }

        let (t, color, mode) = self.current()?;
        info!(time = %hms(t), %color, %mode, "applying current mode");
        self.apply(mode).await
    }

    /// Walk the whole schedule, holding each window's mode for `hold`.
    pub async fn self_test(&mut self, hold: Duration) -> Result<()> {
        let entries = self.schedule.entries().to_vec();
        info!(
            entries = entries.len(),
            hold_secs = hold.as_secs(),
            "self-test started"
        );

        for entry in entries {
            info!(
                until = %schedule::format_hhmm(entry.end),
                color = %entry.indicator,
                mode = %entry.mode,
                "self-test step"
            );
            self.devices.indicator.set_color(entry.indicator)?;
            self.apply(entry.mode).await?;
            sleep(hold).await;
        }

        self.devices.indicator.clear()?;
        info!("self-test finished");
        Ok(())
    }

    /// One schedule evaluation.
    pub async fn tick(&mut self) -> Result<()> {
        let (t, color, mode) = self.current()?;

        if self.mode != Some(mode) {
            info!(time = %hms(t), %color, %mode, "mode change");
            self.apply(mode).await?;
        }

        // Heartbeat: the window colour blinks at 0.5 Hz.
        if t % 2 == 1 {
            self.devices.indicator.set_color(color)?;
        } else {
            self.devices.indicator.clear()?;
        }

        if t % 5 == 0 {
            debug!(time = %hms(t), %mode, "heartbeat");
        }
        Ok(())
    }

    /// Run forever.  Only returns when a device or the clock fails.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            tick_ms = self.tick_interval.as_millis() as u64,
            windows = self.schedule.entries().len(),
            "control loop started"
        );

        loop {
            self.devices.poll_buttons()?;
            self.tick().await?;
            self.service_buttons().await?;
            sleep(self.tick_interval).await;
        }
    }

    /// Best-effort fail-safe after the loop has stopped.
    pub fn shutdown(&mut self) {
        match self.devices.all_off() {
            Ok(()) => info!("all outputs switched off"),
            Err(e) => error!("fail-safe shutdown incomplete: {e}"),
        }
    }

    fn current(&self) -> Result<(u32, IndicatorColor, Mode)> {
        let now = self.devices.clock.now()?;
        let t = clock::time_of_day(&now);
        let entry = self.schedule.resolve(t)?;
        Ok((t, entry.indicator, entry.mode))
    }

    async fn apply(&mut self, mode: Mode) -> Result<()> {
        let now = self.devices.clock.now()?;
        self.devices.display.show(&status::describe(&mode, &now))?;

        for cmd in mode.commands() {
            self.dispatch(cmd).await?;
        }

        // Transitions can take seconds; refresh the timestamps.
        let now = self.devices.clock.now()?;
        self.devices.display.show(&status::describe(&mode, &now))?;

        self.mode = Some(mode);
        Ok(())
    }

    async fn dispatch(&mut self, cmd: DeviceCommand) -> Result<()> {
        debug!(device = cmd.device(), "{cmd}");
        match cmd {
            DeviceCommand::PlantLights(s) => {
                set_with_retry(self.devices.plant_lights.as_mut(), cmd.device(), s.is_on())
            }
            DeviceCommand::Co2Valve(s) => {
                set_with_retry(self.devices.co2_valve.as_mut(), cmd.device(), s.is_on())
            }
            DeviceCommand::DayNightLights(target) => {
                for led in &mut self.devices.lights {
                    led.advance_to(target).await?;
                }
                Ok(())
            }
        }
    }

    /// Manual override: each button steps its own LED channel once.  The
    /// next mode change brings both channels back in line.
    async fn service_buttons(&mut self) -> Result<()> {
        let d = &mut self.devices;
        if d.up_button.consume_pressed() {
            let led = &mut d.lights[0];
            led.advance_one().await?;
            info!(
                button = d.up_button.name(),
                led = led.name(),
                state = %led.state(),
                "button pressed"
            );
        }
        if d.down_button.consume_pressed() {
            let led = &mut d.lights[1];
            led.advance_one().await?;
            info!(
                button = d.down_button.name(),
                led = led.name(),
                state = %led.state(),
                "button pressed"
            );
        }
        Ok(())
    }
}

fn hms(t: u32) -> String {
    format!("{:02}:{:02}:{:02}", t / 3600, t % 3600 / 60, t % 60)
}

// ===========================================================================
// Tests
// ===========================================================================

//! TOML config file loading and validation: schedule table, pin wiring and
//! loop timing.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use time::UtcOffset;

use crate::day_night::{LedState, LedTiming};
use crate::schedule::{self, IndicatorColor, Mode, Schedule, ScheduleEntry, Switch};

// ---------------------------------------------------------------------------
// Config file structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Offset of the clock's standard (winter) time from UTC.
    #[serde(default = "default_utc_offset")]
    pub standard_utc_offset_hours: i8,
    #[serde(default)]
    pub self_test: bool,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub pins: PinConfig,
    /// Absent: the built-in aquarium schedule is used.
    pub schedule: Option<Vec<ScheduleEntryConfig>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    pub tick_ms: u64,
    pub settle_ms: u64,
    pub reset_timeout_sec: u64,
    pub self_test_hold_sec: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PinConfig {
    pub co2_valve: i64,
    pub plant_lights: i64,
    pub day_night_1: i64,
    pub day_night_2: i64,
    pub up_button: i64,
    pub down_button: i64,
    pub active_low: bool, // the stock relay and LED driver boards are active-low
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleEntryConfig {
    /// End of the window as `"HH:MM"`; `"24:00"` closes the day.
    pub end: String,
    pub indicator: IndicatorColor,
    pub plant_lights: Option<Switch>,
    pub co2_valve: Option<Switch>,
    pub day_lights: Option<LedState>,
}

fn default_utc_offset() -> i8 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            standard_utc_offset_hours: default_utc_offset(),
            self_test: false,
            timing: TimingConfig::default(),
            pins: PinConfig::default(),
            schedule: None,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            settle_ms: 1000,
            reset_timeout_sec: 5 * 60,
            self_test_hold_sec: 5,
        }
    }
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            co2_valve: 21,
            plant_lights: 20,
            day_night_1: 16,
            day_night_2: 12,
            up_button: 23,
            down_button: 24,
            active_low: true,
        }
    }
}

/// BCM numbers usable on the 40-pin header.  0 and 1 belong to the HAT
/// EEPROM.
const VALID_GPIO_PINS: std::ops::RangeInclusive<i64> = 2..=27;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Config {
    /// Validate all config entries. Returns `Ok(())` or an error describing
    /// every violation found (not just the first one).
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        self.validate_schedule(&mut errors);
        self.validate_pins(&mut errors);
        self.validate_timing(&mut errors);

        if !(-12..=14).contains(&self.standard_utc_offset_hours) {
            errors.push(format!(
                "standard_utc_offset_hours {} out of range [-12, 14]",
                self.standard_utc_offset_hours
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "config validation failed ({} error{}):\n  - {}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
                errors.join("\n  - ")
            );
        }
    }

    fn validate_schedule(&self, errors: &mut Vec<String>) {
        let Some(entries) = &self.schedule else {
            return;
        };

        let mut ends = Vec::with_capacity(entries.len());
        let mut parsed_all = true;
        for (i, e) in entries.iter().enumerate() {
            match schedule::parse_hhmm(&e.end) {
                Ok(end) => ends.push(end),
                Err(msg) => {
                    errors.push(format!("schedule[{i}]: {msg}"));
                    parsed_all = false;
                }
            }
        }

        // Ordering is only meaningful once every end time parsed.
        if parsed_all {
            errors.extend(schedule::check_ends(&ends));
        }
    }

    fn validate_pins(&self, errors: &mut Vec<String>) {
        let p = &self.pins;
        let named = [
            ("co2_valve", p.co2_valve),
            ("plant_lights", p.plant_lights),
            ("day_night_1", p.day_night_1),
            ("day_night_2", p.day_night_2),
            ("up_button", p.up_button),
            ("down_button", p.down_button),
        ];

        let mut seen: HashSet<i64> = HashSet::new();
        for (name, pin) in named {
            if !VALID_GPIO_PINS.contains(&pin) {
                errors.push(format!(
                    "pins.{name}: {pin} is not a valid BCM GPIO pin (allowed: 2-27)"
                ));
            } else if !seen.insert(pin) {
                errors.push(format!("pins.{name}: {pin} is already used by another device"));
            }
        }
    }

    fn validate_timing(&self, errors: &mut Vec<String>) {
        let t = &self.timing;
        for (name, value) in [
            ("tick_ms", t.tick_ms),
            ("settle_ms", t.settle_ms),
            ("reset_timeout_sec", t.reset_timeout_sec),
            ("self_test_hold_sec", t.self_test_hold_sec),
        ] {
            if value == 0 {
                errors.push(format!("timing.{name} must be positive"));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Derived runtime values
// ---------------------------------------------------------------------------

impl Config {
    /// The schedule table, built-in if the file does not define one.
    pub fn build_schedule(&self) -> Result<Schedule> {
        let Some(entries) = &self.schedule else {
            return Ok(Schedule::aquarium());
        };

        let entries = entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let end = schedule::parse_hhmm(&e.end)
                    .map_err(|msg| anyhow::anyhow!("schedule[{i}]: {msg}"))?;
                Ok(ScheduleEntry {
                    end,
                    indicator: e.indicator,
                    mode: Mode {
                        plant_lights: e.plant_lights,
                        co2_valve: e.co2_valve,
                        day_lights: e.day_lights,
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Schedule::new(entries)?)
    }

    pub fn standard_offset(&self) -> Result<UtcOffset> {
        UtcOffset::from_hms(self.standard_utc_offset_hours, 0, 0)
            .context("invalid standard_utc_offset_hours")
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.timing.tick_ms)
    }

    pub fn led_timing(&self) -> LedTiming {
        LedTiming {
            settle: Duration::from_millis(self.timing.settle_ms),
            reset_after: Duration::from_secs(self.timing.reset_timeout_sec),
        }
    }

    pub fn self_test_hold(&self) -> Duration {
        Duration::from_secs(self.timing.self_test_hold_sec)
    }
}

impl PinConfig {
    /// Pin number as the driver expects it.  Only valid after
    /// [`Config::validate`].
    pub fn bcm(pin: i64) -> Result<u8> {
        u8::try_from(pin).with_context(|| format!("GPIO pin {pin} out of range"))
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Read, parse, and validate a TOML config file.  A missing file yields the
/// defaults: built-in schedule and stock wiring.
pub fn load(path: &str) -> Result<Config> {
    if !Path::new(path).exists() {
        tracing::info!(path, "no config file, using built-in schedule and wiring");
        return Ok(Config::default());
    }

    let contents =
        std::fs::read_to_string(path).with_context(|| format!("failed to read config: {path}"))?;
    let config: Config =
        toml::from_str(&contents).with_context(|| format!("failed to parse config: {path}"))?;
    config
        .validate()
        .with_context(|| format!("invalid config: {path}"))?;

    tracing::info!(
        path,
        schedule_entries = config.schedule.as_ref().map_or(0, Vec::len),
        self_test = config.self_test,
        "config loaded"
    );

    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================

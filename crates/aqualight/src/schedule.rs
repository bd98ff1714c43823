//! The daily schedule: an ordered table of time windows, each carrying an
//! indicator colour and the device commands (the "mode") active during it.
//!
//! A window is identified by the second of the day at which it *ends*.  The
//! active entry for a time `t` is the first entry whose end lies strictly
//! after `t`, so the table must be strictly increasing and close at 24:00.

use std::fmt;

use serde::Deserialize;

use crate::day_night::LedState;
use crate::error::{Error, Result};

pub const SECONDS_PER_DAY: u32 = 86_400;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn is_on(self) -> bool {
        self == Switch::On
    }
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => write!(f, "on"),
            Self::Off => write!(f, "off"),
        }
    }
}

/// Colour of the status indicator for a schedule window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorColor {
    Red,
    Green,
    Blue,
    Yellow,
    Cyan,
    Pink,
    White,
}

impl IndicatorColor {
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Red => (255, 0, 0),
            Self::Green => (0, 255, 0),
            Self::Blue => (0, 0, 255),
            Self::Yellow => (255, 255, 0),
            Self::Cyan => (0, 255, 255),
            Self::Pink => (255, 0, 255),
            Self::White => (255, 255, 255),
        }
    }
}

impl fmt::Display for IndicatorColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Yellow => "yellow",
            Self::Cyan => "cyan",
            Self::Pink => "pink",
            Self::White => "white",
        };
        f.write_str(name)
    }
}

/// One command for one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    PlantLights(Switch),
    Co2Valve(Switch),
    DayNightLights(LedState),
}

impl DeviceCommand {
    pub fn device(&self) -> &'static str {
        match self {
            Self::PlantLights(_) => "plant-lights",
            Self::Co2Valve(_) => "co2-valve",
            Self::DayNightLights(_) => "day-lights",
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlantLights(s) | Self::Co2Valve(s) => write!(f, "{}: {s}", self.device()),
            Self::DayNightLights(s) => write!(f, "{}: {s}", self.device()),
        }
    }
}

/// The command set of a schedule window.  Devices left `None` are not
/// touched when the mode is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mode {
    pub plant_lights: Option<Switch>,
    pub co2_valve: Option<Switch>,
    pub day_lights: Option<LedState>,
}

impl Mode {
    /// Commands in dispatch order.
    pub fn commands(self) -> impl Iterator<Item = DeviceCommand> {
        [
            self.plant_lights.map(DeviceCommand::PlantLights),
            self.co2_valve.map(DeviceCommand::Co2Valve),
            self.day_lights.map(DeviceCommand::DayNightLights),
        ]
        .into_iter()
        .flatten()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.commands().map(|c| c.to_string()).collect();
        if parts.is_empty() {
            f.write_str("(no commands)")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    /// Second of the day at which this window ends, in `(0, 86400]`.
    pub end: u32,
    pub indicator: IndicatorColor,
    pub mode: Mode,
}

#[derive(Debug, Clone)]
pub struct Schedule {
    entries: Vec<ScheduleEntry>,
}

impl Schedule {
    /// Build a schedule, rejecting any table that would leave part of the
    /// day unresolved.
    pub fn new(entries: Vec<ScheduleEntry>) -> Result<Self> {
        let ends: Vec<u32> = entries.iter().map(|e| e.end).collect();
        let errors = check_ends(&ends);
        if errors.is_empty() {
            Ok(Self { entries })
        } else {
            Err(Error::InvalidSchedule(errors.join("; ")))
        }
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn resolve(&self, t: u32) -> Result<&ScheduleEntry> {
        resolve(&self.entries, t)
    }

    /// The aquarium day: lights ramp night → evening → day in the morning
    /// with CO2 running ahead of the plant lights, then back down at night.
    pub fn aquarium() -> Self {
        use IndicatorColor::{Blue, Cyan, Green, Pink, Red, Yellow};
        use LedState::{Day, Evening, Night, Off};
        use Switch::{Off as O, On as I};

        let e = |h: u32, color, plant, co2, lights| ScheduleEntry {
            end: h * 3600,
            indicator: color,
            mode: Mode {
                plant_lights: Some(plant),
                co2_valve: Some(co2),
                day_lights: Some(lights),
            },
        };

        Self {
            entries: vec![
                e(6, Red, O, O, Off),
                e(7, Blue, O, O, Night),
                e(8, Blue, O, I, Night),
                e(9, Cyan, O, I, Evening),
                e(19, Green, I, I, Day),
                e(20, Pink, O, O, Evening),
                e(22, Yellow, O, O, Night),
                e(24, Red, O, O, Off),
            ],
        }
    }
}

/// First entry whose end lies strictly after `t`.
pub fn resolve(entries: &[ScheduleEntry], t: u32) -> Result<&ScheduleEntry> {
    entries
        .iter()
        .find(|e| t < e.end)
        .ok_or(Error::NoScheduleMatch(t))
}

/// Every ordering violation in a list of window ends.
pub(crate) fn check_ends(ends: &[u32]) -> Vec<String> {
    let mut errors = Vec::new();

    if ends.is_empty() {
        errors.push("schedule is empty".to_string());
        return errors;
    }

    for (i, &end) in ends.iter().enumerate() {
        if end == 0 || end > SECONDS_PER_DAY {
            errors.push(format!(
                "schedule[{i}]: end {} outside (00:00, 24:00]",
                format_hhmm(end)
            ));
        }
        if i > 0 && end <= ends[i - 1] {
            errors.push(format!(
                "schedule[{i}]: end {} is not after previous end {}",
                format_hhmm(end),
                format_hhmm(ends[i - 1])
            ));
        }
    }

    if let Some(&last) = ends.last() {
        if last != SECONDS_PER_DAY {
            errors.push(format!(
                "last schedule entry ends at {}, must end at 24:00",
                format_hhmm(last)
            ));
        }
    }

    errors
}

/// Parse `"HH:MM"` into seconds of the day.  `"24:00"` is the end of day.
pub fn parse_hhmm(s: &str) -> std::result::Result<u32, String> {
    let (h, m) = s
        .trim()
        .split_once(':')
        .ok_or_else(|| format!("time '{s}' is not HH:MM"))?;
    let hour: u32 = h
        .parse()
        .map_err(|_| format!("time '{s}' has an invalid hour"))?;
    let minute: u32 = m
        .parse()
        .map_err(|_| format!("time '{s}' has an invalid minute"))?;

    if minute > 59 || hour > 24 || (hour == 24 && minute != 0) {
        return Err(format!("time '{s}' out of range 00:00..=24:00"));
    }
    Ok(hour * 3600 + minute * 60)
}

pub fn format_hhmm(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 3600, seconds % 3600 / 60)
}

// ===========================================================================
// Tests
// ===========================================================================

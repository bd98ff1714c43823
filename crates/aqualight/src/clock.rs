//! Wall-clock access and the time-of-day arithmetic the schedule runs on.
//!
//! The clock source is kept on standard (winter) time.  The seasonal
//! one-hour shift is applied here, from the calendar date alone, so the
//! controller behaves the same whether it is fed by the system clock or a
//! battery-backed RTC that never observed a daylight change.

use time::{OffsetDateTime, UtcOffset};

use crate::error::Result;
use crate::schedule::SECONDS_PER_DAY;

// ---------------------------------------------------------------------------
// Clock source
// ---------------------------------------------------------------------------

/// One reading of the wall clock.  `weekday` counts from Monday = 0 to
/// Sunday = 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl From<OffsetDateTime> for WallClock {
    fn from(dt: OffsetDateTime) -> Self {
        Self {
            year: dt.year(),
            month: u8::from(dt.month()),
            day: dt.day(),
            weekday: dt.weekday().number_days_from_monday(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
        }
    }
}

pub trait Clock {
    fn now(&self) -> Result<WallClock>;
}

/// System time shifted to the configured standard-time offset.
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    pub fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Result<WallClock> {
        Ok(OffsetDateTime::now_utc().to_offset(self.offset).into())
    }
}

// ---------------------------------------------------------------------------
// Daylight shift
// ---------------------------------------------------------------------------

/// Weekdays on which the last Sunday of a 31-day month has already been
/// reached, indexed by `day - 25`.  The last Sunday always falls on the
/// 25th..31st, so on the 25th only a Sunday qualifies and on the 31st every
/// weekday does.
const PAST_LAST_SUNDAY: [&[u8]; 7] = [
    &[6],
    &[6, 0],
    &[6, 0, 1],
    &[6, 0, 1, 2],
    &[6, 0, 1, 2, 3],
    &[6, 0, 1, 2, 3, 4],
    &[6, 0, 1, 2, 3, 4, 5],
];

fn past_last_sunday(day: u8, weekday: u8) -> bool {
    day.checked_sub(25)
        .and_then(|i| PAST_LAST_SUNDAY.get(usize::from(i)))
        .is_some_and(|weekdays| weekdays.contains(&weekday))
}

/// Whether the date lies in the summer-time window, from the last Sunday of
/// March up to the last Sunday of October.
pub fn is_daylight_shifted(month: u8, day: u8, weekday: u8) -> bool {
    match month {
        4..=9 => true,
        3 => past_last_sunday(day, weekday),
        10 => !past_last_sunday(day, weekday),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Time of day
// ---------------------------------------------------------------------------

/// Seconds since midnight, in `[0, 86400)`.  A shifted 23:xx wraps to 00:xx.
pub fn seconds_of_day(reading: &WallClock, shifted: bool) -> u32 {
    let hour = u32::from(reading.hour) + u32::from(shifted);
    (hour * 3600 + u32::from(reading.minute) * 60 + u32::from(reading.second)) % SECONDS_PER_DAY
}

/// Seconds since midnight with the daylight shift for the reading's date.
pub fn time_of_day(reading: &WallClock) -> u32 {
    let shifted = is_daylight_shifted(reading.month, reading.day, reading.weekday);
    seconds_of_day(reading, shifted)
}

// ===========================================================================
// Tests
// ===========================================================================

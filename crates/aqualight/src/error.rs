use thiserror::Error;

/// Errors raised by the control core and its devices.
///
/// Every variant is fatal for the control loop: the process switches the
/// actuators off and exits rather than run with unknown actuator state.
#[derive(Error, Debug)]
pub enum Error {
    /// The schedule table is malformed (ordering, terminal entry, bad times).
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    /// No schedule entry ends after the given second of the day.
    #[error("no schedule entry covers time of day {0}s")]
    NoScheduleMatch(u32),

    /// A device read or write failed.
    #[cfg_attr(not(feature = "gpio"), allow(dead_code))]
    #[error("device '{device}' failed: {reason}")]
    Device { device: String, reason: String },

    /// A binary output kept failing after every retry.
    #[error("device '{device}' write failed after {attempts} attempts: {reason}")]
    WriteFailed {
        device: String,
        attempts: u32,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    #[cfg_attr(not(feature = "gpio"), allow(dead_code))]
    pub(crate) fn device(device: &str, reason: impl ToString) -> Self {
        Self::Device {
            device: device.to_string(),
            reason: reason.to_string(),
        }
    }
}

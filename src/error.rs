//! Error type for configuration loading and navigator start-up.

use thiserror::Error;

/// Failures that can only happen while reading or writing configuration.
///
/// Runtime navigation never fails: bad input degrades to a fallback and
/// out-of-range instants are clamped.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NavError {
    /// `viewing_mode` is neither `"equator"` nor `"horizon"`.
    #[error("unknown viewing mode type: {0}")]
    UnknownMountMode(String),
    /// `preset_sky_time` is neither a day number nor a recognised date.
    #[error("preset sky time is neither a day number nor a date: {0}")]
    InvalidPresetTime(String),
    /// `init_view_pos` is a zero or non-finite vector.
    #[error("initial view direction is not usable: {0}")]
    InvalidViewDirection(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

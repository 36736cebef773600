//! Persisted navigator settings.

use std::fs;
use std::path::Path;

use log::debug;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::NavError;
use crate::time::{parse_calendar_jd, J2000_JD};
use crate::vision::MountMode;

/// Preset sky time: a raw Julian Day, or text holding either a day number
/// or a local calendar date-time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PresetTime {
    JulianDay(f64),
    Text(String),
}

impl Default for PresetTime {
    fn default() -> Self {
        PresetTime::JulianDay(J2000_JD)
    }
}

impl PresetTime {
    pub fn to_julian_day(&self) -> Result<f64, NavError> {
        match self {
            PresetTime::JulianDay(jd) => Ok(*jd),
            PresetTime::Text(text) => {
                if let Ok(jd) = text.trim().parse::<f64>() {
                    debug!("[config] preset_sky_time is a number, treating as julian day: {}", jd);
                    return Ok(jd);
                }
                debug!("[config] preset_sky_time is not a number, treating as date: {}", text);
                parse_calendar_jd(text).ok_or_else(|| NavError::InvalidPresetTime(text.clone()))
            }
        }
    }
}

/// What the clock is set to when the navigator starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartupTimeMode {
    /// Real time.
    #[default]
    Actual,
    /// The configured preset sky time.
    Preset,
    /// Today at the configured time of day.
    Today,
}

impl StartupTimeMode {
    /// Case-insensitive; anything unrecognised means real time.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "preset" => StartupTimeMode::Preset,
            "today" => StartupTimeMode::Today,
            _ => StartupTimeMode::Actual,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StartupTimeMode::Actual => "actual",
            StartupTimeMode::Preset => "preset",
            StartupTimeMode::Today => "today",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Short id of the start-up location.
    pub init_location: String,
    /// `"horizon"` or `"equator"`.
    pub viewing_mode: String,
    /// Start-up look direction, alt-az.
    pub init_view_pos: [f64; 3],
    pub preset_sky_time: PresetTime,
    /// `"HH:MM"` used by the "today" start-up mode.
    pub today_time: String,
    /// `"actual"`, `"preset"` or `"today"`.
    pub startup_time_mode: String,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            init_location: "Paris, Paris, France".to_owned(),
            viewing_mode: MountMode::AltAzimuthal.as_config_str().to_owned(),
            init_view_pos: [1.0, 1e-5, 0.2],
            preset_sky_time: PresetTime::default(),
            today_time: "22:00".to_owned(),
            startup_time_mode: StartupTimeMode::Actual.as_str().to_owned(),
        }
    }
}

impl NavigatorConfig {
    pub fn from_json(json: &str) -> Result<Self, NavError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, NavError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, NavError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save(&self, path: &Path) -> Result<(), NavError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn mount_mode(&self) -> Result<MountMode, NavError> {
        self.viewing_mode.parse()
    }

    pub fn startup_time_mode(&self) -> StartupTimeMode {
        StartupTimeMode::parse(&self.startup_time_mode)
    }

    pub fn init_view_direction(&self) -> Result<Vector3<f64>, NavError> {
        let v = Vector3::from(self.init_view_pos);
        if v.iter().all(|x| x.is_finite()) && v.norm_squared() > 0.0 {
            Ok(v)
        } else {
            Err(NavError::InvalidViewDirection(format!("{:?}", self.init_view_pos)))
        }
    }
}

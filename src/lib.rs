//! Celestial navigation core: simulated time, the observer's place in the
//! solar system, and the reference-frame matrices a sky renderer needs.

use std::sync::Once;

pub mod body;
pub mod config;
pub mod error;
pub mod ffi;
pub mod location;
pub mod navigator;
pub mod observer;
pub mod services;
pub mod time;
pub mod transforms;
pub mod vision;

pub use body::{Body, BodyRef, BodyRegistry, StaticBody, StaticBodyRegistry};
pub use config::{NavigatorConfig, PresetTime, StartupTimeMode};
pub use error::NavError;
pub use ffi::{
    free_json, navcore_free, navcore_move_observer_to, navcore_new, navcore_set_time_now,
    navcore_state_json, navcore_update,
};
pub use location::{Location, LocationDirectory, StaticLocationDirectory};
pub use navigator::{Navigator, NavigatorSnapshot};
pub use observer::Observer;
pub use services::Services;
pub use time::{Clock, FixedClock, SystemClock, TimeModel};
pub use transforms::{Frame, FrameTransforms};
pub use vision::{MountMode, VisionDirection};

static INIT_LOGGER: Once = Once::new();

#[cfg(target_os = "android")]
pub fn init_logger() {
    use android_logger::Config;
    use log::LevelFilter;
    INIT_LOGGER.call_once(|| {
        android_logger::init_once(
            Config::default()
                .with_max_level(LevelFilter::Debug)
                .with_tag("navcore"),
        );
    });
}

#[cfg(not(target_os = "android"))]
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .try_init();
    });
}

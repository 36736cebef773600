//! The navigator: one simulated clock, one observer, and every frame
//! matrix derived from them, kept in step on each change.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveTime;
use log::{debug, error, info, warn};
use nalgebra::Vector3;
use serde::Serialize;

use crate::body::{BodyRef, BodyRegistry};
use crate::config::{NavigatorConfig, PresetTime, StartupTimeMode};
use crate::error::NavError;
use crate::location::{Location, LocationDirectory};
use crate::observer::Observer;
use crate::services::{MovementService, SelectionService, Services, SolarSystem};
use crate::time::{jd_to_datetime, TimeModel, J2000_JD, JD_HOUR};
use crate::transforms::{Frame, FrameTransforms};
use crate::vision::{MountMode, VisionDirection};

/// Real seconds used by [`Navigator::move_observer_to_default`].
pub const DEFAULT_MOVE_DURATION: f64 = 1.0;

type LocationListener = Box<dyn FnMut(&Location)>;

pub struct Navigator {
    time: TimeModel,
    observer: Observer,
    transforms: FrameTransforms,
    vision: VisionDirection,
    mount_mode: MountMode,
    config: NavigatorConfig,
    locations: Box<dyn LocationDirectory>,
    bodies: Box<dyn BodyRegistry>,
    selection: Box<dyn SelectionService>,
    movement: Box<dyn MovementService>,
    solar_system: Box<dyn SolarSystem>,
    listeners: Vec<LocationListener>,
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("time", &self.time)
            .field("location", self.observer.current_location())
            .field("mount_mode", &self.mount_mode)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Navigator {
    /// Build a navigator from persisted settings.
    ///
    /// Fails on an unknown viewing mode or an unusable initial view
    /// direction; every other bad value degrades to a fallback.
    pub fn new(config: NavigatorConfig, services: Services) -> Result<Self, NavError> {
        let mount_mode = config.mount_mode().inspect_err(|e| {
            error!("[Navigator::new] {}", e);
        })?;
        let init_view = config.init_view_direction().inspect_err(|e| {
            error!("[Navigator::new] {}", e);
        })?;

        let Services {
            locations,
            bodies,
            selection,
            movement,
            solar_system,
            clock,
        } = services;

        let location = locations.location_for_short_id(&config.init_location);
        info!("[Navigator::new] starting at {}", location.short_id());
        let observer = Observer::fixed(location, bodies.as_ref());

        let mut time = TimeModel::new(clock);
        time.set_to_now();
        match config.startup_time_mode() {
            StartupTimeMode::Preset => {
                let preset = config.preset_sky_time.to_julian_day().unwrap_or_else(|e| {
                    warn!("[Navigator::new] {}, using J2000.0", e);
                    J2000_JD
                });
                let shift = time.clock().utc_offset_hours(preset);
                time.set_instant(preset - shift * JD_HOUR);
            }
            StartupTimeMode::Today => time.set_to_calendar_time_today(&config.today_time),
            StartupTimeMode::Actual => {}
        }
        debug!(
            "[Navigator::new] startup mode {}, jd {}",
            config.startup_time_mode().as_str(),
            time.instant()
        );

        let transforms = FrameTransforms::compute(&observer, time.instant());
        let vision = VisionDirection::new(Frame::AltAz, init_view, &transforms, mount_mode);

        Ok(Self {
            time,
            observer,
            transforms,
            vision,
            mount_mode,
            config,
            locations,
            bodies,
            selection,
            movement,
            solar_system,
            listeners: Vec::new(),
        })
    }

    /// Default settings and built-in collaborators.
    pub fn standalone() -> Result<Self, NavError> {
        Self::new(NavigatorConfig::default(), Services::standalone())
    }

    // ---------- Frame loop ----------

    /// Advance by `delta_seconds` of real time: move the clock, retire a
    /// finished transition, move the observer, move the bodies, then
    /// recompute every frame from the new body positions.
    pub fn update(&mut self, delta_seconds: f64) {
        self.time.advance(delta_seconds);

        if let Some(next) = self.observer.next_observer() {
            let home = next.home_body().english_name();
            let selected_home = self
                .selection
                .selected_body()
                .is_some_and(|b| b.english_name() == home);
            if selected_home {
                self.selection.clear_selection();
            }
            info!("[update] arrived at {}", next.current_location().short_id());
            self.observer = next;
        }
        self.observer.update(delta_seconds);

        self.solar_system
            .recompute_body_positions(self.time.instant(), self.observer.center_position());
        self.refresh_frames();
    }

    /// Recompute every matrix from the current instant and observer, then
    /// re-derive the vision direction from its anchor frame.
    fn refresh_frames(&mut self) {
        self.transforms = FrameTransforms::compute(&self.observer, self.time.instant());
        self.vision.refresh(&self.transforms, self.mount_mode);
    }

    // ---------- Time ----------

    pub fn instant(&self) -> f64 {
        self.time.instant()
    }

    pub fn set_instant(&mut self, jd: f64) {
        self.time.set_instant(jd);
        self.refresh_frames();
    }

    pub fn time_rate(&self) -> f64 {
        self.time.time_rate()
    }

    pub fn set_time_rate(&mut self, rate: f64) {
        self.time.set_time_rate(rate);
    }

    pub fn set_time_now(&mut self) {
        self.time.set_to_now();
        self.refresh_frames();
    }

    /// Today at `time_of_day` (`"HH:MM"`), local civil time.
    pub fn set_today_time(&mut self, time_of_day: &str) {
        self.time.set_to_calendar_time_today(time_of_day);
        self.refresh_frames();
    }

    pub fn is_time_now(&self) -> bool {
        self.time.is_approximately_now()
    }

    pub fn add_solar_days(&mut self, days: f64) {
        self.time.add_solar_days(days);
        self.refresh_frames();
    }

    pub fn add_sidereal_days(&mut self, days: f64) {
        let home = Arc::clone(self.observer.home_body());
        self.time.add_sidereal_days(days, home.as_ref());
        self.refresh_frames();
    }

    pub fn increase_time_speed(&mut self) {
        self.time.increase_speed();
    }

    pub fn decrease_time_speed(&mut self) {
        self.time.decrease_speed();
    }

    pub fn increase_time_speed_less(&mut self) {
        self.time.increase_speed_less();
    }

    pub fn decrease_time_speed_less(&mut self) {
        self.time.decrease_speed_less();
    }

    /// Local sidereal time of the observer, in radians.
    pub fn local_sidereal_time(&self) -> f64 {
        let st = self.observer.home_body().sidereal_time(self.time.instant());
        (st + self.observer.current_location().longitude).to_radians()
    }

    /// Sidereal day of the home body, in days.
    pub fn local_sidereal_day_length(&self) -> f64 {
        self.observer.home_body().sidereal_day()
    }

    // ---------- Relocation ----------

    /// Relocate to `target`. Uses `duration` real seconds when staying on
    /// the same body and `duration_if_body_changes` otherwise; a
    /// non-positive duration jumps immediately.
    ///
    /// Listeners hear about `target` exactly once, before this returns.
    pub fn move_observer_to(&mut self, target: Location, duration: f64, duration_if_body_changes: f64) {
        let same_body = self.observer.current_location().planet_name == target.planet_name;
        let d = if same_body {
            duration
        } else {
            duration_if_body_changes
        };

        info!("[move_observer_to] {} over {}s", target.short_id(), d);
        self.observer = if d > 0.0 {
            let mut moving = Observer::transitioning(
                self.observer.departure(self.time.instant()),
                target.clone(),
                d,
                self.bodies.as_ref(),
            );
            moving.update(0.0);
            moving
        } else {
            Observer::fixed(target.clone(), self.bodies.as_ref())
        };
        self.refresh_frames();

        for listener in self.listeners.iter_mut() {
            listener(&target);
        }
    }

    pub fn move_observer_to_default(&mut self, target: Location) {
        self.move_observer_to(target, DEFAULT_MOVE_DURATION, DEFAULT_MOVE_DURATION);
    }

    /// Fly to the selected body, keeping the current coordinates.
    /// Tracking is switched off either way.
    pub fn move_observer_to_selected(&mut self) {
        if let Some(body) = self.selection.selected_body() {
            let mut target = self.observer.current_location().clone();
            target.planet_name = body.english_name().to_owned();
            target.name = "-".to_owned();
            target.state = String::new();
            self.move_observer_to_default(target);
        } else {
            debug!("[move_observer_to_selected] nothing selected");
        }
        self.movement.set_tracking(false);
    }

    /// Call `listener` after every relocation with the target location.
    pub fn on_location_changed(&mut self, listener: impl FnMut(&Location) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // ---------- Vision ----------

    pub fn set_vision_direction(&mut self, frame: Frame, direction: Vector3<f64>) {
        self.vision.set(frame, direction, &self.transforms, self.mount_mode);
    }

    pub fn set_alt_az_vision_direction(&mut self, direction: Vector3<f64>) {
        self.set_vision_direction(Frame::AltAz, direction);
    }

    pub fn set_equatorial_vision_direction(&mut self, direction: Vector3<f64>) {
        self.set_vision_direction(Frame::EquatorialOfDate, direction);
    }

    pub fn set_j2000_vision_direction(&mut self, direction: Vector3<f64>) {
        self.set_vision_direction(Frame::J2000, direction);
    }

    pub fn mount_mode(&self) -> MountMode {
        self.mount_mode
    }

    pub fn set_mount_mode(&mut self, mode: MountMode) {
        self.mount_mode = mode;
        self.vision.rebuild_model_view(&self.transforms, mode);
    }

    pub fn toggle_mount_mode(&mut self) {
        self.set_mount_mode(self.mount_mode.toggled());
    }

    // ---------- Defaults ----------

    pub fn set_default_location_id(&mut self, id: &str) {
        let location = self.locations.location_for_short_id(id);
        debug!("[set_default_location_id] {} resolves to {}", id, location.short_id());
        self.config.init_location = id.to_owned();
    }

    /// Remember the current alt-az look direction as the start-up one.
    pub fn set_init_view_direction_to_current(&mut self) {
        self.config.init_view_pos = (*self.vision.alt_az()).into();
    }

    pub fn set_startup_time_mode(&mut self, mode: &str) {
        self.config.startup_time_mode = StartupTimeMode::parse(mode).as_str().to_owned();
    }

    pub fn set_preset_sky_time(&mut self, jd: f64) {
        self.config.preset_sky_time = PresetTime::JulianDay(jd);
    }

    pub fn set_init_today_time(&mut self, time_of_day: NaiveTime) {
        self.config.today_time = time_of_day.format("%H:%M").to_string();
    }

    // ---------- Accessors ----------

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    pub fn current_location(&self) -> &Location {
        self.observer.current_location()
    }

    pub fn home_body(&self) -> &BodyRef {
        self.observer.home_body()
    }

    pub fn transforms(&self) -> &FrameTransforms {
        &self.transforms
    }

    pub fn vision(&self) -> &VisionDirection {
        &self.vision
    }

    pub fn observer_heliocentric_position(&self) -> Vector3<f64> {
        self.transforms.observer_heliocentric_position()
    }

    pub fn snapshot(&self) -> NavigatorSnapshot {
        let jd = self.time.instant();
        NavigatorSnapshot {
            jd,
            utc: jd_to_datetime(jd).map(|dt| dt.to_rfc3339()),
            time_rate: self.time.time_rate(),
            is_time_now: self.is_time_now(),
            location: self.current_location().clone(),
            home_body: self.home_body().english_name().to_owned(),
            transit_progress: self.observer.transit().map(|t| t.progress()),
            mount_mode: self.mount_mode,
            alt_az_vision: (*self.vision.alt_az()).into(),
            equatorial_vision: (*self.vision.equatorial()).into(),
            j2000_vision: (*self.vision.j2000()).into(),
            observer_heliocentric_position: self.observer_heliocentric_position().into(),
            local_sidereal_time: self.local_sidereal_time(),
        }
    }
}

/// Serializable view of the navigator state.
#[derive(Debug, Clone, Serialize)]
pub struct NavigatorSnapshot {
    pub jd: f64,
    pub utc: Option<String>,
    pub time_rate: f64,
    pub is_time_now: bool,
    pub location: Location,
    pub home_body: String,
    /// Eased progress while in transit.
    pub transit_progress: Option<f64>,
    pub mount_mode: MountMode,
    pub alt_az_vision: [f64; 3],
    pub equatorial_vision: [f64; 3],
    pub j2000_vision: [f64; 3],
    pub observer_heliocentric_position: [f64; 3],
    pub local_sidereal_time: f64,
}

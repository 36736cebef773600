//! Bodies an observer can stand on, and the registry that names them.
//!
//! Real orbital mechanics live outside this crate; the navigator only
//! needs each body's spin, axis and current heliocentric position.
//! `StaticBody` provides frozen values good enough to run without an
//! ephemeris.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use nalgebra::{Matrix4, Vector3};

use crate::time::J2000_JD;
use crate::transforms::{x_rotation, z_rotation};

// ---------- Constants ----------
pub const AU_KM: f64 = 149_597_870.691;

/// English name of the body-less root frame (free flight in the solar system).
pub const ROOT_BODY_NAME: &str = "Solar System Observer";

const EARTH_RADIUS_KM: f64 = 6378.137; // WGS-84 equatorial
const EARTH_SIDEREAL_DAY: f64 = 0.997_269_566_32;
const EARTH_OBLIQUITY_DEG: f64 = 23.439_280_305_555_555_6;

/// A solar-system body as seen by the navigator.
pub trait Body: fmt::Debug + Send + Sync {
    fn english_name(&self) -> &str;

    /// Length of one rotation, in days.
    fn sidereal_day(&self) -> f64;

    /// Rotation angle of the prime meridian at `jd`, in degrees.
    fn sidereal_time(&self, jd: f64) -> f64;

    /// Centre of the body in the heliocentric ecliptic frame, in AU.
    fn heliocentric_ecliptic_position(&self) -> Vector3<f64>;

    /// Rotation from the body's equator of date to the VSOP87 ecliptic.
    fn rot_equatorial_to_vsop87(&self) -> Matrix4<f64>;

    /// Equatorial radius, in AU.
    fn radius(&self) -> f64;

    fn is_root(&self) -> bool {
        self.english_name() == ROOT_BODY_NAME
    }
}

pub type BodyRef = Arc<dyn Body>;

/// Lookup of bodies by English name.
pub trait BodyRegistry {
    fn body_by_name(&self, name: &str) -> Option<BodyRef>;

    /// Body used when a location names one that does not exist.
    fn default_body(&self) -> BodyRef;
}

// ---------- Rotation models ----------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SiderealModel {
    /// Does not rotate.
    Fixed,
    /// Greenwich mean sidereal time.
    EarthGmst,
    /// Uniform spin from a reference angle at J2000.0.
    Linear { at_j2000_deg: f64, deg_per_day: f64 },
}

impl SiderealModel {
    pub fn sidereal_time_deg(&self, jd: f64) -> f64 {
        match *self {
            SiderealModel::Fixed => 0.0,
            SiderealModel::EarthGmst => gmst_deg(jd),
            SiderealModel::Linear {
                at_j2000_deg,
                deg_per_day,
            } => unwind_deg(at_j2000_deg + deg_per_day * (jd - J2000_JD)),
        }
    }
}

fn gmst_deg(jd: f64) -> f64 {
    let d = jd - J2000_JD;
    let t = d / 36525.0;
    let gmst = 280.46061837 + 360.98564736629 * d + 0.000387933 * t * t - t * t * t / 38710000.0;
    unwind_deg(gmst)
}

fn unwind_deg(mut x: f64) -> f64 {
    x %= 360.0;
    if x < 0.0 {
        x += 360.0;
    }
    x
}

// ---------- Static bodies ----------

/// A body with a frozen position and a simple spin model.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticBody {
    name: String,
    sidereal_day: f64,
    spin: SiderealModel,
    radius_km: f64,
    obliquity_deg: f64,
    ascending_node_deg: f64,
    position: Vector3<f64>,
}

impl StaticBody {
    pub fn new(
        name: impl Into<String>,
        sidereal_day: f64,
        spin: SiderealModel,
        radius_km: f64,
        position: Vector3<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            sidereal_day,
            spin,
            radius_km,
            obliquity_deg: 0.0,
            ascending_node_deg: 0.0,
            position,
        }
    }

    /// Tilt the rotation axis: `obliquity_deg` from the ecliptic pole,
    /// equator crossing the ecliptic at `ascending_node_deg`.
    pub fn with_axis(mut self, obliquity_deg: f64, ascending_node_deg: f64) -> Self {
        self.obliquity_deg = obliquity_deg;
        self.ascending_node_deg = ascending_node_deg;
        self
    }

    pub fn root() -> Self {
        Self::new(ROOT_BODY_NAME, 1.0, SiderealModel::Fixed, 0.0, Vector3::zeros())
    }

    pub fn sun() -> Self {
        let spin = SiderealModel::Linear {
            at_j2000_deg: 84.176,
            deg_per_day: 14.1844,
        };
        Self::new("Sun", 25.38, spin, 696_000.0, Vector3::zeros()).with_axis(7.25, 75.76)
    }

    /// Earth at its J2000.0 position; equator of date pinned to J2000.
    pub fn earth() -> Self {
        Self::new(
            "Earth",
            EARTH_SIDEREAL_DAY,
            SiderealModel::EarthGmst,
            EARTH_RADIUS_KM,
            Vector3::new(-0.177_135, 0.967_242, -0.000_004),
        )
        .with_axis(EARTH_OBLIQUITY_DEG, 0.0)
    }

    pub fn moon() -> Self {
        let spin = SiderealModel::Linear {
            at_j2000_deg: 38.3213,
            deg_per_day: 13.176_358,
        };
        Self::new(
            "Moon",
            27.321_661,
            spin,
            1737.4,
            Vector3::new(-0.179_700, 0.966_100, 0.000_200),
        )
        .with_axis(1.54, 125.04)
    }

    pub fn mars() -> Self {
        let spin = SiderealModel::Linear {
            at_j2000_deg: 176.63,
            deg_per_day: 350.891_982_26,
        };
        Self::new(
            "Mars",
            1.025_956_76,
            spin,
            3396.19,
            Vector3::new(1.390_715, -0.013_416, -0.034_467),
        )
        .with_axis(26.72, 82.91)
    }
}

impl Body for StaticBody {
    fn english_name(&self) -> &str {
        &self.name
    }

    fn sidereal_day(&self) -> f64 {
        self.sidereal_day
    }

    fn sidereal_time(&self, jd: f64) -> f64 {
        self.spin.sidereal_time_deg(jd)
    }

    fn heliocentric_ecliptic_position(&self) -> Vector3<f64> {
        self.position
    }

    fn rot_equatorial_to_vsop87(&self) -> Matrix4<f64> {
        z_rotation(self.ascending_node_deg.to_radians()) * x_rotation(-self.obliquity_deg.to_radians())
    }

    fn radius(&self) -> f64 {
        self.radius_km / AU_KM
    }
}

// ---------- Registry ----------

#[derive(Debug, Clone)]
pub struct StaticBodyRegistry {
    bodies: HashMap<String, BodyRef>,
    default: BodyRef,
}

impl StaticBodyRegistry {
    pub fn new(default: BodyRef) -> Self {
        let mut bodies = HashMap::new();
        bodies.insert(default.english_name().to_owned(), Arc::clone(&default));
        Self { bodies, default }
    }

    /// Root frame, Sun, Earth (default), Moon and Mars.
    pub fn solar_system() -> Self {
        let mut registry = Self::new(Arc::new(StaticBody::earth()));
        registry.insert(Arc::new(StaticBody::root()));
        registry.insert(Arc::new(StaticBody::sun()));
        registry.insert(Arc::new(StaticBody::moon()));
        registry.insert(Arc::new(StaticBody::mars()));
        registry
    }

    pub fn insert(&mut self, body: BodyRef) {
        self.bodies.insert(body.english_name().to_owned(), body);
    }
}

impl BodyRegistry for StaticBodyRegistry {
    fn body_by_name(&self, name: &str) -> Option<BodyRef> {
        self.bodies.get(name).cloned()
    }

    fn default_body(&self) -> BodyRef {
        Arc::clone(&self.default)
    }
}

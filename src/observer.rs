//! Where the viewpoint is: fixed on a body, or in transit between two
//! locations (possibly on different bodies).

use std::sync::Arc;

use log::{debug, warn};
use nalgebra::{Matrix4, Rotation3, UnitQuaternion, Vector3};

use crate::body::{BodyRef, BodyRegistry, AU_KM};
use crate::location::Location;
use crate::transforms::{y_rotation, z_rotation};

/// Body name reported while travelling between two bodies.
pub const SPACESHIP_NAME: &str = "SpaceShip";

/// Cubic smoothstep `3t² - 2t³`: 0 at the start, 1 at the end, with zero
/// slope at both ends. Input is clamped to `[0, 1]`.
pub fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Interpolate longitudes in degrees along the shorter way round, result
/// in `(-180, 180]`.
fn lerp_longitude(a: f64, b: f64, t: f64) -> f64 {
    let delta = (b - a + 180.0).rem_euclid(360.0) - 180.0;
    let lon = a + delta * t;
    if lon > 180.0 {
        lon - 360.0
    } else if lon <= -180.0 {
        lon + 360.0
    } else {
        lon
    }
}

pub(crate) fn resolve_body(registry: &dyn BodyRegistry, name: &str) -> BodyRef {
    registry.body_by_name(name).unwrap_or_else(|| {
        let fallback = registry.default_body();
        warn!(
            "[observer] can't bind observer to unknown body {:?}, using {}",
            name,
            fallback.english_name()
        );
        fallback
    })
}

/// Alt-az to equatorial-of-date rotation for a point on `body`.
fn rot_alt_az_to_equatorial(body: &BodyRef, location: &Location, jd: f64) -> Matrix4<f64> {
    z_rotation((body.sidereal_time(jd) + location.longitude).to_radians())
        * y_rotation((90.0 - location.latitude).to_radians())
}

fn distance_from_center(body: &BodyRef, location: &Location) -> f64 {
    body.radius() + location.altitude / (1000.0 * AU_KM)
}

/// Spherical interpolation between two rotation matrices. Exact at the ends.
fn blend_rotations(a: &Matrix4<f64>, b: &Matrix4<f64>, t: f64) -> Matrix4<f64> {
    if t <= 0.0 {
        return *a;
    }
    if t >= 1.0 {
        return *b;
    }
    let qa = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(
        a.fixed_view::<3, 3>(0, 0).into_owned(),
    ));
    let mut qb = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(
        b.fixed_view::<3, 3>(0, 0).into_owned(),
    ));
    if qa.coords.dot(&qb.coords) < 0.0 {
        qb = UnitQuaternion::new_unchecked(-qb.into_inner());
    }
    match qa.try_slerp(&qb, t, 1.0e-12) {
        Some(q) => q.to_homogeneous(),
        // Half-turn apart: no unique path, snap to the nearer end.
        None if t < 0.5 => *a,
        None => *b,
    }
}

// ---------- Fixed ----------

#[derive(Debug, Clone)]
pub struct FixedObserver {
    location: Location,
    body: BodyRef,
}

// ---------- Transitioning ----------

/// Where a transition departs from.
#[derive(Debug, Clone)]
pub enum TransitStart {
    /// Standing on a body. The start side keeps following that body.
    OnBody { location: Location, body: BodyRef },
    /// Already travelling. The start side stays where the interrupted trip
    /// was at `jd`, turning only with `spin_body`.
    InFlight {
        location: Location,
        spin_body: BodyRef,
        jd: f64,
        rot_alt_az_to_equ: Matrix4<f64>,
        rot_equ_to_vsop87: Matrix4<f64>,
        center: Vector3<f64>,
        distance: f64,
    },
}

impl TransitStart {
    pub fn on_body(location: Location, body: BodyRef) -> Self {
        TransitStart::OnBody { location, body }
    }

    pub fn location(&self) -> &Location {
        match self {
            TransitStart::OnBody { location, .. } | TransitStart::InFlight { location, .. } => location,
        }
    }

    pub fn body(&self) -> &BodyRef {
        match self {
            TransitStart::OnBody { body, .. } => body,
            TransitStart::InFlight { spin_body, .. } => spin_body,
        }
    }

    fn rot_alt_az_to_equ(&self, jd: f64) -> Matrix4<f64> {
        match self {
            TransitStart::OnBody { location, body } => rot_alt_az_to_equatorial(body, location, jd),
            TransitStart::InFlight {
                spin_body,
                jd: captured_at,
                rot_alt_az_to_equ,
                ..
            } => {
                let spin = spin_body.sidereal_time(jd) - spin_body.sidereal_time(*captured_at);
                z_rotation(spin.to_radians()) * rot_alt_az_to_equ
            }
        }
    }

    fn rot_equ_to_vsop87(&self) -> Matrix4<f64> {
        match self {
            TransitStart::OnBody { body, .. } => body.rot_equatorial_to_vsop87(),
            TransitStart::InFlight { rot_equ_to_vsop87, .. } => *rot_equ_to_vsop87,
        }
    }

    fn center(&self) -> Vector3<f64> {
        match self {
            TransitStart::OnBody { body, .. } => body.heliocentric_ecliptic_position(),
            TransitStart::InFlight { center, .. } => *center,
        }
    }

    fn distance(&self) -> f64 {
        match self {
            TransitStart::OnBody { location, body } => distance_from_center(body, location),
            TransitStart::InFlight { distance, .. } => *distance,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransitObserver {
    start: TransitStart,
    end: Location,
    end_body: BodyRef,
    duration: f64,
    elapsed: f64,
    // Eased fraction of the trip and the location it puts us at.
    progress: f64,
    current: Location,
}

impl TransitObserver {
    fn changes_body(&self) -> bool {
        self.start.body().english_name() != self.end_body.english_name()
    }

    /// Whether orientation is blended from the start side. A walk across a
    /// single body just follows that body under the moving location.
    fn blends_orientation(&self) -> bool {
        self.changes_body() || matches!(self.start, TransitStart::InFlight { .. })
    }

    fn refresh(&mut self) {
        if self.elapsed >= self.duration {
            self.progress = 1.0;
            self.current = self.end.clone();
            return;
        }
        self.progress = smoothstep(self.elapsed / self.duration);
        let p = self.progress;
        let start = self.start.location();

        let mut current = self.end.clone();
        if self.changes_body() {
            current.planet_name = SPACESHIP_NAME.to_owned();
            current.name = format!("{} -> {}", start.planet_name, self.end.planet_name);
        } else {
            current.name = format!("{} -> {}", start.name, self.end.name);
        }
        current.state = String::new();
        current.country = String::new();
        current.latitude = lerp(start.latitude, self.end.latitude, p);
        current.longitude = lerp_longitude(start.longitude, self.end.longitude, p);
        current.altitude = lerp(start.altitude, self.end.altitude, p);
        self.current = current;
    }

    pub fn start(&self) -> &Location {
        self.start.location()
    }

    pub fn end(&self) -> &Location {
        &self.end
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Eased progress in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.progress
    }
}

// ---------- Observer ----------

/// The navigator's single live viewpoint.
#[derive(Debug, Clone)]
pub enum Observer {
    Fixed(FixedObserver),
    Transitioning(TransitObserver),
}

impl Observer {
    /// Stand at `location`. An unknown body binds to the registry default.
    pub fn fixed(location: Location, registry: &dyn BodyRegistry) -> Self {
        let body = resolve_body(registry, &location.planet_name);
        Self::fixed_on(location, body)
    }

    pub fn fixed_on(location: Location, body: BodyRef) -> Self {
        Observer::Fixed(FixedObserver { location, body })
    }

    /// Travel from `start` to `end` over `duration` real seconds. The
    /// interpolated state is valid immediately.
    pub fn transitioning(
        start: TransitStart,
        end: Location,
        duration: f64,
        registry: &dyn BodyRegistry,
    ) -> Self {
        let end_body = resolve_body(registry, &end.planet_name);
        let mut transit = TransitObserver {
            current: start.location().clone(),
            start,
            end,
            end_body,
            duration,
            elapsed: 0.0,
            progress: 0.0,
        };
        transit.refresh();
        Observer::Transitioning(transit)
    }

    /// This observer as the departure point of a new transition at `jd`,
    /// so the new one starts exactly where this one is.
    pub fn departure(&self, jd: f64) -> TransitStart {
        match self {
            Observer::Fixed(f) => TransitStart::on_body(f.location.clone(), Arc::clone(&f.body)),
            Observer::Transitioning(t) => TransitStart::InFlight {
                location: t.current.clone(),
                spin_body: Arc::clone(&t.end_body),
                jd,
                rot_alt_az_to_equ: self.rot_alt_az_to_equatorial(jd),
                rot_equ_to_vsop87: self.rot_equatorial_to_vsop87(),
                center: self.center_position(),
                distance: self.distance_from_center(),
            },
        }
    }

    /// Advance a transition by `delta_seconds` of real time.
    pub fn update(&mut self, delta_seconds: f64) {
        if let Observer::Transitioning(t) = self {
            if t.elapsed >= t.duration && delta_seconds > 0.0 {
                return;
            }
            t.elapsed = (t.elapsed + delta_seconds.max(0.0)).min(t.duration);
            t.refresh();
        }
    }

    pub fn is_expired(&self) -> bool {
        match self {
            Observer::Fixed(_) => false,
            Observer::Transitioning(t) => t.elapsed >= t.duration,
        }
    }

    /// The fixed observer that replaces an expired transition.
    pub fn next_observer(&self) -> Option<Observer> {
        match self {
            Observer::Transitioning(t) if self.is_expired() => {
                debug!("[observer] arrived at {}", t.end.short_id());
                Some(Self::fixed_on(t.end.clone(), Arc::clone(&t.end_body)))
            }
            _ => None,
        }
    }

    pub fn current_location(&self) -> &Location {
        match self {
            Observer::Fixed(f) => &f.location,
            Observer::Transitioning(t) => &t.current,
        }
    }

    /// Body whose clock and orientation the observer follows. A transition
    /// belongs to its destination.
    pub fn home_body(&self) -> &BodyRef {
        match self {
            Observer::Fixed(f) => &f.body,
            Observer::Transitioning(t) => &t.end_body,
        }
    }

    pub fn transit(&self) -> Option<&TransitObserver> {
        match self {
            Observer::Transitioning(t) => Some(t),
            Observer::Fixed(_) => None,
        }
    }

    pub fn rot_alt_az_to_equatorial(&self, jd: f64) -> Matrix4<f64> {
        match self {
            Observer::Fixed(f) => rot_alt_az_to_equatorial(&f.body, &f.location, jd),
            Observer::Transitioning(t) => {
                let to = rot_alt_az_to_equatorial(&t.end_body, &t.current, jd);
                if !t.blends_orientation() {
                    return to;
                }
                blend_rotations(&t.start.rot_alt_az_to_equ(jd), &to, t.progress)
            }
        }
    }

    pub fn rot_equatorial_to_vsop87(&self) -> Matrix4<f64> {
        match self {
            Observer::Fixed(f) => f.body.rot_equatorial_to_vsop87(),
            Observer::Transitioning(t) if t.blends_orientation() => blend_rotations(
                &t.start.rot_equ_to_vsop87(),
                &t.end_body.rot_equatorial_to_vsop87(),
                t.progress,
            ),
            Observer::Transitioning(t) => t.end_body.rot_equatorial_to_vsop87(),
        }
    }

    /// Centre of the home body (or the eased point between the departure
    /// and the destination body) in the heliocentric ecliptic frame, in AU.
    pub fn center_position(&self) -> Vector3<f64> {
        match self {
            Observer::Fixed(f) => f.body.heliocentric_ecliptic_position(),
            Observer::Transitioning(t) => {
                let a = t.start.center();
                let b = t.end_body.heliocentric_ecliptic_position();
                a + (b - a) * t.progress
            }
        }
    }

    /// Distance from the centre to the observer, in AU.
    pub fn distance_from_center(&self) -> f64 {
        match self {
            Observer::Fixed(f) => distance_from_center(&f.body, &f.location),
            Observer::Transitioning(t) => lerp(
                t.start.distance(),
                distance_from_center(&t.end_body, &t.end),
                t.progress,
            ),
        }
    }
}

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::{CStr, CString};
use std::ptr;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use approx::assert_abs_diff_eq;
use chrono::{FixedOffset, TimeZone, Utc};
use nalgebra::{Matrix4, Vector3};
use serde::Deserialize;

use navcore::body::ROOT_BODY_NAME;
use navcore::services::{SingleSelection, SolarSystem, StaticSolarSystem, TrackingFlag};
use navcore::time::{
    parse_calendar_jd, JD_DAY, JD_HOUR, JD_SECOND, J2000_JD, MAX_INSTANT, MIN_INSTANT,
};
use navcore::{
    free_json, navcore_free, navcore_move_observer_to, navcore_new, navcore_state_json,
    navcore_update, Body, FixedClock, Location, MountMode, Navigator, NavigatorConfig, Observer,
    Services, StaticBody, StaticBodyRegistry,
};

fn clock_at_j2000() -> Rc<FixedClock> {
    Rc::new(FixedClock::utc(Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap()))
}

fn navigator_at_j2000() -> Navigator {
    Navigator::new(
        NavigatorConfig::default(),
        Services::standalone().with_clock(clock_at_j2000()),
    )
    .expect("default config is valid")
}

fn gale_crater() -> Location {
    Location::new("Gale Crater", "Mars", 137.4, -5.4, -4500.0)
}

fn assert_pairs_are_inverse(nav: &Navigator) {
    for (forward, inverse) in nav.transforms().pairs() {
        assert_abs_diff_eq!(forward * inverse, Matrix4::identity(), epsilon = 1e-9);
        assert_abs_diff_eq!(inverse * forward, Matrix4::identity(), epsilon = 1e-9);
    }
}

#[test]
fn j2000_vision_round_trips_to_alt_az() {
    let mut nav = navigator_at_j2000();
    nav.set_time_rate(0.0);
    nav.update(0.0);
    assert_eq!(nav.instant(), J2000_JD);
    assert_eq!(nav.mount_mode(), MountMode::AltAzimuthal);

    let look = Vector3::new(1.0, 0.0, 0.0);
    nav.set_alt_az_vision_direction(look);

    let j2000 = *nav.vision().j2000();
    let back = nav.transforms().j2000_to_alt_az().transform_vector(&j2000);
    assert!((back - look).norm() < 1e-9, "round trip drifted: {back:?}");
}

#[test]
fn five_speed_increases_from_pause() {
    let mut nav = navigator_at_j2000();
    nav.set_time_rate(0.0);
    let mut seen = Vec::new();
    for _ in 0..5 {
        nav.increase_time_speed();
        seen.push(nav.time_rate() / JD_SECOND);
    }
    let expected = [1.0, 10.0, 100.0, 1000.0, 10000.0];
    for (got, want) in seen.iter().zip(expected) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-9 * want);
    }

    nav.set_time_rate(0.0);
    nav.increase_time_speed();
    nav.decrease_time_speed();
    assert_eq!(nav.time_rate(), 0.0);
}

#[test]
fn instant_relocation_notifies_once() {
    let mut nav = navigator_at_j2000();
    let heard = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&heard);
    nav.on_location_changed(move |loc| sink.borrow_mut().push(loc.clone()));

    let greenwich = Location::new("Greenwich", "Earth", 0.0, 51.4779, 46.0);
    nav.move_observer_to(greenwich.clone(), 0.0, 0.0);

    assert!(matches!(nav.observer(), Observer::Fixed(_)));
    assert_eq!(nav.current_location(), &greenwich);
    assert_eq!(*heard.borrow(), vec![greenwich]);
    assert_pairs_are_inverse(&nav);
}

#[test]
fn interplanetary_transition_expires_into_fixed_observer() {
    let selection = Rc::new(RefCell::new(SingleSelection::default()));
    let solar_system = Rc::new(RefCell::new(StaticSolarSystem::default()));
    let services = Services {
        selection: Box::new(Rc::clone(&selection)),
        solar_system: Box::new(Rc::clone(&solar_system)),
        ..Services::standalone().with_clock(clock_at_j2000())
    };
    let mut nav = Navigator::new(NavigatorConfig::default(), services).unwrap();
    let notifications = Rc::new(Cell::new(0));
    let counter = Rc::clone(&notifications);
    nav.on_location_changed(move |_| counter.set(counter.get() + 1));

    // Same-body duration is ignored when the body changes.
    nav.move_observer_to(gale_crater(), 0.0, 2.0);
    assert_eq!(notifications.get(), 1);
    assert!(matches!(nav.observer(), Observer::Transitioning(_)));
    assert_eq!(nav.home_body().english_name(), "Mars");
    assert_pairs_are_inverse(&nav);

    nav.update(1.0);
    assert_eq!(nav.current_location().planet_name, "SpaceShip");
    assert_eq!(nav.current_location().name, "Earth -> Mars");
    assert!(!nav.observer().is_expired());
    assert_pairs_are_inverse(&nav);

    let mars = nav.home_body().clone();
    selection.borrow_mut().selected = Some(mars.clone());

    nav.update(1.0);
    assert!(nav.observer().is_expired());
    assert!(matches!(nav.observer(), Observer::Transitioning(_)));

    nav.update(0.0);
    assert!(matches!(nav.observer(), Observer::Fixed(_)));
    assert_eq!(nav.current_location(), &gale_crater());
    assert!(selection.borrow().selected.is_none(), "arriving on the selected body clears it");
    assert_eq!(notifications.get(), 1);

    let (jd, body_position) = solar_system.borrow().last_request.expect("positions were recomputed");
    assert_eq!(jd, nav.instant());
    assert_eq!(body_position, mars.heliocentric_ecliptic_position());
}

#[test]
fn rerouting_mid_transit_keeps_observer_in_place() {
    let mut nav = navigator_at_j2000();
    nav.move_observer_to(gale_crater(), 10.0, 10.0);
    nav.update(5.0);

    let center = nav.observer().center_position();
    let position = nav.observer_heliocentric_position();
    let alt_az_to_equ = *nav.transforms().alt_az_to_equ();

    let quito = Location::new("Quito", "Earth", -78.5, -0.2, 2850.0);
    nav.move_observer_to(quito.clone(), 5.0, 5.0);
    assert_eq!(nav.home_body().english_name(), "Earth");
    assert_abs_diff_eq!(nav.observer().center_position(), center, epsilon = 1e-12);
    assert_abs_diff_eq!(nav.observer_heliocentric_position(), position, epsilon = 1e-12);
    assert_abs_diff_eq!(*nav.transforms().alt_az_to_equ(), alt_az_to_equ, epsilon = 1e-12);
    assert_pairs_are_inverse(&nav);

    nav.update(0.05);
    let step = (nav.observer().center_position() - center).norm();
    assert!(step < 1e-3, "centre jumped {step} AU in one frame");

    nav.update(5.0);
    nav.update(0.0);
    assert!(matches!(nav.observer(), Observer::Fixed(_)));
    assert_eq!(nav.current_location(), &quito);
}

/// Earth on a circular 1 AU orbit, moved by [`Orbit`].
#[derive(Debug)]
struct OrbitingEarth {
    frame: StaticBody,
    position: Mutex<Vector3<f64>>,
}

impl OrbitingEarth {
    fn at(jd: f64) -> Self {
        Self {
            frame: StaticBody::earth(),
            position: Mutex::new(orbit_position(jd)),
        }
    }
}

fn orbit_position(jd: f64) -> Vector3<f64> {
    let angle = std::f64::consts::TAU * (jd - J2000_JD) / 365.25;
    Vector3::new(angle.cos(), angle.sin(), 0.0)
}

impl Body for OrbitingEarth {
    fn english_name(&self) -> &str {
        self.frame.english_name()
    }
    fn sidereal_day(&self) -> f64 {
        self.frame.sidereal_day()
    }
    fn sidereal_time(&self, jd: f64) -> f64 {
        self.frame.sidereal_time(jd)
    }
    fn heliocentric_ecliptic_position(&self) -> Vector3<f64> {
        *self.position.lock().unwrap()
    }
    fn rot_equatorial_to_vsop87(&self) -> Matrix4<f64> {
        self.frame.rot_equatorial_to_vsop87()
    }
    fn radius(&self) -> f64 {
        self.frame.radius()
    }
}

struct Orbit {
    earth: Arc<OrbitingEarth>,
}

impl SolarSystem for Orbit {
    fn recompute_body_positions(&mut self, jd: f64, _observer_body_position: Vector3<f64>) {
        *self.earth.position.lock().unwrap() = orbit_position(jd);
    }
}

#[test]
fn frames_follow_bodies_moved_in_the_same_update() {
    let earth = Arc::new(OrbitingEarth::at(J2000_JD));
    let services = Services {
        bodies: Box::new(StaticBodyRegistry::new(earth.clone())),
        solar_system: Box::new(Orbit { earth: Arc::clone(&earth) }),
        ..Services::standalone().with_clock(clock_at_j2000())
    };
    let mut nav = Navigator::new(NavigatorConfig::default(), services).unwrap();
    let start = earth.heliocentric_ecliptic_position();

    nav.set_time_rate(JD_DAY);
    nav.update(10.0);

    let body = earth.heliocentric_ecliptic_position();
    assert!((body - start).norm() > 0.1, "the body should have moved");
    let offset = (nav.observer_heliocentric_position() - body).norm();
    assert_abs_diff_eq!(offset, nav.observer().distance_from_center(), epsilon = 1e-12);
    assert_abs_diff_eq!(nav.observer().center_position(), body, epsilon = 0.0);
    assert_pairs_are_inverse(&nav);
}

#[test]
fn move_to_selected_body_keeps_coordinates() {
    let selection = Rc::new(RefCell::new(SingleSelection::default()));
    let movement = Rc::new(RefCell::new(TrackingFlag { tracking: true }));
    let services = Services {
        selection: Box::new(Rc::clone(&selection)),
        movement: Box::new(Rc::clone(&movement)),
        ..Services::standalone().with_clock(clock_at_j2000())
    };
    let mut nav = Navigator::new(NavigatorConfig::default(), services).unwrap();

    nav.move_observer_to_selected();
    assert!(!movement.borrow().tracking);
    assert!(matches!(nav.observer(), Observer::Fixed(_)));

    let moon = navcore::StaticBody::moon();
    selection.borrow_mut().selected = Some(std::sync::Arc::new(moon));
    movement.borrow_mut().tracking = true;
    nav.move_observer_to_selected();
    assert!(!movement.borrow().tracking);

    let transit = nav.observer().transit().expect("default relocation takes one second");
    assert_eq!(transit.duration(), 1.0);
    assert_eq!(transit.end().planet_name, "Moon");
    assert_eq!(transit.end().name, "-");
    assert_eq!(transit.end().state, "");
    assert_eq!(transit.end().latitude, Location::paris().latitude);
}

#[test]
fn instant_stays_in_supported_range() {
    let mut nav = navigator_at_j2000();
    nav.set_instant(1e12);
    assert_eq!(nav.instant(), MAX_INSTANT);

    nav.set_time_rate(-1e6);
    nav.update(1e6);
    assert_eq!(nav.instant(), MIN_INSTANT);
    assert_pairs_are_inverse(&nav);

    nav.add_solar_days(-10.0);
    assert_eq!(nav.instant(), MIN_INSTANT);
}

#[test]
fn advance_and_reverse_restore_instant() {
    let mut nav = navigator_at_j2000();
    let start = nav.instant();
    nav.set_time_rate(3600.0 * JD_SECOND);
    nav.update(12.5);
    nav.set_time_rate(-3600.0 * JD_SECOND);
    nav.update(12.5);
    assert_abs_diff_eq!(nav.instant(), start, epsilon = 1e-9);
}

#[test]
fn sidereal_days_follow_home_body() {
    let mut nav = navigator_at_j2000();
    let earth_day = nav.local_sidereal_day_length();
    nav.add_sidereal_days(1.0);
    assert_abs_diff_eq!(nav.instant(), J2000_JD + earth_day, epsilon = 1e-9);

    let free_flight = Location::new("", ROOT_BODY_NAME, 0.0, 0.0, 0.0);
    nav.move_observer_to(free_flight, 0.0, 0.0);
    let before = nav.instant();
    nav.add_sidereal_days(2.0);
    assert_abs_diff_eq!(nav.instant(), before + 2.0, epsilon = 1e-9);
}

#[test]
fn preset_config_fixture_starts_at_preset_time() {
    let config = NavigatorConfig::from_json(include_str!("fixtures/navigator_config.json"))
        .expect("fixture JSON should parse");
    let hawaii = FixedOffset::west_opt(10 * 3600).unwrap();
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), hawaii);

    let nav = Navigator::new(config, Services::standalone().with_clock(clock)).unwrap();
    let preset = parse_calendar_jd("2010-06-21 22:30:00").unwrap();
    assert_abs_diff_eq!(preset, 2_455_369.437_5, epsilon = 1e-9);
    assert_abs_diff_eq!(nav.instant(), preset + 10.0 * JD_HOUR, epsilon = 1e-9);
    assert_eq!(nav.mount_mode(), MountMode::Equatorial);
    assert_eq!(nav.current_location().name, "Mauna Kea");
    assert_abs_diff_eq!(*nav.vision().alt_az(), Vector3::new(0.0, 0.6, 0.8), epsilon = 1e-15);
}

// ---------- C ABI ----------

#[derive(Debug, Deserialize)]
struct SchemaFixture {
    #[serde(rename = "version")]
    _version: u32,
    #[serde(rename = "description")]
    _description: String,
    snapshot_keys: Vec<String>,
    field_types: BTreeMap<String, ExpectedType>,
    location_keys: Vec<String>,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum ExpectedType {
    String,
    Number,
    Boolean,
    Object,
    Vector,
    NullableNumber,
}

fn state_of(nav: *mut Navigator) -> serde_json::Value {
    let json_ptr = navcore_state_json(nav);
    assert!(!json_ptr.is_null(), "FFI should not return null");
    let json_str = unsafe { CStr::from_ptr(json_ptr).to_string_lossy().into_owned() };
    free_json(json_ptr);
    serde_json::from_str(&json_str)
        .unwrap_or_else(|err| panic!("Expected valid JSON, got error: {err}\nPayload: {json_str}"))
}

#[test]
fn state_json_matches_fixture() {
    let fixture: SchemaFixture = serde_json::from_str(include_str!("fixtures/snapshot_schema.json"))
        .expect("fixture JSON should parse");

    let nav = navcore_new(ptr::null());
    assert!(!nav.is_null(), "default config must be accepted");
    navcore_update(nav, 0.016);

    let state = state_of(nav);
    let obj = state.as_object().expect("state must be a JSON object");

    let actual: BTreeSet<_> = obj.keys().cloned().collect();
    let expected: BTreeSet<_> = fixture.snapshot_keys.iter().cloned().collect();
    assert_eq!(
        actual, expected,
        "State JSON keys diverged from golden schema (update tests/fixtures/snapshot_schema.json if intentional)"
    );

    for (field, expected_type) in &fixture.field_types {
        let value = obj
            .get(field)
            .unwrap_or_else(|| panic!("Field '{field}' missing from state"));
        let ok = match expected_type {
            ExpectedType::String => value.is_string(),
            ExpectedType::Number => value.is_number(),
            ExpectedType::Boolean => value.is_boolean(),
            ExpectedType::Object => value.is_object(),
            ExpectedType::NullableNumber => value.is_null() || value.is_number(),
            ExpectedType::Vector => value
                .as_array()
                .is_some_and(|a| a.len() == 3 && a.iter().all(|x| x.is_number())),
        };
        assert!(ok, "Field '{field}' should be {expected_type:?}, got {value}");
    }

    let location_keys: BTreeSet<_> = obj["location"]
        .as_object()
        .expect("location is an object")
        .keys()
        .cloned()
        .collect();
    assert_eq!(location_keys, fixture.location_keys.iter().cloned().collect());
    assert_eq!(obj["mount_mode"], "horizon");
    assert_eq!(obj["home_body"], "Earth");

    navcore_free(nav);
}

#[test]
fn ffi_relocation_and_rejections() {
    let bad = CString::new(r#"{"viewing_mode": "polar"}"#).unwrap();
    assert!(navcore_new(bad.as_ptr()).is_null(), "unknown viewing mode is fatal");
    let garbage = CString::new("not json").unwrap();
    assert!(navcore_new(garbage.as_ptr()).is_null());

    let config = CString::new(r#"{"viewing_mode": "equator"}"#).unwrap();
    let nav = navcore_new(config.as_ptr());
    assert!(!nav.is_null());
    assert_eq!(state_of(nav)["mount_mode"], "equator");

    let target = CString::new(
        r#"{"name":"Gale Crater","planet_name":"Mars","longitude":137.4,"latitude":-5.4,"altitude":-4500.0}"#,
    )
    .unwrap();
    assert!(navcore_move_observer_to(nav, target.as_ptr(), 1.0, 3.0));
    let moving = state_of(nav);
    assert_eq!(moving["home_body"], "Mars");
    assert_eq!(moving["transit_progress"], 0.0);
    assert_eq!(moving["location"]["planet_name"], "SpaceShip");

    navcore_update(nav, 3.0);
    navcore_update(nav, 0.0);
    let arrived = state_of(nav);
    assert!(arrived["transit_progress"].is_null());
    assert_eq!(arrived["location"]["name"], "Gale Crater");

    let broken = CString::new("{").unwrap();
    assert!(!navcore_move_observer_to(nav, broken.as_ptr(), 0.0, 0.0));
    assert!(!navcore_move_observer_to(ptr::null_mut(), target.as_ptr(), 0.0, 0.0));
    assert!(navcore_state_json(ptr::null_mut()).is_null());

    navcore_free(nav);
    navcore_free(ptr::null_mut());
}

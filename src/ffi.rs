//! C ABI for host applications.
//!
//! A navigator lives behind an opaque pointer from `navcore_new` until
//! `navcore_free`. Strings cross the boundary as NUL-terminated UTF-8 JSON;
//! every string returned here must be released with `free_json`.
#![allow(clippy::not_unsafe_ptr_arg_deref)]

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use log::{debug, error, info, warn};

use crate::config::NavigatorConfig;
use crate::init_logger;
use crate::location::Location;
use crate::navigator::Navigator;
use crate::services::Services;

fn read_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

fn navigator_mut<'a>(nav: *mut Navigator) -> Option<&'a mut Navigator> {
    unsafe { nav.as_mut() }
}

/// Create a navigator from a JSON config (null means defaults).
/// Returns null if the config is rejected.
#[no_mangle]
pub extern "C" fn navcore_new(config_json: *const c_char) -> *mut Navigator {
    init_logger();
    info!("[navcore_new] Creating navigator");

    let config = match read_str(config_json) {
        Some(json) => match NavigatorConfig::from_json(&json) {
            Ok(c) => c,
            Err(e) => {
                error!("[navcore_new] Failed to parse config: {}", e);
                return ptr::null_mut();
            }
        },
        None => {
            debug!("[navcore_new] No config given, using defaults");
            NavigatorConfig::default()
        }
    };

    match Navigator::new(config, Services::standalone()) {
        Ok(nav) => Box::into_raw(Box::new(nav)),
        Err(e) => {
            error!("[navcore_new] Navigator rejected config: {}", e);
            ptr::null_mut()
        }
    }
}

#[no_mangle]
pub extern "C" fn navcore_free(nav: *mut Navigator) {
    if nav.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(nav));
    }
}

/// Advance by `delta_seconds` of real time.
#[no_mangle]
pub extern "C" fn navcore_update(nav: *mut Navigator, delta_seconds: f64) {
    if let Some(nav) = navigator_mut(nav) {
        nav.update(delta_seconds);
    }
}

#[no_mangle]
pub extern "C" fn navcore_set_time_now(nav: *mut Navigator) {
    if let Some(nav) = navigator_mut(nav) {
        nav.set_time_now();
    }
}

/// Relocate to the location described by `location_json`. Returns false if
/// the handle is null or the JSON does not describe a location.
#[no_mangle]
pub extern "C" fn navcore_move_observer_to(
    nav: *mut Navigator,
    location_json: *const c_char,
    duration: f64,
    duration_if_body_changes: f64,
) -> bool {
    init_logger();
    let Some(nav) = navigator_mut(nav) else {
        warn!("[navcore_move_observer_to] Null navigator");
        return false;
    };
    let Some(json) = read_str(location_json) else {
        warn!("[navcore_move_observer_to] Null location");
        return false;
    };
    match serde_json::from_str::<Location>(&json) {
        Ok(target) => {
            nav.move_observer_to(target, duration, duration_if_body_changes);
            true
        }
        Err(e) => {
            error!("[navcore_move_observer_to] Failed to parse location: {}", e);
            false
        }
    }
}

/// Current state as a JSON object, or null for a null handle.
#[no_mangle]
pub extern "C" fn navcore_state_json(nav: *mut Navigator) -> *mut c_char {
    let Some(nav) = navigator_mut(nav) else {
        return ptr::null_mut();
    };
    let json = serde_json::to_string(&nav.snapshot()).unwrap_or_else(|e| {
        error!("[navcore_state_json] Failed to serialize state: {}", e);
        "{}".to_string()
    });
    CString::new(json).map_or(ptr::null_mut(), CString::into_raw)
}

#[no_mangle]
pub extern "C" fn free_json(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        let _ = CString::from_raw(ptr);
    }
}

//! Named places on (or above) a body.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A place an observer can stand.
///
/// Longitude and latitude are in degrees (east and north positive),
/// altitude in metres above the body's reference radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub name: String,
    pub state: String,
    pub country: String,
    pub planet_name: String,
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: f64,
}

impl Default for Location {
    fn default() -> Self {
        Self::new("", "Earth", 0.0, 0.0, 0.0)
    }
}

impl Location {
    pub fn new(
        name: impl Into<String>,
        planet_name: impl Into<String>,
        longitude: f64,
        latitude: f64,
        altitude: f64,
    ) -> Self {
        Self {
            name: name.into(),
            state: String::new(),
            country: String::new(),
            planet_name: planet_name.into(),
            longitude,
            latitude,
            altitude,
        }
    }

    pub fn paris() -> Self {
        Self {
            name: "Paris".into(),
            state: "Paris".into(),
            country: "France".into(),
            planet_name: "Earth".into(),
            longitude: 2.3522,
            latitude: 48.8566,
            altitude: 35.0,
        }
    }

    /// Identifier used by the location directory and the configuration,
    /// e.g. `"Paris, Paris, France"`.
    pub fn short_id(&self) -> String {
        format!("{}, {}, {}", self.name, self.state, self.country)
    }
}

/// Lookup of locations by short id. Never fails: unknown ids resolve to
/// some fallback location.
pub trait LocationDirectory {
    fn location_for_short_id(&self, id: &str) -> Location;
}

#[derive(Debug, Clone)]
pub struct StaticLocationDirectory {
    locations: HashMap<String, Location>,
    fallback: Location,
}

impl Default for StaticLocationDirectory {
    fn default() -> Self {
        let mut dir = Self::new(Location::paris());
        dir.insert(Location {
            name: "Greenwich".into(),
            state: "England".into(),
            country: "United Kingdom".into(),
            planet_name: "Earth".into(),
            longitude: 0.0,
            latitude: 51.4779,
            altitude: 46.0,
        });
        dir.insert(Location {
            name: "Mauna Kea".into(),
            state: "Hawaii".into(),
            country: "United States".into(),
            planet_name: "Earth".into(),
            longitude: -155.4681,
            latitude: 19.8207,
            altitude: 4205.0,
        });
        dir.insert(Location {
            name: "Gale Crater".into(),
            state: String::new(),
            country: String::new(),
            planet_name: "Mars".into(),
            longitude: 137.4,
            latitude: -5.4,
            altitude: -4500.0,
        });
        dir
    }
}

impl StaticLocationDirectory {
    pub fn new(fallback: Location) -> Self {
        let mut locations = HashMap::new();
        locations.insert(fallback.short_id(), fallback.clone());
        Self { locations, fallback }
    }

    pub fn insert(&mut self, location: Location) {
        self.locations.insert(location.short_id(), location);
    }
}

impl LocationDirectory for StaticLocationDirectory {
    fn location_for_short_id(&self, id: &str) -> Location {
        self.locations
            .get(id.trim())
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_joins_name_state_country() {
        assert_eq!(Location::paris().short_id(), "Paris, Paris, France");
    }

    #[test]
    fn directory_falls_back_for_unknown_ids() {
        let dir = StaticLocationDirectory::default();
        let greenwich = dir.location_for_short_id("Greenwich, England, United Kingdom");
        assert_eq!(greenwich.longitude, 0.0);
        assert_eq!(dir.location_for_short_id("Atlantis, , "), Location::paris());
    }

    #[test]
    fn location_json_fills_missing_fields() {
        let loc: Location =
            serde_json::from_str(r#"{"name":"Somewhere","planet_name":"Mars","latitude":-10.0}"#)
                .unwrap();
        assert_eq!(loc.planet_name, "Mars");
        assert_eq!(loc.latitude, -10.0);
        assert_eq!(loc.longitude, 0.0);
        assert!(loc.state.is_empty());
    }
}

//! Compile-time registry of supported cities.
//!
//! Cities are defined in `cities/cities.toml` and embedded at compile
//! time. The file order is preserved.

use serde::{Deserialize, Serialize};

/// A city with its coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    /// Display name, also the city key used in reports.
    pub name: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Whether this is the fallback city when no location is known.
    #[serde(default)]
    pub default: bool,
    /// Local advice shown alongside the city's metrics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
}

#[derive(Deserialize)]
struct CityFile {
    city: Vec<City>,
}

// ── Compile-time embedded TOML file ─────────────────────────────────

const CITIES_TOML: &str = include_str!("../cities/cities.toml");

#[cfg(test)]
const EXPECTED_CITY_COUNT: usize = 20;

/// Returns every registered city in file order.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (the file is compiled into
/// the binary, so this is caught by the tests).
#[must_use]
pub fn all_cities() -> Vec<City> {
    let file: CityFile = toml::de::from_str(CITIES_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded city registry: {e}"));
    file.city
}

/// Looks up a city by exact name.
#[must_use]
pub fn find_city(name: &str) -> Option<City> {
    all_cities().into_iter().find(|c| c.name == name)
}

/// The city used when no location is known (Delhi), falling back to the
/// first registered city.
///
/// # Panics
///
/// Panics if the embedded registry is empty.
#[must_use]
pub fn default_city() -> City {
    let cities = all_cities();
    cities
        .iter()
        .find(|c| c.default)
        .or_else(|| cities.first())
        .cloned()
        .unwrap_or_else(|| panic!("Embedded city registry is empty"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_cities() {
        assert_eq!(all_cities().len(), EXPECTED_CITY_COUNT);
    }

    #[test]
    fn city_names_are_unique() {
        let mut seen = BTreeSet::new();
        for city in &all_cities() {
            assert!(seen.insert(city.name.clone()), "Duplicate city: {}", city.name);
        }
    }

    #[test]
    fn coordinates_are_in_india() {
        for city in &all_cities() {
            assert!((6.0..38.0).contains(&city.lat), "{} lat {}", city.name, city.lat);
            assert!((68.0..98.0).contains(&city.lon), "{} lon {}", city.name, city.lon);
        }
    }

    #[test]
    fn exactly_one_default_and_it_is_delhi() {
        let defaults: Vec<City> = all_cities().into_iter().filter(|c| c.default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(default_city().name, "Delhi");
    }

    #[test]
    fn tips_cover_the_ten_largest_cities() {
        let with_tips = all_cities().iter().filter(|c| c.tip.is_some()).count();
        assert_eq!(with_tips, 10);
        assert!(find_city("Surat").unwrap().tip.is_none());
        assert!(find_city("Atlantis").is_none());
    }
}

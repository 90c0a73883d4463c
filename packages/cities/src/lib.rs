#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Cities known to the dashboard.
//!
//! The registry is embedded at compile time from `cities/cities.toml`.
//! On top of it this crate offers nearest-city lookup by coordinates and
//! a fetcher for live weather, air quality and population figures.

pub mod metrics;
pub mod registry;
pub mod retry;

use serde::Serialize;

pub use registry::{City, all_cities, default_city, find_city};

/// Mean Earth radius used for great-circle distances, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Errors that can occur during city operations.
#[derive(Debug, thiserror::Error)]
pub enum CitiesError {
    /// The city is not in the registry.
    #[error("City not found: {name}")]
    UnknownCity {
        /// The requested name.
        name: String,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The upstream API answered with an unusable status.
    #[error("Upstream error: {message}")]
    Upstream {
        /// Description of what went wrong.
        message: String,
    },
}

/// Great-circle distance between two points, in kilometres.
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// A registry city together with its distance from a query point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestCity {
    /// The closest city.
    pub city: City,
    /// Distance from the query point, in kilometres.
    pub distance_km: f64,
}

/// Finds the registry city closest to `(lat, lon)`.
///
/// Returns `None` only if the registry is empty or the coordinates are
/// not finite.
#[must_use]
pub fn nearest_city(lat: f64, lon: f64) -> Option<NearestCity> {
    if !lat.is_finite() || !lon.is_finite() {
        return None;
    }
    all_cities()
        .into_iter()
        .map(|city| {
            let distance_km = haversine_km(lat, lon, city.lat, city.lon);
            NearestCity { city, distance_km }
        })
        .min_by(|a, b| a.distance_km.total_cmp(&b.distance_km))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_to_self() {
        assert!(haversine_km(28.6139, 77.2090, 28.6139, 77.2090).abs() < 1e-9);
    }

    #[test]
    fn delhi_to_mumbai_is_about_1150_km() {
        let d = haversine_km(28.6139, 77.2090, 19.0760, 72.8777);
        assert!((1140.0..1160.0).contains(&d), "got {d}");
    }

    #[test]
    fn nearest_city_to_noida_is_ghaziabad_or_delhi() {
        let nearest = nearest_city(28.5355, 77.3910).unwrap();
        assert!(
            ["Ghaziabad", "Delhi"].contains(&nearest.city.name.as_str()),
            "got {}",
            nearest.city.name
        );
        assert!(nearest.distance_km < 25.0);
    }

    #[test]
    fn nearest_city_at_registry_point_is_that_city() {
        let nearest = nearest_city(18.5204, 73.8567).unwrap();
        assert_eq!(nearest.city.name, "Pune");
        assert!(nearest.distance_km < 1e-6);
    }

    #[test]
    fn rejects_non_finite_coordinates() {
        assert!(nearest_city(f64::NAN, 77.0).is_none());
    }
}

//! Live metrics for a city: weather, air quality and population.
//!
//! Each figure comes from a different public API. A missing API key or a
//! failed request leaves that figure empty and never fails the whole
//! lookup.

use serde::Serialize;

use crate::{CitiesError, City, find_city, retry};

const OPENWEATHERMAP_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const WAQI_URL: &str = "https://api.waqi.info/feed";
const GEODB_HOST: &str = "wft-geo-db.p.rapidapi.com";
const GEODB_RADIUS_KM: u32 = 50;

/// API keys for the metrics providers.
#[derive(Debug, Clone, Default)]
pub struct MetricsConfig {
    /// `OpenWeatherMap` key (`OPENWEATHERMAP_API_KEY`).
    pub openweathermap_key: Option<String>,
    /// World Air Quality Index token (`WAQI_API_KEY`).
    pub waqi_key: Option<String>,
    /// `RapidAPI` key for `GeoDB` (`RAPIDAPI_KEY`).
    pub rapidapi_key: Option<String>,
}

impl MetricsConfig {
    /// Reads keys from the environment. Blank values count as unset.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            openweathermap_key: var("OPENWEATHERMAP_API_KEY"),
            waqi_key: var("WAQI_API_KEY"),
            rapidapi_key: var("RAPIDAPI_KEY"),
        }
    }
}

/// Metrics for one city. `None` means the figure is unavailable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityMetrics {
    /// City name.
    pub city: String,
    /// Temperature in degrees Celsius.
    pub temperature: Option<f64>,
    /// Relative humidity in percent.
    pub humidity: Option<f64>,
    /// Air quality index.
    pub aqi: Option<i64>,
    /// Population.
    pub population: Option<u64>,
    /// Local advice.
    pub tips: Vec<String>,
}

/// Extracts `(temperature, humidity)` from an `OpenWeatherMap` response.
#[must_use]
pub fn parse_weather(body: &serde_json::Value) -> (Option<f64>, Option<f64>) {
    let main = &body["main"];
    (main["temp"].as_f64(), main["humidity"].as_f64())
}

/// Extracts the AQI from a WAQI response. Requires `status == "ok"` and a
/// numeric `data.aqi` (WAQI reports `"-"` when a station has no reading).
#[must_use]
pub fn parse_aqi(body: &serde_json::Value) -> Option<i64> {
    if body["status"].as_str() != Some("ok") {
        return None;
    }
    body["data"]["aqi"].as_i64()
}

/// Extracts the population of the first `GeoDB` match.
#[must_use]
pub fn parse_population(body: &serde_json::Value) -> Option<u64> {
    body["data"]
        .as_array()?
        .first()?
        .get("population")?
        .as_u64()
        .filter(|p| *p > 0)
}

async fn fetch_weather(
    client: &reqwest::Client,
    city: &City,
    key: &str,
) -> Result<(Option<f64>, Option<f64>), CitiesError> {
    let lat = city.lat.to_string();
    let lon = city.lon.to_string();
    let body = retry::send_json(|| {
        client.get(OPENWEATHERMAP_URL).query(&[
            ("lat", lat.as_str()),
            ("lon", lon.as_str()),
            ("appid", key),
            ("units", "metric"),
        ])
    })
    .await?;
    Ok(parse_weather(&body))
}

async fn fetch_aqi(
    client: &reqwest::Client,
    city: &City,
    token: &str,
) -> Result<Option<i64>, CitiesError> {
    let url = format!("{WAQI_URL}/geo:{};{}/", city.lat, city.lon);
    let body = retry::send_json(|| client.get(&url).query(&[("token", token)])).await?;
    Ok(parse_aqi(&body))
}

async fn fetch_population(
    client: &reqwest::Client,
    city: &City,
    key: &str,
) -> Result<Option<u64>, CitiesError> {
    let url = format!("https://{GEODB_HOST}/v1/geo/cities");
    let lat = city.lat.to_string();
    let lon = city.lon.to_string();
    let radius = GEODB_RADIUS_KM.to_string();
    let body = retry::send_json(|| {
        client
            .get(&url)
            .query(&[
                ("latitude", lat.as_str()),
                ("longitude", lon.as_str()),
                ("radius", radius.as_str()),
                ("limit", "1"),
            ])
            .header("X-RapidAPI-Key", key)
            .header("X-RapidAPI-Host", GEODB_HOST)
    })
    .await?;
    Ok(parse_population(&body))
}

fn unavailable<T>(what: &str, city: &str, result: Result<Option<T>, CitiesError>) -> Option<T> {
    result.unwrap_or_else(|e| {
        log::warn!("{what} unavailable for {city}: {e}");
        None
    })
}

/// Fetches weather, AQI and population for a registered city.
///
/// The three lookups run one after another. Figures whose key is missing
/// or whose request fails are left as `None`.
///
/// # Errors
///
/// Returns [`CitiesError::UnknownCity`] if `name` is not in the registry.
pub async fn fetch_city_metrics(
    client: &reqwest::Client,
    name: &str,
    config: &MetricsConfig,
) -> Result<CityMetrics, CitiesError> {
    let city = find_city(name).ok_or_else(|| CitiesError::UnknownCity {
        name: name.to_string(),
    })?;

    let (temperature, humidity) = match &config.openweathermap_key {
        Some(key) => fetch_weather(client, &city, key).await.unwrap_or_else(|e| {
            log::warn!("Weather unavailable for {name}: {e}");
            (None, None)
        }),
        None => {
            log::warn!("OPENWEATHERMAP_API_KEY not set; skipping weather");
            (None, None)
        }
    };

    let aqi = match &config.waqi_key {
        Some(token) => unavailable("AQI", name, fetch_aqi(client, &city, token).await),
        None => {
            log::warn!("WAQI_API_KEY not set; skipping AQI");
            None
        }
    };

    let population = match &config.rapidapi_key {
        Some(key) => unavailable(
            "Population",
            name,
            fetch_population(client, &city, key).await,
        ),
        None => {
            log::warn!("RAPIDAPI_KEY not set; skipping population");
            None
        }
    };

    log::debug!(
        "Metrics for {name}: temperature={temperature:?} humidity={humidity:?} \
         aqi={aqi:?} population={population:?}"
    );

    Ok(CityMetrics {
        city: city.name,
        temperature,
        humidity,
        aqi,
        population,
        tips: city.tip.into_iter().collect(),
    })
}

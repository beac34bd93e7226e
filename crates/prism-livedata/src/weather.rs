//! Current conditions and forecasts with provider fallback.
//!
//! Tomorrow.io is the primary provider; Open-Meteo is the fallback.
//! Both are normalized onto one snapshot schema, with Open-Meteo's WMO
//! condition codes mapped onto the canonical code space. Invalid
//! locations are geocoded and retried against the primary before
//! falling back.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::codes::canonical_code;
use crate::geocode::{parse_latlon, Coordinates, Geocoder};

const WEATHER_TIMEOUT: Duration = Duration::from_secs(8);

pub const DEFAULT_TOMORROW_URL: &str = "https://api.tomorrow.io/v4";
pub const DEFAULT_OPENMETEO_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Represents an error from the weather layer.
#[derive(Error, Debug)]
pub enum WeatherError {
    /// The primary provider credential is absent.
    #[error("weather API key is not configured")]
    MissingApiKey,

    #[error("location is required (e.g., 'City, Country' or 'lat,lon')")]
    MissingLocation,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("weather API error: {status} {body}")]
    Api { status: u16, body: String },

    #[error("bad weather response: {0}")]
    Decode(String),
}

/// Display labels for the unit system in effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitLabels {
    pub temp: String,
    pub speed: String,
}

fn unit_labels(units: &str) -> UnitLabels {
    if units == "imperial" {
        UnitLabels { temp: "°F".to_string(), speed: "mph".to_string() }
    } else {
        UnitLabels { temp: "°C".to_string(), speed: "km/h".to_string() }
    }
}

/// Normalized current-conditions snapshot, identical for both
/// providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub location: String,
    pub observed_at: Option<String>,
    pub units: String,
    pub temperature: Option<f64>,
    #[serde(rename = "temperatureApparent")]
    pub temperature_apparent: Option<f64>,
    pub humidity: Option<f64>,
    #[serde(rename = "windSpeed")]
    pub wind_speed: Option<f64>,
    #[serde(rename = "weatherCode")]
    pub weather_code: Option<i64>,
    #[serde(rename = "precipitationIntensity")]
    pub precipitation_intensity: Option<f64>,
    #[serde(rename = "uvIndex")]
    pub uv_index: Option<f64>,
    pub visibility: Option<f64>,
    pub labels: UnitLabels,
    /// `lat,lon` actually queried, when geocoding resolved the input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_location: Option<String>,
    /// Human-readable name of the resolved place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_label: Option<String>,
}

/// One day of forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecast {
    pub date: Option<String>,
    pub temperature_max: Option<f64>,
    pub temperature_min: Option<f64>,
    pub precipitation_probability_avg: Option<f64>,
    pub wind_speed_avg: Option<f64>,
    pub weather_code_max: Option<i64>,
    pub sunrise_time: Option<String>,
    pub sunset_time: Option<String>,
    pub uv_index_max: Option<f64>,
}

/// One hour of forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyForecast {
    pub time: Option<String>,
    pub temperature: Option<f64>,
    pub temperature_apparent: Option<f64>,
    pub precipitation_probability: Option<f64>,
    pub wind_speed: Option<f64>,
    pub weather_code: Option<i64>,
}

/// Weather client configuration; URLs are overridable for tests.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub default_units: String,
    pub geocode_fallback: bool,
    pub open_meteo_url: String,
    pub cache_ttl: Duration,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_TOMORROW_URL.to_string(),
            default_units: "metric".to_string(),
            geocode_fallback: true,
            open_meteo_url: DEFAULT_OPENMETEO_URL.to_string(),
            cache_ttl: Duration::from_secs(180),
        }
    }
}

// Tomorrow.io wire structures
#[derive(Deserialize, Default)]
struct TomorrowRealtime {
    #[serde(default)]
    data: TomorrowRealtimeData,
}

#[derive(Deserialize, Default)]
struct TomorrowRealtimeData {
    time: Option<String>,
    #[serde(default)]
    values: TomorrowValues,
}

#[derive(Deserialize, Default)]
struct TomorrowValues {
    temperature: Option<f64>,
    #[serde(rename = "temperatureApparent")]
    temperature_apparent: Option<f64>,
    humidity: Option<f64>,
    #[serde(rename = "windSpeed")]
    wind_speed: Option<f64>,
    #[serde(rename = "weatherCode")]
    weather_code: Option<i64>,
    #[serde(rename = "rainIntensity")]
    rain_intensity: Option<f64>,
    #[serde(rename = "precipitationIntensity")]
    precipitation_intensity: Option<f64>,
    #[serde(rename = "uvIndex")]
    uv_index: Option<f64>,
    visibility: Option<f64>,
}

#[derive(Deserialize, Default)]
struct TomorrowForecast {
    #[serde(default)]
    timelines: TomorrowTimelines,
}

#[derive(Deserialize, Default)]
struct TomorrowTimelines {
    #[serde(default)]
    daily: Vec<TomorrowDailyInterval>,
    #[serde(default)]
    hourly: Vec<TomorrowHourlyInterval>,
}

#[derive(Deserialize, Default)]
struct TomorrowDailyInterval {
    time: Option<String>,
    #[serde(default)]
    values: TomorrowDailyValues,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct TomorrowDailyValues {
    temperature_max: Option<f64>,
    temperature_min: Option<f64>,
    precipitation_probability_avg: Option<f64>,
    wind_speed_avg: Option<f64>,
    weather_code_max: Option<i64>,
    sunrise_time: Option<String>,
    sunset_time: Option<String>,
    uv_index_max: Option<f64>,
}

#[derive(Deserialize, Default)]
struct TomorrowHourlyInterval {
    time: Option<String>,
    #[serde(default)]
    values: TomorrowHourlyValues,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct TomorrowHourlyValues {
    temperature: Option<f64>,
    temperature_apparent: Option<f64>,
    precipitation_probability: Option<f64>,
    wind_speed: Option<f64>,
    weather_code: Option<i64>,
}

// Open-Meteo wire structures
#[derive(Deserialize, Default)]
struct OpenMeteoRealtime {
    #[serde(default)]
    current: OpenMeteoCurrent,
}

#[derive(Deserialize, Default)]
struct OpenMeteoCurrent {
    time: Option<String>,
    temperature_2m: Option<f64>,
    apparent_temperature: Option<f64>,
    relative_humidity_2m: Option<f64>,
    wind_speed_10m: Option<f64>,
    weather_code: Option<i64>,
    uv_index: Option<f64>,
    visibility: Option<f64>,
}

#[derive(Deserialize, Default)]
struct OpenMeteoDailyResponse {
    #[serde(default)]
    daily: OpenMeteoDailyBlock,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct OpenMeteoDailyBlock {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_probability_max: Vec<Option<f64>>,
    wind_speed_10m_max: Vec<Option<f64>>,
    weather_code: Vec<Option<i64>>,
    sunrise: Vec<Option<String>>,
    sunset: Vec<Option<String>>,
    uv_index_max: Vec<Option<f64>>,
}

#[derive(Deserialize, Default)]
struct OpenMeteoHourlyResponse {
    #[serde(default)]
    hourly: OpenMeteoHourlyBlock,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct OpenMeteoHourlyBlock {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    apparent_temperature: Vec<Option<f64>>,
    precipitation_probability: Vec<Option<f64>>,
    wind_speed_10m: Vec<Option<f64>>,
    weather_code: Vec<Option<i64>>,
}

fn open_meteo_units(units: &str) -> (&'static str, &'static str) {
    if units == "imperial" {
        ("fahrenheit", "mph")
    } else {
        ("celsius", "kmh")
    }
}

/// Weather client over the primary/fallback provider pair.
pub struct WeatherClient {
    cfg: WeatherConfig,
    geocoder: Geocoder,
    http: Client,
    current: TtlCache<(String, String), CurrentConditions>,
    daily: TtlCache<(String, String, usize), Vec<DailyForecast>>,
    hourly: TtlCache<(String, String, usize), Vec<HourlyForecast>>,
}

impl WeatherClient {
    pub fn new(cfg: WeatherConfig, geocoder: Geocoder) -> Self {
        let ttl = cfg.cache_ttl;
        Self {
            cfg,
            geocoder,
            http: Client::new(),
            current: TtlCache::new(ttl),
            daily: TtlCache::new(ttl),
            hourly: TtlCache::new(ttl),
        }
    }

    fn units_or_default(&self, units: Option<&str>) -> String {
        units
            .map(str::to_lowercase)
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.cfg.default_units.clone())
    }

    fn realtime_url(&self) -> String {
        format!("{}/weather/realtime", self.cfg.base_url.trim_end_matches('/'))
    }

    fn forecast_url(&self) -> String {
        format!("{}/weather/forecast", self.cfg.base_url.trim_end_matches('/'))
    }

    async fn coords_for(&self, location: &str) -> Option<Coordinates> {
        if let Some((lat, lon)) = parse_latlon(location) {
            return Some(Coordinates { lat, lon, label: None });
        }
        self.geocoder.resolve(location).await
    }

    /// Current conditions for a place name or `lat,lon`.
    pub async fn realtime(
        &self,
        location: &str,
        units: Option<&str>,
    ) -> Result<CurrentConditions, WeatherError> {
        let api_key = self.cfg.api_key.clone().ok_or(WeatherError::MissingApiKey)?;
        let location = location.trim();
        if location.is_empty() {
            return Err(WeatherError::MissingLocation);
        }
        let units = self.units_or_default(units);
        let key = (location.to_lowercase(), units.clone());
        if let Some(hit) = self.current.get(&key) {
            debug!(location = %location, "realtime cache hit");
            return Ok(hit);
        }

        let url = self.realtime_url();
        let resp = self
            .http
            .get(&url)
            .timeout(WEATHER_TIMEOUT)
            .query(&[("location", location), ("units", units.as_str()), ("apikey", api_key.as_str())])
            .send()
            .await;

        let resp = match resp {
            Ok(resp) => resp,
            Err(e) => {
                if let Some(fallback) = self.open_meteo_realtime(location, &units).await {
                    self.current.insert(key, fallback.clone());
                    return Ok(fallback);
                }
                return Err(WeatherError::Connection(e.to_string()));
            }
        };

        let status = resp.status();
        if status.is_success() {
            let parsed: TomorrowRealtime =
                resp.json().await.map_err(|e| WeatherError::Decode(e.to_string()))?;
            let result = normalize_tomorrow_realtime(location, &units, parsed, None);
            self.current.insert(key, result.clone());
            return Ok(result);
        }

        // Invalid-location rejections often geocode fine; retry the
        // primary with resolved coordinates before giving up on it.
        if self.cfg.geocode_fallback && status.as_u16() == 400 {
            if let Some(coords) = self.geocoder.resolve(location).await {
                let resolved = format!("{},{}", coords.lat, coords.lon);
                let retry = self
                    .http
                    .get(&url)
                    .timeout(WEATHER_TIMEOUT)
                    .query(&[
                        ("location", resolved.as_str()),
                        ("units", units.as_str()),
                        ("apikey", api_key.as_str()),
                    ])
                    .send()
                    .await;
                if let Ok(retry) = retry {
                    if retry.status().is_success() {
                        let parsed: TomorrowRealtime =
                            retry.json().await.map_err(|e| WeatherError::Decode(e.to_string()))?;
                        let result = normalize_tomorrow_realtime(
                            location,
                            &units,
                            parsed,
                            Some((resolved, coords.label)),
                        );
                        self.current.insert(key, result.clone());
                        return Ok(result);
                    }
                }
            }
        }

        if let Some(fallback) = self.open_meteo_realtime(location, &units).await {
            self.current.insert(key, fallback.clone());
            return Ok(fallback);
        }
        let body = resp.text().await.unwrap_or_default();
        warn!(location = %location, status = status.as_u16(), "realtime weather failed");
        Err(WeatherError::Api { status: status.as_u16(), body })
    }

    /// Daily forecast. No geocode retry here: callers pass the location
    /// already resolved by a realtime call.
    pub async fn forecast_daily(
        &self,
        location: &str,
        units: Option<&str>,
        days: usize,
    ) -> Result<Vec<DailyForecast>, WeatherError> {
        let api_key = self.cfg.api_key.clone().ok_or(WeatherError::MissingApiKey)?;
        let location = location.trim();
        if location.is_empty() {
            return Err(WeatherError::MissingLocation);
        }
        let units = self.units_or_default(units);
        let days = days.max(1);
        let key = (location.to_lowercase(), units.clone(), days);
        if let Some(hit) = self.daily.get(&key) {
            return Ok(hit);
        }

        let resp = self
            .http
            .get(self.forecast_url())
            .timeout(WEATHER_TIMEOUT)
            .query(&[
                ("location", location),
                ("units", units.as_str()),
                ("timesteps", "1d"),
                ("apikey", api_key.as_str()),
            ])
            .send()
            .await;

        let resp = match resp {
            Ok(resp) => resp,
            Err(e) => {
                if let Some(fallback) = self.open_meteo_daily(location, &units, days).await {
                    self.daily.insert(key, fallback.clone());
                    return Ok(fallback);
                }
                return Err(WeatherError::Connection(e.to_string()));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            if let Some(fallback) = self.open_meteo_daily(location, &units, days).await {
                self.daily.insert(key, fallback.clone());
                return Ok(fallback);
            }
            let body = resp.text().await.unwrap_or_default();
            return Err(WeatherError::Api { status: status.as_u16(), body });
        }

        let parsed: TomorrowForecast =
            resp.json().await.map_err(|e| WeatherError::Decode(e.to_string()))?;
        let out: Vec<DailyForecast> = parsed
            .timelines
            .daily
            .into_iter()
            .take(days)
            .map(|interval| DailyForecast {
                date: interval.time,
                temperature_max: interval.values.temperature_max,
                temperature_min: interval.values.temperature_min,
                precipitation_probability_avg: interval.values.precipitation_probability_avg,
                wind_speed_avg: interval.values.wind_speed_avg,
                weather_code_max: interval.values.weather_code_max,
                sunrise_time: interval.values.sunrise_time,
                sunset_time: interval.values.sunset_time,
                uv_index_max: interval.values.uv_index_max,
            })
            .collect();
        self.daily.insert(key, out.clone());
        Ok(out)
    }

    /// Hourly forecast for the next `hours` hours.
    pub async fn forecast_hourly(
        &self,
        location: &str,
        units: Option<&str>,
        hours: usize,
    ) -> Result<Vec<HourlyForecast>, WeatherError> {
        let api_key = self.cfg.api_key.clone().ok_or(WeatherError::MissingApiKey)?;
        let location = location.trim();
        if location.is_empty() {
            return Err(WeatherError::MissingLocation);
        }
        let units = self.units_or_default(units);
        let hours = hours.max(1);
        let key = (location.to_lowercase(), units.clone(), hours);
        if let Some(hit) = self.hourly.get(&key) {
            return Ok(hit);
        }

        let resp = self
            .http
            .get(self.forecast_url())
            .timeout(WEATHER_TIMEOUT)
            .query(&[
                ("location", location),
                ("units", units.as_str()),
                ("timesteps", "1h"),
                ("apikey", api_key.as_str()),
            ])
            .send()
            .await;

        let resp = match resp {
            Ok(resp) => resp,
            Err(e) => {
                if let Some(fallback) = self.open_meteo_hourly(location, &units, hours).await {
                    self.hourly.insert(key, fallback.clone());
                    return Ok(fallback);
                }
                return Err(WeatherError::Connection(e.to_string()));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            if let Some(fallback) = self.open_meteo_hourly(location, &units, hours).await {
                self.hourly.insert(key, fallback.clone());
                return Ok(fallback);
            }
            let body = resp.text().await.unwrap_or_default();
            return Err(WeatherError::Api { status: status.as_u16(), body });
        }

        let parsed: TomorrowForecast =
            resp.json().await.map_err(|e| WeatherError::Decode(e.to_string()))?;
        let out: Vec<HourlyForecast> = parsed
            .timelines
            .hourly
            .into_iter()
            .take(hours)
            .map(|interval| HourlyForecast {
                time: interval.time,
                temperature: interval.values.temperature,
                temperature_apparent: interval.values.temperature_apparent,
                precipitation_probability: interval.values.precipitation_probability,
                wind_speed: interval.values.wind_speed,
                weather_code: interval.values.weather_code,
            })
            .collect();
        self.hourly.insert(key, out.clone());
        Ok(out)
    }

    async fn open_meteo_realtime(&self, location: &str, units: &str) -> Option<CurrentConditions> {
        let coords = self.coords_for(location).await?;
        let (temp_unit, wind_unit) = open_meteo_units(units);
        let resp = self
            .http
            .get(&self.cfg.open_meteo_url)
            .timeout(WEATHER_TIMEOUT)
            .query(&[
                ("latitude", coords.lat.as_str()),
                ("longitude", coords.lon.as_str()),
                (
                    "current",
                    "temperature_2m,apparent_temperature,relative_humidity_2m,wind_speed_10m,weather_code,uv_index,visibility",
                ),
                ("temperature_unit", temp_unit),
                ("windspeed_unit", wind_unit),
                ("forecast_days", "1"),
            ])
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let parsed: OpenMeteoRealtime = resp.json().await.ok()?;
        let cur = parsed.current;
        Some(CurrentConditions {
            location: location.to_string(),
            observed_at: cur.time,
            units: units.to_string(),
            temperature: cur.temperature_2m,
            temperature_apparent: cur.apparent_temperature,
            humidity: cur.relative_humidity_2m,
            wind_speed: cur.wind_speed_10m,
            weather_code: cur.weather_code.and_then(canonical_code),
            precipitation_intensity: None,
            uv_index: cur.uv_index,
            visibility: cur.visibility,
            labels: unit_labels(units),
            resolved_location: Some(format!("{},{}", coords.lat, coords.lon)),
            resolved_label: coords.label,
        })
    }

    async fn open_meteo_daily(
        &self,
        location: &str,
        units: &str,
        days: usize,
    ) -> Option<Vec<DailyForecast>> {
        let coords = self.coords_for(location).await?;
        let (temp_unit, wind_unit) = open_meteo_units(units);
        let forecast_days = days.to_string();
        let resp = self
            .http
            .get(&self.cfg.open_meteo_url)
            .timeout(WEATHER_TIMEOUT)
            .query(&[
                ("latitude", coords.lat.as_str()),
                ("longitude", coords.lon.as_str()),
                (
                    "daily",
                    "weather_code,temperature_2m_max,temperature_2m_min,precipitation_probability_max,wind_speed_10m_max,sunrise,sunset,uv_index_max",
                ),
                ("temperature_unit", temp_unit),
                ("windspeed_unit", wind_unit),
                ("forecast_days", forecast_days.as_str()),
            ])
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let parsed: OpenMeteoDailyResponse = resp.json().await.ok()?;
        let block = parsed.daily;
        let out = block
            .time
            .iter()
            .enumerate()
            .map(|(i, t)| DailyForecast {
                date: Some(t.clone()),
                temperature_max: block.temperature_2m_max.get(i).copied().flatten(),
                temperature_min: block.temperature_2m_min.get(i).copied().flatten(),
                precipitation_probability_avg: block
                    .precipitation_probability_max
                    .get(i)
                    .copied()
                    .flatten(),
                wind_speed_avg: block.wind_speed_10m_max.get(i).copied().flatten(),
                weather_code_max: block
                    .weather_code
                    .get(i)
                    .copied()
                    .flatten()
                    .and_then(canonical_code),
                sunrise_time: block.sunrise.get(i).cloned().flatten(),
                sunset_time: block.sunset.get(i).cloned().flatten(),
                uv_index_max: block.uv_index_max.get(i).copied().flatten(),
            })
            .collect();
        Some(out)
    }

    async fn open_meteo_hourly(
        &self,
        location: &str,
        units: &str,
        hours: usize,
    ) -> Option<Vec<HourlyForecast>> {
        let coords = self.coords_for(location).await?;
        let (temp_unit, wind_unit) = open_meteo_units(units);
        let resp = self
            .http
            .get(&self.cfg.open_meteo_url)
            .timeout(WEATHER_TIMEOUT)
            .query(&[
                ("latitude", coords.lat.as_str()),
                ("longitude", coords.lon.as_str()),
                (
                    "hourly",
                    "weather_code,temperature_2m,apparent_temperature,precipitation_probability,wind_speed_10m",
                ),
                ("temperature_unit", temp_unit),
                ("windspeed_unit", wind_unit),
                ("forecast_days", "1"),
            ])
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let parsed: OpenMeteoHourlyResponse = resp.json().await.ok()?;
        let block = parsed.hourly;
        let out = block
            .time
            .iter()
            .take(hours)
            .enumerate()
            .map(|(i, t)| HourlyForecast {
                time: Some(t.clone()),
                temperature: block.temperature_2m.get(i).copied().flatten(),
                temperature_apparent: block.apparent_temperature.get(i).copied().flatten(),
                precipitation_probability: block
                    .precipitation_probability
                    .get(i)
                    .copied()
                    .flatten(),
                wind_speed: block.wind_speed_10m.get(i).copied().flatten(),
                weather_code: block
                    .weather_code
                    .get(i)
                    .copied()
                    .flatten()
                    .and_then(canonical_code),
            })
            .collect();
        Some(out)
    }
}

fn normalize_tomorrow_realtime(
    location: &str,
    units: &str,
    parsed: TomorrowRealtime,
    resolved: Option<(String, Option<String>)>,
) -> CurrentConditions {
    let values = parsed.data.values;
    let (resolved_location, resolved_label) = match resolved {
        Some((loc, label)) => (Some(loc), label),
        None => (None, None),
    };
    CurrentConditions {
        location: location.to_string(),
        observed_at: parsed.data.time,
        units: units.to_string(),
        temperature: values.temperature,
        temperature_apparent: values.temperature_apparent,
        humidity: values.humidity,
        wind_speed: values.wind_speed,
        weather_code: values.weather_code,
        precipitation_intensity: values.rain_intensity.or(values.precipitation_intensity),
        uv_index: values.uv_index,
        visibility: values.visibility,
        labels: unit_labels(units),
        resolved_location,
        resolved_label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_labels_follow_the_unit_system() {
        assert_eq!(unit_labels("metric").temp, "°C");
        assert_eq!(unit_labels("metric").speed, "km/h");
        assert_eq!(unit_labels("imperial").temp, "°F");
        assert_eq!(unit_labels("imperial").speed, "mph");
    }

    #[test]
    fn rain_intensity_wins_over_precipitation_intensity() {
        let parsed = TomorrowRealtime {
            data: TomorrowRealtimeData {
                time: Some("2026-08-06T12:00:00Z".to_string()),
                values: TomorrowValues {
                    rain_intensity: Some(1.5),
                    precipitation_intensity: Some(0.2),
                    ..TomorrowValues::default()
                },
            },
        };
        let snapshot = normalize_tomorrow_realtime("Boston", "metric", parsed, None);
        assert_eq!(snapshot.precipitation_intensity, Some(1.5));
        assert_eq!(snapshot.resolved_location, None);
    }

    #[test]
    fn snapshot_serializes_with_wire_casing() {
        let parsed = TomorrowRealtime::default();
        let snapshot = normalize_tomorrow_realtime(
            "Boston",
            "metric",
            parsed,
            Some(("42.36,-71.05".to_string(), Some("Boston, Suffolk".to_string()))),
        );
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("temperatureApparent").is_some());
        assert!(json.get("windSpeed").is_some());
        assert_eq!(json["resolved_location"], "42.36,-71.05");
        assert_eq!(json["labels"]["temp"], "°C");
    }
}

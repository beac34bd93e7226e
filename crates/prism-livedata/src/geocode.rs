//! Place-name resolution with a fallback provider chain.
//!
//! Best-effort: every failure degrades to `None` and the caller decides
//! whether missing coordinates are fatal.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const GEOCODE_TIMEOUT: Duration = Duration::from_secs(10);

static LATLON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(-?\d+\.?\d*)\s*,\s*(-?\d+\.?\d*)").expect("valid lat,lon regex")
});

// Trailing time qualifiers people append to place phrases, e.g.
// "denver today" or "paris this weekend".
static TIME_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:today|now|tonight|tomorrow|this\s+(?:morning|afternoon|evening|week|weekend))\b\s*$",
    )
    .expect("valid time-suffix regex")
});

/// Resolved coordinates plus the provider's display label when one was
/// available. Lat/lon stay strings; they are only ever re-embedded in
/// query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub lat: String,
    pub lon: String,
    pub label: Option<String>,
}

/// Extracts an explicit `lat,lon` pair from free text.
#[must_use]
pub fn parse_latlon(text: &str) -> Option<(String, String)> {
    LATLON_RE
        .captures(text)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
}

/// Strips a trailing time qualifier ("today", "this weekend", ...) and
/// surrounding punctuation from a location phrase.
#[must_use]
pub fn strip_time_suffix(text: &str) -> String {
    let trimmed = text.trim().trim_matches(|c: char| ",;:. ".contains(c));
    let stripped = TIME_SUFFIX_RE.replace(trimmed, "");
    stripped.trim().trim_matches(|c: char| ",;:. ".contains(c)).to_string()
}

/// One geocoding backend in the fallback chain.
#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Resolves a place name; `None` on any failure.
    async fn resolve(&self, query: &str) -> Option<Coordinates>;
}

/// OSM-backed geocoder (maps.co).
pub struct OsmGeocoder {
    url: String,
    client: Client,
}

impl OsmGeocoder {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), client: Client::new() }
    }
}

#[derive(Deserialize)]
struct OsmPlace {
    lat: Option<serde_json::Value>,
    lon: Option<serde_json::Value>,
    display_name: Option<String>,
    name: Option<String>,
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl GeocodeProvider for OsmGeocoder {
    fn name(&self) -> &'static str {
        "osm"
    }

    async fn resolve(&self, query: &str) -> Option<Coordinates> {
        let resp = self
            .client
            .get(&self.url)
            .timeout(GEOCODE_TIMEOUT)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let places: Vec<OsmPlace> = resp.json().await.ok()?;
        let first = places.into_iter().next()?;
        let lat = first.lat.as_ref().and_then(scalar_to_string)?;
        let lon = first.lon.as_ref().and_then(scalar_to_string)?;
        let label = first.display_name.or(first.name).or_else(|| Some(query.to_string()));
        Some(Coordinates { lat, lon, label })
    }
}

/// Open-Meteo's keyless geocoding endpoint.
pub struct OpenMeteoGeocoder {
    url: String,
    client: Client,
}

impl OpenMeteoGeocoder {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), client: Client::new() }
    }
}

#[derive(Deserialize, Default)]
struct OpenMeteoGeoResponse {
    #[serde(default)]
    results: Vec<OpenMeteoGeoResult>,
}

#[derive(Deserialize)]
struct OpenMeteoGeoResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
    name: Option<String>,
    admin1: Option<String>,
    country: Option<String>,
}

#[async_trait]
impl GeocodeProvider for OpenMeteoGeocoder {
    fn name(&self) -> &'static str {
        "open-meteo"
    }

    async fn resolve(&self, query: &str) -> Option<Coordinates> {
        let resp = self
            .client
            .get(&self.url)
            .timeout(GEOCODE_TIMEOUT)
            .query(&[("name", query), ("count", "1"), ("language", "en")])
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let parsed: OpenMeteoGeoResponse = resp.json().await.ok()?;
        let first = parsed.results.into_iter().next()?;
        let (lat, lon) = (first.latitude?, first.longitude?);
        let label_parts: Vec<String> = [first.name, first.admin1, first.country]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();
        let label =
            if label_parts.is_empty() { Some(query.to_string()) } else { Some(label_parts.join(", ")) };
        Some(Coordinates { lat: lat.to_string(), lon: lon.to_string(), label })
    }
}

/// Ordered geocoder chain; first provider to yield coordinates wins.
pub struct Geocoder {
    providers: Vec<Box<dyn GeocodeProvider>>,
}

impl Geocoder {
    pub fn new(providers: Vec<Box<dyn GeocodeProvider>>) -> Self {
        Self { providers }
    }

    /// Resolves a place name to coordinates, normalizing trailing time
    /// words first so queries like "denver today" still resolve.
    pub async fn resolve(&self, query: &str) -> Option<Coordinates> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return None;
        }
        let normalized = strip_time_suffix(trimmed);
        let query = if normalized.is_empty() { trimmed } else { normalized.as_str() };

        for provider in &self.providers {
            if let Some(coords) = provider.resolve(query).await {
                debug!(provider = provider.name(), query = %query, "geocoded location");
                return Some(coords);
            }
        }
        None
    }
}

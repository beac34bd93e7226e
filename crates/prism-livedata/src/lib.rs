//! Live-data clients for Prism: web search, weather and geocoding.
//!
//! Each client normalizes provider-specific payloads onto one schema and
//! falls back across an ordered provider list, so callers never see
//! which upstream actually answered. Responses are TTL-cached
//! per client.

pub mod cache;
pub mod codes;
pub mod geocode;
pub mod search;
pub mod weather;

pub use cache::TtlCache;
pub use codes::canonical_code;
pub use geocode::{
    parse_latlon, strip_time_suffix, Coordinates, GeocodeProvider, Geocoder, OpenMeteoGeocoder,
    OsmGeocoder,
};
pub use search::{
    LangSearchProvider, SearchClient, SearchError, SearchProvider, SearchResult, TavilyProvider,
};
pub use weather::{
    CurrentConditions, DailyForecast, HourlyForecast, UnitLabels, WeatherClient, WeatherConfig,
    WeatherError,
};

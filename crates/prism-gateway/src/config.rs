//! Gateway configuration, assembled from the environment at startup.

use std::net::SocketAddr;
use std::time::Duration;

use prism_livedata::WeatherConfig;
use prism_runtime::DEFAULT_RUNTIME_HOST;

const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_OLLAMA_HOST: &str = "http://ollama-dev:11434";
const DEFAULT_LANGSEARCH_URL: &str = "https://api.langsearch.ai/v1/web-search";
const DEFAULT_TAVILY_URL: &str = "https://api.tavily.com/search";
const DEFAULT_GEOCODE_URL: &str = "https://geocode.maps.co/search";
const DEFAULT_OPENMETEO_GEOCODE_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";

/// Startup-time configuration for the whole gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind: SocketAddr,
    /// Runtime host candidates, configured host first.
    pub runtime_hosts: Vec<String>,
    pub keep_alive: String,
    /// Maximum resident models; zero or negative disables enforcement.
    pub max_loaded_models: i64,
    /// Static model list served when the registry is unreachable.
    pub default_models: Vec<String>,
    pub langsearch_url: String,
    pub langsearch_api_key: Option<String>,
    pub tavily_url: String,
    pub tavily_api_key: Option<String>,
    pub search_cache_ttl: Duration,
    pub weather: WeatherConfig,
    pub geocode_url: String,
    pub open_meteo_geocode_url: String,
}

impl GatewayConfig {
    /// Reads configuration from process environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary lookup, so tests can
    /// supply their own environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let bind = get_or("PRISM_BIND", DEFAULT_BIND)
            .parse()
            .unwrap_or_else(|_| DEFAULT_BIND.parse().expect("valid default bind address"));

        let runtime_hosts = vec![
            get_or("OLLAMA_HOST", DEFAULT_OLLAMA_HOST),
            DEFAULT_RUNTIME_HOST.to_string(),
        ];

        let max_loaded_models =
            get("MAX_LOADED_MODELS").and_then(|v| v.parse().ok()).unwrap_or(2);

        let default_models = split_csv(&get("DEFAULT_MODELS").unwrap_or_default());

        let weather_ttl =
            Duration::from_secs(get("WEATHER_CACHE_SECONDS").and_then(|v| v.parse().ok()).unwrap_or(180));
        let search_ttl =
            Duration::from_secs(get("SEARCH_CACHE_SECONDS").and_then(|v| v.parse().ok()).unwrap_or(180));

        let weather = WeatherConfig {
            api_key: get("TOMORROW_API_KEY"),
            base_url: get_or("TOMORROW_BASE_URL", prism_livedata::weather::DEFAULT_TOMORROW_URL),
            default_units: get_or("TOMORROW_UNITS", "metric").to_lowercase(),
            geocode_fallback: get_or("WEATHER_GEOCODE_FALLBACK", "true").to_lowercase() == "true",
            open_meteo_url: get_or(
                "OPENMETEO_URL",
                prism_livedata::weather::DEFAULT_OPENMETEO_URL,
            ),
            cache_ttl: weather_ttl,
        };

        Self {
            bind,
            runtime_hosts,
            keep_alive: get_or("OLLAMA_KEEP_ALIVE", "5m"),
            max_loaded_models,
            default_models,
            langsearch_url: get_or("LANGSEARCH_API_URL", DEFAULT_LANGSEARCH_URL),
            langsearch_api_key: get("LANGSEARCH_API_KEY"),
            tavily_url: get_or("TAVILY_API_URL", DEFAULT_TAVILY_URL),
            tavily_api_key: get("TAVILY_API_KEY"),
            search_cache_ttl: search_ttl,
            weather,
            geocode_url: get_or("GEOCODE_URL", DEFAULT_GEOCODE_URL),
            open_meteo_geocode_url: get_or("OPENMETEO_GEOCODE_URL", DEFAULT_OPENMETEO_GEOCODE_URL),
        }
    }
}

// Comma-separated list, trimmed and deduplicated with order preserved.
fn split_csv(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in raw.split(',') {
        let candidate = part.trim();
        if !candidate.is_empty() && !out.iter().any(|existing| existing == candidate) {
            out.push(candidate.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> GatewayConfig {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        GatewayConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]);
        assert_eq!(config.bind, DEFAULT_BIND.parse().unwrap());
        assert_eq!(
            config.runtime_hosts,
            vec![DEFAULT_OLLAMA_HOST.to_string(), DEFAULT_RUNTIME_HOST.to_string()]
        );
        assert_eq!(config.max_loaded_models, 2);
        assert_eq!(config.keep_alive, "5m");
        assert!(config.default_models.is_empty());
        assert!(config.langsearch_api_key.is_none());
        assert!(config.weather.geocode_fallback);
        assert_eq!(config.weather.cache_ttl, Duration::from_secs(180));
    }

    #[test]
    fn environment_overrides_take_effect() {
        let config = config_from(&[
            ("OLLAMA_HOST", "http://gpu-box:11434"),
            ("MAX_LOADED_MODELS", "0"),
            ("TOMORROW_API_KEY", "key-123"),
            ("TOMORROW_UNITS", "Imperial"),
            ("WEATHER_CACHE_SECONDS", "30"),
            ("WEATHER_GEOCODE_FALLBACK", "false"),
        ]);
        assert_eq!(config.runtime_hosts[0], "http://gpu-box:11434");
        assert_eq!(config.max_loaded_models, 0);
        assert_eq!(config.weather.api_key.as_deref(), Some("key-123"));
        assert_eq!(config.weather.default_units, "imperial");
        assert_eq!(config.weather.cache_ttl, Duration::from_secs(30));
        assert!(!config.weather.geocode_fallback);
    }

    #[test]
    fn default_models_csv_is_deduplicated_in_order() {
        let config = config_from(&[("DEFAULT_MODELS", "llama3:8b, phi3:mini,llama3:8b, ")]);
        assert_eq!(
            config.default_models,
            vec!["llama3:8b".to_string(), "phi3:mini".to_string()]
        );
    }

    #[test]
    fn unparsable_numbers_fall_back_to_defaults() {
        let config = config_from(&[("MAX_LOADED_MODELS", "lots"), ("WEATHER_CACHE_SECONDS", "soon")]);
        assert_eq!(config.max_loaded_models, 2);
        assert_eq!(config.weather.cache_ttl, Duration::from_secs(180));
    }
}

//! Shared application state, built once at startup and handed to every
//! request task.

use std::sync::Arc;

use prism_livedata::{
    Geocoder, LangSearchProvider, OpenMeteoGeocoder, OsmGeocoder, SearchClient, SearchProvider,
    TavilyProvider, WeatherClient,
};
use prism_runtime::{ResidencyController, RuntimeClient};

use crate::config::GatewayConfig;

/// Everything a request handler needs, dependency-injected so tests can
/// construct isolated instances against mock endpoints.
pub struct AppState {
    pub config: GatewayConfig,
    pub runtime: Arc<RuntimeClient>,
    pub residency: Arc<ResidencyController>,
    pub search: Arc<SearchClient>,
    pub weather: Arc<WeatherClient>,
}

impl AppState {
    /// Wires up clients and the residency controller from
    /// configuration.
    #[must_use]
    pub fn from_config(config: GatewayConfig) -> Self {
        let runtime = Arc::new(RuntimeClient::new(
            config.runtime_hosts.clone(),
            config.keep_alive.clone(),
        ));
        let residency =
            Arc::new(ResidencyController::new(runtime.clone(), config.max_loaded_models));

        // Providers exist only when their credential is configured.
        let mut providers: Vec<Box<dyn SearchProvider>> = Vec::new();
        if let Some(key) = &config.langsearch_api_key {
            providers.push(Box::new(LangSearchProvider::new(config.langsearch_url.clone(), key)));
        }
        if let Some(key) = &config.tavily_api_key {
            providers.push(Box::new(TavilyProvider::new(config.tavily_url.clone(), key)));
        }
        let search = Arc::new(SearchClient::new(providers, config.search_cache_ttl));

        let geocoder = Geocoder::new(vec![
            Box::new(OsmGeocoder::new(config.geocode_url.clone())),
            Box::new(OpenMeteoGeocoder::new(config.open_meteo_geocode_url.clone())),
        ]);
        let weather = Arc::new(WeatherClient::new(config.weather.clone(), geocoder));

        Self { config, runtime, residency, search, weather }
    }
}

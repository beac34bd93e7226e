//! `GET /api/weather`

use hyper::{StatusCode, Uri};

use super::{json_response, query_params, BoxedResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Current conditions plus daily and hourly forecasts for a location.
/// Forecast calls reuse the location resolved by the realtime call.
pub async fn get_weather(state: &AppState, uri: &Uri) -> Result<BoxedResponse, ApiError> {
    let params = query_params(uri);
    let location = params
        .get("location")
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .ok_or_else(|| ApiError::bad_request("location query parameter is required"))?;
    let units = params.get("units").map(String::as_str);

    let current = state
        .weather
        .realtime(location, units)
        .await
        .map_err(|e| ApiError::bad_gateway(e.to_string()))?;
    let forecast_location =
        current.resolved_location.clone().unwrap_or_else(|| location.to_string());

    let daily = state
        .weather
        .forecast_daily(&forecast_location, units, 7)
        .await
        .map_err(|e| ApiError::bad_gateway(e.to_string()))?;
    let hourly = state
        .weather
        .forecast_hourly(&forecast_location, units, 12)
        .await
        .map_err(|e| ApiError::bad_gateway(e.to_string()))?;

    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({
            "weather": { "current": current, "daily": daily, "hourly": hourly }
        }),
    ))
}

//! Request handlers, one module per endpoint group, plus the small
//! shared plumbing for JSON bodies and query strings.

pub mod chat;
pub mod models;
pub mod search;
pub mod training;
pub mod weather;

use std::collections::HashMap;
use std::convert::Infallible;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode, Uri};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub type BoxedResponse = Response<BoxBody<Bytes, Infallible>>;

/// `GET /api/health`
pub fn health() -> Result<BoxedResponse, ApiError> {
    Ok(json_response(StatusCode::OK, &serde_json::json!({ "status": "ok" })))
}

pub(crate) fn json_response(status: StatusCode, value: &serde_json::Value) -> BoxedResponse {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    let mut response = Response::new(Full::new(Bytes::from(bytes)).boxed());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(hyper::header::CONTENT_TYPE, "application/json".parse().expect("valid header"));
    response
}

/// Reads and deserializes a JSON request body; malformed input is a
/// validation error, reported before any downstream call.
pub(crate) async fn read_json<T: DeserializeOwned>(req: Request<Incoming>) -> Result<T, ApiError> {
    let bytes = req
        .into_body()
        .collect()
        .await
        .map(|body| body.to_bytes())
        .map_err(|e| ApiError::bad_request(format!("Unable to read request body: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))
}

/// Decodes `?key=value` pairs from a request URI.
pub(crate) fn query_params(uri: &Uri) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let Some(query) = uri.query() else {
        return params;
    };
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let decode = |raw: &str| {
            let raw = raw.replace('+', " ");
            urlencoding::decode(&raw).map(|s| s.into_owned()).unwrap_or(raw)
        };
        if !key.is_empty() {
            params.insert(decode(key), decode(value));
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_decode_percent_and_plus() {
        let uri: Uri = "/api/weather?location=Boston%2C+MA&units=metric".parse().unwrap();
        let params = query_params(&uri);
        assert_eq!(params.get("location").map(String::as_str), Some("Boston, MA"));
        assert_eq!(params.get("units").map(String::as_str), Some("metric"));
    }

    #[test]
    fn query_params_tolerate_missing_values() {
        let uri: Uri = "/api/weather?location".parse().unwrap();
        let params = query_params(&uri);
        assert_eq!(params.get("location").map(String::as_str), Some(""));
    }

    #[test]
    fn no_query_yields_no_params() {
        let uri: Uri = "/api/weather".parse().unwrap();
        assert!(query_params(&uri).is_empty());
    }
}

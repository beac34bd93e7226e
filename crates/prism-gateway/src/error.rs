//! HTTP error responses.
//!
//! Direct (non-streaming) endpoints surface failures as a
//! machine-checkable status plus a human-readable `detail` string,
//! serialized as `{"detail": …}`.

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::{Response, StatusCode};
use std::convert::Infallible;
use thiserror::Error;

/// An error ready to be rendered as an HTTP response.
#[derive(Error, Debug)]
#[error("{status}: {detail}")]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, detail: detail.into() }
    }

    pub fn not_found() -> Self {
        Self { status: StatusCode::NOT_FOUND, detail: "Not found".to_string() }
    }

    pub fn bad_gateway(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_GATEWAY, detail: detail.into() }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, detail: detail.into() }
    }

    pub fn into_response(self) -> Response<BoxBody<Bytes, Infallible>> {
        let body = serde_json::json!({ "detail": self.detail });
        let bytes = serde_json::to_vec(&body).unwrap_or_default();
        let mut response = Response::new(Full::new(Bytes::from(bytes)).boxed());
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(hyper::header::CONTENT_TYPE, "application/json".parse().expect("valid header"));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_carries_status_and_detail() {
        let response = ApiError::bad_request("Missing models or prompt").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn display_includes_both_parts() {
        let err = ApiError::bad_gateway("upstream down");
        let msg = format!("{err}");
        assert!(msg.contains("502"));
        assert!(msg.contains("upstream down"));
    }
}

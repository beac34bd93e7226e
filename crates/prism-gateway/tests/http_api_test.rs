//! HTTP-level tests: bind the gateway on an ephemeral port and exercise
//! the surface with a real client.

use std::sync::Arc;

use prism_gateway::server::spawn_on_ephemeral_port;
use prism_gateway::{AppState, GatewayConfig};

// A host that refuses connections immediately.
const DEAD_HOST: &str = "http://127.0.0.1:1";

async fn spawn_gateway(configure: impl FnOnce(&mut GatewayConfig)) -> String {
    let mut config = GatewayConfig::from_lookup(|_| None);
    config.runtime_hosts = vec![DEAD_HOST.to_string()];
    configure(&mut config);
    let state = Arc::new(AppState::from_config(config));
    let (addr, shutdown) = spawn_on_ephemeral_port(state).await.unwrap();
    // Keep the shutdown channel open for the life of the test process;
    // dropping the sender would stop the accept loop.
    std::mem::forget(shutdown);
    format!("http://{addr}")
}

#[tokio::test]
async fn health_endpoint_answers_ok() {
    let base = spawn_gateway(|_| {}).await;
    let resp = reqwest::get(format!("{base}/api/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn models_fall_back_to_the_configured_list() {
    let base = spawn_gateway(|config| {
        config.default_models = vec!["llama3:8b".to_string(), "phi3:mini".to_string()];
    })
    .await;

    let resp = reqwest::get(format!("{base}/api/models")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["models"], serde_json::json!(["llama3:8b", "phi3:mini"]));
}

#[tokio::test]
async fn models_come_from_the_registry_when_reachable() {
    let mut runtime = mockito::Server::new_async().await;
    runtime
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(r#"{"models":[{"name":"llama3:8b"}]}"#)
        .create_async()
        .await;

    let runtime_url = runtime.url();
    let base = spawn_gateway(move |config| {
        config.runtime_hosts = vec![runtime_url];
        config.default_models = vec!["unused:fallback".to_string()];
    })
    .await;

    let resp = reqwest::get(format!("{base}/api/models")).await.unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["models"], serde_json::json!(["llama3:8b"]));
}

#[tokio::test]
async fn chat_without_a_prompt_is_rejected_before_any_downstream_call() {
    let base = spawn_gateway(|_| {}).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/chat"))
        .json(&serde_json::json!({ "models": ["m1"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Missing models or prompt");
}

#[tokio::test]
async fn chat_streams_newline_delimited_events() {
    let mut runtime = mockito::Server::new_async().await;
    runtime
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_body(r#"{"response":"Hello back.","done":true}"#)
        .create_async()
        .await;

    let runtime_url = runtime.url();
    let base = spawn_gateway(move |config| {
        config.runtime_hosts = vec![runtime_url];
    })
    .await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base}/api/chat"))
        .json(&serde_json::json!({ "models": ["m1"], "prompt": "hello there friend" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some("application/x-ndjson")
    );

    let body = resp.text().await.unwrap();
    let lines: Vec<serde_json::Value> = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["model"], "m1");
    assert_eq!(lines[0]["response"], "Thinking…");
    assert_eq!(lines[1]["response"], "Hello back.");
}

#[tokio::test]
async fn search_without_providers_is_a_client_error() {
    let base = spawn_gateway(|_| {}).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/search"))
        .json(&serde_json::json!({ "query": "rust news", "limit": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("no search provider configured"));
}

#[tokio::test]
async fn search_validates_the_limit_range() {
    let base = spawn_gateway(|_| {}).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/search"))
        .json(&serde_json::json!({ "query": "rust news", "limit": 50 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn weather_failure_maps_to_bad_gateway() {
    let base = spawn_gateway(|config| {
        // Key present but every provider endpoint is unreachable.
        config.weather.api_key = Some("wx-key".to_string());
        config.weather.base_url = DEAD_HOST.to_string();
        config.weather.open_meteo_url = format!("{DEAD_HOST}/openmeteo");
        config.geocode_url = format!("{DEAD_HOST}/geocode");
        config.open_meteo_geocode_url = format!("{DEAD_HOST}/geocode2");
    })
    .await;

    let resp =
        reqwest::get(format!("{base}/api/weather?location=Boston&units=metric")).await.unwrap();
    assert_eq!(resp.status(), 502);
}

#[tokio::test]
async fn missing_weather_location_is_a_client_error() {
    let base = spawn_gateway(|_| {}).await;
    let resp = reqwest::get(format!("{base}/api/weather")).await.unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn ensure_model_requires_both_model_names() {
    let base = spawn_gateway(|_| {}).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/training/ensure-model"))
        .json(&serde_json::json!({ "base_model": "llama3:8b" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Missing parameters");
}

#[tokio::test]
async fn ensure_model_creates_the_tag_through_the_registry() {
    let mut runtime = mockito::Server::new_async().await;
    runtime
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(r#"{"models":[{"name":"llama3:8b"}]}"#)
        .create_async()
        .await;
    runtime
        .mock("POST", "/api/create")
        .with_status(200)
        .with_body(r#"{"status":"success"}"#)
        .create_async()
        .await;

    let runtime_url = runtime.url();
    let base = spawn_gateway(move |config| {
        config.runtime_hosts = vec![runtime_url];
    })
    .await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base}/api/training/ensure-model"))
        .json(&serde_json::json!({ "base_model": "llama3:8b", "new_model": "custom:latest" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["detail"], "created");
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let base = spawn_gateway(|_| {}).await;
    let resp = reqwest::get(format!("{base}/api/nope")).await.unwrap();
    assert_eq!(resp.status(), 404);
}

//! REST client for the Ollama-compatible model runtime.
//!
//! Every call walks an ordered list of host candidates and returns the
//! first success; when no candidate answers, the error names every
//! attempted endpoint. There is no retry beyond that single pass.

use std::path::Path;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::RuntimeError;
use crate::residency::ModelRegistry;

/// Default runtime endpoint, used as the last host candidate.
pub const DEFAULT_RUNTIME_HOST: &str = "http://localhost:11434";

const TAGS_TIMEOUT: Duration = Duration::from_secs(10);
const PS_TIMEOUT: Duration = Duration::from_secs(5);
const STOP_TIMEOUT: Duration = Duration::from_secs(5);
const CREATE_TIMEOUT: Duration = Duration::from_secs(120);
const GENERATE_TIMEOUT: Duration = Duration::from_secs(120);
const EMBED_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the runtime's REST API.
#[derive(Debug, Clone)]
pub struct RuntimeClient {
    /// Host candidates, tried in order. Deduplicated at construction.
    hosts: Vec<String>,
    /// `keep_alive` hint passed on generation requests so the runtime
    /// unloads idle models on its own.
    keep_alive: String,
    client: Client,
}

/// Sampling options forwarded to the runtime on generation requests.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// A completed (non-streaming) generation.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub prompt_eval_count: Option<u32>,
    pub eval_count: Option<u32>,
}

/// One NDJSON chunk of a streaming generation.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

/// Outcome of a tag create/ensure call. Never an `Err`: tag management
/// is advisory and the caller decides how hard to fail.
#[derive(Debug, Clone, Serialize)]
pub struct TagOutcome {
    pub ok: bool,
    pub detail: String,
}

// Runtime API request/response structures
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<&'a GenerateOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<&'a str>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

// `/api/ps` answers vary across runtime versions: the process list may
// arrive as `models` or `processes`, and entries name the model under
// `name` or `model`.
#[derive(Deserialize, Default)]
struct PsResponse {
    #[serde(default, alias = "processes")]
    models: Vec<PsEntry>,
}

#[derive(Deserialize)]
struct PsEntry {
    #[serde(alias = "model")]
    name: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    embedding: Vec<f64>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: String,
}

fn api_error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                format!("HTTP {status} from model runtime")
            } else {
                body.to_string()
            }
        })
}

impl RuntimeClient {
    /// Creates a client over the given host candidates, deduplicated
    /// with order preserved.
    pub fn new(hosts: Vec<String>, keep_alive: impl Into<String>) -> Self {
        let mut deduped: Vec<String> = Vec::new();
        for host in hosts {
            let host = host.trim_end_matches('/').to_string();
            if !host.is_empty() && !deduped.contains(&host) {
                deduped.push(host);
            }
        }
        if deduped.is_empty() {
            deduped.push(DEFAULT_RUNTIME_HOST.to_string());
        }
        Self { hosts: deduped, keep_alive: keep_alive.into(), client: Client::new() }
    }

    /// The host candidates this client sweeps, in order.
    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Lists locally available model tags (`GET /api/tags`).
    ///
    /// A host that answers with an empty tag list is not an error; the
    /// remaining candidates are still probed for tags.
    pub async fn list_models(&self) -> Result<Vec<String>, RuntimeError> {
        let mut attempts = Vec::new();
        let mut saw_empty = false;
        for host in &self.hosts {
            let url = format!("{host}/api/tags");
            match self.client.get(&url).timeout(TAGS_TIMEOUT).send().await {
                Ok(resp) if resp.status().is_success() => match resp.json::<TagsResponse>().await {
                    Ok(tags) => {
                        let names: Vec<String> =
                            tags.models.into_iter().map(|t| t.name).collect();
                        if !names.is_empty() {
                            return Ok(names);
                        }
                        saw_empty = true;
                    }
                    Err(e) => attempts.push(format!("{host} -> {e}")),
                },
                Ok(resp) => attempts.push(format!("{host} -> HTTP {}", resp.status())),
                Err(e) => attempts.push(format!("{host} -> {e}")),
            }
        }
        if saw_empty {
            return Ok(Vec::new());
        }
        Err(RuntimeError::Unreachable { attempts })
    }

    /// Names of models currently resident in runtime memory
    /// (`GET /api/ps`).
    pub async fn list_loaded(&self) -> Result<Vec<String>, RuntimeError> {
        let mut attempts = Vec::new();
        for host in &self.hosts {
            let url = format!("{host}/api/ps");
            match self.client.get(&url).timeout(PS_TIMEOUT).send().await {
                Ok(resp) if resp.status().is_success() => {
                    let ps = resp.json::<PsResponse>().await.unwrap_or_default();
                    return Ok(ps.models.into_iter().filter_map(|p| p.name).collect());
                }
                Ok(resp) => attempts.push(format!("{host} -> HTTP {}", resp.status())),
                Err(e) => attempts.push(format!("{host} -> {e}")),
            }
        }
        Err(RuntimeError::Unreachable { attempts })
    }

    /// Asks the runtime to unload a model (`POST /api/stop`).
    ///
    /// Tries both `{"name": …}` and `{"model": …}` payload shapes for
    /// compatibility across runtime versions. Returns `true` only on a
    /// confirmed unload.
    pub async fn unload(&self, name: &str) -> bool {
        for host in &self.hosts {
            let url = format!("{host}/api/stop");
            for body in [
                serde_json::json!({ "name": name }),
                serde_json::json!({ "model": name }),
            ] {
                match self.client.post(&url).timeout(STOP_TIMEOUT).json(&body).send().await {
                    Ok(resp) if resp.status().is_success() => {
                        debug!(model = %name, host = %host, "model unloaded");
                        return true;
                    }
                    Ok(resp) => {
                        debug!(model = %name, host = %host, status = %resp.status(), "unload rejected");
                    }
                    Err(e) => {
                        debug!(model = %name, host = %host, error = %e, "unload attempt failed");
                    }
                }
            }
        }
        warn!(model = %name, "no runtime host confirmed the unload");
        false
    }

    /// Creates (or overwrites) a model tag via `POST /api/create`,
    /// synthesizing a Modelfile from the base model, an optional adapter
    /// path (included only when it exists on disk), and extra `PARAM`
    /// lines.
    pub async fn create_tag(
        &self,
        name: &str,
        base: &str,
        adapter_path: Option<&str>,
        params: &[(String, String)],
    ) -> TagOutcome {
        let modelfile = build_modelfile(base, adapter_path, params);
        let payload = serde_json::json!({ "name": name, "modelfile": modelfile });

        let mut attempts = Vec::new();
        for host in &self.hosts {
            let url = format!("{host}/api/create");
            match self.client.post(&url).timeout(CREATE_TIMEOUT).json(&payload).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return TagOutcome { ok: true, detail: "created".to_string() };
                    }
                    let body = resp.text().await.unwrap_or_default();
                    return TagOutcome {
                        ok: false,
                        detail: format!("HTTP {}: {}", status.as_u16(), body),
                    };
                }
                Err(e) => attempts.push(format!("{host} -> {e}")),
            }
        }
        TagOutcome { ok: false, detail: format!("unable to reach runtime: {}", attempts.join("; ")) }
    }

    /// Ensures a tag exists, creating an alias when missing. Idempotent.
    pub async fn ensure_tag(
        &self,
        name: &str,
        base: &str,
        adapter_path: Option<&str>,
    ) -> TagOutcome {
        if let Ok(existing) = self.list_models().await {
            if existing.iter().any(|m| m == name) {
                return TagOutcome { ok: true, detail: "exists".to_string() };
            }
        }
        self.create_tag(name, base, adapter_path, &[]).await
    }

    /// Runs a prompt to completion (`POST /api/generate`, non-streaming).
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: Option<&GenerateOptions>,
    ) -> Result<Generation, RuntimeError> {
        debug!(model = %model, prompt_len = prompt.len(), "generating completion");
        let mut attempts = Vec::new();
        for host in &self.hosts {
            let url = format!("{host}/api/generate");
            let body = GenerateRequest {
                model,
                prompt,
                stream: false,
                options,
                keep_alive: Some(&self.keep_alive),
            };
            let resp = match self
                .client
                .post(&url)
                .timeout(GENERATE_TIMEOUT)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    attempts.push(format!("{host} -> {e}"));
                    continue;
                }
            };

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                let message = api_error_message(status.as_u16(), &text);
                error!(model = %model, status = %status, error = %message, "generation rejected");
                return Err(RuntimeError::Api { status: status.as_u16(), message });
            }

            let parsed: GenerateResponse = resp
                .json()
                .await
                .map_err(|e| RuntimeError::Serialization(format!("bad generate response: {e}")))?;
            return Ok(Generation {
                text: parsed.response,
                prompt_eval_count: parsed.prompt_eval_count,
                eval_count: parsed.eval_count,
            });
        }
        Err(RuntimeError::Unreachable { attempts })
    }

    /// Runs a prompt with `stream: true`, yielding chunks as the
    /// runtime produces them. Nothing is buffered beyond one partial
    /// NDJSON line.
    pub async fn generate_stream(
        &self,
        model: &str,
        prompt: &str,
        options: Option<&GenerateOptions>,
    ) -> Result<GenerateStream, RuntimeError> {
        let mut attempts = Vec::new();
        for host in &self.hosts {
            let url = format!("{host}/api/generate");
            let body = GenerateRequest {
                model,
                prompt,
                stream: true,
                options,
                keep_alive: Some(&self.keep_alive),
            };
            let resp = match self
                .client
                .post(&url)
                .timeout(GENERATE_TIMEOUT)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    attempts.push(format!("{host} -> {e}"));
                    continue;
                }
            };

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                let message = api_error_message(status.as_u16(), &text);
                return Err(RuntimeError::Api { status: status.as_u16(), message });
            }
            return Ok(GenerateStream::new(resp));
        }
        Err(RuntimeError::Unreachable { attempts })
    }

    /// Computes an embedding vector (`POST /api/embeddings`).
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f64>, RuntimeError> {
        let mut attempts = Vec::new();
        for host in &self.hosts {
            let url = format!("{host}/api/embeddings");
            let body = EmbeddingsRequest { model, prompt: text };
            let resp = match self
                .client
                .post(&url)
                .timeout(EMBED_TIMEOUT)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    attempts.push(format!("{host} -> {e}"));
                    continue;
                }
            };

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                let message = api_error_message(status.as_u16(), &text);
                return Err(RuntimeError::Api { status: status.as_u16(), message });
            }
            let parsed: EmbeddingsResponse = resp
                .json()
                .await
                .map_err(|e| RuntimeError::Serialization(format!("bad embeddings response: {e}")))?;
            return Ok(parsed.embedding);
        }
        Err(RuntimeError::Unreachable { attempts })
    }
}

fn build_modelfile(base: &str, adapter_path: Option<&str>, params: &[(String, String)]) -> String {
    let mut lines = vec![format!("FROM {base}")];
    if let Some(path) = adapter_path {
        if Path::new(path).exists() {
            lines.push(format!("ADAPTER {path}"));
        }
    }
    for (key, value) in params {
        lines.push(format!("PARAM {key} {value}"));
    }
    lines.join("\n") + "\n"
}

#[async_trait]
impl ModelRegistry for RuntimeClient {
    async fn list_loaded(&self) -> Result<Vec<String>, RuntimeError> {
        Self::list_loaded(self).await
    }

    async fn unload(&self, name: &str) -> bool {
        Self::unload(self, name).await
    }
}

// Streaming response parser for the runtime's NDJSON chunk format.
pub struct GenerateStream {
    stream: Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>,
    buffer: String,
    done: bool,
}

impl GenerateStream {
    fn new(response: reqwest::Response) -> Self {
        Self { stream: Box::pin(response.bytes_stream()), buffer: String::new(), done: false }
    }

    fn next_buffered_chunk(&mut self) -> Option<GenerateChunk> {
        while let Some(idx) = self.buffer.find('\n') {
            let line = self.buffer[..idx].trim().to_string();
            self.buffer.drain(..=idx);
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<GenerateChunk>(&line) {
                Ok(chunk) => {
                    if chunk.done {
                        self.done = true;
                    }
                    return Some(chunk);
                }
                Err(e) => {
                    debug!(error = %e, "skipping malformed runtime chunk");
                }
            }
        }
        None
    }
}

impl Stream for GenerateStream {
    type Item = Result<GenerateChunk, RuntimeError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(chunk) = this.next_buffered_chunk() {
                return Poll::Ready(Some(Ok(chunk)));
            }
            if this.done {
                return Poll::Ready(None);
            }

            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(chunk) => this.buffer.push_str(&chunk),
                    Err(e) => {
                        return Poll::Ready(Some(Err(RuntimeError::Serialization(format!(
                            "invalid utf-8 in generation stream: {e}"
                        )))));
                    }
                },
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(RuntimeError::Request(format!(
                        "generation stream error: {e}"
                    )))));
                }
                Poll::Ready(None) => {
                    // Stream ended; flush a trailing line without a newline.
                    this.done = true;
                    if !this.buffer.trim().is_empty() {
                        let line = std::mem::take(&mut this.buffer);
                        if let Ok(chunk) = serde_json::from_str::<GenerateChunk>(line.trim()) {
                            return Poll::Ready(Some(Ok(chunk)));
                        }
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_candidates_are_deduped_in_order() {
        let client = RuntimeClient::new(
            vec![
                "http://ollama-dev:11434".to_string(),
                "http://localhost:11434/".to_string(),
                "http://ollama-dev:11434".to_string(),
            ],
            "5m",
        );
        assert_eq!(
            client.hosts(),
            &["http://ollama-dev:11434".to_string(), "http://localhost:11434".to_string()]
        );
    }

    #[test]
    fn empty_candidate_list_falls_back_to_default() {
        let client = RuntimeClient::new(Vec::new(), "5m");
        assert_eq!(client.hosts(), &[DEFAULT_RUNTIME_HOST.to_string()]);
    }

    #[test]
    fn modelfile_skips_missing_adapter() {
        let content = build_modelfile("llama3", Some("/definitely/not/here.bin"), &[]);
        assert_eq!(content, "FROM llama3\n");
    }

    #[test]
    fn modelfile_includes_params() {
        let params = vec![("temperature".to_string(), "0.2".to_string())];
        let content = build_modelfile("llama3", None, &params);
        assert_eq!(content, "FROM llama3\nPARAM temperature 0.2\n");
    }
}

// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Ollama API.
//!
//! Provides [`OllamaClient`] which handles URL construction, per-request
//! timeouts, and classification of every failure into a [`BackendError`].
//! No retries: a failed call is reported once and the caller decides.

use std::time::{Duration, Instant};

use lxbot_core::{BackendError, CallResult, LxbotError};
use tracing::debug;

use crate::types::{ModelEntry, TagsResponse};

/// Longest response-body excerpt carried in a status error.
const MAX_ERROR_BODY: usize = 200;

/// HTTP client for Ollama communication.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    /// Creates a client for the server at `base_url` (e.g. `http://localhost:11434`).
    pub fn new(base_url: &str) -> Result<Self, LxbotError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LxbotError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Returns the base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POSTs `body` to `path` and returns the decoded JSON object.
    ///
    /// The timeout covers connecting, sending and reading the whole body.
    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> CallResult {
        let url = self.api_url(path);
        let started = Instant::now();

        let response = self
            .client
            .post(&url)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(&e, timeout))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| classify(&e, timeout))?;
        debug!(
            path,
            status = %status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "backend response received"
        );

        if !status.is_success() {
            return Err(BackendError::status(status.as_u16(), excerpt(&text)));
        }

        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| BackendError::malformed(format!("invalid JSON from backend: {e}")))?;
        if !value.is_object() {
            return Err(BackendError::malformed("backend response is not a JSON object"));
        }
        Ok(value)
    }

    /// Lists the models installed on the server via `GET /api/tags`.
    pub async fn list_models(&self, timeout: Duration) -> Result<Vec<ModelEntry>, BackendError> {
        let response = self
            .client
            .get(self.api_url("/api/tags"))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(&e, timeout))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| classify(&e, timeout))?;
        if !status.is_success() {
            return Err(BackendError::status(status.as_u16(), excerpt(&text)));
        }

        let tags: TagsResponse = serde_json::from_str(&text)
            .map_err(|e| BackendError::malformed(format!("invalid model listing: {e}")))?;
        Ok(tags.models)
    }
}

/// Maps a reqwest failure onto the backend error taxonomy.
fn classify(err: &reqwest::Error, timeout: Duration) -> BackendError {
    if err.is_timeout() {
        BackendError::timeout(timeout)
    } else if err.is_decode() {
        BackendError::malformed(format!("failed to read response body: {err}"))
    } else {
        BackendError::transport(format!("HTTP request failed: {err}"))
    }
}

fn excerpt(body: &str) -> &str {
    let body = body.trim();
    if body.len() <= MAX_ERROR_BODY {
        return body;
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

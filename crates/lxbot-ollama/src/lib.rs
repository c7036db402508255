// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama backend adapter for lxbot.
//!
//! This crate implements [`Backend`] for an Ollama server: single-turn
//! `generate` calls, multi-turn `chat` calls, and a non-fatal startup probe
//! of the installed models.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use lxbot_config::model::OllamaConfig;
use lxbot_core::error::{BackendError, LxbotError};
use lxbot_core::traits::{Backend, PluginAdapter};
use lxbot_core::types::{AdapterType, CallResult, ChatTurn, Endpoint, HealthStatus};
use tracing::{debug, info, warn};

use crate::client::OllamaClient;
use crate::types::{ChatRequest, GenerateRequest, ModelEntry};

/// Ollama backend implementing [`Backend`].
pub struct OllamaBackend {
    client: OllamaClient,
    model: String,
    probe_timeout: Duration,
}

/// Outcome of probing `/api/tags` at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeReport {
    /// The configured model is installed.
    Ready { model_count: usize },
    /// The server answered but the configured model is not installed.
    ModelMissing { available: Vec<String> },
    /// The server answered with an empty model list.
    NoModels,
    /// The server could not be reached or answered with an error.
    Unreachable(BackendError),
}

impl OllamaBackend {
    /// Creates a backend from the `[ollama]` configuration section.
    pub fn new(config: &OllamaConfig) -> Result<Self, LxbotError> {
        let client = OllamaClient::new(&config.base_url)?;
        info!(
            base_url = client.base_url(),
            model = config.model,
            "Ollama backend initialized"
        );
        Ok(Self {
            client,
            model: config.model.clone(),
            probe_timeout: config.probe_timeout(),
        })
    }

    /// Returns the configured model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the server base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    /// Lists the installed models.
    pub async fn list_models(&self) -> Result<Vec<ModelEntry>, BackendError> {
        self.client.list_models(self.probe_timeout).await
    }

    /// Checks reachability and whether the configured model is installed.
    pub async fn probe(&self) -> ProbeReport {
        match self.list_models().await {
            Ok(models) if models.is_empty() => ProbeReport::NoModels,
            Ok(models) => {
                if models.iter().any(|m| model_matches(&self.model, &m.name)) {
                    ProbeReport::Ready {
                        model_count: models.len(),
                    }
                } else {
                    ProbeReport::ModelMissing {
                        available: models.into_iter().map(|m| m.name).collect(),
                    }
                }
            }
            Err(e) => ProbeReport::Unreachable(e),
        }
    }

    /// Runs [`probe`](Self::probe) and logs the outcome. Never fails.
    pub async fn probe_and_log(&self) -> ProbeReport {
        let report = self.probe().await;
        match &report {
            ProbeReport::Ready { model_count } => {
                info!(
                    base_url = self.base_url(),
                    model = self.model,
                    model_count,
                    "connected to Ollama"
                );
            }
            ProbeReport::ModelMissing { available } => {
                warn!(
                    model = self.model,
                    available = available.join(", "),
                    "configured model not found on Ollama server; run `ollama pull {}`",
                    self.model
                );
            }
            ProbeReport::NoModels => {
                warn!(
                    base_url = self.base_url(),
                    "Ollama server has no models installed"
                );
            }
            ProbeReport::Unreachable(e) => {
                warn!(
                    base_url = self.base_url(),
                    error = %e,
                    "could not connect to Ollama; requests will fail until it is reachable"
                );
            }
        }
        report
    }
}

/// `llama3.2` matches an installed `llama3.2:latest`.
fn model_matches(configured: &str, installed: &str) -> bool {
    configured == installed
        || (!configured.contains(':')
            && installed
                .strip_prefix(configured)
                .is_some_and(|rest| rest == ":latest"))
}

#[async_trait]
impl PluginAdapter for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Backend
    }

    async fn health_check(&self) -> Result<HealthStatus, LxbotError> {
        Ok(match self.probe().await {
            ProbeReport::Ready { .. } => HealthStatus::Healthy,
            ProbeReport::ModelMissing { .. } => {
                HealthStatus::Degraded(format!("model {} is not installed", self.model))
            }
            ProbeReport::NoModels => HealthStatus::Degraded("no models installed".into()),
            ProbeReport::Unreachable(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), LxbotError> {
        debug!("Ollama backend shutting down");
        Ok(())
    }
}

#[async_trait]
impl Backend for OllamaBackend {
    async fn call(
        &self,
        endpoint: Endpoint,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> CallResult {
        debug!(endpoint = %endpoint, model = self.model, "calling backend");
        self.client.post_json(endpoint.path(), &payload, timeout).await
    }

    fn generate_payload(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!(GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        })
    }

    fn chat_payload(&self, messages: &[ChatTurn]) -> serde_json::Value {
        serde_json::json!(ChatRequest {
            model: &self.model,
            messages,
            stream: false,
        })
    }
}

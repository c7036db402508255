// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Ollama HTTP API.
//!
//! Only the request bodies and the `/api/tags` listing are typed. Generate
//! and chat responses stay as raw JSON so reply extraction can fall back
//! gracefully on shapes it does not recognise.

use lxbot_core::ChatTurn;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatTurn],
    pub stream: bool,
}

/// Response of `GET /api/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

/// One installed model.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub modified_at: Option<String>,
}

// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend trait for the text-generation inference service.

use std::time::Duration;

use async_trait::async_trait;

use crate::traits::adapter::PluginAdapter;
use crate::types::{CallResult, ChatTurn, Endpoint};

/// A text-generation backend with `generate` and `chat` endpoints.
///
/// `call` never returns a Rust error for backend trouble: transport faults,
/// timeouts and malformed bodies all come back as the `Err` side of
/// [`CallResult`]. Retrying is the caller's decision.
#[async_trait]
pub trait Backend: PluginAdapter {
    /// Issues one request and waits at most `timeout` for the full response.
    async fn call(
        &self,
        endpoint: Endpoint,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> CallResult;

    /// Builds a single-turn `generate` payload.
    fn generate_payload(&self, prompt: &str) -> serde_json::Value;

    /// Builds a multi-turn `chat` payload from an ordered message list.
    fn chat_payload(&self, messages: &[ChatTurn]) -> serde_json::Value;
}

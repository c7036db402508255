// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock text-generation backend for deterministic testing.
//!
//! `MockBackend` implements `Backend` with pre-configured results, records
//! every call it receives, and can optionally hold calls behind a gate so a
//! test can observe the bot while a request is in flight.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::{Notify, Semaphore};

use lxbot_core::{
    AdapterType, Backend, CallResult, ChatTurn, Endpoint, HealthStatus, LxbotError,
    PluginAdapter,
};

/// Text returned when no scripted result is queued.
pub const DEFAULT_REPLY: &str = "mock response";

/// One call observed by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub endpoint: Endpoint,
    pub payload: Value,
}

/// A mock backend that returns pre-configured results.
///
/// Results are popped from a FIFO queue. When the queue is empty, a success
/// carrying [`DEFAULT_REPLY`] in the shape of the called endpoint is returned.
pub struct MockBackend {
    model: String,
    results: Mutex<VecDeque<CallResult>>,
    calls: Mutex<Vec<RecordedCall>>,
    call_made: Notify,
    gate: Option<Arc<Semaphore>>,
}

impl MockBackend {
    /// Create a new mock backend with an empty result queue.
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            results: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            call_made: Notify::new(),
            gate: None,
        }
    }

    /// Create a mock backend pre-loaded with the given results.
    pub fn with_results(results: Vec<CallResult>) -> Self {
        let backend = Self::new();
        *lock(&backend.results) = VecDeque::from(results);
        backend
    }

    /// Holds every call until [`release`](Self::release) grants it a permit.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Add a result to the end of the queue.
    pub fn push_result(&self, result: CallResult) {
        lock(&self.results).push_back(result);
    }

    /// Lets `n` held (or future) calls proceed. No-op when not gated.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Every call received so far, in arrival order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Waits until at least `count` calls have arrived.
    pub async fn wait_for_calls(&self, count: usize, timeout: Duration) -> Result<(), LxbotError> {
        let wait = async {
            loop {
                let notified = self.call_made.notified();
                if self.call_count() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| LxbotError::Timeout { duration: timeout })
    }

    fn next_result(&self, endpoint: Endpoint) -> CallResult {
        lock(&self.results)
            .pop_front()
            .unwrap_or_else(|| Ok(default_response(endpoint)))
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// A successful response in the shape `endpoint` answers with.
pub fn default_response(endpoint: Endpoint) -> Value {
    reply_for(endpoint, DEFAULT_REPLY)
}

/// A successful response carrying `text`, shaped for `endpoint`.
pub fn reply_for(endpoint: Endpoint, text: &str) -> Value {
    match endpoint {
        Endpoint::Generate => json!({"model": "mock-model", "response": text, "done": true}),
        Endpoint::Chat => json!({
            "model": "mock-model",
            "message": {"role": "assistant", "content": text},
            "done": true
        }),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl PluginAdapter for MockBackend {
    fn name(&self) -> &str {
        "mock-backend"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Backend
    }

    async fn health_check(&self) -> Result<HealthStatus, LxbotError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LxbotError> {
        Ok(())
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn call(&self, endpoint: Endpoint, payload: Value, _timeout: Duration) -> CallResult {
        lock(&self.calls).push(RecordedCall { endpoint, payload });
        self.call_made.notify_waiters();

        if let Some(gate) = &self.gate
            && let Ok(permit) = gate.acquire().await
        {
            permit.forget();
        }
        self.next_result(endpoint)
    }

    fn generate_payload(&self, prompt: &str) -> Value {
        json!({"model": self.model, "prompt": prompt, "stream": false})
    }

    fn chat_payload(&self, messages: &[ChatTurn]) -> Value {
        json!({"model": self.model, "messages": messages, "stream": false})
    }
}

// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction of the user-visible text from a raw backend response.

use serde_json::Value;

/// Placeholder used when a successful response has neither known shape.
pub const UNEXPECTED_FORMAT: &str = "Unexpected response format";

/// Pulls the generated text out of a backend response.
///
/// `generate` answers carry it in `response`, `chat` answers in
/// `message.content`. Anything else yields [`UNEXPECTED_FORMAT`].
pub fn extract_reply_text(response: &Value) -> String {
    if let Some(text) = response.get("response").and_then(Value::as_str) {
        return text.to_string();
    }
    if let Some(text) = response
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
    {
        return text.to_string();
    }
    UNEXPECTED_FORMAT.to_string()
}

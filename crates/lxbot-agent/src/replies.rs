// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-visible reply texts.

use lxbot_core::{CallResult, extract_reply_text};

pub const DECODE_ERROR: &str = "Error: Message content is not valid UTF-8.";
pub const STILL_PROCESSING: &str = "Still processing your last request, please wait...";
pub const QUEUE_FULL: &str = "The request queue is full, please try again in a moment.";
pub const EMPTY_RESPONSE: &str = "Received empty response from AI model";
pub const PROCESSING: &str = "Processing your request...";
pub const EMPTY_CHAT: &str = "Please provide a message for the chat!";
pub const ASK_USAGE: &str = "Please provide a question, e.g. /ask why is the sky blue?";
pub const RESET_DONE: &str = "Chat conversation has been reset!";
pub const NOTHING_TO_RESET: &str = "No active conversation to reset.";
pub const ADMIN_ONLY: &str = "This command is restricted to admins.";

/// Turns a backend outcome into the text sent back to the user.
///
/// Reachability failures (transport errors and timeouts) point the user at
/// the backend address; other failures are reported verbatim.
pub fn backend_reply(result: &CallResult, base_url: &str) -> String {
    match result {
        Ok(response) => {
            let text = extract_reply_text(response);
            let text = text.trim();
            if text.is_empty() {
                EMPTY_RESPONSE.to_string()
            } else {
                text.to_string()
            }
        }
        Err(e) if e.is_connectivity() => format!(
            "Unable to connect to Ollama API. Please check if Ollama is running at {base_url}"
        ),
        Err(e) => format!("Error: {e}"),
    }
}

pub fn unknown_command(prefix: &str, name: &str) -> String {
    format!("Unknown command: {prefix}{name}. Send {prefix}help for a list.")
}

pub fn debug_mode(enabled: bool) -> String {
    format!(
        "Debug mode: {}",
        if enabled { "enabled" } else { "disabled" }
    )
}

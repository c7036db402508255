// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for lxbot integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without a running Ollama server or a
//! messaging network.
//!
//! # Components
//!
//! - [`MockBackend`] - Scripted backend that records calls and can hold them
//! - [`MockChannel`] - Mock messaging channel with message injection and capture
//! - [`TestHarness`] - The full agent stack wired over the two mocks

pub mod harness;
pub mod mock_backend;
pub mod mock_channel;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_backend::{MockBackend, RecordedCall};
pub use mock_channel::MockChannel;

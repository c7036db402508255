// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch queue for backend calls.
//!
//! Requests are accepted into a bounded FIFO and executed one at a time by a
//! single worker task, so the backend never sees more than one concurrent
//! call. Every accepted request has its completion invoked exactly once.

pub mod queue;

pub use queue::{Completion, DispatchQueue, QueueSettings};

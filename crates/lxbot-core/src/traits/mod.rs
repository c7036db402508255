// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Network-facing adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility. [`KeyValueStore`] is
//! deliberately synchronous.

pub mod adapter;
pub mod backend;
pub mod channel;
pub mod storage;

pub use adapter::PluginAdapter;
pub use backend::Backend;
pub use channel::ChannelAdapter;
pub use storage::KeyValueStore;

// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline message replay for the Kasa chat engine.
//!
//! When connectivity returns, the [`SyncEngine`] drains the store's
//! `pending`/`failed` backlog against the server, over the socket when it is
//! up and over HTTP otherwise.

pub mod engine;

pub use engine::{SyncEngine, SyncOutcome};

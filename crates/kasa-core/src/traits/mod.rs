// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the network seams of the chat engine.
//!
//! The controller and the Sync Engine depend only on these traits, so tests
//! substitute in-memory fakes for the socket and the HTTP backend.

pub mod api;
pub mod channel;

pub use api::MessagingApi;
pub use channel::RealtimeChannel;

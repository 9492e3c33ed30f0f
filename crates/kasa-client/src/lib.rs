// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP messaging API client for the Kasa chat engine.
//!
//! Implements the [`MessagingApi`](kasa_core::MessagingApi) contract over
//! REST: history fetch, message create, and read receipts. This is the path
//! the engine falls back to whenever the realtime channel is down.

pub mod client;
pub mod wire;

pub use client::HttpMessagingApi;

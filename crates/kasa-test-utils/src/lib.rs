// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles for the Kasa chat engine.
//!
//! `MockChannel` and `MockApi` stand in for the WebSocket channel and the
//! HTTP messaging API so the Sync Engine and the Chat Session Controller can
//! be tested deterministically, with no network and no real clock.

pub mod mock_api;
pub mod mock_channel;

pub use mock_api::MockApi;
pub use mock_channel::MockChannel;

// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation chat session control for the Kasa engine.
//!
//! One [`ChatSession`] per open conversation: cache-first history, optimistic
//! sends, read receipts, typing state, and a realtime event loop that keeps
//! the local store and the view in step with the server.

pub mod session;

pub use session::{ChatSession, SessionEvent};

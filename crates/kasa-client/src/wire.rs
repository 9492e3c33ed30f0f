// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request bodies for the messaging API. The shared response shape
//! ([`WireMessage`](kasa_core::WireMessage)) lives in `kasa-core`.

use kasa_core::types::MessageKind;
use serde::Serialize;

/// Body of `POST /bookings/{id}/messages`.
#[derive(Debug, Serialize)]
pub struct SendMessageBody<'a> {
    pub content: &'a str,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

/// Body of `POST /bookings/{id}/messages/mark-read`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadBody<'a> {
    pub message_ids: &'a [String],
}

// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Frame encoding for the realtime channel.
//!
//! Frames are JSON objects `{"event": <name>, "data": <payload>}` carrying
//! the `message:*` event names from the messaging contract. Unknown event
//! names decode to `None` so newer servers do not break older clients.

use kasa_core::types::{ChatEvent, ClientEvent};
use kasa_core::{KasaError, WireMessage};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct Frame {
    event: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ReceivedPayload {
    #[serde(flatten)]
    message: WireMessage,
    #[serde(rename = "tempId", default)]
    temp_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypingPayload {
    conversation_id: String,
    user_id: String,
    is_typing: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadPayload {
    conversation_id: String,
    message_ids: Vec<String>,
}

fn decode_err(event: &str, e: serde_json::Error) -> KasaError {
    KasaError::Channel {
        message: format!("bad payload for `{event}` frame"),
        source: Some(Box::new(e)),
    }
}

/// Decode a server frame into a [`ChatEvent`].
///
/// Returns `Ok(None)` for event names this client does not know.
pub fn decode_server_frame(text: &str) -> Result<Option<ChatEvent>, KasaError> {
    let frame: Frame = serde_json::from_str(text).map_err(|e| KasaError::Channel {
        message: "frame is not valid JSON".to_string(),
        source: Some(Box::new(e)),
    })?;

    match frame.event.as_str() {
        "message:received" => {
            let payload: ReceivedPayload =
                serde_json::from_value(frame.data).map_err(|e| decode_err(&frame.event, e))?;
            Ok(Some(ChatEvent::MessageReceived {
                message: payload.message.into_message(),
                temp_id: payload.temp_id,
            }))
        }
        "message:typing" => {
            let payload: TypingPayload =
                serde_json::from_value(frame.data).map_err(|e| decode_err(&frame.event, e))?;
            Ok(Some(ChatEvent::Typing {
                conversation_id: payload.conversation_id,
                user_id: payload.user_id,
                is_typing: payload.is_typing,
            }))
        }
        "message:read" => {
            let payload: ReadPayload =
                serde_json::from_value(frame.data).map_err(|e| decode_err(&frame.event, e))?;
            Ok(Some(ChatEvent::Read {
                conversation_id: payload.conversation_id,
                message_ids: payload.message_ids,
            }))
        }
        _ => Ok(None),
    }
}

/// Encode a client event into its outbound frame.
pub fn encode_client_event(event: &ClientEvent) -> String {
    let data = match event {
        ClientEvent::Send {
            conversation_id,
            content,
            kind,
            temp_id,
        } => json!({
            "conversationId": conversation_id,
            "content": content,
            "type": kind,
            "tempId": temp_id,
        }),
        ClientEvent::Typing {
            conversation_id,
            is_typing,
        } => json!({
            "conversationId": conversation_id,
            "isTyping": is_typing,
        }),
        ClientEvent::Read {
            conversation_id,
            message_ids,
        } => json!({
            "conversationId": conversation_id,
            "messageIds": message_ids,
        }),
    };
    json!({ "event": event.event_name(), "data": data }).to_string()
}

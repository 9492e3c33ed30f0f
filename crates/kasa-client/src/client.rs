// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP implementation of the messaging API contract.

use async_trait::async_trait;
use kasa_config::model::ApiConfig;
use kasa_core::types::{Message, MessageKind};
use kasa_core::{KasaError, MessagingApi};
use tracing::debug;

use kasa_core::WireMessage;

use crate::wire::{MarkReadBody, SendMessageBody};

/// Messaging API client over HTTP.
///
/// This is the fallback delivery path; it is also the authoritative source
/// for conversation history. One instance is shared by the controller and
/// the Sync Engine.
pub struct HttpMessagingApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMessagingApi {
    /// Build a client from configuration.
    pub fn new(config: &ApiConfig) -> Result<Self, KasaError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| KasaError::Api {
                message: "failed to build HTTP client".to_string(),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self, conversation_id: &str) -> String {
        format!("{}/bookings/{conversation_id}/messages", self.base_url)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, KasaError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(KasaError::api(format!("server returned HTTP {status}")))
        }
    }
}

fn transport_err(context: &str, e: reqwest::Error) -> KasaError {
    KasaError::Api {
        message: context.to_string(),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl MessagingApi for HttpMessagingApi {
    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<Message>, KasaError> {
        let response = self
            .client
            .get(self.messages_url(conversation_id))
            .send()
            .await
            .map_err(|e| transport_err("history fetch failed", e))?;
        let wire: Vec<WireMessage> = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| transport_err("history response was not valid JSON", e))?;
        debug!(conversation_id, count = wire.len(), "history fetched");
        Ok(wire.into_iter().map(WireMessage::into_message).collect())
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        content: &str,
        kind: MessageKind,
    ) -> Result<Message, KasaError> {
        let response = self
            .client
            .post(self.messages_url(conversation_id))
            .json(&SendMessageBody { content, kind })
            .send()
            .await
            .map_err(|e| transport_err("message send failed", e))?;
        let wire: WireMessage = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| transport_err("send response was not valid JSON", e))?;
        Ok(wire.into_message())
    }

    async fn mark_read(
        &self,
        conversation_id: &str,
        message_ids: &[String],
    ) -> Result<(), KasaError> {
        let response = self
            .client
            .post(format!(
                "{}/mark-read",
                self.messages_url(conversation_id)
            ))
            .json(&MarkReadBody { message_ids })
            .send()
            .await
            .map_err(|e| transport_err("mark-read failed", e))?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn mark_all_read(&self, conversation_id: &str) -> Result<(), KasaError> {
        let response = self
            .client
            .post(format!(
                "{}/mark-all-read",
                self.messages_url(conversation_id)
            ))
            .send()
            .await
            .map_err(|e| transport_err("mark-all-read failed", e))?;
        Self::check_status(response).await?;
        Ok(())
    }
}

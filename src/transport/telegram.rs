use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::http::{response_from_error, response_from_http};
use super::DestinationTransport;
use crate::destination::Destination;
use crate::message::{DestinationMessageResponse, MessageContent};

/// Sends messages through the Telegram Bot API.
pub struct TelegramTransport {
    client: Client,
    api_base_url: String,
}

impl TelegramTransport {
    pub fn new(client: Client, api_base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl DestinationTransport for TelegramTransport {
    #[tracing::instrument(name = "transport.telegram", skip(self, destination, message))]
    async fn send_message(
        &self,
        destination: &Destination,
        message: &MessageContent,
        reference_id: &str,
    ) -> DestinationMessageResponse {
        let Destination::Telegram(telegram) = destination else {
            return DestinationMessageResponse::new(
                400,
                format!("Telegram transport cannot deliver to {}", destination.destination_type()),
            );
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base_url, telegram.bot_token());
        let body = json!({
            "chat_id": telegram.chat_id(),
            "text": message.build_message_with_title(),
            "disable_web_page_preview": true
        });

        match self.client.post(&url).json(&body).send().await {
            Ok(response) => {
                let mapped = response_from_http(response).await;
                tracing::debug!(reference_id = %reference_id, status = mapped.status_code, "Telegram message sent");
                mapped
            }
            // reqwest errors carry the URL, which contains the bot token
            Err(e) => {
                let e = e.without_url();
                tracing::warn!(reference_id = %reference_id, error = %e, "Telegram request failed");
                response_from_error(e)
            }
        }
    }
}

use std::sync::Arc;

use async_trait::async_trait;

use super::DestinationTransport;
use crate::credentials::SnsClientFactory;
use crate::destination::Destination;
use crate::error::NotificationError;
use crate::message::{DestinationMessageResponse, MessageContent};

/// Publishes messages to Amazon SNS topics.
pub struct SnsTransport {
    clients: Arc<dyn SnsClientFactory>,
}

impl SnsTransport {
    pub fn new(clients: Arc<dyn SnsClientFactory>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl DestinationTransport for SnsTransport {
    #[tracing::instrument(name = "transport.sns", skip(self, destination, message))]
    async fn send_message(
        &self,
        destination: &Destination,
        message: &MessageContent,
        reference_id: &str,
    ) -> DestinationMessageResponse {
        let Destination::Sns(sns) = destination else {
            return DestinationMessageResponse::new(
                400,
                format!("SNS transport cannot deliver to {}", destination.destination_type()),
            );
        };

        let client = match self.clients.create_sns_client(sns.region(), sns.role_arn()).await {
            Ok(client) => client,
            Err(e) => return NotificationError::from(e).into(),
        };

        match client
            .publish(sns.topic_arn(), message.text_description(), message.title())
            .await
        {
            Ok(message_id) => {
                tracing::info!(reference_id = %reference_id, message_id = %message_id, "Message published to SNS");
                DestinationMessageResponse::success()
            }
            Err(e) => {
                tracing::warn!(reference_id = %reference_id, error = %e, "SNS publish failed");
                match e.status {
                    Some(status) => DestinationMessageResponse::new(
                        status,
                        format!("SNS Send Error({}), SNS status:{}", status, e),
                    ),
                    None => DestinationMessageResponse::new(
                        400,
                        format!("SNS sdk Error, SDK status:{}", e),
                    ),
                }
            }
        }
    }
}

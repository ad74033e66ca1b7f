use std::sync::Arc;

use async_trait::async_trait;

use super::mime::build_email;
use super::DestinationTransport;
use crate::credentials::SesClientFactory;
use crate::destination::Destination;
use crate::error::NotificationError;
use crate::message::{DestinationMessageResponse, MessageContent};

/// Delivers email through Amazon SES as raw MIME.
pub struct SesTransport {
    clients: Arc<dyn SesClientFactory>,
    email_size_limit: usize,
    minimum_header_length: usize,
}

impl SesTransport {
    pub fn new(clients: Arc<dyn SesClientFactory>, email_size_limit: usize, minimum_header_length: usize) -> Self {
        Self {
            clients,
            email_size_limit,
            minimum_header_length,
        }
    }
}

#[async_trait]
impl DestinationTransport for SesTransport {
    #[tracing::instrument(name = "transport.ses", skip(self, destination, message))]
    async fn send_message(
        &self,
        destination: &Destination,
        message: &MessageContent,
        reference_id: &str,
    ) -> DestinationMessageResponse {
        let Destination::Ses(ses) = destination else {
            return DestinationMessageResponse::new(
                400,
                format!("SES transport cannot deliver to {}", destination.destination_type()),
            );
        };

        if message.estimated_email_size(self.minimum_header_length) > self.email_size_limit {
            return DestinationMessageResponse::new(
                413,
                format!("Email size larger than {}", self.email_size_limit),
            );
        }

        let email = match build_email(ses.from_address(), ses.recipient(), message) {
            Ok(email) => email,
            Err(e) => return DestinationMessageResponse::new(e.status_code(), e.to_string()),
        };

        let client = match self.clients.create_ses_client(ses.region(), ses.role_arn()).await {
            Ok(client) => client,
            Err(e) => return NotificationError::from(e).into(),
        };

        match client.send_raw_email(email.formatted()).await {
            Ok(message_id) => {
                tracing::info!(reference_id = %reference_id, message_id = %message_id, "Email sent through SES");
                DestinationMessageResponse::success()
            }
            Err(e) => {
                tracing::warn!(reference_id = %reference_id, error = %e, "SES send failed");
                match e.status {
                    Some(status) => DestinationMessageResponse::new(
                        status,
                        format!("sendEmail Error({}), SES status:{}", status, e),
                    ),
                    None => DestinationMessageResponse::new(
                        400,
                        format!("sendEmail Error, SDK status:{}", e),
                    ),
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeSesFactory;
    use super::*;
    use crate::credentials::AwsServiceError;
    use crate::destination::SesDestination;

    fn destination() -> Destination {
        Destination::Ses(
            SesDestination::new(
                "ses",
                "eu-west-1",
                Some("arn:aws:iam::012345678912:role/ses"),
                "from@example.com",
                "to@example.com",
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_ses_success() {
        let factory = Arc::new(FakeSesFactory::returning(Ok("msg-1".to_string())));
        let transport = SesTransport::new(factory.clone(), 10_000_000, 160);
        let message = MessageContent::new("Subject", "Body").unwrap();

        let response = transport.send_message(&destination(), &message, "ref").await;

        assert_eq!(response, DestinationMessageResponse::success());
        let requests = factory.requests.lock().unwrap();
        assert_eq!(requests[0].0, "eu-west-1");
        assert_eq!(requests[0].1.as_deref(), Some("arn:aws:iam::012345678912:role/ses"));
        let raw = String::from_utf8(factory.client.sent.lock().unwrap()[0].clone()).unwrap();
        assert!(raw.contains("Subject: Subject"));
    }

    #[tokio::test]
    async fn test_ses_service_error_keeps_status() {
        let factory = Arc::new(FakeSesFactory::returning(Err(AwsServiceError {
            status: Some(403),
            code: Some("AccessDenied".to_string()),
            message: "not authorized".to_string(),
        })));
        let transport = SesTransport::new(factory, 10_000_000, 160);
        let message = MessageContent::new("Subject", "Body").unwrap();

        let response = transport.send_message(&destination(), &message, "ref").await;

        assert_eq!(response.status_code, 403);
        assert_eq!(
            response.status_text,
            "sendEmail Error(403), SES status:AccessDenied:not authorized"
        );
    }

    #[tokio::test]
    async fn test_ses_sdk_error_without_status_is_400() {
        let factory = Arc::new(FakeSesFactory::returning(Err(AwsServiceError {
            status: None,
            code: None,
            message: "dispatch failure".to_string(),
        })));
        let transport = SesTransport::new(factory, 10_000_000, 160);
        let message = MessageContent::new("Subject", "Body").unwrap();

        let response = transport.send_message(&destination(), &message, "ref").await;
        assert_eq!(response.status_code, 400);
    }

    #[tokio::test]
    async fn test_ses_credential_failure_is_503() {
        let mut factory = FakeSesFactory::returning(Ok("unused".to_string()));
        factory.fail_credentials = true;
        let transport = SesTransport::new(Arc::new(factory), 10_000_000, 160);
        let message = MessageContent::new("Subject", "Body").unwrap();

        let response = transport.send_message(&destination(), &message, "ref").await;
        assert_eq!(response.status_code, 503);
    }
}

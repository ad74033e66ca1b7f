use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use super::mime::build_email;
use super::DestinationTransport;
use crate::config::SmtpAccountCredentials;
use crate::destination::{Destination, EncryptionMethod, SmtpDestination};
use crate::message::{DestinationMessageResponse, MessageContent};

/// Failure of one SMTP delivery, classified by what the caller can do about it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SmtpSendError {
    /// Server refused the message or a recipient
    #[error("{0}")]
    Rejected(String),
    /// Could not reach or talk to the server
    #[error("{0}")]
    Connection(String),
    #[error("{0}")]
    Messaging(String),
}

impl SmtpSendError {
    pub fn status_code(&self) -> u16 {
        match self {
            SmtpSendError::Rejected(_) => 502,
            SmtpSendError::Connection(_) => 503,
            SmtpSendError::Messaging(_) => 424,
        }
    }
}

impl From<lettre::transport::smtp::Error> for SmtpSendError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        let detail = err.to_string();
        if err.is_permanent() || err.is_transient() {
            SmtpSendError::Rejected(detail)
        } else if err.is_client() || err.is_response() || err.is_transport_shutdown() {
            SmtpSendError::Messaging(detail)
        } else {
            SmtpSendError::Connection(detail)
        }
    }
}

/// Connection parameters of one SMTP session.
#[derive(Clone)]
pub struct SmtpSession {
    pub host: String,
    pub port: u16,
    pub encryption_method: EncryptionMethod,
    pub credentials: Option<SmtpAccountCredentials>,
    pub timeout: Duration,
}

/// Hands a finished message to an SMTP server.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, session: &SmtpSession, message: Message) -> Result<(), SmtpSendError>;
}

/// [`Mailer`] backed by lettre's async SMTP transport.
#[derive(Debug, Clone, Default)]
pub struct LettreMailer;

impl LettreMailer {
    fn transport(session: &SmtpSession) -> Result<AsyncSmtpTransport<Tokio1Executor>, SmtpSendError> {
        let builder = match session.encryption_method {
            EncryptionMethod::Ssl => AsyncSmtpTransport::<Tokio1Executor>::relay(&session.host)
                .map_err(SmtpSendError::from)?,
            EncryptionMethod::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&session.host)
                    .map_err(SmtpSendError::from)?
            }
            EncryptionMethod::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&session.host)
            }
        };

        let mut builder = builder
            .port(session.port)
            .timeout(Some(session.timeout));

        if session.encryption_method != EncryptionMethod::None {
            if let Some(account) = &session.credentials {
                builder = builder.credentials(Credentials::new(
                    account.username.clone(),
                    account.password.clone(),
                ));
            }
        }

        Ok(builder.build())
    }
}

#[async_trait]
impl Mailer for LettreMailer {
    async fn send(&self, session: &SmtpSession, message: Message) -> Result<(), SmtpSendError> {
        let transport = Self::transport(session)?;
        transport.send(message).await?;
        Ok(())
    }
}

/// Delivers email through SMTP relays.
pub struct SmtpTransport {
    mailer: Arc<dyn Mailer>,
    accounts: HashMap<String, SmtpAccountCredentials>,
    email_size_limit: usize,
    minimum_header_length: usize,
    timeout: Duration,
}

impl SmtpTransport {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        accounts: HashMap<String, SmtpAccountCredentials>,
        email_size_limit: usize,
        minimum_header_length: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            mailer,
            accounts,
            email_size_limit,
            minimum_header_length,
            timeout,
        }
    }

    fn session(&self, destination: &SmtpDestination) -> SmtpSession {
        SmtpSession {
            host: destination.host().to_string(),
            port: destination.port(),
            encryption_method: destination.encryption_method(),
            credentials: self.accounts.get(destination.account_name()).cloned(),
            timeout: self.timeout,
        }
    }
}

#[async_trait]
impl DestinationTransport for SmtpTransport {
    #[tracing::instrument(name = "transport.smtp", skip(self, destination, message))]
    async fn send_message(
        &self,
        destination: &Destination,
        message: &MessageContent,
        reference_id: &str,
    ) -> DestinationMessageResponse {
        let Destination::Smtp(smtp) = destination else {
            return DestinationMessageResponse::new(
                400,
                format!("SMTP transport cannot deliver to {}", destination.destination_type()),
            );
        };

        if message.estimated_email_size(self.minimum_header_length) > self.email_size_limit {
            return DestinationMessageResponse::new(
                413,
                format!("Email size larger than {}", self.email_size_limit),
            );
        }

        let email = match build_email(smtp.from_address(), smtp.recipient(), message) {
            Ok(email) => email,
            Err(e) => return DestinationMessageResponse::new(e.status_code(), e.to_string()),
        };

        tracing::debug!(reference_id = %reference_id, host = %smtp.host(), port = smtp.port(), "Sending email over SMTP");
        match self.mailer.send(&self.session(smtp), email).await {
            Ok(()) => {
                tracing::info!(reference_id = %reference_id, "Email sent over SMTP");
                DestinationMessageResponse::success()
            }
            Err(e) => {
                tracing::warn!(reference_id = %reference_id, error = %e, "SMTP send failed");
                DestinationMessageResponse::new(
                    e.status_code(),
                    format!("sendEmail Error, status:{}", e),
                )
            }
        }
    }
}

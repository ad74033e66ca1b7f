//! Transport dispatch
//!
//! One [`DestinationTransport`] per destination type, held in an immutable
//! [`TransportRegistry`] that is built and checked once at start-up.

mod http;
mod mime;
mod ses;
mod smtp;
mod sns;
mod telegram;
mod webhook;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

pub use http::build_http_client;
pub use mime::{build_email, MimeError};
pub use ses::SesTransport;
pub use smtp::{LettreMailer, Mailer, SmtpSendError, SmtpSession, SmtpTransport};
pub use sns::SnsTransport;
pub use telegram::TelegramTransport;
pub use webhook::WebhookTransport;

use crate::config::Settings;
use crate::credentials::{SesClientFactory, SnsClientFactory};
use crate::destination::{Destination, DestinationType};
use crate::error::{NotificationError, Result};
use crate::message::{DestinationMessageResponse, MessageContent};
use crate::validation::{HostDenyList, HostResolver};

/// Sends one message to one destination. Failures are reported in the
/// returned response, never as an error.
#[async_trait]
pub trait DestinationTransport: Send + Sync {
    async fn send_message(
        &self,
        destination: &Destination,
        message: &MessageContent,
        reference_id: &str,
    ) -> DestinationMessageResponse;
}

pub struct TransportRegistry {
    transports: HashMap<DestinationType, Arc<dyn DestinationTransport>>,
}

impl TransportRegistry {
    pub fn builder() -> TransportRegistryBuilder {
        TransportRegistryBuilder::default()
    }

    /// Standard wiring: one shared HTTP client for webhook and Telegram,
    /// lettre for SMTP, SDK clients for SES and SNS.
    pub fn from_settings(
        settings: &Settings,
        resolver: Arc<dyn HostResolver>,
        mailer: Arc<dyn Mailer>,
        ses_clients: Arc<dyn SesClientFactory>,
        sns_clients: Arc<dyn SnsClientFactory>,
    ) -> Result<Self> {
        let http_client = build_http_client(&settings.http)?;
        let deny_list = HostDenyList::new(&settings.core.host_deny_list);

        let webhook: Arc<dyn DestinationTransport> = Arc::new(WebhookTransport::new(
            http_client.clone(),
            deny_list,
            resolver,
        ));
        let smtp = Arc::new(SmtpTransport::new(
            mailer,
            settings.smtp.accounts.clone(),
            settings.core.email_size_limit,
            settings.core.email_minimum_header_length,
            settings.http.socket_timeout(),
        ));
        let ses = Arc::new(SesTransport::new(
            ses_clients,
            settings.core.email_size_limit,
            settings.core.email_minimum_header_length,
        ));
        let sns = Arc::new(SnsTransport::new(sns_clients));
        let telegram = Arc::new(TelegramTransport::new(
            http_client,
            settings.telegram.api_base_url.clone(),
        ));

        Self::builder()
            .register(DestinationType::Slack, webhook.clone())
            .register(DestinationType::Chime, webhook.clone())
            .register(DestinationType::MicrosoftTeams, webhook.clone())
            .register(DestinationType::CustomWebhook, webhook)
            .register(DestinationType::Smtp, smtp)
            .register(DestinationType::Ses, ses)
            .register(DestinationType::Sns, sns)
            .register(DestinationType::Telegram, telegram)
            .build()
    }

    pub fn get(&self, destination_type: DestinationType) -> Result<&Arc<dyn DestinationTransport>> {
        self.transports
            .get(&destination_type)
            .ok_or_else(|| NotificationError::UnsupportedDestination(destination_type.to_string()))
    }

    pub fn registered_types(&self) -> Vec<DestinationType> {
        let mut types: Vec<_> = self.transports.keys().copied().collect();
        types.sort();
        types
    }
}

#[derive(Default)]
pub struct TransportRegistryBuilder {
    transports: HashMap<DestinationType, Arc<dyn DestinationTransport>>,
}

impl TransportRegistryBuilder {
    pub fn register(
        mut self,
        destination_type: DestinationType,
        transport: Arc<dyn DestinationTransport>,
    ) -> Self {
        self.transports.insert(destination_type, transport);
        self
    }

    /// Build a registry covering every destination type.
    pub fn build(self) -> Result<TransportRegistry> {
        self.build_for(&DestinationType::ALL)
    }

    /// Build a registry that must cover at least `required`.
    pub fn build_for(self, required: &[DestinationType]) -> Result<TransportRegistry> {
        if let Some(missing) = required
            .iter()
            .find(|t| !self.transports.contains_key(*t))
        {
            tracing::error!(destination_type = %missing, "No transport registered");
            return Err(NotificationError::UnsupportedDestination(missing.to_string()));
        }

        tracing::info!(
            transports = self.transports.len(),
            "Transport registry initialized"
        );
        Ok(TransportRegistry {
            transports: self.transports,
        })
    }
}

//! Destination model
//!
//! A closed set of destination variants. Every constructor validates its
//! input, so a `Destination` value is always safe to dispatch.

mod email;
mod sns;
mod telegram;
mod webhook;

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

pub use email::{EncryptionMethod, SesDestination, SmtpDestination};
pub use sns::SnsDestination;
pub use telegram::TelegramDestination;
pub use webhook::{CustomWebhookDestination, HttpMethod, WebhookDestination};

use crate::config::SmtpConfig;
use crate::error::{NotificationError, Result};
use crate::validation::HostDenyList;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DestinationType {
    Slack,
    Chime,
    MicrosoftTeams,
    CustomWebhook,
    Sns,
    Ses,
    Smtp,
    Telegram,
}

impl DestinationType {
    pub const ALL: [DestinationType; 8] = [
        DestinationType::Slack,
        DestinationType::Chime,
        DestinationType::MicrosoftTeams,
        DestinationType::CustomWebhook,
        DestinationType::Sns,
        DestinationType::Ses,
        DestinationType::Smtp,
        DestinationType::Telegram,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationType::Slack => "slack",
            DestinationType::Chime => "chime",
            DestinationType::MicrosoftTeams => "microsoft_teams",
            DestinationType::CustomWebhook => "webhook",
            DestinationType::Sns => "sns",
            DestinationType::Ses => "ses_account",
            DestinationType::Smtp => "smtp_account",
            DestinationType::Telegram => "telegram",
        }
    }

    pub fn is_email(&self) -> bool {
        matches!(self, DestinationType::Ses | DestinationType::Smtp)
    }
}

impl fmt::Display for DestinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Slack(WebhookDestination),
    Chime(WebhookDestination),
    MicrosoftTeams(WebhookDestination),
    CustomWebhook(CustomWebhookDestination),
    Sns(SnsDestination),
    Ses(SesDestination),
    Smtp(SmtpDestination),
    Telegram(TelegramDestination),
}

impl Destination {
    pub fn destination_type(&self) -> DestinationType {
        match self {
            Destination::Slack(_) => DestinationType::Slack,
            Destination::Chime(_) => DestinationType::Chime,
            Destination::MicrosoftTeams(_) => DestinationType::MicrosoftTeams,
            Destination::CustomWebhook(_) => DestinationType::CustomWebhook,
            Destination::Sns(_) => DestinationType::Sns,
            Destination::Ses(_) => DestinationType::Ses,
            Destination::Smtp(_) => DestinationType::Smtp,
            Destination::Telegram(_) => DestinationType::Telegram,
        }
    }

    pub fn slack(url: &str, deny_list: &HostDenyList) -> Result<Self> {
        Ok(Destination::Slack(WebhookDestination::new(url, deny_list)?))
    }

    pub fn chime(url: &str, deny_list: &HostDenyList) -> Result<Self> {
        Ok(Destination::Chime(WebhookDestination::new(url, deny_list)?))
    }

    pub fn microsoft_teams(url: &str, deny_list: &HostDenyList) -> Result<Self> {
        Ok(Destination::MicrosoftTeams(WebhookDestination::new(
            url, deny_list,
        )?))
    }
}

fn default_method() -> String {
    "POST".to_string()
}

/// Serialized destination, as found in config documents and send requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DestinationConfig {
    Slack {
        url: String,
    },
    Chime {
        url: String,
    },
    MicrosoftTeams {
        url: String,
    },
    Webhook {
        url: String,
        #[serde(default)]
        header_params: BTreeMap<String, String>,
        #[serde(default = "default_method")]
        method: String,
    },
    Sns {
        topic_arn: String,
        #[serde(default)]
        role_arn: Option<String>,
    },
    SesAccount {
        account_name: String,
        aws_region: String,
        #[serde(default)]
        role_arn: Option<String>,
        from_address: String,
        recipient: String,
    },
    /// Missing connection fields are filled by [`DestinationConfig::with_smtp_defaults`].
    SmtpAccount {
        account_name: String,
        #[serde(default)]
        host: Option<String>,
        #[serde(default)]
        port: Option<u16>,
        #[serde(default)]
        encryption_method: Option<String>,
        from_address: String,
        recipient: String,
    },
    Telegram {
        bot_token: String,
        chat_id: String,
    },
}

impl DestinationConfig {
    /// Fill unset SMTP host, port and encryption from the configured defaults.
    pub fn with_smtp_defaults(self, defaults: &SmtpConfig) -> Self {
        match self {
            DestinationConfig::SmtpAccount {
                account_name,
                host,
                port,
                encryption_method,
                from_address,
                recipient,
            } => DestinationConfig::SmtpAccount {
                account_name,
                host: host.or_else(|| Some(defaults.host.clone())),
                port: port.or(Some(defaults.port)),
                encryption_method: encryption_method.or_else(|| Some(defaults.encryption_method.clone())),
                from_address,
                recipient,
            },
            other => other,
        }
    }

    pub fn into_destination(self, deny_list: &HostDenyList) -> Result<Destination> {
        match self {
            DestinationConfig::Slack { url } => Destination::slack(&url, deny_list),
            DestinationConfig::Chime { url } => Destination::chime(&url, deny_list),
            DestinationConfig::MicrosoftTeams { url } => Destination::microsoft_teams(&url, deny_list),
            DestinationConfig::Webhook {
                url,
                header_params,
                method,
            } => Ok(Destination::CustomWebhook(CustomWebhookDestination::new(
                &url,
                header_params,
                &method,
                deny_list,
            )?)),
            DestinationConfig::Sns {
                topic_arn,
                role_arn,
            } => Ok(Destination::Sns(SnsDestination::new(
                &topic_arn,
                role_arn.as_deref(),
            )?)),
            DestinationConfig::SesAccount {
                account_name,
                aws_region,
                role_arn,
                from_address,
                recipient,
            } => Ok(Destination::Ses(SesDestination::new(
                &account_name,
                &aws_region,
                role_arn.as_deref(),
                &from_address,
                &recipient,
            )?)),
            DestinationConfig::SmtpAccount {
                account_name,
                host,
                port,
                encryption_method,
                from_address,
                recipient,
            } => Ok(Destination::Smtp(SmtpDestination::new(
                &account_name,
                &host.ok_or_else(|| missing_smtp_field("host"))?,
                port.ok_or_else(|| missing_smtp_field("port"))?,
                &encryption_method.ok_or_else(|| missing_smtp_field("encryption_method"))?,
                &from_address,
                &recipient,
            )?)),
            DestinationConfig::Telegram { bot_token, chat_id } => Ok(Destination::Telegram(
                TelegramDestination::new(&bot_token, &chat_id)?,
            )),
        }
    }
}

fn missing_smtp_field(field: &str) -> NotificationError {
    NotificationError::InvalidDestination(format!("SMTP {} is required", field))
}

//! End-to-end tests through the public API
//!
//! Transports are real where they can run against local fakes (wiremock,
//! unresolvable SMTP hosts) and trait-object fakes everywhere else. No
//! Redis, AWS account or SMTP server is required.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notification_delivery::config::{CoreConfig, CounterConfig, HttpConfig, Settings};
use notification_delivery::credentials::{
    AwsServiceError, CredentialError, SesApi, SesClientFactory, SnsApi, SnsClientFactory,
};
use notification_delivery::destination::{
    CustomWebhookDestination, Destination, DestinationConfig, DestinationType, SmtpDestination,
    SnsDestination, TelegramDestination,
};
use notification_delivery::error::NotificationError;
use notification_delivery::message::{DestinationMessageResponse, MessageContent};
use notification_delivery::notification::{DirectExecution, NotificationCore};
use notification_delivery::throttle::{create_counter_store, Accountant, Counters};
use notification_delivery::transport::{
    build_http_client, DestinationTransport, LettreMailer, SmtpTransport, TelegramTransport,
    TransportRegistry,
};
use notification_delivery::validation::{validate_email, HostDenyList, SystemResolver};

// ============================================================================
// Fakes
// ============================================================================

struct RecordingTransport {
    response: DestinationMessageResponse,
    seen: Mutex<Vec<(DestinationType, String)>>,
}

impl RecordingTransport {
    fn new(response: DestinationMessageResponse) -> Arc<Self> {
        Arc::new(Self {
            response,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl DestinationTransport for RecordingTransport {
    async fn send_message(
        &self,
        destination: &Destination,
        _message: &MessageContent,
        reference_id: &str,
    ) -> DestinationMessageResponse {
        self.seen
            .lock()
            .unwrap()
            .push((destination.destination_type(), reference_id.to_string()));
        self.response.clone()
    }
}

struct NoAws;

#[async_trait]
impl SesClientFactory for NoAws {
    async fn create_ses_client(
        &self,
        _region: &str,
        role_arn: Option<&str>,
    ) -> Result<Arc<dyn SesApi>, CredentialError> {
        Err(CredentialError::MissingCredentials(role_arn.unwrap_or("default").to_string()))
    }
}

#[async_trait]
impl SnsClientFactory for NoAws {
    async fn create_sns_client(
        &self,
        _region: &str,
        _role_arn: Option<&str>,
    ) -> Result<Arc<dyn SnsApi>, CredentialError> {
        Ok(Arc::new(RejectingSns))
    }
}

struct RejectingSns;

#[async_trait]
impl SnsApi for RejectingSns {
    async fn publish(&self, _topic_arn: &str, _message: &str, _subject: &str) -> Result<String, AwsServiceError> {
        Err(AwsServiceError {
            status: Some(403),
            code: Some("AuthorizationError".to_string()),
            message: "not allowed".to_string(),
        })
    }
}

fn full_registry(transport: Arc<RecordingTransport>) -> TransportRegistry {
    DestinationType::ALL
        .iter()
        .fold(TransportRegistry::builder(), |builder, t| {
            builder.register(*t, transport.clone())
        })
        .build()
        .unwrap()
}

fn message() -> MessageContent {
    MessageContent::new("Alert", "Disk full").unwrap()
}

fn day(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

// ============================================================================
// Core façade
// ============================================================================

#[tokio::test]
async fn test_core_routes_by_destination_type() {
    let transport = RecordingTransport::new(DestinationMessageResponse::success());
    let core = NotificationCore::new(
        full_registry(transport.clone()),
        Arc::new(DirectExecution),
        CoreConfig::default(),
    );

    let deny = HostDenyList::default();
    let slack = Destination::slack("https://hooks.slack.com/services/T/B/x", &deny).unwrap();
    let sns = Destination::Sns(
        SnsDestination::new("arn:aws:sns:us-west-2:012345678912:alerts", None).unwrap(),
    );

    assert!(core.send_message(&slack, &message(), "a").await.unwrap().is_success());
    assert!(core.send_message(&sns, &message(), "b").await.unwrap().is_success());

    assert_eq!(
        *transport.seen.lock().unwrap(),
        vec![
            (DestinationType::Slack, "a".to_string()),
            (DestinationType::Sns, "b".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_core_telegram_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot42:secret/sendMessage"))
        .and(body_json(json!({
            "chat_id": "-100123",
            "text": "Alert\n\nDisk full",
            "disable_web_page_preview": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let http = build_http_client(&HttpConfig::default()).unwrap();
    let registry = TransportRegistry::builder()
        .register(DestinationType::Telegram, Arc::new(TelegramTransport::new(http, server.uri())))
        .build_for(&[DestinationType::Telegram])
        .unwrap();
    let core = NotificationCore::new(registry, Arc::new(DirectExecution), CoreConfig::default());
    let telegram = Destination::Telegram(TelegramDestination::new("42:secret", "-100123").unwrap());

    let response = core.send_message(&telegram, &message(), "ref").await.unwrap();
    assert_eq!(response, DestinationMessageResponse::success());
}

#[tokio::test]
async fn test_standard_registry_covers_every_type() {
    let settings = Settings::default();
    let registry = TransportRegistry::from_settings(
        &settings,
        Arc::new(SystemResolver),
        Arc::new(LettreMailer),
        Arc::new(NoAws),
        Arc::new(NoAws),
    )
    .unwrap();
    assert_eq!(registry.registered_types().len(), DestinationType::ALL.len());

    let core = NotificationCore::new(registry, Arc::new(DirectExecution), settings.core.clone());
    let sns = Destination::Sns(SnsDestination::new("arn:aws:sns:eu-west-1:012345678912:t", None).unwrap());
    let response = core.send_message(&sns, &message(), "ref").await.unwrap();
    assert_eq!(response.status_code, 403);
    assert_eq!(response.status_text, "SNS Send Error(403), SNS status:AuthorizationError:not allowed");

    let ses = DestinationConfig::SesAccount {
        account_name: "ops".to_string(),
        aws_region: "us-east-1".to_string(),
        role_arn: None,
        from_address: "from@example.com".to_string(),
        recipient: "to@example.com".to_string(),
    }
    .into_destination(&HostDenyList::default())
    .unwrap();
    let response = core.send_message(&ses, &message(), "ref").await.unwrap();
    assert_eq!(response.status_code, 503);
}

// ============================================================================
// Destination validation
// ============================================================================

#[test]
fn test_private_address_webhook_rejected_without_network() {
    let deny = HostDenyList::new(&["10.0.0.0/8", "169.254.0.0/16"]);
    let result = CustomWebhookDestination::new("https://10.0.0.5/hook", BTreeMap::new(), "POST", &deny);
    assert!(matches!(result, Err(NotificationError::InvalidDestination(_))));
}

#[test]
fn test_plain_http_rejected() {
    let result = Destination::slack("http://hooks.slack.com/services/T/B/x", &HostDenyList::default());
    assert!(matches!(result, Err(NotificationError::InvalidDestination(_))));
}

#[test]
fn test_email_validation_is_stable() {
    for address in ["ops@example.com", "not-an-email", "a@b"] {
        assert_eq!(validate_email(address).is_ok(), validate_email(address).is_ok());
    }
    assert!(validate_email("ops@example.com").is_ok());
    assert!(validate_email("not-an-email").is_err());
}

#[test]
fn test_sns_region_from_topic_arn() {
    let sns = SnsDestination::new("arn:aws:sns:us-west-2:012345678912:test-notification", None).unwrap();
    assert_eq!(sns.region(), "us-west-2");
}

#[test]
fn test_attachment_requires_file_name() {
    let result = MessageContent::builder("Report", "See attached")
        .file_encoding("base64")
        .file_data("aGVsbG8=")
        .build();
    assert!(matches!(result, Err(NotificationError::InvalidMessage(_))));
}

#[test]
fn test_destination_config_from_json() {
    let config: DestinationConfig = serde_json::from_value(json!({
        "type": "webhook",
        "url": "https://hooks.example.com/in",
        "header_params": {"X-Token": "abc"},
        "method": "PUT"
    }))
    .unwrap();
    let destination = config.into_destination(&HostDenyList::default()).unwrap();
    assert_eq!(destination.destination_type(), DestinationType::CustomWebhook);
}

// ============================================================================
// SMTP
// ============================================================================

#[tokio::test]
async fn test_smtp_unresolvable_host_is_503() {
    let transport = SmtpTransport::new(
        Arc::new(LettreMailer),
        HashMap::new(),
        10_000_000,
        160,
        Duration::from_secs(5),
    );
    let destination = Destination::Smtp(
        SmtpDestination::new(
            "ops",
            "mail.nowhere.invalid",
            25,
            "none",
            "from@example.com",
            "to@example.com",
        )
        .unwrap(),
    );

    let response = transport.send_message(&destination, &message(), "ref").await;

    assert_eq!(response.status_code, 503);
    assert!(response.status_text.starts_with("sendEmail Error, status:"));
}

// ============================================================================
// Quota protocol
// ============================================================================

#[tokio::test]
async fn test_quota_boundary_at_limit() {
    let accountant = Accountant::new(200, Duration::from_secs(5));
    accountant
        .initialize(create_counter_store(&CounterConfig::default(), None))
        .await;

    let prior = Counters {
        request_count: 199,
        email_sent_success_count: 199,
        ..Default::default()
    };
    accountant.increment_counters_on(day(4, 2), &prior).await.unwrap();

    let one = Counters::email_attempt(true);
    let two = Counters {
        email_sent_success_count: 2,
        ..Default::default()
    };
    assert!(accountant.is_message_quota_available_on(day(4, 28), &one).await.unwrap());
    assert!(!accountant.is_message_quota_available_on(day(4, 28), &two).await.unwrap());

    // Next month starts from zero
    assert!(accountant.is_message_quota_available_on(day(5, 1), &two).await.unwrap());
}

#[tokio::test]
async fn test_check_send_increment() {
    let transport = RecordingTransport::new(DestinationMessageResponse::success());
    let core = NotificationCore::new(
        full_registry(transport),
        Arc::new(DirectExecution),
        CoreConfig::default(),
    );
    let accountant = Accountant::new(1, Duration::from_secs(5));
    accountant
        .initialize(create_counter_store(&CounterConfig::default(), None))
        .await;
    let smtp = Destination::Smtp(
        SmtpDestination::new("ops", "smtp.example.com", 587, "start_tls", "a@example.com", "b@example.com")
            .unwrap(),
    );
    let today = day(9, 9);

    for expected_allowed in [true, false] {
        let allowed = accountant
            .is_message_quota_available_on(today, &Counters::email_attempt(true))
            .await
            .unwrap();
        assert_eq!(allowed, expected_allowed);
        if allowed {
            let response = core.send_message(&smtp, &message(), "ref").await.unwrap();
            accountant
                .increment_counters_on(today, &Counters::email_attempt(response.is_success()))
                .await
                .unwrap();
        }
    }

    let month = accountant.monthly_counters(today).await.unwrap();
    assert_eq!(month.email_sent_success_count, 1);
}

use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use notification_delivery::config::Settings;
use notification_delivery::credentials::{AwsSesClientFactory, AwsSnsClientFactory, CredentialsProviderFactory};
use notification_delivery::destination::{Destination, DestinationConfig};
use notification_delivery::message::{DestinationMessageResponse, MessageContent, MessagePayload};
use notification_delivery::notification::{DirectExecution, NotificationCore, PrivilegedExecution};
use notification_delivery::redis::{CircuitBreaker, RedisHealth, RedisPool};
use notification_delivery::telemetry::init_telemetry;
use notification_delivery::throttle::{create_counter_store, Accountant, Counters};
use notification_delivery::transport::{LettreMailer, TransportRegistry};
use notification_delivery::validation::{HostDenyList, SystemResolver};

/// One test message: where to send it and what to send.
#[derive(Debug, Deserialize)]
struct SendRequest {
    destination: DestinationConfig,
    message: MessagePayload,
    #[serde(default)]
    reference_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let settings = Settings::new().context("loading configuration")?;
    let _telemetry = init_telemetry(&settings.otel)?;
    tracing::info!("Configuration loaded");

    let request = read_request(std::env::args().nth(1).as_deref())?;
    let deny_list = HostDenyList::new(&settings.core.host_deny_list);
    let destination = request
        .destination
        .with_smtp_defaults(&settings.smtp)
        .into_destination(&deny_list)?;
    let message = MessageContent::try_from(request.message)?;
    let reference_id = request
        .reference_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let privileged: Arc<dyn PrivilegedExecution> = Arc::new(DirectExecution);
    let timeout = settings.core.operation_timeout();
    let registry = TransportRegistry::from_settings(
        &settings,
        Arc::new(SystemResolver),
        Arc::new(LettreMailer),
        Arc::new(AwsSesClientFactory::new(
            CredentialsProviderFactory::sts(timeout),
            privileged.clone(),
        )),
        Arc::new(AwsSnsClientFactory::new(
            CredentialsProviderFactory::sts(timeout),
            privileged.clone(),
        )),
    )?;
    let core = NotificationCore::new(registry, privileged, settings.core.clone());

    let accountant = Accountant::new(settings.core.monthly_email_limit, timeout);
    let redis_pool = if settings.counter.backend == "redis" {
        Some(Arc::new(RedisPool::new(
            &settings.redis,
            Arc::new(CircuitBreaker::default()),
            Arc::new(RedisHealth::new()),
        )?))
    } else {
        None
    };
    accountant
        .initialize(create_counter_store(&settings.counter, redis_pool))
        .await;

    let response = send_with_quota(&core, &accountant, &destination, &message, &reference_id).await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Quota check (email only), send, then record the outcome.
async fn send_with_quota(
    core: &NotificationCore,
    accountant: &Accountant,
    destination: &Destination,
    message: &MessageContent,
    reference_id: &str,
) -> Result<DestinationMessageResponse> {
    let is_email = destination.destination_type().is_email();
    let attempt = |success| {
        if is_email {
            Counters::email_attempt(success)
        } else {
            Counters::message_attempt(success)
        }
    };

    if is_email && !accountant.is_message_quota_available(&attempt(true)).await? {
        tracing::info!(reference_id = %reference_id, "Message sending quota not available");
        return Ok(DestinationMessageResponse::new(
            429,
            "Message Sending quota not available",
        ));
    }

    let response = core.send_message(destination, message, reference_id).await?;

    if let Err(e) = accountant.increment_counters(&attempt(response.is_success())).await {
        tracing::warn!(reference_id = %reference_id, error = %e, "Failed to record send counters");
    }
    Ok(response)
}

/// Read the request from `path`, or stdin when no path (or `-`) is given.
fn read_request(path: Option<&str>) -> Result<SendRequest> {
    let raw = match path {
        Some(path) if path != "-" => {
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?
        }
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("reading request from stdin")?;
            buffer
        }
    };
    serde_json::from_str(&raw).context("parsing send request")
}

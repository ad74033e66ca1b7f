use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::config::CoreConfig;
use crate::destination::Destination;
use crate::error::Result;
use crate::message::{DestinationMessageResponse, MessageContent};
use crate::metrics::SendMetrics;
use crate::transport::TransportRegistry;

use super::privileged::{run_privileged, PrivilegedExecution};

/// Entry point for sending notifications.
///
/// Picks the transport for a destination, runs the send inside the
/// privilege scope and hands back the transport's response unchanged.
/// Quota accounting is left to the caller (see [`crate::throttle::Accountant`]).
pub struct NotificationCore {
    registry: TransportRegistry,
    privileged: Arc<dyn PrivilegedExecution>,
    settings: CoreConfig,
}

impl NotificationCore {
    pub fn new(
        registry: TransportRegistry,
        privileged: Arc<dyn PrivilegedExecution>,
        settings: CoreConfig,
    ) -> Self {
        Self {
            registry,
            privileged,
            settings,
        }
    }

    /// Send one message to one destination.
    ///
    /// Delivery failures come back as a non-2xx response. `Err` is only
    /// returned when no transport handles the destination type.
    #[tracing::instrument(
        name = "notification.send",
        skip(self, destination, message),
        fields(destination_type = %destination.destination_type())
    )]
    pub async fn send_message(
        &self,
        destination: &Destination,
        message: &MessageContent,
        reference_id: &str,
    ) -> Result<DestinationMessageResponse> {
        let destination_type = destination.destination_type();
        let transport = self.registry.get(destination_type)?;

        let started = Instant::now();
        let response = run_privileged(
            self.privileged.as_ref(),
            "send_message",
            transport.send_message(destination, message, reference_id),
        )
        .await;
        SendMetrics::record(destination_type, response.status_code, started.elapsed());

        if response.is_success() {
            tracing::info!(reference_id = %reference_id, "Notification delivered");
        } else {
            tracing::warn!(
                reference_id = %reference_id,
                status_code = response.status_code,
                status_text = %response.status_text,
                "Notification delivery failed"
            );
        }
        Ok(response)
    }

    pub async fn allowed_config_types(&self) -> Vec<String> {
        run_privileged(self.privileged.as_ref(), "get_allowed_config_types", async {
            self.settings.allowed_config_types.clone()
        })
        .await
    }

    pub async fn allowed_config_features(&self) -> Vec<String> {
        run_privileged(self.privileged.as_ref(), "get_allowed_config_features", async {
            self.settings.allowed_config_features.clone()
        })
        .await
    }

    pub async fn plugin_features(&self) -> HashMap<String, String> {
        run_privileged(self.privileged.as_ref(), "get_plugin_features", async {
            HashMap::from([(
                "tooltip_support".to_string(),
                self.settings.tooltip_support.to_string(),
            )])
        })
        .await
    }
}

//! Shared HTTP client and response normalization for webhook style transports

use reqwest::redirect::Policy;
use reqwest::{Client, Response};

use crate::config::HttpConfig;
use crate::error::{NotificationError, Result};
use crate::message::DestinationMessageResponse;

/// Build the client shared by every HTTP send.
///
/// Redirects are never followed: the deny-list only vets the configured URL,
/// so a 3xx is returned to the caller as a failed send.
pub fn build_http_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .redirect(Policy::none())
        .connect_timeout(config.connection_timeout())
        .timeout(config.socket_timeout())
        .pool_max_idle_per_host(config.max_connections_per_route)
        .build()
        .map_err(|e| NotificationError::Internal(format!("Failed to build HTTP client: {}", e)))
}

/// 2xx is success; any other status is passed through with the body as text.
pub async fn response_from_http(response: Response) -> DestinationMessageResponse {
    let status = response.status();
    if status.is_success() {
        return DestinationMessageResponse::success();
    }

    let body = response.text().await.unwrap_or_default();
    DestinationMessageResponse::new(status.as_u16(), body)
}

/// Network level failures (connect, timeout, TLS) map to 503.
pub fn response_from_error(err: reqwest::Error) -> DestinationMessageResponse {
    let detail = if err.is_timeout() {
        format!("Request timed out: {}", err)
    } else {
        format!("Failed to send message: {}", err)
    };
    DestinationMessageResponse::new(503, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_response_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(418).set_body_string("teapot"))
            .mount(&server)
            .await;

        let client = build_http_client(&HttpConfig::default()).unwrap();
        let response = client.get(server.uri()).send().await.unwrap();
        let mapped = response_from_http(response).await;

        assert_eq!(mapped, DestinationMessageResponse::new(418, "teapot"));
    }

    #[tokio::test]
    async fn test_timeout_maps_to_503() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let config = HttpConfig {
            socket_timeout_ms: 50,
            ..HttpConfig::default()
        };
        let client = build_http_client(&config).unwrap();
        let err = client.get(server.uri()).send().await.unwrap_err();
        let mapped = response_from_error(err);

        assert_eq!(mapped.status_code, 503);
        assert!(mapped.status_text.starts_with("Request timed out"));
    }
}

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde_json::{Map, Value};
use url::Url;

use super::http::{response_from_error, response_from_http};
use super::DestinationTransport;
use crate::destination::{Destination, HttpMethod};
use crate::message::{DestinationMessageResponse, MessageContent};
use crate::validation::{HostDenyList, HostResolver};

/// Request derived from a webhook destination and a message.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WebhookRequest {
    pub url: Url,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl WebhookRequest {
    pub(crate) fn build(destination: &Destination, message: &MessageContent) -> Option<Self> {
        let chat = |url: &Url, key: &str| {
            let mut body = Map::new();
            body.insert(key.to_string(), Value::String(message.build_message_with_title()));
            WebhookRequest {
                url: url.clone(),
                method: HttpMethod::Post,
                headers: vec![("Content-Type".to_string(), "application/json".to_string())],
                body: Some(Value::Object(body).to_string()),
            }
        };

        match destination {
            Destination::Slack(dest) | Destination::MicrosoftTeams(dest) => Some(chat(dest.url(), "text")),
            Destination::Chime(dest) => Some(chat(dest.url(), "Content")),
            Destination::CustomWebhook(dest) => {
                let mut headers: Vec<(String, String)> = dest
                    .header_params()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                if headers.is_empty() {
                    headers.push(("Content-Type".to_string(), "application/json".to_string()));
                }
                let body = match dest.method() {
                    HttpMethod::Get => None,
                    _ => Some(message.text_description().to_string()),
                };
                Some(WebhookRequest {
                    url: dest.url().clone(),
                    method: dest.method(),
                    headers,
                    body,
                })
            }
            _ => None,
        }
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
    }
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, String> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("Invalid header name '{}': {}", name, e))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| format!("Invalid header value for '{}': {}", name, e))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Delivers Slack, Chime, Microsoft Teams and custom webhook messages.
pub struct WebhookTransport {
    client: Client,
    deny_list: HostDenyList,
    resolver: Arc<dyn HostResolver>,
}

impl WebhookTransport {
    pub fn new(client: Client, deny_list: HostDenyList, resolver: Arc<dyn HostResolver>) -> Self {
        Self {
            client,
            deny_list,
            resolver,
        }
    }
}

#[async_trait]
impl DestinationTransport for WebhookTransport {
    #[tracing::instrument(
        name = "transport.webhook",
        skip(self, destination, message),
        fields(destination_type = %destination.destination_type())
    )]
    async fn send_message(
        &self,
        destination: &Destination,
        message: &MessageContent,
        reference_id: &str,
    ) -> DestinationMessageResponse {
        let Some(request) = WebhookRequest::build(destination, message) else {
            return DestinationMessageResponse::new(
                400,
                format!(
                    "Webhook transport cannot deliver to {}",
                    destination.destination_type()
                ),
            );
        };

        if let Err(e) = self
            .deny_list
            .check_resolved(&request.url, self.resolver.as_ref())
            .await
        {
            tracing::warn!(reference_id = %reference_id, error = %e, "Webhook host denied at send time");
            return e.into();
        }

        let headers = match header_map(&request.headers) {
            Ok(headers) => headers,
            Err(detail) => return DestinationMessageResponse::new(400, detail),
        };

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), request.url.clone())
            .headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let start = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response_from_http(response).await,
            Err(e) => {
                tracing::warn!(reference_id = %reference_id, error = %e, "Webhook request failed");
                response_from_error(e)
            }
        };

        tracing::debug!(
            reference_id = %reference_id,
            status = response.status_code,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Webhook message sent"
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::destination::{CustomWebhookDestination, WebhookDestination};
    use crate::transport::http::build_http_client;
    use crate::validation::testing::StaticResolver;
    use serde_json::json;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_json, body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(deny: &[&str], resolver: StaticResolver) -> WebhookTransport {
        WebhookTransport::new(
            build_http_client(&HttpConfig::default()).unwrap(),
            HostDenyList::new(deny),
            Arc::new(resolver),
        )
    }

    fn message() -> MessageContent {
        MessageContent::new("Alert", "CPU high").unwrap()
    }

    #[test]
    fn test_request_bodies() {
        let url = "https://hooks.example.com/x";
        let slack = Destination::Slack(WebhookDestination::unchecked(url));
        let chime = Destination::Chime(WebhookDestination::unchecked(url));

        let slack_req = WebhookRequest::build(&slack, &message()).unwrap();
        assert_eq!(slack_req.body.as_deref(), Some(r#"{"text":"Alert\n\nCPU high"}"#));

        let chime_req = WebhookRequest::build(&chime, &message()).unwrap();
        assert_eq!(chime_req.body.as_deref(), Some(r#"{"Content":"Alert\n\nCPU high"}"#));
        assert_eq!(chime_req.method, HttpMethod::Post);
    }

    #[test]
    fn test_custom_webhook_defaults() {
        let dest = Destination::CustomWebhook(CustomWebhookDestination::unchecked(
            "https://example.com/hook",
            BTreeMap::new(),
            HttpMethod::Get,
        ));
        let request = WebhookRequest::build(&dest, &message()).unwrap();
        assert_eq!(
            request.headers,
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
        assert!(request.body.is_none());
    }

    #[tokio::test]
    async fn test_slack_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/hook"))
            .and(body_json(json!({"text": "Alert\n\nCPU high"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let dest = Destination::Slack(WebhookDestination::unchecked(&format!(
            "{}/services/hook",
            server.uri()
        )));
        let response = transport(&[], StaticResolver::default())
            .send_message(&dest, &message(), "ref-1")
            .await;

        assert_eq!(response, DestinationMessageResponse::success());
    }

    #[tokio::test]
    async fn test_remote_error_passthrough() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(header("X-Api-Key", "secret"))
            .and(body_string("CPU high"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such hook"))
            .mount(&server)
            .await;

        let mut headers = BTreeMap::new();
        headers.insert("X-Api-Key".to_string(), "secret".to_string());
        let dest = Destination::CustomWebhook(CustomWebhookDestination::unchecked(
            &format!("{}/hook", server.uri()),
            headers,
            HttpMethod::Put,
        ));

        let response = transport(&[], StaticResolver::default())
            .send_message(&dest, &message(), "ref-2")
            .await;

        assert_eq!(response, DestinationMessageResponse::new(404, "no such hook"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_503() {
        // Nothing listens on port 9 locally
        let dest = Destination::Slack(WebhookDestination::unchecked("http://127.0.0.1:9/hook"));
        let response = transport(&[], StaticResolver::default())
            .send_message(&dest, &message(), "ref-3")
            .await;

        assert_eq!(response.status_code, 503);
        assert!(!response.status_text.is_empty());
    }

    #[tokio::test]
    async fn test_resolved_denied_host_is_not_contacted() {
        let dest = Destination::Slack(WebhookDestination::unchecked("https://sneaky.example.com/hook"));
        let resolver = StaticResolver::with("sneaky.example.com", &["10.9.8.7"]);

        let response = transport(&["10.0.0.0/8"], resolver)
            .send_message(&dest, &message(), "ref-4")
            .await;

        assert_eq!(response.status_code, 400);
        assert!(response.status_text.contains("denied"));
    }

    #[tokio::test]
    async fn test_redirect_to_denied_host_not_followed() {
        let internal = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&internal)
            .await;

        let port = internal.address().port();
        let public = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(
                ResponseTemplate::new(307)
                    .insert_header("Location", format!("http://localhost:{}/internal", port).as_str()),
            )
            .expect(1)
            .mount(&public)
            .await;

        let dest = Destination::Slack(WebhookDestination::unchecked(&format!("{}/hook", public.uri())));
        let response = transport(&["localhost"], StaticResolver::default())
            .send_message(&dest, &message(), "ref-6")
            .await;

        assert_eq!(response.status_code, 307);
        assert!(!response.is_success());
        assert!(internal.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_non_webhook_destination_rejected() {
        let dest = Destination::Telegram(
            crate::destination::TelegramDestination::new("1:abc", "42").unwrap(),
        );
        let response = transport(&[], StaticResolver::default())
            .send_message(&dest, &message(), "ref-5")
            .await;
        assert_eq!(response.status_code, 400);
    }
}

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{NotificationError, Result};
use crate::validation::{validate_http_method, validate_url, HostDenyList};

/// Incoming webhook of a chat service (Slack, Chime, Microsoft Teams).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookDestination {
    url: Url,
}

impl WebhookDestination {
    pub fn new(url: &str, deny_list: &HostDenyList) -> Result<Self> {
        Ok(Self {
            url: validate_url(url, deny_list)?,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    #[cfg(test)]
    pub(crate) fn unchecked(url: &str) -> Self {
        Self {
            url: Url::parse(url).unwrap(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            other => {
                validate_http_method(other)?;
                Err(NotificationError::InvalidDestination(format!(
                    "Unsupported method: {}",
                    other
                )))
            }
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arbitrary HTTPS endpoint with caller-supplied headers and method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomWebhookDestination {
    url: Url,
    header_params: BTreeMap<String, String>,
    method: HttpMethod,
}

impl CustomWebhookDestination {
    pub fn new(
        url: &str,
        header_params: BTreeMap<String, String>,
        method: &str,
        deny_list: &HostDenyList,
    ) -> Result<Self> {
        let url = validate_url(url, deny_list)?;
        let method = method.parse()?;
        Ok(Self {
            url,
            header_params,
            method,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn header_params(&self) -> &BTreeMap<String, String> {
        &self.header_params
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    #[cfg(test)]
    pub(crate) fn unchecked(url: &str, header_params: BTreeMap<String, String>, method: HttpMethod) -> Self {
        Self {
            url: Url::parse(url).unwrap(),
            header_params,
            method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_rejects_denied_host() {
        let deny = HostDenyList::new(&["10.0.0.0/8"]);
        assert!(WebhookDestination::new("https://10.0.0.5/hook", &deny).is_err());
        assert!(WebhookDestination::new("https://hooks.slack.com/services/x", &deny).is_ok());
    }

    #[test]
    fn test_custom_webhook_method() {
        let deny = HostDenyList::default();
        let dest =
            CustomWebhookDestination::new("https://example.com/hook", BTreeMap::new(), "PUT", &deny)
                .unwrap();
        assert_eq!(dest.method(), HttpMethod::Put);

        assert!(
            CustomWebhookDestination::new("https://example.com/hook", BTreeMap::new(), "DELETE", &deny)
                .is_err()
        );
    }

    #[test]
    fn test_method_parsing_is_exact() {
        assert_eq!("POST".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert_eq!("PATCH".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        for bad in ["post", "DELETE", "", "POST "] {
            assert!(
                matches!(bad.parse::<HttpMethod>(), Err(NotificationError::InvalidDestination(_))),
                "{:?}",
                bad
            );
        }
    }

    #[test]
    fn test_equality_by_value() {
        let deny = HostDenyList::default();
        let a = WebhookDestination::new("https://example.com/a", &deny).unwrap();
        let b = WebhookDestination::new("https://example.com/a", &deny).unwrap();
        assert_eq!(a, b);
    }
}

//! Destination validation
//!
//! Pure checks for URLs, email addresses, identifiers, HTTP methods, AWS regions
//! and ports, plus the host deny-list used to keep destinations away from
//! internal networks. Nothing here touches the network except the optional
//! [`HostResolver`] used by the send-time deny-list re-check.

use std::collections::HashSet;
use std::io;
use std::net::IpAddr;

use async_trait::async_trait;
use ipnetwork::IpNetwork;
use lazy_static::lazy_static;
use regex::Regex;
use url::{Host, Url};

use crate::error::{NotificationError, Result};

lazy_static! {
    // Practical RFC 5322 address pattern, case-insensitive
    static ref EMAIL_PATTERN: Regex = Regex::new(
        r##"(?i)^(?:[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*|"(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21\x23-\x5b\x5d-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])*")@(?:(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?|\[(?:(?:(2(5[0-5]|[0-4][0-9])|1[0-9][0-9]|[1-9]?[0-9]))\.){3}(?:(2(5[0-5]|[0-4][0-9])|1[0-9][0-9]|[1-9]?[0-9])|[a-z0-9-]*[a-z0-9]:(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21-\x5a\x53-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])+)\])$"##
    )
    .unwrap();

    static ref ID_PATTERN: Regex = Regex::new(r"^[A-Za-z0-9+/_-]+$").unwrap();
}

/// HTTP methods accepted for custom webhooks
pub const ALLOWED_HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH"];

/// AWS regions accepted for SES accounts
pub const AWS_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "af-south-1",
    "ap-east-1",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ca-central-1",
    "ca-west-1",
    "cn-north-1",
    "cn-northwest-1",
    "eu-central-1",
    "eu-central-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-south-1",
    "eu-south-2",
    "eu-north-1",
    "il-central-1",
    "me-south-1",
    "me-central-1",
    "sa-east-1",
    "us-gov-east-1",
    "us-gov-west-1",
];

/// Hosts and networks that destinations must not point to.
///
/// Entries that parse as an IP address or CIDR range are matched by network
/// containment (a bare address is a single-host network). Everything else is
/// an exact, case-insensitive hostname match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostDenyList {
    networks: Vec<IpNetwork>,
    hostnames: HashSet<String>,
}

impl HostDenyList {
    pub fn new<S: AsRef<str>>(entries: &[S]) -> Self {
        let mut networks = Vec::new();
        let mut hostnames = HashSet::new();

        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            match entry.parse::<IpNetwork>() {
                Ok(network) => networks.push(network),
                Err(_) => {
                    hostnames.insert(entry.trim_end_matches('.').to_ascii_lowercase());
                }
            }
        }

        Self {
            networks,
            hostnames,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty() && self.hostnames.is_empty()
    }

    /// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are matched in both forms.
    pub fn denies_ip(&self, ip: IpAddr) -> bool {
        let mapped = match ip {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4),
            IpAddr::V4(_) => None,
        };
        self.networks
            .iter()
            .any(|network| network.contains(ip) || mapped.is_some_and(|v4| network.contains(v4)))
    }

    pub fn denies_hostname(&self, hostname: &str) -> bool {
        self.hostnames
            .contains(&hostname.trim_end_matches('.').to_ascii_lowercase())
    }

    /// Literal check of a URL host: exact hostname, or IP inside a denied network.
    pub fn denies_host(&self, host: &Host<&str>) -> bool {
        match host {
            Host::Domain(domain) => self.denies_hostname(domain),
            Host::Ipv4(ip) => self.denies_ip(IpAddr::V4(*ip)),
            Host::Ipv6(ip) => self.denies_ip(IpAddr::V6(*ip)),
        }
    }

    /// Send-time check: the literal host, then every address it resolves to.
    ///
    /// A resolution failure is not a denial; the subsequent request fails on its own.
    pub async fn check_resolved(&self, url: &Url, resolver: &dyn HostResolver) -> Result<()> {
        let host = url
            .host()
            .ok_or_else(|| NotificationError::InvalidDestination("URL has no host".to_string()))?;

        if self.denies_host(&host) {
            return Err(host_denied(&host.to_string()));
        }

        if self.networks.is_empty() {
            return Ok(());
        }

        if let Host::Domain(domain) = host {
            match resolver.resolve(domain).await {
                Ok(addresses) => {
                    if let Some(ip) = addresses.into_iter().find(|ip| self.denies_ip(*ip)) {
                        tracing::warn!(host = %domain, resolved = %ip, "Host resolves to denied address");
                        return Err(host_denied(domain));
                    }
                }
                Err(e) => {
                    tracing::debug!(host = %domain, error = %e, "Host resolution failed during deny-list check");
                }
            }
        }

        Ok(())
    }
}

fn host_denied(host: &str) -> NotificationError {
    NotificationError::InvalidDestination(format!(
        "Host of url is denied by host_deny_list: {}",
        host
    ))
}

/// Resolves hostnames for the send-time deny-list check.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the system resolver.
#[derive(Debug, Clone, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addresses = tokio::net::lookup_host((host, 0)).await?;
        Ok(addresses.map(|addr| addr.ip()).collect())
    }
}

/// Parse and validate a destination URL: HTTPS only, host not denied.
pub fn validate_url(url: &str, deny_list: &HostDenyList) -> Result<Url> {
    if url.trim().is_empty() {
        return Err(NotificationError::InvalidDestination(
            "url is null or empty".to_string(),
        ));
    }

    let parsed = Url::parse(url)
        .map_err(|e| NotificationError::InvalidDestination(format!("Invalid URL: {}", e)))?;

    if parsed.scheme() != "https" {
        return Err(NotificationError::InvalidDestination(format!(
            "Unsupported URL scheme '{}', only https is allowed",
            parsed.scheme()
        )));
    }

    let host = parsed
        .host()
        .ok_or_else(|| NotificationError::InvalidDestination("URL has no host".to_string()))?;

    if deny_list.denies_host(&host) {
        return Err(host_denied(&host.to_string()));
    }

    Ok(parsed)
}

pub fn validate_email(address: &str) -> Result<()> {
    if address.is_empty() {
        return Err(NotificationError::InvalidDestination(
            "FromAddress and recipient should be provided".to_string(),
        ));
    }
    if !EMAIL_PATTERN.is_match(address) {
        return Err(NotificationError::InvalidDestination(format!(
            "Invalid email address: {}",
            address
        )));
    }
    Ok(())
}

pub fn validate_id(id: &str) -> Result<()> {
    if !ID_PATTERN.is_match(id) {
        return Err(NotificationError::InvalidDestination(format!(
            "Invalid characters in id: {}",
            id
        )));
    }
    Ok(())
}

pub fn validate_http_method(method: &str) -> Result<()> {
    if !ALLOWED_HTTP_METHODS.contains(&method) {
        return Err(NotificationError::InvalidDestination(format!(
            "Invalid method supplied: {}. Only GET, POST, PUT and PATCH are allowed",
            method
        )));
    }
    Ok(())
}

pub fn validate_region(region: &str) -> Result<()> {
    if !AWS_REGIONS.contains(&region) {
        return Err(NotificationError::InvalidDestination(format!(
            "Invalid AWS region: {}",
            region
        )));
    }
    Ok(())
}

pub fn validate_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(NotificationError::InvalidDestination(
            "Port should be positive value".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;

    /// Resolver returning fixed answers; unknown hosts fail to resolve.
    #[derive(Default)]
    pub struct StaticResolver {
        pub answers: HashMap<String, Vec<IpAddr>>,
    }

    impl StaticResolver {
        pub fn with(host: &str, ips: &[&str]) -> Self {
            let mut answers = HashMap::new();
            answers.insert(
                host.to_string(),
                ips.iter().map(|ip| ip.parse().unwrap()).collect(),
            );
            Self { answers }
        }
    }

    #[async_trait]
    impl HostResolver for StaticResolver {
        async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
            self.answers
                .get(host)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such host"))
        }
    }
}

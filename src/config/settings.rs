use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Minimum accepted email size limit in bytes (10KB).
pub const MINIMUM_EMAIL_SIZE_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub core: CoreConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub counter: CounterConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// Hosts, IPs and CIDR ranges that destinations may not point to
    #[serde(default)]
    pub host_deny_list: Vec<String>,
    /// Config types the embedding system may create
    #[serde(default = "default_allowed_config_types")]
    pub allowed_config_types: Vec<String>,
    /// Features allowed to send notifications
    #[serde(default = "default_allowed_config_features")]
    pub allowed_config_features: Vec<String>,
    #[serde(default = "default_true")]
    pub tooltip_support: bool,
    /// Maximum email size in bytes
    #[serde(default = "default_email_size_limit")]
    pub email_size_limit: usize,
    /// Estimated header overhead added to every email size check
    #[serde(default = "default_email_minimum_header_length")]
    pub email_minimum_header_length: usize,
    /// Successful email sends allowed per calendar month
    #[serde(default = "default_monthly_email_limit")]
    pub monthly_email_limit: u64,
    /// Deadline for credential and counter store operations
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
    #[serde(default = "default_socket_timeout_ms")]
    pub socket_timeout_ms: u64,
    #[serde(default = "default_max_connections_per_route")]
    pub max_connections_per_route: usize,
}

/// Credentials for one named SMTP account
#[derive(Clone, Deserialize)]
pub struct SmtpAccountCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SmtpAccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpAccountCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default = "default_smtp_encryption")]
    pub encryption_method: String,
    /// account_name -> credentials
    #[serde(default)]
    pub accounts: HashMap<String, SmtpAccountCredentials>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_api_base_url")]
    pub api_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CounterConfig {
    /// "memory" or "redis"
    #[serde(default = "default_counter_backend")]
    pub backend: String,
    #[serde(default = "default_counter_prefix")]
    pub redis_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_otel_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
    /// Emit log lines as JSON instead of human-readable text
    #[serde(default)]
    pub json_logs: bool,
}

fn default_true() -> bool {
    true
}

fn default_allowed_config_types() -> Vec<String> {
    [
        "slack",
        "chime",
        "microsoft_teams",
        "webhook",
        "email",
        "sns",
        "ses_account",
        "smtp_account",
        "email_group",
        "telegram",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_allowed_config_features() -> Vec<String> {
    ["alerting", "index_management", "reports"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_email_size_limit() -> usize {
    10_000_000 // 10MB
}

fn default_email_minimum_header_length() -> usize {
    160
}

fn default_monthly_email_limit() -> u64 {
    200
}

fn default_operation_timeout_ms() -> u64 {
    60_000
}

fn default_connection_timeout_ms() -> u64 {
    5_000
}

fn default_socket_timeout_ms() -> u64 {
    50_000
}

fn default_max_connections_per_route() -> usize {
    20
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_encryption() -> String {
    "start_tls".to_string()
}

fn default_telegram_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_counter_backend() -> String {
    "memory".to_string()
}

fn default_counter_prefix() -> String {
    "notifications:counter".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_service_name() -> String {
    "notification-delivery".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("core.monthly_email_limit", 200)?
            .set_default("core.email_size_limit", 10_000_000)?
            .set_default("counter.backend", "memory")?
            .set_default("redis.url", "redis://localhost:6379")?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // CORE__HOST_DENY_LIST, CORE__MONTHLY_EMAIL_LIMIT, SMTP__HOST, REDIS__URL, etc.
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("core.host_deny_list")
                    .with_list_parse_key("core.allowed_config_types")
                    .with_list_parse_key("core.allowed_config_features"),
            );

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.normalize();
        Ok(settings)
    }

    /// Clamp values that have a floor.
    pub fn normalize(&mut self) {
        if self.core.email_size_limit < MINIMUM_EMAIL_SIZE_LIMIT {
            tracing::warn!(
                configured = self.core.email_size_limit,
                minimum = MINIMUM_EMAIL_SIZE_LIMIT,
                "Email size limit below minimum, clamping"
            );
            self.core.email_size_limit = MINIMUM_EMAIL_SIZE_LIMIT;
        }
    }
}

impl CoreConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl HttpConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            http: HttpConfig::default(),
            smtp: SmtpConfig::default(),
            telegram: TelegramConfig::default(),
            counter: CounterConfig::default(),
            redis: RedisConfig::default(),
            otel: OtelConfig::default(),
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            host_deny_list: vec![],
            allowed_config_types: default_allowed_config_types(),
            allowed_config_features: default_allowed_config_features(),
            tooltip_support: true,
            email_size_limit: default_email_size_limit(),
            email_minimum_header_length: default_email_minimum_header_length(),
            monthly_email_limit: default_monthly_email_limit(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connection_timeout_ms: default_connection_timeout_ms(),
            socket_timeout_ms: default_socket_timeout_ms(),
            max_connections_per_route: default_max_connections_per_route(),
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            encryption_method: default_smtp_encryption(),
            accounts: HashMap::new(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_telegram_api_base_url(),
        }
    }
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            backend: default_counter_backend(),
            redis_prefix: default_counter_prefix(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_otel_service_name(),
            sampling_ratio: default_sampling_ratio(),
            json_logs: false,
        }
    }
}

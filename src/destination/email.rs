use std::fmt;
use std::str::FromStr;

use crate::error::{NotificationError, Result};
use crate::validation::{validate_email, validate_port, validate_region};

/// Transport security of an SMTP session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncryptionMethod {
    None,
    Ssl,
    StartTls,
}

impl EncryptionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptionMethod::None => "none",
            EncryptionMethod::Ssl => "ssl",
            EncryptionMethod::StartTls => "start_tls",
        }
    }
}

impl FromStr for EncryptionMethod {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(EncryptionMethod::None),
            "ssl" => Ok(EncryptionMethod::Ssl),
            "start_tls" => Ok(EncryptionMethod::StartTls),
            other => Err(NotificationError::InvalidDestination(format!(
                "Invalid encryption method: {}. Supported: none, ssl, start_tls",
                other
            ))),
        }
    }
}

impl fmt::Display for EncryptionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn require_non_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(NotificationError::InvalidDestination(format!(
            "{} is null or empty",
            field
        )));
    }
    Ok(())
}

/// Email sent through an SMTP relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpDestination {
    account_name: String,
    host: String,
    port: u16,
    encryption_method: EncryptionMethod,
    from_address: String,
    recipient: String,
}

impl SmtpDestination {
    pub fn new(
        account_name: &str,
        host: &str,
        port: u16,
        encryption_method: &str,
        from_address: &str,
        recipient: &str,
    ) -> Result<Self> {
        require_non_empty(account_name, "account name")?;
        require_non_empty(host, "host")?;
        validate_port(port)?;
        let encryption_method = encryption_method.parse()?;
        validate_email(from_address)?;
        validate_email(recipient)?;

        Ok(Self {
            account_name: account_name.to_string(),
            host: host.to_string(),
            port,
            encryption_method,
            from_address: from_address.to_string(),
            recipient: recipient.to_string(),
        })
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn encryption_method(&self) -> EncryptionMethod {
        self.encryption_method
    }

    pub fn from_address(&self) -> &str {
        &self.from_address
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }
}

/// Email sent through Amazon SES.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SesDestination {
    account_name: String,
    aws_region: String,
    role_arn: Option<String>,
    from_address: String,
    recipient: String,
}

impl SesDestination {
    pub fn new(
        account_name: &str,
        aws_region: &str,
        role_arn: Option<&str>,
        from_address: &str,
        recipient: &str,
    ) -> Result<Self> {
        require_non_empty(account_name, "account name")?;
        validate_region(aws_region)?;
        if let Some(role) = role_arn {
            require_non_empty(role, "role arn")?;
        }
        validate_email(from_address)?;
        validate_email(recipient)?;

        Ok(Self {
            account_name: account_name.to_string(),
            aws_region: aws_region.to_string(),
            role_arn: role_arn.map(str::to_string),
            from_address: from_address.to_string(),
            recipient: recipient.to_string(),
        })
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn region(&self) -> &str {
        &self.aws_region
    }

    pub fn role_arn(&self) -> Option<&str> {
        self.role_arn.as_deref()
    }

    pub fn from_address(&self) -> &str {
        &self.from_address
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }
}

//! AWS credential vending
//!
//! Resolves credentials for SES and SNS: the default provider chain when no
//! role is configured, STS `AssumeRole` otherwise. Also vends region and
//! credential scoped SES/SNS clients.

mod clients;

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use aws_config::default_provider::credentials::DefaultCredentialsChain;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use aws_sdk_sts::error::DisplayErrorContext;
use thiserror::Error;

pub use clients::{
    AwsServiceError, AwsSesClientFactory, AwsSnsClientFactory, SesApi, SesClientFactory, SnsApi,
    SnsClientFactory,
};

use crate::error::NotificationError;
use crate::metrics::CredentialMetrics;

/// Session name used for every assumed role
pub const ROLE_SESSION_NAME: &str = "notifications-core";

#[derive(Error, Debug, Clone)]
pub enum CredentialError {
    #[error("STS AssumeRole failed for {role_arn}: {message}")]
    AssumeRole { role_arn: String, message: String },

    #[error("STS AssumeRole returned no credentials for {0}")]
    MissingCredentials(String),

    #[error("Credential resolution timed out after {0:?}")]
    Timeout(Duration),
}

impl From<CredentialError> for NotificationError {
    fn from(err: CredentialError) -> Self {
        NotificationError::CredentialResolution(err.to_string())
    }
}

/// Exchanges a role ARN for temporary credentials.
#[async_trait]
pub trait RoleAssumer: Send + Sync {
    async fn assume_role(
        &self,
        region: &str,
        role_arn: &str,
        session_name: &str,
    ) -> Result<Credentials, CredentialError>;
}

/// [`RoleAssumer`] backed by AWS STS.
#[derive(Debug, Clone, Default)]
pub struct StsRoleAssumer;

#[async_trait]
impl RoleAssumer for StsRoleAssumer {
    async fn assume_role(
        &self,
        region: &str,
        role_arn: &str,
        session_name: &str,
    ) -> Result<Credentials, CredentialError> {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        let client = aws_sdk_sts::Client::new(&config);

        let output = client
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .send()
            .await
            .map_err(|e| CredentialError::AssumeRole {
                role_arn: role_arn.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let session = output
            .credentials()
            .ok_or_else(|| CredentialError::MissingCredentials(role_arn.to_string()))?;

        Ok(Credentials::new(
            session.access_key_id(),
            session.secret_access_key(),
            Some(session.session_token().to_string()),
            SystemTime::try_from(*session.expiration()).ok(),
            "sts-assume-role",
        ))
    }
}

/// Builds credential providers for a region and optional role.
#[derive(Clone)]
pub struct CredentialsProviderFactory {
    role_assumer: Arc<dyn RoleAssumer>,
    timeout: Duration,
}

impl CredentialsProviderFactory {
    pub fn new(role_assumer: Arc<dyn RoleAssumer>, timeout: Duration) -> Self {
        Self {
            role_assumer,
            timeout,
        }
    }

    /// Factory using STS for role assumption.
    pub fn sts(timeout: Duration) -> Self {
        Self::new(Arc::new(StsRoleAssumer), timeout)
    }

    /// Default chain (environment, profile, instance metadata) without a role,
    /// static session credentials from `AssumeRole` with one. Never retried.
    #[tracing::instrument(name = "credentials.resolve", skip(self), fields(has_role = role_arn.is_some()))]
    pub async fn credentials_provider(
        &self,
        region: &str,
        role_arn: Option<&str>,
    ) -> Result<SharedCredentialsProvider, CredentialError> {
        let Some(role_arn) = role_arn else {
            let chain = DefaultCredentialsChain::builder()
                .region(Region::new(region.to_string()))
                .build()
                .await;
            return Ok(SharedCredentialsProvider::new(chain));
        };

        let assumed = tokio::time::timeout(
            self.timeout,
            self.role_assumer
                .assume_role(region, role_arn, ROLE_SESSION_NAME),
        )
        .await
        .map_err(|_| CredentialError::Timeout(self.timeout))
        .and_then(|result| result);

        match assumed {
            Ok(credentials) => {
                tracing::debug!(region = %region, role_arn = %role_arn, "Assumed role for AWS client");
                Ok(SharedCredentialsProvider::new(credentials))
            }
            Err(e) => {
                CredentialMetrics::record_failure(region);
                tracing::error!(region = %region, role_arn = %role_arn, error = %e, "Failed to assume role");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Role assumer returning canned credentials or a canned failure.
    pub struct FakeRoleAssumer {
        pub fail: bool,
        pub delay: Option<Duration>,
        pub calls: Mutex<Vec<(String, String, String)>>,
    }

    impl FakeRoleAssumer {
        pub fn ok() -> Self {
            Self {
                fail: false,
                delay: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl RoleAssumer for FakeRoleAssumer {
        async fn assume_role(
            &self,
            region: &str,
            role_arn: &str,
            session_name: &str,
        ) -> Result<Credentials, CredentialError> {
            self.calls.lock().unwrap().push((
                region.to_string(),
                role_arn.to_string(),
                session_name.to_string(),
            ));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(CredentialError::AssumeRole {
                    role_arn: role_arn.to_string(),
                    message: "AccessDenied".to_string(),
                });
            }
            Ok(Credentials::new("AKIDTEST", "secret", Some("token".to_string()), None, "fake"))
        }
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ses::primitives::Blob;
use aws_sdk_ses::types::RawMessage;
use dashmap::DashMap;

use super::{CredentialError, CredentialsProviderFactory};
use crate::notification::{run_privileged, PrivilegedExecution};

/// Failure reported by an AWS service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsServiceError {
    /// HTTP status of the service response, absent for SDK-side failures
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl std::fmt::Display for AwsServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}:{}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

macro_rules! service_error {
    ($err:expr) => {{
        use aws_sdk_ses::error::ProvideErrorMetadata;
        let err = $err;
        let status = err.raw_response().map(|r| r.status().as_u16());
        let code = err.code().map(str::to_string);
        let message = err
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| aws_sdk_ses::error::DisplayErrorContext(&err).to_string());
        AwsServiceError {
            status,
            code,
            message,
        }
    }};
}

#[async_trait]
pub trait SesApi: Send + Sync {
    /// Send a complete MIME message; returns the provider message id.
    async fn send_raw_email(&self, raw_message: Vec<u8>) -> Result<String, AwsServiceError>;
}

#[async_trait]
pub trait SnsApi: Send + Sync {
    /// Publish to a topic; returns the provider message id.
    async fn publish(
        &self,
        topic_arn: &str,
        message: &str,
        subject: &str,
    ) -> Result<String, AwsServiceError>;
}

struct SdkSesClient(aws_sdk_ses::Client);

struct SdkSnsClient(aws_sdk_sns::Client);

#[async_trait]
impl SesApi for SdkSesClient {
    async fn send_raw_email(&self, raw_message: Vec<u8>) -> Result<String, AwsServiceError> {
        let raw = RawMessage::builder()
            .data(Blob::new(raw_message))
            .build()
            .map_err(|e| AwsServiceError {
                status: None,
                code: None,
                message: e.to_string(),
            })?;

        let output = self
            .0
            .send_raw_email()
            .raw_message(raw)
            .send()
            .await
            .map_err(|e| service_error!(e))?;

        Ok(output.message_id().to_string())
    }
}

#[async_trait]
impl SnsApi for SdkSnsClient {
    async fn publish(
        &self,
        topic_arn: &str,
        message: &str,
        subject: &str,
    ) -> Result<String, AwsServiceError> {
        let output = self
            .0
            .publish()
            .topic_arn(topic_arn)
            .message(message)
            .subject(subject)
            .send()
            .await
            .map_err(|e| service_error!(e))?;

        Ok(output.message_id().unwrap_or_default().to_string())
    }
}

#[async_trait]
pub trait SesClientFactory: Send + Sync {
    async fn create_ses_client(
        &self,
        region: &str,
        role_arn: Option<&str>,
    ) -> Result<Arc<dyn SesApi>, CredentialError>;
}

#[async_trait]
pub trait SnsClientFactory: Send + Sync {
    async fn create_sns_client(
        &self,
        region: &str,
        role_arn: Option<&str>,
    ) -> Result<Arc<dyn SnsApi>, CredentialError>;
}

async fn load_sdk_config(
    credentials: &CredentialsProviderFactory,
    region: &str,
    role_arn: Option<&str>,
) -> Result<aws_config::SdkConfig, CredentialError> {
    let provider = credentials.credentials_provider(region, role_arn).await?;
    Ok(aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .credentials_provider(provider)
        .load()
        .await)
}

/// SES clients built from the AWS SDK. Default-chain clients are cached per
/// region; role-scoped clients carry session credentials and are built per call.
pub struct AwsSesClientFactory {
    credentials: CredentialsProviderFactory,
    privileged: Arc<dyn PrivilegedExecution>,
    cache: DashMap<String, Arc<dyn SesApi>>,
}

impl AwsSesClientFactory {
    pub fn new(credentials: CredentialsProviderFactory, privileged: Arc<dyn PrivilegedExecution>) -> Self {
        Self {
            credentials,
            privileged,
            cache: DashMap::new(),
        }
    }
}

#[async_trait]
impl SesClientFactory for AwsSesClientFactory {
    async fn create_ses_client(
        &self,
        region: &str,
        role_arn: Option<&str>,
    ) -> Result<Arc<dyn SesApi>, CredentialError> {
        if role_arn.is_none() {
            if let Some(client) = self.cache.get(region) {
                return Ok(client.clone());
            }
        }

        let config = run_privileged(
            self.privileged.as_ref(),
            "create_ses_client",
            load_sdk_config(&self.credentials, region, role_arn),
        )
        .await?;
        let client: Arc<dyn SesApi> = Arc::new(SdkSesClient(aws_sdk_ses::Client::new(&config)));

        if role_arn.is_none() {
            self.cache.insert(region.to_string(), client.clone());
        }
        tracing::debug!(region = %region, has_role = role_arn.is_some(), "Created SES client");
        Ok(client)
    }
}

/// SNS counterpart of [`AwsSesClientFactory`].
pub struct AwsSnsClientFactory {
    credentials: CredentialsProviderFactory,
    privileged: Arc<dyn PrivilegedExecution>,
    cache: DashMap<String, Arc<dyn SnsApi>>,
}

impl AwsSnsClientFactory {
    pub fn new(credentials: CredentialsProviderFactory, privileged: Arc<dyn PrivilegedExecution>) -> Self {
        Self {
            credentials,
            privileged,
            cache: DashMap::new(),
        }
    }
}

#[async_trait]
impl SnsClientFactory for AwsSnsClientFactory {
    async fn create_sns_client(
        &self,
        region: &str,
        role_arn: Option<&str>,
    ) -> Result<Arc<dyn SnsApi>, CredentialError> {
        if role_arn.is_none() {
            if let Some(client) = self.cache.get(region) {
                return Ok(client.clone());
            }
        }

        let config = run_privileged(
            self.privileged.as_ref(),
            "create_sns_client",
            load_sdk_config(&self.credentials, region, role_arn),
        )
        .await?;
        let client: Arc<dyn SnsApi> = Arc::new(SdkSnsClient(aws_sdk_sns::Client::new(&config)));

        if role_arn.is_none() {
            self.cache.insert(region.to_string(), client.clone());
        }
        tracing::debug!(region = %region, has_role = role_arn.is_some(), "Created SNS client");
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::FakeRoleAssumer;
    use super::*;
    use crate::notification::privileged::testing::RecordingExecution;
    use std::time::Duration;

    #[test]
    fn test_service_error_display() {
        let err = AwsServiceError {
            status: Some(400),
            code: Some("InvalidParameter".to_string()),
            message: "bad topic".to_string(),
        };
        assert_eq!(err.to_string(), "InvalidParameter:bad topic");
    }

    #[tokio::test]
    async fn test_default_chain_clients_are_cached() {
        let privileged = Arc::new(RecordingExecution::default());
        let factory = AwsSnsClientFactory::new(
            CredentialsProviderFactory::new(Arc::new(FakeRoleAssumer::ok()), Duration::from_secs(5)),
            privileged.clone(),
        );

        let a = factory.create_sns_client("us-west-2", None).await.unwrap();
        let b = factory.create_sns_client("us-west-2", None).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*privileged.actions.lock().unwrap(), vec!["create_sns_client"]);
    }

    #[tokio::test]
    async fn test_role_failure_propagates() {
        let factory = AwsSesClientFactory::new(
            CredentialsProviderFactory::new(Arc::new(FakeRoleAssumer::failing()), Duration::from_secs(5)),
            Arc::new(crate::notification::DirectExecution),
        );

        let result = factory
            .create_ses_client("us-east-1", Some("arn:aws:iam::012345678912:role/ses"))
            .await;
        assert!(matches!(result, Err(CredentialError::AssumeRole { .. })));
    }
}

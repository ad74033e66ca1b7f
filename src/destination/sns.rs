use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{NotificationError, Result};

lazy_static! {
    static ref TOPIC_ARN_PATTERN: Regex =
        Regex::new(r"^arn:aws(-[a-z]+)*:sns:[a-z]{2}(-[a-z]+)+-\d+:\d{12}:[A-Za-z0-9_-]{1,256}(\.fifo)?$")
            .unwrap();
    static ref ROLE_ARN_PATTERN: Regex =
        Regex::new(r"^arn:aws(-[a-z]+)*:iam::\d{12}:role/[\w+=,.@/-]+$").unwrap();
}

/// Amazon SNS topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnsDestination {
    topic_arn: String,
    role_arn: Option<String>,
}

impl SnsDestination {
    pub fn new(topic_arn: &str, role_arn: Option<&str>) -> Result<Self> {
        if !TOPIC_ARN_PATTERN.is_match(topic_arn) {
            return Err(NotificationError::InvalidDestination(format!(
                "Invalid SNS topic ARN: {}",
                topic_arn
            )));
        }
        if let Some(role) = role_arn {
            if !ROLE_ARN_PATTERN.is_match(role) {
                return Err(NotificationError::InvalidDestination(format!(
                    "Invalid IAM role ARN: {}",
                    role
                )));
            }
        }

        Ok(Self {
            topic_arn: topic_arn.to_string(),
            role_arn: role_arn.map(str::to_string),
        })
    }

    pub fn topic_arn(&self) -> &str {
        &self.topic_arn
    }

    pub fn role_arn(&self) -> Option<&str> {
        self.role_arn.as_deref()
    }

    /// Region segment of the topic ARN (`arn:partition:sns:<region>:account:name`).
    pub fn region(&self) -> &str {
        self.topic_arn.split(':').nth(3).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_from_topic_arn() {
        let dest = SnsDestination::new("arn:aws:sns:us-west-2:012345678912:test-notification", None).unwrap();
        assert_eq!(dest.region(), "us-west-2");

        let gov = SnsDestination::new("arn:aws-us-gov:sns:us-gov-west-1:012345678912:alerts.fifo", None).unwrap();
        assert_eq!(gov.region(), "us-gov-west-1");
    }

    #[test]
    fn test_invalid_arns() {
        assert!(SnsDestination::new("arn:aws:sqs:us-west-2:012345678912:queue", None).is_err());
        assert!(SnsDestination::new("not-an-arn", None).is_err());
        assert!(SnsDestination::new(
            "arn:aws:sns:us-west-2:012345678912:topic",
            Some("arn:aws:iam::012345678912:user/bob")
        )
        .is_err());
        assert!(SnsDestination::new(
            "arn:aws:sns:us-west-2:012345678912:topic",
            Some("arn:aws:iam::012345678912:role/iam-test")
        )
        .is_ok());
    }
}

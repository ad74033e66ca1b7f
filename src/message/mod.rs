//! Message payloads and normalized delivery results

use serde::{Deserialize, Serialize};

use crate::error::{NotificationError, Result};

pub const STATUS_SUCCESS_TEXT: &str = "Success";

/// File attached to an email message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    /// "base64" or "text"
    pub file_encoding: String,
    pub file_data: String,
    pub file_content_type: Option<String>,
}

/// Content of a single notification. Always holds a non-empty title and text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageContent {
    title: String,
    text_description: String,
    html_description: Option<String>,
    attachment: Option<Attachment>,
}

impl MessageContent {
    pub fn new(title: impl Into<String>, text_description: impl Into<String>) -> Result<Self> {
        MessageContentBuilder::new(title, text_description).build()
    }

    pub fn builder(
        title: impl Into<String>,
        text_description: impl Into<String>,
    ) -> MessageContentBuilder {
        MessageContentBuilder::new(title, text_description)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn text_description(&self) -> &str {
        &self.text_description
    }

    pub fn html_description(&self) -> Option<&str> {
        self.html_description.as_deref()
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Title and text joined the way chat webhooks render them.
    pub fn build_message_with_title(&self) -> String {
        format!("{}\n\n{}", self.title, self.text_description)
    }

    /// Approximate rendered email size, used before building the MIME message.
    pub fn estimated_email_size(&self, minimum_header_length: usize) -> usize {
        let attachment_length = self
            .attachment
            .as_ref()
            .map(|a| minimum_header_length + a.file_data.len() + a.file_name.len())
            .unwrap_or(0);

        minimum_header_length
            + self.title.len()
            + self.text_description.len()
            + self.html_description.as_ref().map(|h| h.len()).unwrap_or(0)
            + attachment_length
    }
}

#[derive(Debug, Clone, Default)]
pub struct MessageContentBuilder {
    title: String,
    text_description: String,
    html_description: Option<String>,
    file_name: Option<String>,
    file_encoding: Option<String>,
    file_data: Option<String>,
    file_content_type: Option<String>,
}

impl MessageContentBuilder {
    pub fn new(title: impl Into<String>, text_description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text_description: text_description.into(),
            ..Default::default()
        }
    }

    pub fn html_description(mut self, html: impl Into<String>) -> Self {
        self.html_description = Some(html.into());
        self
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn file_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.file_encoding = Some(encoding.into());
        self
    }

    pub fn file_data(mut self, data: impl Into<String>) -> Self {
        self.file_data = Some(data.into());
        self
    }

    pub fn file_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.file_content_type = Some(content_type.into());
        self
    }

    pub fn build(self) -> Result<MessageContent> {
        if self.title.trim().is_empty() {
            return Err(NotificationError::InvalidMessage(
                "title is null or empty".to_string(),
            ));
        }
        if self.text_description.trim().is_empty() {
            return Err(NotificationError::InvalidMessage(
                "text message is null or empty".to_string(),
            ));
        }

        let any_attachment_field = self.file_name.is_some()
            || self.file_encoding.is_some()
            || self.file_data.is_some()
            || self.file_content_type.is_some();

        let attachment = if any_attachment_field {
            match (self.file_name, self.file_encoding, self.file_data) {
                (Some(file_name), Some(file_encoding), Some(file_data)) => Some(Attachment {
                    file_name,
                    file_encoding,
                    file_data,
                    file_content_type: self.file_content_type,
                }),
                _ => {
                    return Err(NotificationError::InvalidMessage(
                        "file name, file encoding and file data must all be provided with an attachment"
                            .to_string(),
                    ))
                }
            }
        } else {
            None
        };

        Ok(MessageContent {
            title: self.title,
            text_description: self.text_description,
            html_description: self.html_description,
            attachment,
        })
    }
}

/// Wire form of a message, as read from JSON send requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePayload {
    pub title: String,
    pub text_description: String,
    #[serde(default)]
    pub html_description: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_encoding: Option<String>,
    #[serde(default)]
    pub file_data: Option<String>,
    #[serde(default)]
    pub file_content_type: Option<String>,
}

impl TryFrom<MessagePayload> for MessageContent {
    type Error = NotificationError;

    fn try_from(payload: MessagePayload) -> Result<Self> {
        let mut builder = MessageContentBuilder::new(payload.title, payload.text_description);
        builder.html_description = payload.html_description;
        builder.file_name = payload.file_name;
        builder.file_encoding = payload.file_encoding;
        builder.file_data = payload.file_data;
        builder.file_content_type = payload.file_content_type;
        builder.build()
    }
}

/// Normalized result of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationMessageResponse {
    pub status_code: u16,
    pub status_text: String,
}

impl DestinationMessageResponse {
    pub fn new(status_code: u16, status_text: impl Into<String>) -> Self {
        Self {
            status_code,
            status_text: status_text.into(),
        }
    }

    pub fn success() -> Self {
        Self::new(200, STATUS_SUCCESS_TEXT)
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

//! MIME construction for email transports
//!
//! Layout: `multipart/mixed` holding a `multipart/alternative` body (plain text,
//! plus HTML when present) and an optional attachment part.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as AttachmentPart, Mailbox, MultiPart, SinglePart};
use lettre::Message;
use thiserror::Error;

use crate::message::{Attachment, MessageContent};

#[derive(Error, Debug)]
pub enum MimeError {
    #[error("recipient parsing failed with status:{0}")]
    Address(String),

    #[error("attachment could not be encoded: {0}")]
    Attachment(String),

    #[error("message could not be built: {0}")]
    Build(String),
}

impl MimeError {
    pub fn status_code(&self) -> u16 {
        match self {
            MimeError::Address(_) | MimeError::Attachment(_) => 400,
            MimeError::Build(_) => 424,
        }
    }
}

fn mailbox(address: &str) -> Result<Mailbox, MimeError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| MimeError::Address(format!("{}: {}", address, e)))
}

fn body_part(message: &MessageContent) -> MultiPart {
    let plain = SinglePart::plain(message.text_description().to_string());
    match message.html_description() {
        Some(html) => MultiPart::alternative()
            .singlepart(plain)
            .singlepart(SinglePart::html(html.to_string())),
        None => MultiPart::alternative().singlepart(plain),
    }
}

fn attachment_part(attachment: &Attachment) -> Result<Option<SinglePart>, MimeError> {
    match attachment.file_encoding.as_str() {
        "base64" => {
            let compact: String = attachment
                .file_data
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            let data = STANDARD
                .decode(compact)
                .map_err(|e| MimeError::Attachment(e.to_string()))?;
            let content_type = attachment
                .file_content_type
                .as_deref()
                .unwrap_or("application/octet-stream");
            let content_type = ContentType::parse(content_type)
                .map_err(|e| MimeError::Attachment(format!("{}: {}", content_type, e)))?;
            Ok(Some(
                AttachmentPart::new(attachment.file_name.clone()).body(data, content_type),
            ))
        }
        "text" => {
            let subtype = attachment
                .file_content_type
                .as_deref()
                .and_then(|ct| ct.rsplit('/').next())
                .filter(|s| !s.is_empty())
                .unwrap_or("plain");
            let content_type = format!("text/{}; charset=utf-8", subtype);
            let content_type = ContentType::parse(&content_type)
                .map_err(|e| MimeError::Attachment(format!("{}: {}", content_type, e)))?;
            Ok(Some(
                AttachmentPart::new(attachment.file_name.clone())
                    .body(attachment.file_data.clone(), content_type),
            ))
        }
        other => {
            tracing::warn!(encoding = %other, file_name = %attachment.file_name, "Unsupported attachment encoding, skipping");
            Ok(None)
        }
    }
}

/// Build the complete email for one sender and one recipient.
pub fn build_email(
    from_address: &str,
    recipient: &str,
    message: &MessageContent,
) -> Result<Message, MimeError> {
    let mut mixed = MultiPart::mixed().multipart(body_part(message));
    if let Some(attachment) = message.attachment() {
        if let Some(part) = attachment_part(attachment)? {
            mixed = mixed.singlepart(part);
        }
    }

    Message::builder()
        .from(mailbox(from_address)?)
        .to(mailbox(recipient)?)
        .subject(message.title())
        .multipart(mixed)
        .map_err(|e| MimeError::Build(e.to_string()))
}

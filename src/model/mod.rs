//! Content models
//!
//! The caller-facing description of an entry and the request shape used to
//! save one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod builder;
pub mod mimetypes;

pub use builder::ContentModelBuilder;

/// Kind of entry as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Directory,
    File,
    Notebook,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Directory => "directory",
            ContentType::File => "file",
            ContentType::Notebook => "notebook",
        }
    }
}

/// Encoding of a model's `content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Text,
    Base64,
    Json,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Text => "text",
            Format::Base64 => "base64",
            Format::Json => "json",
        }
    }
}

/// Payload of a model fetched with content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Content {
    /// Directory listing.
    Entries(Vec<ContentModel>),
    /// File body, either UTF-8 text or base64.
    Text(String),
    /// Notebook document.
    Notebook(Value),
}

/// Description of a single entry.
///
/// `content` is present only when it was requested, and `format` is present
/// exactly when `content` is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentModel {
    pub name: String,
    pub path: String,
    pub last_modified: DateTime<Utc>,
    pub created: DateTime<Utc>,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub size: Option<u64>,
    pub mimetype: Option<String>,
    pub content: Option<Content>,
    pub format: Option<Format>,
    pub writable: bool,
    /// Non-fatal note for the caller, such as a failed notebook validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ContentModel {
    /// Listing entries, if this is a directory model with content.
    pub fn entries(&self) -> Option<&[ContentModel]> {
        match &self.content {
            Some(Content::Entries(entries)) => Some(entries),
            _ => None,
        }
    }

    /// Text or base64 body, if this is a file model with content.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Some(Content::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Notebook document, if this is a notebook model with content.
    pub fn notebook(&self) -> Option<&Value> {
        match &self.content {
            Some(Content::Notebook(value)) => Some(value),
            _ => None,
        }
    }
}

/// Caller-supplied model for a save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveModel {
    #[serde(rename = "type", default)]
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub format: Option<Format>,
    #[serde(default)]
    pub content: Option<Value>,
}

impl SaveModel {
    pub fn directory() -> Self {
        Self {
            content_type: Some(ContentType::Directory),
            ..Self::default()
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content_type: Some(ContentType::File),
            format: Some(Format::Text),
            content: Some(Value::String(content.into())),
        }
    }

    pub fn base64(content: impl Into<String>) -> Self {
        Self {
            content_type: Some(ContentType::File),
            format: Some(Format::Base64),
            content: Some(Value::String(content.into())),
        }
    }

    pub fn notebook(content: Value) -> Self {
        Self {
            content_type: Some(ContentType::Notebook),
            format: Some(Format::Json),
            content: Some(content),
        }
    }
}

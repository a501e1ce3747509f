//! Secret model.
//!
//! A [`SecretRecord`] is what the store persists: opaque cipher text plus
//! the access and expiration policy. [`SecretMetadata`] is the read-only
//! projection handed back to callers; it never carries content.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of random bytes behind a generated [`SecretId`].
pub const SECRET_ID_BYTES: usize = 32;

/// Layout used when rendering an expiration for humans.
pub const EXPIRATION_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Render a Unix-second expiration as `YYYY-MM-DD HH:MM:SS UTC`.
pub fn format_expiration(epoch_seconds: i64) -> String {
    DateTime::from_timestamp(epoch_seconds, 0)
        .unwrap_or_default()
        .format(EXPIRATION_FORMAT)
        .to_string()
}

/// Identifier of a stored secret.
///
/// Generated identifiers are 64 lowercase hex characters from 32 CSPRNG bytes.
/// Identifiers supplied by callers are taken as-is; an unknown id simply
/// reads back as absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretId(String);

impl SecretId {
    /// Fresh random identifier.
    pub fn generate() -> Self {
        let bytes: [u8; SECRET_ID_BYTES] = rand::random();
        Self(hex::encode(bytes))
    }

    /// Wrap a caller-supplied identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecretId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SecretId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SecretId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for SecretId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Kind of payload a secret carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// UTF-8 text
    #[default]
    Text,
    /// Arbitrary file bytes, usually with a filename
    File,
}

impl ContentType {
    /// Stored representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::File => "file",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "file" => Ok(Self::File),
            other => Err(ValidationError::UnknownContentType(other.to_owned())),
        }
    }
}

/// A secret as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    /// Identifier
    pub id: SecretId,
    /// Opaque string produced by the crypto provider
    pub cipher_text: String,
    /// Payload kind
    pub content_type: ContentType,
    /// Original filename, only meaningful for [`ContentType::File`]
    pub filename: Option<String>,
    /// Accesses so far
    pub access_count: i64,
    /// Maximum accesses; `0` means unlimited
    pub access_limit: i64,
    /// Absolute expiration, Unix seconds
    pub expiration_epoch: i64,
}

impl SecretRecord {
    /// Seconds left before expiry relative to `now`. Negative once expired.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        self.expiration_epoch.saturating_sub(now.timestamp())
    }

    /// Whether `access_count` has consumed the access limit.
    pub fn limit_reached(&self, access_count: i64) -> bool {
        self.access_limit > 0 && access_count >= self.access_limit
    }

    /// Content-free projection.
    pub fn metadata(&self) -> SecretMetadata {
        SecretMetadata {
            id: self.id.clone(),
            content_type: self.content_type,
            filename: self.filename.clone(),
            access_count: self.access_count,
            access_limit: self.access_limit,
            expiration_epoch: self.expiration_epoch,
        }
    }
}

/// Read projection of a secret. Never carries content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretMetadata {
    pub id: SecretId,
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub access_count: i64,
    pub access_limit: i64,
    pub expiration_epoch: i64,
}

impl SecretMetadata {
    /// Expiration as a UTC timestamp.
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expiration_epoch, 0)
    }

    /// Expiration rendered as `YYYY-MM-DD HH:MM:SS UTC`.
    pub fn formatted_expiration(&self) -> String {
        format_expiration(self.expiration_epoch)
    }
}

/// Request to create a secret.
#[derive(Clone, PartialEq, Eq)]
pub struct NewSecret {
    /// Plaintext payload
    pub content: Vec<u8>,
    /// Payload kind
    pub content_type: ContentType,
    /// Filename for file payloads
    pub filename: Option<String>,
    /// Requested access limit; negative values are treated as unlimited
    pub access_limit: i64,
    /// Absolute expiration, Unix seconds
    pub expiration_epoch: i64,
}

impl NewSecret {
    /// Text secret with no access limit.
    pub fn text(content: impl Into<String>, expiration_epoch: i64) -> Self {
        Self {
            content: content.into().into_bytes(),
            content_type: ContentType::Text,
            filename: None,
            access_limit: 0,
            expiration_epoch,
        }
    }

    /// File secret with no access limit.
    pub fn file(
        content: impl Into<Vec<u8>>,
        filename: impl Into<String>,
        expiration_epoch: i64,
    ) -> Self {
        Self {
            content: content.into(),
            content_type: ContentType::File,
            filename: Some(filename.into()),
            access_limit: 0,
            expiration_epoch,
        }
    }

    /// Set the access limit.
    pub fn with_access_limit(mut self, access_limit: i64) -> Self {
        self.access_limit = access_limit;
        self
    }
}

impl fmt::Debug for NewSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewSecret")
            .field("content_len", &self.content.len())
            .field("content_type", &self.content_type)
            .field("filename", &self.filename)
            .field("access_limit", &self.access_limit)
            .field("expiration_epoch", &self.expiration_epoch)
            .finish()
    }
}

/// Decrypted secret returned by an access.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretContent {
    pub id: SecretId,
    pub content: Vec<u8>,
    pub content_type: ContentType,
    pub filename: Option<String>,
}

impl SecretContent {
    /// Content as UTF-8, if it is valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

impl fmt::Debug for SecretContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretContent")
            .field("id", &self.id)
            .field("content", &"[REDACTED]")
            .field("content_type", &self.content_type)
            .field("filename", &self.filename)
            .finish()
    }
}

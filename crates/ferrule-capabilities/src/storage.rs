//! Blob storage contract.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use ferrule_core::CapabilityType;

use crate::error::CapabilityResult;

/// A boxed byte stream used for uploads and downloads.
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Metadata about a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type, when the backend tracks it.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Last modification time, when the backend tracks it.
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    /// Backend-specific entity tag.
    #[serde(default)]
    pub etag: Option<String>,
}

/// A time-limited URL granting direct access to one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignedUrl {
    /// The signed URL.
    pub url: String,
    /// HTTP method the URL is valid for (`GET` or `PUT`).
    pub method: String,
    /// When the signature stops being accepted.
    pub expires_at: DateTime<Utc>,
}

/// A storage backend (local disk, S3-compatible bucket, ...).
///
/// `connect` / `disconnect` bracket the provider's lifetime within an
/// activation; providers without connection state keep the defaults.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Extension-chosen identifier of this implementation (e.g. `"s3"`).
    fn id(&self) -> &str;

    /// Always [`CapabilityType::StorageProvider`].
    fn capability_type(&self) -> CapabilityType {
        CapabilityType::StorageProvider
    }

    /// Open connections or validate credentials.
    async fn connect(&self) -> CapabilityResult<()> {
        Ok(())
    }

    /// Release connections.
    async fn disconnect(&self) -> CapabilityResult<()> {
        Ok(())
    }

    /// Upload `body` under `key`, replacing any existing object.
    async fn put_stream(
        &self,
        key: &str,
        body: ByteStream,
        content_length: Option<u64>,
    ) -> CapabilityResult<()>;

    /// Open a download stream for `key`.
    async fn get_stream(&self, key: &str) -> CapabilityResult<ByteStream>;

    /// A URL clients can `GET` directly for `ttl`.
    async fn presigned_download_url(&self, key: &str, ttl: Duration)
    -> CapabilityResult<PresignedUrl>;

    /// A URL clients can `PUT` directly for `ttl`.
    async fn presigned_upload_url(&self, key: &str, ttl: Duration) -> CapabilityResult<PresignedUrl>;

    /// Object metadata, `None` if the key does not exist.
    async fn head(&self, key: &str) -> CapabilityResult<Option<ObjectMeta>>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> CapabilityResult<()>;
}

//! ObjectStorage trait definition
//!
//! This trait is the one contract every provider adapter implements. Callers
//! obtain an adapter from the registry and never see provider-native types.

use std::collections::BTreeMap;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::acl::AccessMode;
use crate::config::StorageConfig;
use crate::error::{Error, Result};

/// Streaming object body
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Content type used when nothing better is known
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Bucket owner identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// A bucket as reported by list-buckets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketInfo {
    pub name: String,

    /// Region or location constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,
}

impl BucketInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
            owner: None,
            created: None,
        }
    }
}

/// An object as reported by a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,

    /// Size in bytes
    pub size: u64,

    /// ETag (usually MD5 for single-part uploads)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,

    /// Whether this is a directory placeholder (key ends with `/`)
    pub is_dir: bool,

    /// Owning bucket
    pub bucket: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

impl ObjectInfo {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, size: u64) -> Self {
        let key = key.into();
        Self {
            is_dir: key.ends_with('/'),
            key,
            size,
            etag: None,
            last_modified: None,
            bucket: bucket.into(),
            version_id: None,
        }
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn with_last_modified(mut self, last_modified: Timestamp) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    /// Human-readable size
    pub fn size_human(&self) -> String {
        humansize::format_size(self.size, humansize::BINARY)
    }
}

/// Object metadata as reported by a head request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Object key
    pub name: String,

    pub size: u64,

    pub content_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,

    /// Whether the adapter talks HTTPS
    pub use_https: bool,

    /// User metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

/// Version selection and conditions for a head request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataOptions {
    /// Read this version instead of the current one
    pub version_id: Option<String>,

    /// Fail with [`Error::Precondition`] unless the ETag matches
    pub if_match: Option<String>,

    /// Fail with [`Error::Precondition`] unless the object changed after this
    pub if_modified_since: Option<Timestamp>,
}

impl MetadataOptions {
    pub fn version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    pub fn if_match(mut self, etag: impl Into<String>) -> Self {
        self.if_match = Some(etag.into());
        self
    }

    pub fn if_modified_since(mut self, since: Timestamp) -> Self {
        self.if_modified_since = Some(since);
        self
    }

    /// Check the conditions against an object's current ETag and timestamp
    pub fn check(
        &self,
        context: &str,
        etag: Option<&str>,
        last_modified: Option<Timestamp>,
    ) -> Result<()> {
        if let Some(expected) = &self.if_match {
            let expected = expected.trim_matches('"');
            if expected != "*" && etag.map(|e| e.trim_matches('"')) != Some(expected) {
                return Err(Error::Precondition(format!(
                    "{context}: ETag does not match '{expected}'"
                )));
            }
        }
        if let (Some(since), Some(modified)) = (self.if_modified_since, last_modified) {
            // Providers compare at second precision
            if modified.as_second() <= since.as_second() {
                return Err(Error::Precondition(format!("{context}: not modified")));
            }
        }
        Ok(())
    }
}

/// Content type for a local file, guessed from its name.
///
/// Fails with [`Error::Validation`] unless `path` is an existing file.
pub async fn file_content_type(path: &Path) -> Result<&'static str> {
    let is_file = tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(Error::Validation(format!(
            "'{}' is not an existing file",
            path.display()
        )));
    }
    Ok(mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    #[default]
    Post,
    Delete,
    Head,
}

impl HttpMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "PUT" => Ok(HttpMethod::Put),
            "POST" => Ok(HttpMethod::Post),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            other => Err(Error::Validation(format!("unsupported HTTP method '{other}'"))),
        }
    }
}

/// One CORS rule: a single origin/method pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsRule {
    pub origin: String,

    #[serde(default)]
    pub method: HttpMethod,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_header: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose_header: Option<String>,
}

impl CorsRule {
    pub fn new(origin: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            origin: origin.into(),
            method,
            allowed_header: None,
            expose_header: None,
        }
    }
}

/// Provider-neutral object storage operations
///
/// Every operation taking a bucket or object name fails with
/// [`Error::Validation`] when the name is empty. Object names lose a single
/// leading `/`.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Lower-cased provider identifier
    fn provider(&self) -> &str;

    fn config(&self) -> &StorageConfig;

    /// `true` also when the bucket exists but access is forbidden
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    /// Fails with [`Error::Conflict`] when the name is taken
    async fn create_bucket(&self, bucket: &str) -> Result<()>;

    async fn remove_bucket(&self, bucket: &str) -> Result<()>;

    async fn list_buckets(&self) -> Result<Vec<BucketInfo>>;

    /// Bucket mode; a bucket never reports `Default`
    async fn get_bucket_acl(&self, bucket: &str) -> Result<AccessMode>;

    async fn set_bucket_acl(&self, bucket: &str, mode: AccessMode) -> Result<()>;

    /// Replace the bucket's CORS rules; an empty list is rejected
    async fn set_bucket_cors(&self, bucket: &str, rules: &[CorsRule]) -> Result<()>;

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool>;

    /// Every object under `prefix`, across all pages
    async fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<ObjectInfo>>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectReader>;

    /// Stream an object into a local file, creating parent directories
    async fn get_object_to_file(&self, bucket: &str, key: &str, path: &Path) -> Result<u64> {
        let mut reader = self.get_object(bucket, key).await?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(path).await?;
        let written = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        Ok(written)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<()>;

    /// Upload a body of unknown length and return the bytes written.
    ///
    /// The default buffers the whole body; remote adapters override it to
    /// upload in bounded parts.
    async fn put_object_stream(
        &self,
        bucket: &str,
        key: &str,
        mut reader: ObjectReader,
        content_type: Option<&str>,
    ) -> Result<u64> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        let size = data.len() as u64;
        self.put_object(bucket, key, data, content_type).await?;
        Ok(size)
    }

    /// Upload a local file; the content type is guessed from its name
    async fn put_object_from_file(&self, bucket: &str, key: &str, path: &Path) -> Result<u64> {
        let content_type = file_content_type(path).await?;
        let file = tokio::fs::File::open(path).await?;
        self.put_object_stream(bucket, key, Box::pin(file), Some(content_type))
            .await
    }

    async fn get_object_metadata(&self, bucket: &str, key: &str) -> Result<ObjectMetadata> {
        self.get_object_metadata_with(bucket, key, &MetadataOptions::default())
            .await
    }

    /// Head request for a specific version or under conditions
    async fn get_object_metadata_with(
        &self,
        bucket: &str,
        key: &str,
        options: &MetadataOptions,
    ) -> Result<ObjectMetadata>;

    /// Server-side copy
    async fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<()> {
        self.copy_object_with(
            source_bucket,
            source_key,
            dest_bucket,
            dest_key,
            &CancellationToken::new(),
        )
        .await
    }

    /// Server-side copy that stops and cleans up when `cancel` fires
    async fn copy_object_with(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
        cancel: &CancellationToken,
    ) -> Result<()>;

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Batch delete; fails as a whole when fewer deletions are reported
    async fn remove_objects(&self, bucket: &str, keys: &[String]) -> Result<()>;

    /// Effective object mode, with `Default` resolved against the bucket
    async fn get_object_acl(&self, bucket: &str, key: &str) -> Result<AccessMode>;

    async fn set_object_acl(&self, bucket: &str, key: &str, mode: AccessMode) -> Result<()>;

    /// Reset the object to inherit and return its effective mode
    async fn remove_object_acl(&self, bucket: &str, key: &str) -> Result<AccessMode> {
        self.set_object_acl(bucket, key, AccessMode::Default).await?;
        self.get_object_acl(bucket, key).await
    }

    /// GET URL: static when the object is public, signed otherwise
    async fn presigned_get_object(&self, bucket: &str, key: &str, expiry: Duration)
    -> Result<String>;
}

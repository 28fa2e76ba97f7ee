//! In-memory storage backend
//!
//! `MemoryBackend` simulates an object storage service: buckets, objects,
//! ACLs with inheritance, CORS rules and multipart sessions. `MemoryStorage`
//! is the adapter over it, registered under the `memory` provider.

use std::collections::{BTreeMap, HashMap};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::acl::{self, AccessMode};
use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::listing::{self, ListPage, PageRequest, PageSource};
use crate::multipart::{
    self, CompletedPart, CopyConfig, ObjectLocation, PartCopier, PartCopyRequest,
};
use crate::path::{format_object_name, object_name, validate_bucket};
use crate::presign::{self, UrlSigner};
use crate::registry::{ProviderFactory, StorageHandle};
use crate::traits::{
    BucketInfo, CorsRule, DEFAULT_CONTENT_TYPE, MetadataOptions, ObjectInfo, ObjectMetadata,
    ObjectReader, ObjectStorage, Owner,
};

/// Provider identifier of the in-memory backend
pub const PROVIDER: &str = "memory";

#[derive(Debug, Clone)]
struct StoredObject {
    data: Arc<Vec<u8>>,
    content_type: String,
    etag: String,
    last_modified: Timestamp,
    acl: AccessMode,
    metadata: BTreeMap<String, String>,
}

impl StoredObject {
    fn new(data: Vec<u8>, content_type: String) -> Self {
        Self {
            etag: etag_of(&data),
            data: Arc::new(data),
            content_type,
            last_modified: Timestamp::now(),
            acl: AccessMode::Default,
            metadata: BTreeMap::new(),
        }
    }
}

#[derive(Debug)]
struct BucketState {
    owner: String,
    created: Timestamp,
    acl: AccessMode,
    cors: Vec<CorsRule>,
    objects: BTreeMap<String, StoredObject>,
}

#[derive(Debug)]
struct Upload {
    dest: ObjectLocation,
    content_type: Option<String>,
    parts: BTreeMap<i32, (String, Vec<u8>)>,
}

#[derive(Debug, Default)]
struct State {
    buckets: BTreeMap<String, BucketState>,
    uploads: HashMap<String, Upload>,
    next_upload: u64,
}

impl State {
    fn bucket(&self, bucket: &str) -> Result<&BucketState> {
        self.buckets
            .get(bucket)
            .ok_or_else(|| Error::NotFound(format!("bucket '{bucket}'")))
    }

    fn bucket_mut(&mut self, bucket: &str) -> Result<&mut BucketState> {
        self.buckets
            .get_mut(bucket)
            .ok_or_else(|| Error::NotFound(format!("bucket '{bucket}'")))
    }

    fn object(&self, bucket: &str, key: &str) -> Result<&StoredObject> {
        self.bucket(bucket)?
            .objects
            .get(key)
            .ok_or_else(|| Error::NotFound(format!("object '{bucket}/{key}'")))
    }

    fn object_mut(&mut self, bucket: &str, key: &str) -> Result<&mut StoredObject> {
        self.bucket_mut(bucket)?
            .objects
            .get_mut(key)
            .ok_or_else(|| Error::NotFound(format!("object '{bucket}/{key}'")))
    }
}

/// Simulated storage service shared by every adapter built over it
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::Provider("memory backend state is poisoned".into()))
    }

    /// CORS rules currently stored for `bucket`
    pub fn bucket_cors(&self, bucket: &str) -> Result<Vec<CorsRule>> {
        Ok(self.state()?.bucket(bucket)?.cors.clone())
    }

    /// Multipart sessions neither completed nor aborted
    pub fn pending_uploads(&self) -> Result<usize> {
        Ok(self.state()?.uploads.len())
    }
}

fn etag_of(data: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    format!("\"{:016x}\"", hasher.finish())
}

/// Adapter over a [`MemoryBackend`]
pub struct MemoryStorage {
    config: StorageConfig,
    backend: Arc<MemoryBackend>,
    copy: CopyConfig,
}

impl MemoryStorage {
    pub fn new(config: StorageConfig, backend: Arc<MemoryBackend>) -> Result<Self> {
        config.require_credentials()?;
        Ok(Self {
            config,
            backend,
            copy: CopyConfig::default(),
        })
    }

    /// Override the multipart copy settings
    pub fn with_copy_config(mut self, copy: CopyConfig) -> Self {
        self.copy = copy;
        self
    }

    pub fn backend(&self) -> &Arc<MemoryBackend> {
        &self.backend
    }

    fn base_url(&self) -> String {
        self.config
            .endpoint_url()
            .unwrap_or_else(|| format!("{}://localhost", self.config.scheme()))
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn config(&self) -> &StorageConfig {
        &self.config
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        validate_bucket(bucket)?;
        Ok(self.backend.state()?.buckets.contains_key(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        validate_bucket(bucket)?;
        let mut state = self.backend.state()?;
        if state.buckets.contains_key(bucket) {
            return Err(Error::Conflict(format!("bucket '{bucket}' already exists")));
        }
        state.buckets.insert(
            bucket.to_string(),
            BucketState {
                owner: self.config.access_key.clone(),
                created: Timestamp::now(),
                acl: AccessMode::Private,
                cors: Vec::new(),
                objects: BTreeMap::new(),
            },
        );
        tracing::debug!(bucket, "Created bucket");
        Ok(())
    }

    async fn remove_bucket(&self, bucket: &str) -> Result<()> {
        validate_bucket(bucket)?;
        let mut state = self.backend.state()?;
        if !state.bucket(bucket)?.objects.is_empty() {
            return Err(Error::Conflict(format!("bucket '{bucket}' is not empty")));
        }
        state.buckets.remove(bucket);
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        let state = self.backend.state()?;
        Ok(state
            .buckets
            .iter()
            .map(|(name, bucket)| BucketInfo {
                name: name.clone(),
                location: Some(self.config.effective_region().to_string()),
                owner: Some(Owner {
                    id: bucket.owner.clone(),
                    display_name: None,
                }),
                created: Some(bucket.created),
            })
            .collect())
    }

    async fn get_bucket_acl(&self, bucket: &str) -> Result<AccessMode> {
        validate_bucket(bucket)?;
        Ok(self.backend.state()?.bucket(bucket)?.acl)
    }

    async fn set_bucket_acl(&self, bucket: &str, mode: AccessMode) -> Result<()> {
        validate_bucket(bucket)?;
        self.backend.state()?.bucket_mut(bucket)?.acl = mode.resolve_bucket();
        Ok(())
    }

    async fn set_bucket_cors(&self, bucket: &str, rules: &[CorsRule]) -> Result<()> {
        validate_bucket(bucket)?;
        if rules.is_empty() {
            return Err(Error::Validation("CORS rules cannot be empty".into()));
        }
        self.backend.state()?.bucket_mut(bucket)?.cors = rules.to_vec();
        Ok(())
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let key = object_name(bucket, key)?;
        match self.backend.state()?.object(bucket, &key) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<ObjectInfo>> {
        validate_bucket(bucket)?;
        listing::list_all(self, bucket, prefix).await
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectReader> {
        let key = object_name(bucket, key)?;
        let data = Arc::clone(&self.backend.state()?.object(bucket, &key)?.data);
        let reader: ObjectReader = Box::pin(std::io::Cursor::new(data.as_ref().clone()));
        Ok(reader)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<()> {
        let key = object_name(bucket, key)?;
        let content_type = content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_string();
        let mut state = self.backend.state()?;
        let target = state.bucket_mut(bucket)?;
        let size = data.len();
        target
            .objects
            .insert(key.clone(), StoredObject::new(data, content_type));
        tracing::debug!(bucket, key = %key, size, "Stored object");
        Ok(())
    }

    async fn get_object_metadata_with(
        &self,
        bucket: &str,
        key: &str,
        options: &MetadataOptions,
    ) -> Result<ObjectMetadata> {
        let key = object_name(bucket, key)?;
        let state = self.backend.state()?;
        let object = state.object(bucket, &key)?;
        // Unversioned: only the S3 "null" version exists
        if let Some(version) = options.version_id.as_deref().filter(|v| *v != "null") {
            return Err(Error::NotFound(format!(
                "version '{version}' of object '{bucket}/{key}'"
            )));
        }
        options.check(
            &format!("object '{bucket}/{key}'"),
            Some(object.etag.as_str()),
            Some(object.last_modified),
        )?;
        Ok(ObjectMetadata {
            name: key.clone(),
            size: object.data.len() as u64,
            content_type: object.content_type.clone(),
            etag: Some(object.etag.clone()),
            last_modified: Some(object.last_modified),
            use_https: self.config.use_https,
            metadata: object.metadata.clone(),
            version_id: None,
        })
    }

    async fn copy_object_with(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let source = ObjectLocation::new(source_bucket, object_name(source_bucket, source_key)?);
        let dest = ObjectLocation::new(dest_bucket, object_name(dest_bucket, dest_key)?);
        multipart::copy_object(self, &self.copy, &source, &dest, cancel).await?;
        Ok(())
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<()> {
        let key = object_name(bucket, key)?;
        self.backend.state()?.bucket_mut(bucket)?.objects.remove(&key);
        Ok(())
    }

    async fn remove_objects(&self, bucket: &str, keys: &[String]) -> Result<()> {
        validate_bucket(bucket)?;
        let keys = keys
            .iter()
            .map(|k| format_object_name(k))
            .collect::<Result<Vec<_>>>()?;
        let mut state = self.backend.state()?;
        let target = state.bucket_mut(bucket)?;
        for key in &keys {
            target.objects.remove(key);
        }
        tracing::debug!(bucket, count = keys.len(), "Removed objects");
        Ok(())
    }

    async fn get_object_acl(&self, bucket: &str, key: &str) -> Result<AccessMode> {
        let key = object_name(bucket, key)?;
        let own = self.backend.state()?.object(bucket, &key)?.acl;
        acl::resolve_effective(own, || self.get_bucket_acl(bucket)).await
    }

    async fn set_object_acl(&self, bucket: &str, key: &str, mode: AccessMode) -> Result<()> {
        let key = object_name(bucket, key)?;
        self.backend.state()?.object_mut(bucket, &key)?.acl = mode;
        Ok(())
    }

    async fn presigned_get_object(
        &self,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> Result<String> {
        let key = object_name(bucket, key)?;
        presign::presigned_get_url(self, bucket, &key, expiry).await
    }
}

#[async_trait]
impl PageSource for MemoryStorage {
    async fn fetch_page(&self, request: &PageRequest) -> Result<ListPage> {
        let state = self.backend.state()?;
        let bucket = state.bucket(&request.bucket)?;
        let prefix = request.prefix.as_deref().unwrap_or("");
        let max_keys = request.max_keys.max(1) as usize;

        let mut matching = bucket
            .objects
            .iter()
            .filter(|(key, _)| match request.marker.as_deref() {
                Some(marker) => key.as_str() > marker,
                None => true,
            })
            .filter(|(key, _)| key.starts_with(prefix));

        let objects: Vec<ObjectInfo> = matching
            .by_ref()
            .take(max_keys)
            .map(|(key, object)| {
                ObjectInfo::new(&request.bucket, key.clone(), object.data.len() as u64)
                    .with_etag(object.etag.clone())
                    .with_last_modified(object.last_modified)
            })
            .collect();
        let truncated = matching.next().is_some();

        Ok(ListPage {
            next_marker: truncated
                .then(|| objects.last().map(|o| o.key.clone()))
                .flatten(),
            objects,
            truncated,
        })
    }
}

#[async_trait]
impl PartCopier for MemoryStorage {
    async fn source_size(&self, source: &ObjectLocation) -> Result<u64> {
        let state = self.backend.state()?;
        Ok(state.object(&source.bucket, &source.key)?.data.len() as u64)
    }

    async fn initiate(&self, dest: &ObjectLocation) -> Result<String> {
        let mut state = self.backend.state()?;
        state.bucket(&dest.bucket)?;
        state.next_upload += 1;
        let upload_id = format!("upload-{}", state.next_upload);
        state.uploads.insert(
            upload_id.clone(),
            Upload {
                dest: dest.clone(),
                content_type: None,
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn copy_part(&self, request: &PartCopyRequest) -> Result<CompletedPart> {
        let mut state = self.backend.state()?;
        let source = state.object(&request.source.bucket, &request.source.key)?;
        let (start, end) = (request.start as usize, request.end as usize);
        if start >= end || end > source.data.len() {
            return Err(Error::Provider(format!(
                "invalid range {start}-{end} for '{}'",
                request.source
            )));
        }
        let bytes = source.data[start..end].to_vec();
        let content_type = source.content_type.clone();

        let upload = state
            .uploads
            .get_mut(&request.upload_id)
            .ok_or_else(|| Error::NotFound(format!("upload '{}'", request.upload_id)))?;
        upload.content_type.get_or_insert(content_type);
        let etag = etag_of(&bytes);
        upload
            .parts
            .insert(request.part_number, (etag.clone(), bytes));

        Ok(CompletedPart {
            part_number: request.part_number,
            etag,
        })
    }

    async fn complete(
        &self,
        dest: &ObjectLocation,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<()> {
        let mut state = self.backend.state()?;
        let upload = state
            .uploads
            .remove(upload_id)
            .ok_or_else(|| Error::NotFound(format!("upload '{upload_id}'")))?;
        if upload.dest != *dest {
            return Err(Error::Provider(format!(
                "upload '{upload_id}' belongs to '{}'",
                upload.dest
            )));
        }
        if parts.is_empty() || parts.len() != upload.parts.len() {
            return Err(Error::Provider(format!(
                "upload '{upload_id}' completed with {} of {} parts",
                parts.len(),
                upload.parts.len()
            )));
        }

        let mut data = Vec::new();
        let mut previous = 0;
        for part in parts {
            if part.part_number <= previous {
                return Err(Error::Provider("parts must be in ascending order".into()));
            }
            previous = part.part_number;
            match upload.parts.get(&part.part_number) {
                Some((etag, bytes)) if *etag == part.etag => data.extend_from_slice(bytes),
                _ => {
                    return Err(Error::Provider(format!(
                        "part {} of upload '{upload_id}' is missing or corrupt",
                        part.part_number
                    )));
                }
            }
        }

        let content_type = upload
            .content_type
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        state
            .bucket_mut(&dest.bucket)?
            .objects
            .insert(dest.key.clone(), StoredObject::new(data, content_type));
        Ok(())
    }

    async fn abort(&self, _dest: &ObjectLocation, upload_id: &str) -> Result<()> {
        let mut state = self.backend.state()?;
        state
            .uploads
            .remove(upload_id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("upload '{upload_id}'")))
    }

    async fn copy_whole(&self, source: &ObjectLocation, dest: &ObjectLocation) -> Result<()> {
        let mut state = self.backend.state()?;
        let object = state.object(&source.bucket, &source.key)?;
        let copy = StoredObject {
            last_modified: Timestamp::now(),
            acl: AccessMode::Default,
            ..object.clone()
        };
        state
            .bucket_mut(&dest.bucket)?
            .objects
            .insert(dest.key.clone(), copy);
        Ok(())
    }
}

#[async_trait]
impl UrlSigner for MemoryStorage {
    async fn effective_object_acl(&self, bucket: &str, key: &str) -> Result<AccessMode> {
        self.get_object_acl(bucket, key).await
    }

    fn static_url(&self, bucket: &str, key: &str) -> Result<String> {
        presign::static_object_url(&format!("{}/{bucket}", self.base_url()), key)
    }

    async fn sign_get_url(
        &self,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> Result<Option<String>> {
        let expires = i64::try_from(expiry.as_secs())
            .ok()
            .and_then(|secs| Timestamp::now().as_second().checked_add(secs))
            .ok_or_else(|| {
                Error::Validation(format!("expiry of {}s is too large", expiry.as_secs()))
            })?;
        let mut url = Url::parse(&self.static_url(bucket, key)?)
            .map_err(|e| Error::Provider(format!("signing '{bucket}/{key}': {e}")))?;
        url.query_pairs_mut()
            .append_pair("X-Osskit-Credential", &self.config.access_key)
            .append_pair("X-Osskit-Expires", &expires.to_string());
        Ok(Some(url.to_string()))
    }
}

/// Factory for [`MemoryStorage`]; every adapter shares one backend
#[derive(Default)]
pub struct MemoryFactory {
    backend: Arc<MemoryBackend>,
}

impl MemoryFactory {
    pub fn new(backend: Arc<MemoryBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ProviderFactory for MemoryFactory {
    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn create(&self, config: &StorageConfig) -> Result<StorageHandle> {
        Ok(Arc::new(MemoryStorage::new(
            config.clone(),
            Arc::clone(&self.backend),
        )?))
    }
}

//! S3 storage adapter
//!
//! Wraps aws-sdk-s3 and implements the core `ObjectStorage` contract. One
//! adapter type serves every S3-compatible provider; the [`Dialect`] supplies
//! the per-provider differences.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketCannedAcl, BucketLocationConstraint, CompletedMultipartUpload,
    CompletedPart as SdkCompletedPart, CorsConfiguration, CreateBucketConfiguration, Delete,
    ObjectCannedAcl, ObjectIdentifier,
};
use aws_smithy_types::DateTime;
use jiff::Timestamp;
use tokio_util::sync::CancellationToken;

use osskit_core::acl::{self, AccessMode, AclTranslator, Grant, GrantListTranslator, Grantee, Permission};
use osskit_core::config::DEFAULT_REGION;
use osskit_core::listing::{self, ListPage, PageRequest, PageSource};
use osskit_core::multipart::{
    self, CompletedPart, CopyConfig, MAX_PART_SIZE, MIN_PART_SIZE, ObjectLocation, PartCopier,
    PartCopyRequest,
};
use osskit_core::path::{format_object_name, object_name, validate_bucket};
use osskit_core::presign::{self, UrlSigner};
use osskit_core::traits::{DEFAULT_CONTENT_TYPE, file_content_type};
use osskit_core::upload::{self, DEFAULT_UPLOAD_PART_SIZE, PartUploader};
use osskit_core::{
    BucketInfo, CorsRule, Error, MetadataOptions, ObjectInfo, ObjectMetadata, ObjectReader,
    ObjectStorage, Owner, Result, StorageConfig,
};

use crate::acl_header::{self, AclHeaderCapture};
use crate::dialect::Dialect;
use crate::error::{from_sdk, status_of};

/// Keys per delete-objects request
const DELETE_BATCH_SIZE: usize = 1000;

/// Adapter over an S3-compatible service
pub struct S3Storage {
    inner: aws_sdk_s3::Client,
    config: StorageConfig,
    dialect: Dialect,
    copy: CopyConfig,
    upload_part_size: u64,
}

impl S3Storage {
    /// Create an adapter for `config` speaking `dialect`
    pub async fn new(dialect: Dialect, config: StorageConfig) -> Result<Self> {
        config.require_credentials()?;
        let endpoint = dialect.endpoint_url(&config)?;

        let credentials = aws_credential_types::Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None, // session token
            None, // expiry
            "osskit-static-credentials",
        );

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(
                config.effective_region().to_string(),
            ));
        if let Some(endpoint) = &endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(dialect.force_path_style())
            .build();

        tracing::debug!(
            provider = dialect.provider(),
            endpoint = endpoint.as_deref().unwrap_or("<sdk default>"),
            "Built S3 client"
        );

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            config,
            dialect,
            copy: CopyConfig::default(),
            upload_part_size: DEFAULT_UPLOAD_PART_SIZE,
        })
    }

    pub fn with_copy_config(mut self, copy: CopyConfig) -> Self {
        self.copy = copy;
        self
    }

    /// Part size for streamed uploads, kept within the S3 part limits
    pub fn with_upload_part_size(mut self, size: u64) -> Self {
        self.upload_part_size = size.clamp(MIN_PART_SIZE, MAX_PART_SIZE);
        self
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn bucket_name(&self, bucket: &str) -> String {
        self.dialect.bucket_name(&self.config, bucket)
    }

    fn location(&self, bucket: &str, key: &str) -> Result<ObjectLocation> {
        let key = object_name(bucket, key)?;
        Ok(ObjectLocation::new(self.bucket_name(bucket), key))
    }

    async fn put_body(&self, dest: &ObjectLocation, body: ByteStream, content_type: &str) -> Result<()> {
        self.inner
            .put_object()
            .bucket(&dest.bucket)
            .key(&dest.key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("put object '{dest}'")))?;
        Ok(())
    }

    /// Location constraint of a bucket; an empty answer means `us-east-1`
    pub async fn bucket_location(&self, bucket: &str) -> Result<String> {
        validate_bucket(bucket)?;
        let name = self.bucket_name(bucket);
        let response = self
            .inner
            .get_bucket_location()
            .bucket(&name)
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("bucket location of '{name}'")))?;

        Ok(response
            .location_constraint()
            .map(|c| c.as_str().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string()))
    }

    /// Unsigned base URL of a bucket
    pub fn bucket_endpoint(&self, bucket: &str) -> Result<String> {
        validate_bucket(bucket)?;
        self.dialect.bucket_base_url(&self.config, bucket)
    }

    /// Own ACL of an object, before inheritance is resolved
    async fn object_mode(&self, bucket: &str, key: &str) -> Result<AccessMode> {
        let request = self.inner.get_object_acl().bucket(bucket).key(key);
        let (response, header) = match self.dialect.object_acl_header() {
            Some(name) => {
                let capture = AclHeaderCapture::new(name);
                let response = request
                    .customize()
                    .interceptor(capture.clone())
                    .send()
                    .await;
                (response, capture.take())
            }
            None => (request.send().await, None),
        };
        let response = response.map_err(|e| from_sdk(e, format!("ACL of '{bucket}/{key}'")))?;

        let grants = to_grants(response.grants());
        tracing::trace!(bucket, key, header = ?header, grants = grants.len(), "Read object ACL");
        Ok(acl_header::object_mode(
            header.as_deref(),
            &grants,
            self.dialect.inherits_object_acl(),
        ))
    }
}

/// Convert SDK grants; entries without a grantee or a known permission are dropped
pub fn to_grants(grants: &[aws_sdk_s3::types::Grant]) -> Vec<Grant> {
    grants
        .iter()
        .filter_map(|grant| {
            let grantee = grant.grantee()?;
            let permission = Permission::parse(grant.permission()?.as_str())?;
            let grantee = match (grantee.uri(), grantee.id()) {
                (Some(uri), _) => Grantee::from_uri(uri),
                (None, Some(id)) => Grantee::User(id.to_string()),
                (None, None) => return None,
            };
            Some(Grant::new(grantee, permission))
        })
        .collect()
}

fn timestamp(value: Option<&DateTime>) -> Option<Timestamp> {
    value.and_then(|t| Timestamp::from_second(t.secs()).ok())
}

fn date_time(value: Timestamp) -> DateTime {
    DateTime::from_secs(value.as_second())
}

fn trim_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

fn copy_source(location: &ObjectLocation) -> String {
    format!(
        "{}/{}",
        location.bucket,
        urlencoding::encode(&location.key)
    )
}

/// A delete batch succeeds only when every requested key is reported deleted
fn check_batch_deleted(
    bucket: &str,
    requested: usize,
    deleted: usize,
    first_error: Option<&str>,
) -> Result<()> {
    if deleted == requested {
        return Ok(());
    }
    Err(Error::Provider(format!(
        "removed {deleted} of {requested} objects from '{bucket}': {}",
        first_error.unwrap_or("no reason given")
    )))
}

fn build_error(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Error {
    Error::Validation(format!("{context}: {err}"))
}

#[async_trait]
impl ObjectStorage for S3Storage {
    fn provider(&self) -> &str {
        self.dialect.provider()
    }

    fn config(&self) -> &StorageConfig {
        &self.config
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        validate_bucket(bucket)?;
        let name = self.bucket_name(bucket);
        match self.inner.head_bucket().bucket(&name).send().await {
            Ok(_) => Ok(true),
            Err(e) => match status_of(&e) {
                // Forbidden still means someone owns it
                Some(403) => Ok(true),
                Some(404) => Ok(false),
                _ => match from_sdk(e, format!("bucket '{name}'")) {
                    Error::NotFound(_) => Ok(false),
                    other => Err(other),
                },
            },
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        validate_bucket(bucket)?;
        let name = self.bucket_name(bucket);
        let mut request = self
            .inner
            .create_bucket()
            .bucket(&name)
            .acl(BucketCannedAcl::Private);

        let region = self.config.effective_region();
        if matches!(self.dialect, Dialect::Aws | Dialect::Huawei) && region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        request
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("create bucket '{name}'")))?;
        tracing::info!(bucket = %name, provider = self.provider(), "Created bucket");
        Ok(())
    }

    async fn remove_bucket(&self, bucket: &str) -> Result<()> {
        validate_bucket(bucket)?;
        let name = self.bucket_name(bucket);
        self.inner
            .delete_bucket()
            .bucket(&name)
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("remove bucket '{name}'")))?;
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        let response = self
            .inner
            .list_buckets()
            .send()
            .await
            .map_err(|e| from_sdk(e, "list buckets"))?;

        let owner = response.owner().map(|o| Owner {
            id: o.id().unwrap_or_default().to_string(),
            display_name: o.display_name().map(str::to_string),
        });

        Ok(response
            .buckets()
            .iter()
            .map(|b| BucketInfo {
                name: b.name().unwrap_or_default().to_string(),
                location: b.bucket_region().map(str::to_string),
                owner: owner.clone(),
                created: timestamp(b.creation_date()),
            })
            .collect())
    }

    async fn get_bucket_acl(&self, bucket: &str) -> Result<AccessMode> {
        validate_bucket(bucket)?;
        let name = self.bucket_name(bucket);
        let response = self
            .inner
            .get_bucket_acl()
            .bucket(&name)
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("ACL of bucket '{name}'")))?;

        let grants = to_grants(response.grants());
        Ok(GrantListTranslator.to_canonical(&grants).resolve_bucket())
    }

    async fn set_bucket_acl(&self, bucket: &str, mode: AccessMode) -> Result<()> {
        validate_bucket(bucket)?;
        let name = self.bucket_name(bucket);
        let canned = self.dialect.bucket_canned_acl(mode);
        self.inner
            .put_bucket_acl()
            .bucket(&name)
            .acl(BucketCannedAcl::from(canned.as_str()))
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("set ACL of bucket '{name}'")))?;
        tracing::debug!(bucket = %name, acl = %canned, "Set bucket ACL");
        Ok(())
    }

    async fn set_bucket_cors(&self, bucket: &str, rules: &[CorsRule]) -> Result<()> {
        validate_bucket(bucket)?;
        if rules.is_empty() {
            return Err(Error::Validation("CORS rules cannot be empty".into()));
        }
        let name = self.bucket_name(bucket);

        let rules = rules
            .iter()
            .map(|rule| {
                aws_sdk_s3::types::CorsRule::builder()
                    .allowed_origins(&rule.origin)
                    .allowed_methods(rule.method.as_str())
                    .set_allowed_headers(rule.allowed_header.clone().map(|h| vec![h]))
                    .set_expose_headers(rule.expose_header.clone().map(|h| vec![h]))
                    .build()
                    .map_err(|e| build_error("invalid CORS rule", e))
            })
            .collect::<Result<Vec<_>>>()?;
        let configuration = CorsConfiguration::builder()
            .set_cors_rules(Some(rules))
            .build()
            .map_err(|e| build_error("invalid CORS configuration", e))?;

        self.inner
            .put_bucket_cors()
            .bucket(&name)
            .cors_configuration(configuration)
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("set CORS of bucket '{name}'")))?;
        Ok(())
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let key = object_name(bucket, key)?;
        let name = self.bucket_name(bucket);
        match self.inner.head_object().bucket(&name).key(&key).send().await {
            Ok(_) => Ok(true),
            Err(e) => match from_sdk(e, format!("object '{name}/{key}'")) {
                Error::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<ObjectInfo>> {
        validate_bucket(bucket)?;
        listing::list_all(self, &self.bucket_name(bucket), prefix).await
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectReader> {
        let key = object_name(bucket, key)?;
        let name = self.bucket_name(bucket);
        let response = self
            .inner
            .get_object()
            .bucket(&name)
            .key(&key)
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("object '{name}/{key}'")))?;

        let reader: ObjectReader = Box::pin(response.body.into_async_read());
        Ok(reader)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<()> {
        let dest = self.location(bucket, key)?;
        let size = data.len();
        self.put_body(&dest, ByteStream::from(data), content_type.unwrap_or(DEFAULT_CONTENT_TYPE))
            .await?;
        tracing::debug!(%dest, size, "Uploaded object");
        Ok(())
    }

    async fn put_object_stream(
        &self,
        bucket: &str,
        key: &str,
        mut reader: ObjectReader,
        content_type: Option<&str>,
    ) -> Result<u64> {
        let dest = self.location(bucket, key)?;
        let summary = upload::upload_stream(
            self,
            &dest,
            &mut reader,
            content_type.unwrap_or(DEFAULT_CONTENT_TYPE),
            self.upload_part_size,
        )
        .await?;
        Ok(summary.size)
    }

    async fn put_object_from_file(&self, bucket: &str, key: &str, path: &Path) -> Result<u64> {
        let content_type = file_content_type(path).await?;
        let size = tokio::fs::metadata(path).await?.len();
        if size >= self.upload_part_size {
            let file = tokio::fs::File::open(path).await?;
            return self
                .put_object_stream(bucket, key, Box::pin(file), Some(content_type))
                .await;
        }

        let dest = self.location(bucket, key)?;
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;
        self.put_body(&dest, body, content_type).await?;
        tracing::debug!(%dest, size, path = %path.display(), "Uploaded file");
        Ok(size)
    }

    async fn get_object_metadata_with(
        &self,
        bucket: &str,
        key: &str,
        options: &MetadataOptions,
    ) -> Result<ObjectMetadata> {
        let key = object_name(bucket, key)?;
        let name = self.bucket_name(bucket);
        let response = self
            .inner
            .head_object()
            .bucket(&name)
            .key(&key)
            .set_version_id(options.version_id.clone())
            .set_if_match(options.if_match.clone())
            .set_if_modified_since(options.if_modified_since.map(date_time))
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("object '{name}/{key}'")))?;

        Ok(ObjectMetadata {
            size: response.content_length().unwrap_or(0).max(0) as u64,
            content_type: response
                .content_type()
                .unwrap_or(DEFAULT_CONTENT_TYPE)
                .to_string(),
            etag: response.e_tag().map(trim_etag),
            last_modified: timestamp(response.last_modified()),
            use_https: self.config.use_https,
            metadata: response
                .metadata()
                .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_else(BTreeMap::new),
            version_id: response.version_id().map(str::to_string),
            name: key,
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
        let source = ObjectLocation::new(
            self.bucket_name(source_bucket),
            object_name(source_bucket, source_key)?,
        );
        let dest = ObjectLocation::new(
            self.bucket_name(dest_bucket),
            object_name(dest_bucket, dest_key)?,
        );
        multipart::copy_object(self, &self.copy, &source, &dest, cancel).await?;
        Ok(())
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<()> {
        let key = object_name(bucket, key)?;
        let name = self.bucket_name(bucket);
        self.inner
            .delete_object()
            .bucket(&name)
            .key(&key)
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("remove object '{name}/{key}'")))?;
        Ok(())
    }

    async fn remove_objects(&self, bucket: &str, keys: &[String]) -> Result<()> {
        validate_bucket(bucket)?;
        let keys = keys
            .iter()
            .map(|k| format_object_name(k))
            .collect::<Result<Vec<_>>>()?;
        let name = self.bucket_name(bucket);

        for chunk in keys.chunks(DELETE_BATCH_SIZE) {
            let objects = chunk
                .iter()
                .map(|key| {
                    ObjectIdentifier::builder()
                        .key(key)
                        .build()
                        .map_err(|e| build_error("invalid object identifier", e))
                })
                .collect::<Result<Vec<_>>>()?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(false)
                .build()
                .map_err(|e| build_error("invalid delete request", e))?;

            let response = self
                .inner
                .delete_objects()
                .bucket(&name)
                .delete(delete)
                .send()
                .await
                .map_err(|e| from_sdk(e, format!("remove objects from '{name}'")))?;

            check_batch_deleted(
                &name,
                chunk.len(),
                response.deleted().len(),
                response.errors().first().and_then(|e| e.message()),
            )?;
        }

        tracing::debug!(bucket = %name, count = keys.len(), "Removed objects");
        Ok(())
    }

    async fn get_object_acl(&self, bucket: &str, key: &str) -> Result<AccessMode> {
        let key = object_name(bucket, key)?;
        let name = self.bucket_name(bucket);
        let own = self.object_mode(&name, &key).await?;
        acl::resolve_effective(own, || self.get_bucket_acl(bucket)).await
    }

    async fn set_object_acl(&self, bucket: &str, key: &str, mode: AccessMode) -> Result<()> {
        let key = object_name(bucket, key)?;
        let canned = self.dialect.object_canned_acl(mode)?;
        if !self.object_exists(bucket, &key).await? {
            return Err(Error::NotFound(format!("object '{bucket}/{key}'")));
        }

        let name = self.bucket_name(bucket);
        self.inner
            .put_object_acl()
            .bucket(&name)
            .key(&key)
            .acl(ObjectCannedAcl::from(canned.as_str()))
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("set ACL of '{name}/{key}'")))?;
        tracing::debug!(bucket = %name, key = %key, acl = %canned, "Set object ACL");
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
impl PageSource for S3Storage {
    async fn fetch_page(&self, request: &PageRequest) -> Result<ListPage> {
        let response = self
            .inner
            .list_objects_v2()
            .bucket(&request.bucket)
            .set_prefix(request.prefix.clone())
            .set_continuation_token(request.marker.clone())
            .max_keys(request.max_keys)
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("list objects in '{}'", request.bucket)))?;

        let objects = response
            .contents()
            .iter()
            .map(|object| {
                let size = object.size().unwrap_or(0).max(0) as u64;
                let mut info =
                    ObjectInfo::new(&request.bucket, object.key().unwrap_or_default(), size);
                info.etag = object.e_tag().map(trim_etag);
                info.last_modified = timestamp(object.last_modified());
                info
            })
            .collect();

        Ok(ListPage {
            objects,
            truncated: response.is_truncated().unwrap_or(false),
            next_marker: response.next_continuation_token().map(str::to_string),
        })
    }
}

#[async_trait]
impl PartCopier for S3Storage {
    async fn source_size(&self, source: &ObjectLocation) -> Result<u64> {
        let response = self
            .inner
            .head_object()
            .bucket(&source.bucket)
            .key(&source.key)
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("object '{source}'")))?;
        Ok(response.content_length().unwrap_or(0).max(0) as u64)
    }

    async fn initiate(&self, dest: &ObjectLocation) -> Result<String> {
        let response = self
            .inner
            .create_multipart_upload()
            .bucket(&dest.bucket)
            .key(&dest.key)
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("start upload to '{dest}'")))?;

        response
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| Error::Provider(format!("no upload id returned for '{dest}'")))
    }

    async fn copy_part(&self, request: &PartCopyRequest) -> Result<CompletedPart> {
        let response = self
            .inner
            .upload_part_copy()
            .bucket(&request.dest.bucket)
            .key(&request.dest.key)
            .upload_id(&request.upload_id)
            .part_number(request.part_number)
            .copy_source(copy_source(&request.source))
            .copy_source_range(format!("bytes={}-{}", request.start, request.end - 1))
            .send()
            .await
            .map_err(|e| {
                from_sdk(
                    e,
                    format!("copy part {} to '{}'", request.part_number, request.dest),
                )
            })?;

        let etag = response
            .copy_part_result()
            .and_then(|r| r.e_tag())
            .ok_or_else(|| {
                Error::Provider(format!(
                    "no ETag returned for part {} of '{}'",
                    request.part_number, request.dest
                ))
            })?;

        Ok(CompletedPart {
            part_number: request.part_number,
            etag: etag.to_string(),
        })
    }

    async fn complete(
        &self,
        dest: &ObjectLocation,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<()> {
        let parts = parts
            .iter()
            .map(|p| {
                SdkCompletedPart::builder()
                    .part_number(p.part_number)
                    .e_tag(&p.etag)
                    .build()
            })
            .collect();

        self.inner
            .complete_multipart_upload()
            .bucket(&dest.bucket)
            .key(&dest.key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("complete upload to '{dest}'")))?;
        Ok(())
    }

    async fn abort(&self, dest: &ObjectLocation, upload_id: &str) -> Result<()> {
        self.inner
            .abort_multipart_upload()
            .bucket(&dest.bucket)
            .key(&dest.key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("abort upload to '{dest}'")))?;
        Ok(())
    }

    async fn copy_whole(&self, source: &ObjectLocation, dest: &ObjectLocation) -> Result<()> {
        self.inner
            .copy_object()
            .bucket(&dest.bucket)
            .key(&dest.key)
            .copy_source(copy_source(source))
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("copy '{source}' to '{dest}'")))?;
        Ok(())
    }
}

#[async_trait]
impl PartUploader for S3Storage {
    async fn put_whole(&self, dest: &ObjectLocation, data: Vec<u8>, content_type: &str) -> Result<()> {
        self.put_body(dest, ByteStream::from(data), content_type).await
    }

    async fn initiate_upload(&self, dest: &ObjectLocation, content_type: &str) -> Result<String> {
        let response = self
            .inner
            .create_multipart_upload()
            .bucket(&dest.bucket)
            .key(&dest.key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("start upload to '{dest}'")))?;

        response
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| Error::Provider(format!("no upload id returned for '{dest}'")))
    }

    async fn upload_part(
        &self,
        dest: &ObjectLocation,
        upload_id: &str,
        part_number: i32,
        data: Vec<u8>,
    ) -> Result<CompletedPart> {
        let response = self
            .inner
            .upload_part()
            .bucket(&dest.bucket)
            .key(&dest.key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| from_sdk(e, format!("upload part {part_number} to '{dest}'")))?;

        let etag = response.e_tag().ok_or_else(|| {
            Error::Provider(format!("no ETag returned for part {part_number} of '{dest}'"))
        })?;
        Ok(CompletedPart {
            part_number,
            etag: etag.to_string(),
        })
    }

    async fn complete_upload(
        &self,
        dest: &ObjectLocation,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<()> {
        PartCopier::complete(self, dest, upload_id, parts).await
    }

    async fn abort_upload(&self, dest: &ObjectLocation, upload_id: &str) -> Result<()> {
        PartCopier::abort(self, dest, upload_id).await
    }
}

#[async_trait]
impl UrlSigner for S3Storage {
    async fn effective_object_acl(&self, bucket: &str, key: &str) -> Result<AccessMode> {
        self.get_object_acl(bucket, key).await
    }

    fn static_url(&self, bucket: &str, key: &str) -> Result<String> {
        self.dialect.static_url(&self.config, bucket, key)
    }

    async fn sign_get_url(
        &self,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> Result<Option<String>> {
        let presigning = PresigningConfig::expires_in(expiry)
            .map_err(|e| Error::Validation(format!("invalid expiry: {e}")))?;
        let name = self.bucket_name(bucket);
        let request = self
            .inner
            .get_object()
            .bucket(&name)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| from_sdk(e, format!("sign '{name}/{key}'")))?;
        Ok(Some(request.uri().to_string()))
    }
}

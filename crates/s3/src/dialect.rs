//! Provider dialects
//!
//! Every supported cloud is reached through its S3-compatible API. A dialect
//! captures what differs between them: endpoints, addressing style, bucket
//! naming, static URL shape and which ACL values objects accept.

use osskit_core::acl::{AccessMode, AclTranslator, CannedAcl, CannedAclTranslator};
use osskit_core::presign::static_object_url;
use osskit_core::{Error, Result, StorageConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Amazon S3
    Aws,
    Minio,
    /// Alibaba Cloud OSS
    Aliyun,
    /// Tencent Cloud COS
    QCloud,
    /// Huawei Cloud OBS
    Huawei,
}

impl Dialect {
    pub const ALL: [Dialect; 5] = [
        Dialect::Aws,
        Dialect::Minio,
        Dialect::Aliyun,
        Dialect::QCloud,
        Dialect::Huawei,
    ];

    /// Provider identifier used in configuration
    pub const fn provider(&self) -> &'static str {
        match self {
            Dialect::Aws => "s3",
            Dialect::Minio => "minio",
            Dialect::Aliyun => "aliyun",
            Dialect::QCloud => "qcloud",
            Dialect::Huawei => "huawei",
        }
    }

    pub fn from_provider(provider: &str) -> Option<Self> {
        let provider = provider.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|d| d.provider() == provider)
    }

    /// Virtual-hosted addressing is mandatory on the public clouds
    pub const fn force_path_style(&self) -> bool {
        matches!(self, Dialect::Minio)
    }

    /// Response header of GetObjectAcl carrying the object's canned ACL
    pub const fn object_acl_header(&self) -> Option<&'static str> {
        match self {
            Dialect::Aliyun => Some("x-oss-object-acl"),
            Dialect::QCloud => Some("x-cos-acl"),
            Dialect::Aws | Dialect::Minio | Dialect::Huawei => None,
        }
    }

    /// Whether objects can carry an ACL that defers to their bucket
    pub const fn inherits_object_acl(&self) -> bool {
        self.object_acl_header().is_some()
    }

    /// Service endpoint as a URL; `None` lets the SDK pick (AWS only)
    pub fn endpoint_url(&self, config: &StorageConfig) -> Result<Option<String>> {
        if let Some(url) = config.endpoint_url() {
            return Ok(Some(url));
        }
        let region = config.effective_region();
        let scheme = config.scheme();
        let url = match self {
            Dialect::Aws => return Ok(None),
            Dialect::Minio => {
                return Err(Error::Configuration(
                    "minio storage requires an endpoint".into(),
                ));
            }
            Dialect::Aliyun => {
                let region = region.strip_prefix("oss-").unwrap_or(region);
                format!("{scheme}://oss-{region}.aliyuncs.com")
            }
            Dialect::QCloud => format!("{scheme}://cos.{region}.myqcloud.com"),
            Dialect::Huawei => format!("{scheme}://obs.{region}.myhuaweicloud.com"),
        };
        Ok(Some(url))
    }

    /// Bucket name as the service knows it.
    ///
    /// COS bucket names end in `-<appid>`; the suffix is added when missing.
    pub fn bucket_name(&self, config: &StorageConfig, bucket: &str) -> String {
        match (self, config.app_id.as_deref()) {
            (Dialect::QCloud, Some(app_id))
                if !app_id.is_empty() && !bucket.ends_with(&format!("-{app_id}")) =>
            {
                format!("{bucket}-{app_id}")
            }
            _ => bucket.to_string(),
        }
    }

    /// Unsigned base URL of a bucket, without a trailing slash
    pub fn bucket_base_url(&self, config: &StorageConfig, bucket: &str) -> Result<String> {
        let bucket = self.bucket_name(config, bucket);
        let scheme = config.scheme();
        let region = config.effective_region();
        let url = match self {
            Dialect::Aliyun => {
                let endpoint = self
                    .endpoint_url(config)?
                    .unwrap_or_default();
                let host = endpoint
                    .split_once("://")
                    .map_or(endpoint.as_str(), |(_, host)| host);
                format!("{scheme}://{bucket}.{host}")
            }
            Dialect::QCloud => format!("{scheme}://{bucket}.cos.{region}.myqcloud.com"),
            Dialect::Huawei => format!("{scheme}://{bucket}.obs.{region}.myhuaweicloud.com"),
            Dialect::Aws => match config.endpoint_url() {
                Some(endpoint) => format!("{endpoint}/{bucket}"),
                None => format!("https://{bucket}.s3.{region}.amazonaws.com"),
            },
            Dialect::Minio => {
                let endpoint = self.endpoint_url(config)?.unwrap_or_default();
                format!("{endpoint}/{bucket}")
            }
        };
        Ok(url)
    }

    /// Direct URL of an object; only meaningful when the object is public
    pub fn static_url(&self, config: &StorageConfig, bucket: &str, key: &str) -> Result<String> {
        static_object_url(&self.bucket_base_url(config, bucket)?, key)
    }

    /// Canned ACL to send for a bucket; buckets have nothing to inherit from
    pub fn bucket_canned_acl(&self, mode: AccessMode) -> CannedAcl {
        CannedAclTranslator.from_canonical(mode.resolve_bucket())
    }

    /// Canned ACL to send for an object
    pub fn object_canned_acl(&self, mode: AccessMode) -> Result<CannedAcl> {
        match (self, mode) {
            (Dialect::QCloud, AccessMode::PublicReadWrite) => Err(Error::Validation(
                "qcloud objects do not support public-read-write".into(),
            )),
            (_, AccessMode::Default) if !self.inherits_object_acl() => Ok(CannedAcl::Private),
            _ => Ok(CannedAclTranslator.from_canonical(mode)),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.provider())
    }
}

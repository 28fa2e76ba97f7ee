//! Presigned URL resolution
//!
//! Public objects are served from their static URL, which never expires.
//! Everything else gets a provider-signed URL.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::acl::AccessMode;
use crate::error::{Error, Result};

/// Provider hooks needed to hand out a GET URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlSigner: Send + Sync {
    /// Object mode with `Default` already resolved against the bucket
    async fn effective_object_acl(&self, bucket: &str, key: &str) -> Result<AccessMode>;

    /// Unsigned URL of the object
    fn static_url(&self, bucket: &str, key: &str) -> Result<String>;

    /// Signed URL valid for `expiry`; `None` when the provider produced nothing
    async fn sign_get_url(&self, bucket: &str, key: &str, expiry: Duration)
    -> Result<Option<String>>;
}

/// Resolve a GET URL for `bucket/key`
pub async fn presigned_get_url<S>(
    signer: &S,
    bucket: &str,
    key: &str,
    expiry: Duration,
) -> Result<String>
where
    S: UrlSigner + ?Sized,
{
    if expiry.is_zero() {
        return Err(Error::Validation("expiry must be greater than zero".into()));
    }

    let mode = signer.effective_object_acl(bucket, key).await?;
    if mode.is_public() {
        tracing::debug!(bucket, key, %mode, "Object is public, returning static URL");
        return signer.static_url(bucket, key);
    }

    signer
        .sign_get_url(bucket, key, expiry)
        .await?
        .filter(|url| !url.is_empty())
        .ok_or_else(|| Error::Provider(format!("signing '{bucket}/{key}' returned no URL")))
}

/// Append an object key to a base URL, percent-encoding each segment
pub fn static_object_url(base: &str, key: &str) -> Result<String> {
    let mut url = Url::parse(base)
        .map_err(|e| Error::Configuration(format!("invalid base URL '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|_| Error::Configuration(format!("base URL '{base}' cannot carry a path")))?
        .pop_if_empty()
        .extend(key.split('/'));
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_object_url() {
        assert_eq!(
            static_object_url("https://photos.oss-cn-hangzhou.aliyuncs.com", "2024/cat.jpg")
                .unwrap(),
            "https://photos.oss-cn-hangzhou.aliyuncs.com/2024/cat.jpg"
        );
        assert_eq!(
            static_object_url("http://localhost:9000/photos", "a b.txt").unwrap(),
            "http://localhost:9000/photos/a%20b.txt"
        );
        assert!(static_object_url("not a url", "k").is_err());
    }

    #[tokio::test]
    async fn test_public_object_gets_static_url() {
        let mut signer = MockUrlSigner::new();
        signer
            .expect_effective_object_acl()
            .returning(|_, _| Ok(AccessMode::PublicRead));
        signer
            .expect_static_url()
            .returning(|bucket, key| Ok(format!("https://{bucket}.example.com/{key}")));
        signer.expect_sign_get_url().never();

        let url = presigned_get_url(&signer, "b", "k.txt", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(url, "https://b.example.com/k.txt");
    }

    #[tokio::test]
    async fn test_private_object_gets_signed_url() {
        let mut signer = MockUrlSigner::new();
        signer
            .expect_effective_object_acl()
            .returning(|_, _| Ok(AccessMode::Private));
        signer.expect_static_url().never();
        signer
            .expect_sign_get_url()
            .withf(|_, _, expiry| *expiry == Duration::from_secs(300))
            .returning(|_, _, _| Ok(Some("https://signed".to_string())));

        let url = presigned_get_url(&signer, "b", "k", Duration::from_secs(300))
            .await
            .unwrap();
        assert_eq!(url, "https://signed");
    }

    #[tokio::test]
    async fn test_missing_signature_is_provider_error() {
        for signed in [None, Some(String::new())] {
            let mut signer = MockUrlSigner::new();
            signer
                .expect_effective_object_acl()
                .returning(|_, _| Ok(AccessMode::Private));
            signer
                .expect_sign_get_url()
                .returning(move |_, _, _| Ok(signed.clone()));

            let err = presigned_get_url(&signer, "b", "k", Duration::from_secs(1))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Provider(_)));
        }
    }

    #[tokio::test]
    async fn test_zero_expiry_is_rejected() {
        let signer = MockUrlSigner::new();
        let err = presigned_get_url(&signer, "b", "k", Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}

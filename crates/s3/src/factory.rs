//! Registry factories for the S3-compatible providers

use std::sync::Arc;

use async_trait::async_trait;
use osskit_core::{ProviderFactory, Result, StorageConfig, StorageHandle, StorageRegistry};

use crate::client::S3Storage;
use crate::dialect::Dialect;

/// Builds [`S3Storage`] adapters for one dialect
#[derive(Debug, Clone, Copy)]
pub struct S3Factory {
    dialect: Dialect,
}

impl S3Factory {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }
}

#[async_trait]
impl ProviderFactory for S3Factory {
    fn provider(&self) -> &str {
        self.dialect.provider()
    }

    async fn create(&self, config: &StorageConfig) -> Result<StorageHandle> {
        let storage = S3Storage::new(self.dialect, config.clone()).await?;
        Ok(Arc::new(storage))
    }
}

/// Register a factory for every S3-compatible provider
pub async fn register_providers(registry: &StorageRegistry) {
    for dialect in Dialect::ALL {
        registry
            .register_factory(Arc::new(S3Factory::new(dialect)))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osskit_core::Error;

    #[tokio::test]
    async fn test_registers_every_dialect() {
        let registry = StorageRegistry::new(Default::default());
        register_providers(&registry).await;
        assert_eq!(
            registry.providers().await,
            vec!["aliyun", "huawei", "minio", "qcloud", "s3"]
        );
    }

    #[tokio::test]
    async fn test_registry_builds_minio_adapter() {
        let registry = StorageRegistry::new(Default::default())
            .with_storage(
                "local",
                StorageConfig::new("MinIO", "http://127.0.0.1:9000", "AK", "SK"),
            )
            .with_storage("broken", StorageConfig::new("minio", "", "AK", "SK"));
        register_providers(&registry).await;

        let storage = registry.create("local").await.unwrap();
        assert_eq!(storage.provider(), "minio");
        assert!(matches!(
            registry.create("broken").await,
            Err(Error::Configuration(_))
        ));
    }
}

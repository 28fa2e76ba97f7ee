//! Provider registry
//!
//! Maps named storage configurations to adapter instances. Provider
//! identifiers resolve through a factory table that callers extend with
//! [`StorageRegistry::register_factory`]; adapters are built lazily and
//! cached per name for the registry's lifetime.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OnceCell, RwLock};

use crate::config::{Config, StorageConfig};
use crate::error::{Error, Result};
use crate::traits::ObjectStorage;

/// Shared adapter handle
pub type StorageHandle = Arc<dyn ObjectStorage>;

/// Name resolved by [`StorageRegistry::create_default`]
pub const DEFAULT_STORAGE: &str = "default";

/// Constructor for one provider's adapters
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    /// Provider identifier this factory serves (case-insensitive)
    fn provider(&self) -> &str;

    /// Build an adapter; fails with [`Error::Validation`] on missing credentials
    async fn create(&self, config: &StorageConfig) -> Result<StorageHandle>;
}

/// Registry of named storages and provider factories
pub struct StorageRegistry {
    configs: HashMap<String, StorageConfig>,
    factories: RwLock<HashMap<String, Arc<dyn ProviderFactory>>>,
    /// One slot per name; the slot's `OnceCell` serializes first construction
    cache: Mutex<HashMap<String, Arc<OnceCell<StorageHandle>>>>,
}

impl StorageRegistry {
    pub fn new(configs: HashMap<String, StorageConfig>) -> Self {
        Self {
            configs,
            factories: RwLock::new(HashMap::new()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Build a registry over every storage in a loaded config file
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config
                .storages
                .iter()
                .map(|(name, storage)| (name.clone(), storage.clone()))
                .collect(),
        )
    }

    /// Add a named configuration before the registry is shared
    pub fn with_storage(mut self, name: impl Into<String>, config: StorageConfig) -> Self {
        self.configs.insert(name.into(), config);
        self
    }

    /// Register (or replace) the factory for its provider identifier
    pub async fn register_factory(&self, factory: Arc<dyn ProviderFactory>) {
        let provider = factory.provider().trim().to_ascii_lowercase();
        tracing::debug!(provider = %provider, "Registered provider factory");
        self.factories.write().await.insert(provider, factory);
    }

    /// Registered provider identifiers, sorted
    pub async fn providers(&self) -> Vec<String> {
        let mut providers: Vec<String> = self.factories.read().await.keys().cloned().collect();
        providers.sort();
        providers
    }

    /// Configured storage names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.configs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn config(&self, name: &str) -> Option<&StorageConfig> {
        self.configs.get(name)
    }

    /// Adapter for `name`, constructing it on first use.
    ///
    /// Concurrent first calls for the same name construct exactly one
    /// adapter. A failed construction leaves the slot empty so a later call
    /// can retry.
    pub async fn create(&self, name: &str) -> Result<StorageHandle> {
        if name.trim().is_empty() {
            return Err(Error::Validation("storage name cannot be empty".into()));
        }

        // Only configured names get a cache slot
        if !self.configs.contains_key(name) {
            return Err(Error::Configuration(format!("no storage named '{name}'")));
        }

        let slot = {
            let mut cache = self.cache.lock().await;
            cache.entry(name.to_string()).or_default().clone()
        };

        let handle = slot.get_or_try_init(|| self.construct(name)).await?;
        Ok(Arc::clone(handle))
    }

    /// Adapter for the storage named `"default"`
    pub async fn create_default(&self) -> Result<StorageHandle> {
        self.create(DEFAULT_STORAGE).await
    }

    /// Already-constructed adapter, if any
    pub async fn cached(&self, name: &str) -> Option<StorageHandle> {
        let cache = self.cache.lock().await;
        cache.get(name).and_then(|slot| slot.get().cloned())
    }

    async fn construct(&self, name: &str) -> Result<StorageHandle> {
        let config = self
            .configs
            .get(name)
            .ok_or_else(|| Error::Configuration(format!("no storage named '{name}'")))?;

        let provider = config.provider.trim().to_ascii_lowercase();
        if provider.is_empty() {
            return Err(Error::Configuration(format!(
                "storage '{name}' has no provider"
            )));
        }

        let factory = self
            .factories
            .read()
            .await
            .get(&provider)
            .cloned()
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "storage '{name}' uses unknown provider '{provider}'"
                ))
            })?;

        let storage = factory.create(config).await?;
        tracing::info!(name, provider = %provider, "Created storage adapter");
        Ok(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBackend, MemoryStorage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Builds in-memory adapters and counts constructions
    struct CountingFactory {
        provider: &'static str,
        backend: Arc<MemoryBackend>,
        constructed: AtomicUsize,
    }

    impl CountingFactory {
        fn new(provider: &'static str) -> Arc<Self> {
            Arc::new(Self {
                provider,
                backend: Arc::new(MemoryBackend::new()),
                constructed: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ProviderFactory for CountingFactory {
        fn provider(&self) -> &str {
            self.provider
        }

        async fn create(&self, config: &StorageConfig) -> Result<StorageHandle> {
            self.constructed.fetch_add(1, Ordering::SeqCst);
            // Widen the window for racing callers
            tokio::time::sleep(Duration::from_millis(20)).await;
            let storage = MemoryStorage::new(config.clone(), Arc::clone(&self.backend))?;
            Ok(Arc::new(storage))
        }
    }

    fn storage(provider: &str) -> StorageConfig {
        StorageConfig::new(provider, "", "AK", "SK")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_create_constructs_once() {
        let factory = CountingFactory::new("stub");
        let registry = Arc::new(StorageRegistry::new(HashMap::new()).with_storage("x", storage("stub")));
        registry.register_factory(factory.clone()).await;

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.create("x").await })
            })
            .collect();

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap().unwrap());
        }

        assert_eq!(factory.constructed.load(Ordering::SeqCst), 1);
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
    }

    #[tokio::test]
    async fn test_create_returns_cached_instance() {
        let factory = CountingFactory::new("stub");
        let registry = StorageRegistry::new(HashMap::new()).with_storage("a", storage("stub"));
        registry.register_factory(factory.clone()).await;

        assert!(registry.cached("a").await.is_none());
        let first = registry.create("a").await.unwrap();
        let second = registry.create("a").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.cached("a").await.is_some());
        assert_eq!(factory.constructed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_lookup_is_case_insensitive() {
        let registry = StorageRegistry::new(HashMap::new()).with_storage("a", storage("  STUB "));
        registry.register_factory(CountingFactory::new("Stub")).await;

        let storage = registry.create("a").await.unwrap();
        assert_eq!(storage.provider(), "memory");
        assert_eq!(registry.providers().await, vec!["stub"]);
    }

    #[tokio::test]
    async fn test_create_errors() {
        let registry = StorageRegistry::new(HashMap::new())
            .with_storage("blank", storage(""))
            .with_storage("unknown", storage("nope"))
            .with_storage("nokey", StorageConfig::new("stub", "", "", "SK"));
        registry.register_factory(CountingFactory::new("stub")).await;

        assert!(matches!(
            registry.create("").await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            registry.create("missing").await,
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            registry.create("blank").await,
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            registry.create("unknown").await,
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            registry.create("nokey").await,
            Err(Error::Validation(_))
        ));
        // Failures are not cached
        assert!(registry.cached("nokey").await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_names_leave_no_cache_slots() {
        let registry = StorageRegistry::new(HashMap::new()).with_storage("a", storage("stub"));
        registry.register_factory(CountingFactory::new("stub")).await;

        for i in 0..1000 {
            assert!(matches!(
                registry.create(&format!("missing-{i}")).await,
                Err(Error::Configuration(_))
            ));
        }
        assert!(registry.cache.lock().await.is_empty());

        registry.create("a").await.unwrap();
        assert_eq!(registry.cache.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_factory_registered_later_is_used() {
        let registry = StorageRegistry::new(HashMap::new()).with_storage("late", storage("stub"));
        assert!(registry.create("late").await.is_err());

        registry.register_factory(CountingFactory::new("stub")).await;
        assert!(registry.create("late").await.is_ok());
    }

    #[tokio::test]
    async fn test_create_default() {
        let mut config = Config::default();
        config
            .storages
            .insert(DEFAULT_STORAGE.to_string(), storage("stub"));
        let registry = StorageRegistry::from_config(&config);
        registry.register_factory(CountingFactory::new("stub")).await;

        assert_eq!(registry.names(), vec!["default"]);
        assert!(registry.create_default().await.is_ok());
    }
}

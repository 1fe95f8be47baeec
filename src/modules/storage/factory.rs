//! Memoized storage adapter construction
//!
//! [`StorageFactory`] owns the single cached adapter. It is created once by the
//! composition root and shared through `Arc`; `get` fills the slot on first use
//! and `reset` empties it so the next `get` re-reads configuration.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use super::error::StorageError;
use super::provider::StorageBackend;
use super::supabase::SupabaseStorage;
use super::tos::TosStorage;
use crate::core::config::{StorageConfig, StorageSettings};

/// Source of storage configuration, consulted on every slot fill
pub type ConfigLoader = Arc<dyn Fn() -> Result<StorageConfig, StorageError> + Send + Sync>;

pub struct StorageFactory {
    loader: ConfigLoader,
    slot: RwLock<Option<Arc<dyn StorageBackend>>>,
    constructed: AtomicUsize,
}

impl StorageFactory {
    pub fn new(loader: ConfigLoader) -> Self {
        Self {
            loader,
            slot: RwLock::new(None),
            constructed: AtomicUsize::new(0),
        }
    }

    /// Factory reading the process environment
    pub fn from_env() -> Self {
        Self::new(Arc::new(StorageConfig::from_env))
    }

    /// Cached adapter, constructing it from fresh configuration if the slot is empty.
    ///
    /// Construction happens outside the lock: two concurrent first calls may
    /// both build an adapter, and the later store wins. Construction failures
    /// leave the slot empty.
    pub async fn get(&self) -> Result<Arc<dyn StorageBackend>, StorageError> {
        {
            let slot = self.slot.read().await;
            if let Some(backend) = slot.as_ref() {
                return Ok(Arc::clone(backend));
            }
        }

        let config = (self.loader)()?;
        let backend = build_provider(&config)?;
        self.constructed.fetch_add(1, Ordering::SeqCst);

        *self.slot.write().await = Some(Arc::clone(&backend));
        Ok(backend)
    }

    /// Drop the cached adapter
    pub async fn reset(&self) {
        if self.slot.write().await.take().is_some() {
            info!("Storage provider cache cleared");
        }
    }

    /// Cached adapter without constructing one
    pub async fn current(&self) -> Option<Arc<dyn StorageBackend>> {
        self.slot.read().await.clone()
    }

    /// Number of adapters built by this factory so far
    #[allow(dead_code)]
    pub fn constructed_count(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }
}

/// Construct the adapter matching `config`
pub fn build_provider(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>, StorageError> {
    let backend: Arc<dyn StorageBackend> = match &config.settings {
        StorageSettings::Supabase(settings) => Arc::new(SupabaseStorage::new(settings)?),
        StorageSettings::Tos(settings) => Arc::new(TosStorage::new(settings)?),
    };
    info!(
        "Storage provider '{}' ready (bucket: {})",
        config.provider.as_str(),
        backend.bucket_name()
    );
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EnvLookup;
    use crate::shared::test_helpers::map_lookup;
    use std::sync::Mutex;
    use tokio_test::assert_ok;

    /// Loader whose backing map can be swapped between calls
    fn swappable(initial: &[(&str, &str)]) -> (ConfigLoader, Arc<Mutex<EnvLookup>>) {
        let current = Arc::new(Mutex::new(map_lookup(initial)));
        let source = Arc::clone(&current);
        let loader: ConfigLoader = Arc::new(move || {
            let lookup = source.lock().unwrap().clone();
            StorageConfig::from_lookup(&lookup)
        });
        (loader, current)
    }

    const SUPABASE: &[(&str, &str)] = &[
        ("SUPABASE_URL", "https://proj.supabase.co"),
        ("SUPABASE_ANON_KEY", "anon"),
    ];

    const TOS: &[(&str, &str)] = &[
        ("STORAGE_PROVIDER", "tos"),
        ("TOS_ACCESS_KEY_ID", "ak"),
        ("TOS_ACCESS_KEY_SECRET", "sk"),
        ("TOS_BUCKET_NAME", "voices"),
    ];

    #[tokio::test]
    async fn test_get_returns_cached_instance() {
        let (loader, _) = swappable(SUPABASE);
        let factory = StorageFactory::new(loader);

        let first = assert_ok!(factory.get().await);
        let second = assert_ok!(factory.get().await);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.constructed_count(), 1);
        assert_eq!(first.name(), "supabase");
    }

    #[tokio::test]
    async fn test_config_changes_apply_only_after_reset() {
        let (loader, source) = swappable(SUPABASE);
        let factory = StorageFactory::new(loader);

        let first = assert_ok!(factory.get().await);
        *source.lock().unwrap() = map_lookup(TOS);

        let cached = assert_ok!(factory.get().await);
        assert_eq!(cached.name(), "supabase");
        assert!(Arc::ptr_eq(&first, &cached));

        factory.reset().await;
        assert!(factory.current().await.is_none());

        let rebuilt = assert_ok!(factory.get().await);
        assert_eq!(rebuilt.name(), "tos");
        assert_eq!(rebuilt.bucket_name(), "voices");
        assert_eq!(factory.constructed_count(), 2);
    }

    #[tokio::test]
    async fn test_configuration_error_is_not_cached() {
        let (loader, source) = swappable(&[("STORAGE_PROVIDER", "tos")]);
        let factory = StorageFactory::new(loader);

        let err = match factory.get().await {
            Err(err) => err,
            Ok(_) => panic!("missing TOS credentials must fail construction"),
        };
        assert!(err.is_configuration());
        assert!(factory.current().await.is_none());
        assert_eq!(factory.constructed_count(), 0);

        *source.lock().unwrap() = map_lookup(TOS);
        assert_ok!(factory.get().await);
        assert_eq!(factory.constructed_count(), 1);
    }

    #[tokio::test]
    async fn test_factory_rewrites_s3_endpoint() {
        let mut pairs = TOS.to_vec();
        pairs.push(("TOS_ENDPOINT", "tos-s3-cn-guangzhou.volces.com"));
        let (loader, _) = swappable(&pairs);
        let factory = StorageFactory::new(loader);

        let backend = assert_ok!(factory.get().await);
        assert_eq!(
            backend.public_url("k"),
            "https://tos-cn-guangzhou.volces.com/voices/k"
        );
    }

    #[tokio::test]
    async fn test_concurrent_first_access_yields_working_adapters() {
        let (loader, _) = swappable(SUPABASE);
        let factory = Arc::new(StorageFactory::new(loader));

        let (a, b) = tokio::join!(factory.get(), factory.get());
        assert_ok!(a);
        assert_ok!(b);

        let built = factory.constructed_count();
        assert!((1..=2).contains(&built));
        assert!(factory.current().await.is_some());
    }
}

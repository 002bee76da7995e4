//! Current configuration ownership and persistence.
//!
//! [`ConfigStore`] holds the one [`Config`] snapshot that is current at any instant. Readers get
//! an [`Arc`] to a complete snapshot without taking a lock; writers build, validate and persist a
//! whole replacement before publishing it with a single atomic pointer swap.
//!
//! Durable storage sits behind the [`ConfigStorage`] trait. Two implementations are provided,
//! [`file::FileStorage`] and [`memory::MemoryStorage`]. The former is what the server runs with,
//! the latter is not durable across restarts.

use crate::config::Config;
use crate::error::Error;
use arc_swap::ArcSwap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub mod file;
pub mod memory;
pub mod watcher;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use watcher::ConfigWatcher;

/// `DynStorage` is a type alias for a [`ConfigStorage`] shared between the store and its owner.
pub type DynStorage = Arc<dyn ConfigStorage + Send + Sync>;

/// `SharedStore` is the handle every component uses to reach the current configuration.
pub type SharedStore = Arc<ConfigStore>;

/// An async trait describing durable storage of a whole [`Config`].
#[async_trait::async_trait]
pub trait ConfigStorage {
    /// Read the persisted configuration as-is (not normalized).
    async fn load(&self) -> Result<Config, Error>;

    /// Replace the persisted configuration.
    async fn save(&self, config: &Config) -> Result<(), Error>;
}

/// Outcome of a [`ConfigStore::reconcile`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Storage holds the same configuration as memory.
    Unchanged,
    /// Storage held a different configuration, which is now current.
    Reloaded,
}

pub struct ConfigStore {
    current: ArcSwap<Config>,
    storage: DynStorage,
    // Serializes writers, and the watcher's read-compare-publish pass, so that persist order
    // always matches publish order. Readers never touch it.
    update_lock: Mutex<()>,
}

impl ConfigStore {
    /// Load the initial configuration from storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigLoad`] if storage can't be read or holds an invalid configuration.
    pub async fn load(storage: DynStorage) -> Result<Self, Error> {
        let config = storage
            .load()
            .await
            .and_then(|config| Ok(config.normalize()?))
            .map_err(|err| Error::ConfigLoad(Box::new(err)))?;
        Ok(Self::with_config(config, storage))
    }

    /// Create a store from an already validated configuration without reading storage.
    #[must_use]
    pub fn with_config(config: Config, storage: DynStorage) -> Self {
        ConfigStore {
            current: ArcSwap::from_pointee(config),
            storage,
            update_lock: Mutex::new(()),
        }
    }

    /// The current configuration snapshot.
    #[must_use]
    pub fn get(&self) -> Arc<Config> {
        self.current.load_full()
    }

    /// Validate, persist and then publish a replacement configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the candidate is malformed and
    /// [`Error::ConfigPersist`] if it could not be written to storage. In both cases the current
    /// snapshot is unchanged.
    pub async fn set(&self, candidate: Config) -> Result<(), Error> {
        let candidate = candidate.normalize()?;

        let _guard = self.update_lock.lock().await;
        self.storage
            .save(&candidate)
            .await
            .map_err(|err| Error::ConfigPersist(Box::new(err)))?;
        self.publish(candidate);
        Ok(())
    }

    /// Compare the persisted configuration with the current snapshot and adopt it if it
    /// differs. An unreadable or invalid persisted configuration leaves memory untouched.
    ///
    /// The read happens under the writer lock, so a concurrent [`set`][Self::set] is either
    /// fully visible to the comparison or runs after it.
    ///
    /// # Errors
    ///
    /// Returns the storage read error, or [`Error::InvalidConfig`] if the persisted
    /// configuration fails validation.
    pub async fn reconcile(&self) -> Result<Reconciled, Error> {
        let _guard = self.update_lock.lock().await;
        let candidate = self.storage.load().await?.normalize()?;
        if *self.current.load_full() == candidate {
            return Ok(Reconciled::Unchanged);
        }
        if let Err(err) = self.storage.save(&candidate).await {
            tracing::warn!("reloaded configuration but could not re-persist it: {err}");
        }
        self.publish(candidate);
        Ok(Reconciled::Reloaded)
    }

    fn publish(&self, config: Config) {
        let previous = self.current.load();
        if previous.server_addr != config.server_addr {
            tracing::warn!(
                "ServerAddr changed from {} to {}; the DNS listener keeps its socket until restart",
                previous.server_addr,
                config.server_addr
            );
        }
        drop(previous);
        self.current.store(Arc::new(config));
    }
}

use crate::config::Config;
use crate::config_store::ConfigStorage;
use crate::error::Error;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// A non-durable [`ConfigStorage`]. Reads and writes can be made to fail on demand, which makes
/// it the storage of choice for exercising the store's failure paths.
#[derive(Debug, Default)]
#[allow(clippy::module_name_repetitions)]
pub struct MemoryStorage {
    config: RwLock<Config>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
}

impl MemoryStorage {
    #[must_use]
    pub fn new(config: Config) -> Self {
        MemoryStorage {
            config: RwLock::new(config),
            ..MemoryStorage::default()
        }
    }

    /// Overwrite the stored configuration without going through a
    /// [`ConfigStore`][crate::config_store::ConfigStore], like an external edit would.
    pub async fn replace(&self, config: Config) {
        *self.config.write().await = config;
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl ConfigStorage for MemoryStorage {
    async fn load(&self) -> Result<Config, Error> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "configuration unavailable").into());
        }
        Ok(self.config.read().await.clone())
    }

    async fn save(&self, config: &Config) -> Result<(), Error> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "storage is read-only").into());
        }
        *self.config.write().await = config.clone();
        Ok(())
    }
}

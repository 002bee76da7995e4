use crate::config_store::{Reconciled, SharedStore};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Periodically reconciles the persisted configuration into the [`ConfigStore`].
///
/// A failed read (missing or corrupt file, invalid content) is reported and the in-memory
/// configuration keeps serving.
///
/// [`ConfigStore`]: crate::config_store::ConfigStore
pub struct ConfigWatcher {
    store: SharedStore,
    interval: Duration,
}

impl ConfigWatcher {
    #[must_use]
    pub fn new(store: SharedStore, interval: Duration) -> Self {
        ConfigWatcher { store, interval }
    }

    /// Run the watcher on its own task until the runtime shuts down.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the store was just loaded.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    /// Perform a single reconciliation pass, logging its outcome.
    pub async fn poll_once(&self) -> Option<Reconciled> {
        match self.store.reconcile().await {
            Ok(Reconciled::Reloaded) => {
                tracing::info!("reloaded DNS configuration from storage");
                Some(Reconciled::Reloaded)
            }
            Ok(Reconciled::Unchanged) => Some(Reconciled::Unchanged),
            Err(err) => {
                tracing::warn!("keeping current DNS configuration, storage check failed: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::config_store::{ConfigStorage, ConfigStore, FileStorage, MemoryStorage};
    use std::sync::Arc;

    fn sample() -> Config {
        Config {
            server_addr: "127.0.0.1:5353".to_string(),
            external_addr: "9.9.9.9:53".to_string(),
            zones: vec![],
        }
    }

    #[tokio::test]
    async fn poll_once_reports_failures() {
        let storage = Arc::new(MemoryStorage::new(sample()));
        let store = Arc::new(ConfigStore::load(storage.clone()).await.unwrap());
        let watcher = ConfigWatcher::new(store.clone(), Duration::from_secs(5));

        assert_eq!(watcher.poll_once().await, Some(Reconciled::Unchanged));
        storage.fail_loads(true);
        assert_eq!(watcher.poll_once().await, None);
        assert_eq!(*store.get(), sample());
    }

    #[tokio::test]
    async fn picks_up_file_edits() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path().join("dnsconfig.json")));
        storage.save(&sample()).await.unwrap();
        let store = Arc::new(ConfigStore::load(storage.clone()).await.unwrap());
        let handle = ConfigWatcher::new(store.clone(), Duration::from_millis(20)).spawn();

        std::fs::write(
            storage.path(),
            r#"{ "ServerAddr": "127.0.0.1:5353", "ExternalAddr": "1.1.1.1", "Zones": [] }"#,
        )
        .unwrap();

        let mut reloaded = false;
        for _ in 0..100 {
            if store.get().external_addr == "1.1.1.1" {
                reloaded = true;
                break;
            }
            time::sleep(Duration::from_millis(20)).await;
        }
        handle.abort();
        assert!(reloaded);
    }

    #[tokio::test]
    async fn removed_file_keeps_serving() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path().join("dnsconfig.json")));
        storage.save(&sample()).await.unwrap();
        let store = Arc::new(ConfigStore::load(storage.clone()).await.unwrap());
        std::fs::remove_file(storage.path()).unwrap();

        let watcher = ConfigWatcher::new(store.clone(), Duration::from_secs(5));
        assert_eq!(watcher.poll_once().await, None);
        assert_eq!(*store.get(), sample());
    }
}

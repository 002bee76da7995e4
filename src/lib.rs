//! Zone Crab
//!
//! A small authoritative-or-forwarding DNS server. Names under the operator's configured zones
//! are answered from a JSON configuration file (A, MX and TXT records); everything else is
//! relayed to a single external resolver.
//!
//! The configuration can be replaced while the server runs, either through the
//! [HTTP API][crate::api] or by editing the file on disk. Every query resolves against one
//! complete configuration snapshot, never a mix of old and new.
//!
#![warn(clippy::pedantic)]

pub mod api;
pub mod config;
pub mod config_store;
pub mod dns;
pub mod error;
pub mod notify;
pub mod settings;

pub use api::new as new_http;
pub use config::Config;
pub use config_store::{ConfigStore, ConfigWatcher, FileStorage, MemoryStorage, SharedStore};
pub use dns::new as new_dns;
pub use notify::Notifier;
pub use settings::Settings;

use anyhow::{anyhow, Result};
use is_terminal::IsTerminal;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zonecrab::config_store::DynStorage;
use zonecrab::dns::{QueryEngine, UdpForwarder};
use zonecrab::{ConfigStore, ConfigWatcher, FileStorage, Notifier, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let mut first_args = std::env::args().take(3);
    let (program_name, config_file, settings_file) = (
        first_args.next().unwrap_or("zonecrab".to_string()),
        first_args.next(),
        first_args.next(),
    );

    let config_file = config_file.ok_or_else(|| {
        anyhow!("usage: {program_name} /path/to/dnsconfig.json [/path/to/settings.json]")
    })?;
    let settings = settings_init(settings_file)?;

    let storage: DynStorage = Arc::new(FileStorage::new(&config_file));
    let store = Arc::new(ConfigStore::load(storage).await?);
    tracing::debug!("loaded DNS config from {config_file}");

    let notifier = Notifier::new(settings.notify_capacity);
    let forwarder = Arc::new(UdpForwarder::new(settings.forward_timeout));
    let engine = Arc::new(QueryEngine::new(store.clone(), forwarder, notifier.clone()));

    let server_addr = store.get().server_addr.clone();
    let dns_server = zonecrab::dns::new(&server_addr, engine).await?;
    tracing::info!("DNS listening on UDP {}", dns_server.local_addr()?);
    let dns_handle = tokio::spawn(dns_server.block_until_done());

    let watcher_handle = ConfigWatcher::new(store.clone(), settings.reload_interval).spawn();

    tracing::info!("API listening on {}", &settings.api_bind_addr);
    let api_server = zonecrab::api::new(&settings, store, notifier)?;
    let api_handle = tokio::spawn(api_server);

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
        },
        Ok(dns_res) = dns_handle => {
            if let Err(err) = dns_res {
                return Err(err.into())
            }
        }
        Ok(api_res) = api_handle => {
            if let Err(err) = api_res {
                return Err(err.into())
            }
        }
    }
    watcher_handle.abort();
    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(std::io::stdout().is_terminal()))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zonecrab=info".into()),
        )
        .init();
}

fn settings_init(settings_file: Option<String>) -> Result<Settings> {
    match settings_file {
        None => {
            let settings = Settings::default();
            settings.validate()?;
            Ok(settings)
        }
        Some(settings_file) => {
            tracing::debug!("loaded settings from {settings_file}");
            Ok(Settings::try_from_file(&settings_file)?)
        }
    }
}

use crate::api::routes;
use crate::config_store::SharedStore;
use crate::notify::Notifier;
use crate::settings::Settings;
use std::future::Future;

#[derive(Clone)]
pub(super) struct AppState {
    pub store: SharedStore,
    pub notifier: Notifier,
}

/// Build the HTTP API server future, bound to
/// [`Settings::api_bind_addr`][crate::settings::Settings::api_bind_addr].
///
/// # Errors
///
/// Returns an error if the address can't be bound.
pub fn new(
    settings: &Settings,
    store: SharedStore,
    notifier: Notifier,
) -> anyhow::Result<impl Future<Output = hyper::Result<()>>> {
    let router = routes::new(AppState { store, notifier }, settings);
    Ok(axum::Server::try_bind(&settings.api_bind_addr)?.serve(router.into_make_service()))
}

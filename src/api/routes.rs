use crate::api::api_error::APIError;
use crate::api::server::AppState;
use crate::config::Config;
use crate::notify::QueryEvent;
use crate::settings::Settings;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::json;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::services::ServeFile;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub(super) fn new(state: AppState, settings: &Settings) -> Router {
    let mut router = Router::new()
        .route("/healthcheck", get(health_check))
        .route("/api/config", get(get_config).post(update_config))
        .route("/ws", get(log_stream));
    if let Some(index_path) = &settings.index_path {
        router = router.route_service("/", ServeFile::new(index_path));
    }
    router
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(settings.api_timeout))
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

#[allow(clippy::unused_async)]
async fn get_config(State(state): State<AppState>) -> Json<Config> {
    Json(state.store.get().as_ref().clone())
}

async fn update_config(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<Config>, APIError>,
) -> Result<impl IntoResponse, APIError> {
    if let Err(err) = state.store.set(payload).await {
        tracing::debug!("rejected configuration update: {err}");
        return Err(err.into());
    }
    tracing::info!("accepted configuration update");
    Ok(Json(json!({"message": "Configuration updated successfully"})))
}

#[allow(clippy::unused_async)]
async fn log_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let events = state.notifier.subscribe();
    ws.on_upgrade(move |socket| stream_events(socket, events))
}

async fn stream_events(mut socket: WebSocket, mut events: broadcast::Receiver<QueryEvent>) {
    tracing::debug!("log stream subscriber connected");
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if socket.send(Message::Text(event.to_string())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("log stream subscriber fell behind, dropped {skipped} events");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    tracing::debug!("log stream subscriber disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZoneConfig;
    use crate::config_store::{ConfigStorage, ConfigStore, MemoryStorage};
    use crate::notify::Notifier;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn sample() -> Config {
        Config {
            server_addr: "127.0.0.1:5353".to_string(),
            external_addr: "9.9.9.9:53".to_string(),
            zones: vec![ZoneConfig {
                zone: "example.com.".to_string(),
                records: HashMap::new(),
            }],
        }
    }

    async fn app() -> (Router, Arc<MemoryStorage>, AppState) {
        let storage = Arc::new(MemoryStorage::new(sample()));
        let store = Arc::new(ConfigStore::load(storage.clone()).await.unwrap());
        let state = AppState {
            store,
            notifier: Notifier::new(8),
        };
        (new(state.clone(), &Settings::default()), storage, state)
    }

    fn post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/config")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(res: axum::response::Response) -> serde_json::Value {
        let bytes = hyper::body::to_bytes(res.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn get_returns_current_config() {
        let (app, _, _) = app().await;
        let res = app
            .oneshot(Request::builder().uri("/api/config").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["ExternalAddr"], "9.9.9.9:53");
        assert_eq!(body["Zones"][0]["Zone"], "example.com.");
    }

    #[tokio::test]
    async fn post_replaces_config() {
        let (app, storage, state) = app().await;
        let res = app
            .oneshot(post(
                r#"{"ServerAddr":"127.0.0.1:5353","ExternalAddr":"1.1.1.1:53","Zones":[]}"#,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            json_body(res).await["message"],
            "Configuration updated successfully"
        );
        assert_eq!(state.store.get().external_addr, "1.1.1.1:53");
        assert_eq!(storage.load().await.unwrap().external_addr, "1.1.1.1:53");
    }

    #[tokio::test]
    async fn post_invalid_config_is_rejected() {
        let (app, _, state) = app().await;
        let res = app
            .oneshot(post(r#"{"ServerAddr":"","ExternalAddr":"1.1.1.1:53","Zones":[]}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(res).await["error"]
            .as_str()
            .unwrap()
            .contains("ServerAddr"));
        assert_eq!(*state.store.get(), sample());
    }

    #[tokio::test]
    async fn post_malformed_json_is_rejected() {
        let (app, _, _) = app().await;
        let res = app.oneshot(post("{ not json")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn post_persist_failure_is_a_server_error() {
        let (app, storage, state) = app().await;
        storage.fail_saves(true);
        let res = app
            .oneshot(post(
                r#"{"ServerAddr":"127.0.0.1:5353","ExternalAddr":"1.1.1.1:53","Zones":[]}"#,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(*state.store.get(), sample());
    }

    #[tokio::test]
    async fn health_check_is_ok() {
        let (app, _, _) = app().await;
        let res = app
            .oneshot(Request::builder().uri("/healthcheck").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["ok"], "healthy");
    }
}

//! Route definitions for the WsHub HTTP surface.
//!
//! Introspection routes are mounted under `/api`; the WebSocket endpoint
//! lives at `/ws`.

use axum::{
    Router,
    routing::{delete, get},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/connections", get(handlers::connections::list_connections))
        .route(
            "/connections/{client_id}",
            delete(handlers::connections::disconnect),
        );

    let ws_routes = Router::new().route("/ws", get(handlers::ws::ws_upgrade));

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use wshub_core::config::AppConfig;
    use wshub_core::config::hub::HubConfig;
    use wshub_realtime::Hub;
    use wshub_realtime::transport::memory;

    use super::*;

    fn state(capacity: usize) -> AppState {
        let config = AppConfig {
            hub: HubConfig {
                capacity,
                ..HubConfig::default()
            },
            ..AppConfig::default()
        };
        let hub = Hub::new(config.hub.clone());
        AppState::new(config, hub)
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }

    #[tokio::test]
    async fn health_reports_pool_usage() {
        let state = state(3);
        let (transport, _peer) = memory::pair(8);
        state.hub.register("c1", transport).unwrap();

        let (status, body) = get_json(build_router(state), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "ok");
        assert_eq!(body["data"]["connections"], 1);
        assert_eq!(body["data"]["capacity"], 3);
        assert_eq!(body["data"]["metrics"]["connections_total"], 1);
    }

    #[tokio::test]
    async fn connections_lists_registered_clients() {
        let state = state(3);
        let (transport, _peer) = memory::pair(8);
        state.hub.register("c1", transport).unwrap();

        let (status, body) = get_json(build_router(state), "/api/connections").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["client_id"], "c1");
    }

    #[tokio::test]
    async fn disconnect_unregisters_client() {
        let state = state(3);
        let hub = state.hub.clone();
        let (transport, _peer) = memory::pair(8);
        hub.register("c1", transport).unwrap();

        let router = build_router(state);
        let response = router
            .clone()
            .oneshot(
                Request::delete("/api/connections/c1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!hub.is_registered("c1"));

        let response = router
            .oneshot(
                Request::delete("/api/connections/c1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn full_pool_is_refused_before_upgrade() {
        let state = state(1);
        let _held = state.hub.admit("holder").unwrap();

        let (status, body) = get_json(build_router(state), "/ws?client_id=c2").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "SERVICE_UNAVAILABLE");
        assert_eq!(body["message"], "pool is full");
        assert_eq!(body["status"], 503);
        assert_eq!(body["path"], "/ws");
    }

    #[tokio::test]
    async fn duplicate_client_id_is_a_conflict() {
        let state = state(2);
        let (transport, _peer) = memory::pair(8);
        state.hub.register("dup", transport).unwrap();

        let (status, body) = get_json(build_router(state), "/ws?client_id=dup").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "CONFLICT");
    }

    #[tokio::test]
    async fn closed_hub_refuses_connections() {
        let state = state(2);
        state.hub.close().await.unwrap();

        let (status, _) = get_json(build_router(state), "/ws").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn plain_request_is_rejected_and_slot_released() {
        let state = state(1);
        let hub = state.hub.clone();

        let (status, _) = get_json(build_router(state), "/ws?client_id=c1").await;
        assert!(status.is_client_error());
        assert_eq!(hub.count(), 0);
        assert!(hub.admit("c1").is_ok());
    }
}

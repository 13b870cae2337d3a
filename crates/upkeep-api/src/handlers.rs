//! HTTP handlers for the heartbeat and health endpoints.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::ApiState;

/// Header carrying the shared cluster secret.
pub const SECRET_HEADER: &str = "X-Upkeep-Secret";

#[derive(Deserialize)]
pub struct PushParams {
    pub token: Option<String>,
}

/// GET /api/push?token=<hex>
///
/// Records a heartbeat for the push monitor owning the token. 400 when
/// the token is missing, 404 when it is unknown or the engine is
/// passive.
pub async fn push_heartbeat(
    State(state): State<ApiState>,
    Query(params): Query<PushParams>,
) -> impl IntoResponse {
    let token = params.token.unwrap_or_default();
    if token.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing token");
    }

    if state.engine.record_heartbeat(&token).await {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::NOT_FOUND, "Invalid Token")
    }
}

/// GET /api/health
///
/// Always 200 once authorized. With a shared key configured, requests
/// must carry it in the `X-Upkeep-Secret` header.
pub async fn health(State(state): State<ApiState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(key) = &state.shared_key {
        let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(key.as_str()) {
            return (StatusCode::UNAUTHORIZED, "Unauthorized");
        }
    }
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use upkeep_engine::Engine;
    use upkeep_state::{MonitorKind, NewMonitor, StateStore, Store};

    async fn state_with_push_monitor() -> (ApiState, String) {
        let store = Arc::new(StateStore::open_in_memory().unwrap());
        let monitor = store
            .add_monitor(NewMonitor {
                name: "worker".to_string(),
                kind: MonitorKind::Push,
                url: String::new(),
                interval_secs: 10,
                max_retries: 0,
                check_ssl: false,
                expiry_threshold_days: 14,
                alert_id: 0,
            })
            .unwrap();

        let engine = Arc::new(Engine::new(store as Arc<dyn Store>));
        upkeep_engine::supervisor::reconcile_once(&engine).await;

        (
            ApiState {
                engine,
                shared_key: None,
            },
            monitor.token,
        )
    }

    #[tokio::test]
    async fn push_with_valid_token() {
        let (state, token) = state_with_push_monitor().await;
        let resp = push_heartbeat(State(state), Query(PushParams { token: Some(token) }))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn push_without_token_is_bad_request() {
        let (state, _) = state_with_push_monitor().await;
        let resp = push_heartbeat(State(state), Query(PushParams { token: None }))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn push_with_unknown_token_is_not_found() {
        let (state, _) = state_with_push_monitor().await;
        let resp = push_heartbeat(
            State(state),
            Query(PushParams {
                token: Some("f00dbabe".to_string()),
            }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn push_on_passive_engine_is_not_found() {
        let (state, token) = state_with_push_monitor().await;
        state.engine.set_active(false);

        let resp = push_heartbeat(State(state), Query(PushParams { token: Some(token) }))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_without_key_is_open() {
        let (state, _) = state_with_push_monitor().await;
        let resp = health(State(state), HeaderMap::new()).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_with_key_requires_the_header() {
        let (mut state, _) = state_with_push_monitor().await;
        state.shared_key = Some("s3cret".to_string());

        let resp = health(State(state.clone()), HeaderMap::new())
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let mut headers = HeaderMap::new();
        headers.insert(SECRET_HEADER, "s3cret".parse().unwrap());
        let resp = health(State(state), headers).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

//! upkeep-api — HTTP surface for upkeep.
//!
//! Two routes, both consumed by machines rather than people:
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/push?token=<hex>` | Heartbeat ingress for push monitors |
//! | GET | `/api/health` | Liveness, probed by a follower replica |

pub mod handlers;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use upkeep_engine::Engine;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<Engine>,
    /// When set, `/api/health` requires the matching `X-Upkeep-Secret`.
    pub shared_key: Option<String>,
}

/// Build the API router.
pub fn build_router(engine: Arc<Engine>, shared_key: Option<String>) -> Router {
    let state = ApiState { engine, shared_key };
    Router::new()
        .route("/api/push", get(handlers::push_heartbeat))
        .route("/api/health", get(handlers::health))
        .with_state(state)
}

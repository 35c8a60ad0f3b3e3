//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the per-room websocket endpoint and the admin vote routes under a
//! single Axum router. Every unmatched path answers with a plain liveness
//! line so load balancers and browsers poking the root get a 200.

pub mod votes;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Plain-text body served for any path without a route.
pub const LIVENESS_TEXT: &str = "crowdroom coordinator is running";

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/rooms/{room}/ws", get(ws::handle_ws))
        .route(
            "/rooms/{room}/votes",
            get(votes::list_votes)
                .post(votes::submit_vote)
                .delete(votes::clear_votes),
        )
        .route("/healthz", get(healthz))
        .fallback(liveness)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn liveness() -> &'static str {
    LIVENESS_TEXT
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

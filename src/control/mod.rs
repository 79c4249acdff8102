//! Control API: the command interface consumed by the UI collaborator.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use self::auth::control_auth_middleware;
use self::handlers::*;
use crate::engine::HeaderEngine;

/// State injected into control handlers.
#[derive(Clone)]
pub struct ControlState {
    pub engine: Arc<HeaderEngine>,
    pub api_key: String,
}

/// Build the control router.
pub fn setup_control_router(state: ControlState) -> Router {
    Router::new()
        .route("/control/status", get(get_status))
        .route("/control/rules", post(update_rules))
        .route("/control/count", get(get_count))
        .route("/control/count/reset", post(reset_count))
        .route("/control/timer", post(set_timer).delete(clear_timer))
        .route("/control/export", get(export_profiles))
        .route("/control/import", post(import_profiles))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            control_auth_middleware,
        ))
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

mod api;
mod pages;

pub use api::*;
pub use pages::*;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/certificate", post(submit_form))
        .route("/api/certificate", post(create_certificate))
        .route("/api/validate/:code", get(validate_code))
        .route("/api/status/:code", get(check_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

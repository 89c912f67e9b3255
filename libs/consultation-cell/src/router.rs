use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn consultation_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/book", post(handlers::book_slot))
        .route("/check-slot", post(handlers::check_slot))
        .route("/reschedule", post(handlers::reschedule_consultation))
        .route("/", get(handlers::list_consultations))
        .route("/{consultation_id}", get(handlers::get_consultation))
        .route("/{consultation_id}/complete", patch(handlers::complete_consultation))
        .route("/{consultation_id}/join", post(handlers::join_consultation))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

use std::sync::Arc;

use axum::{
    routing::get,
    Router,
};

use scheduling_cell::router::scheduling_routes;
use scheduling_cell::SchedulingState;

pub fn create_router(scheduling_state: Arc<SchedulingState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Praxis Clinic API is running!" }))
        .nest("/scheduling", scheduling_routes(scheduling_state))
}

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::SchedulingState;

/// All scheduling routes sit behind the identity middleware; there is no
/// public surface in this cell.
pub fn scheduling_routes(state: Arc<SchedulingState>) -> Router {
    let auth_config = Arc::new(state.config.clone());

    Router::new()
        // Booking and lifecycle
        .route("/appointments", post(handlers::create_appointment))
        .route("/appointments/{appointment_id}/note", post(handlers::add_secretary_note))
        .route("/appointments/{appointment_id}/confirm", post(handlers::confirm_appointment))
        .route("/appointments/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/appointments/{appointment_id}/complete", post(handlers::complete_appointment))
        // Availability
        .route("/availability/seed", post(handlers::seed_availability))
        .route("/availability/overview", get(handlers::availability_overview))
        .route("/availability/slots", get(handlers::list_unbooked_slots))
        // Dashboard projections
        .route("/dashboard/today", get(handlers::todays_appointments))
        .route("/dashboard/recent", get(handlers::past_appointments_today))
        .route("/dashboard/details", get(handlers::paginated_appointment_details))
        .layer(middleware::from_fn_with_state(auth_config, auth_middleware))
        .with_state(state)
}

// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{NaiveDate, Timelike, Utc};
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::{Identity, Role};
use shared_models::error::AppError;

use crate::models::{
    AddNoteRequest, AppointmentDetailsView, AppointmentView, CreateAppointmentRequest, Paginated,
    SlotView,
};
use crate::services::SchedulingState;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct CalendarQueryParams {
    pub week_start: Option<NaiveDate>,
    /// Kept as a raw string: an unparseable value must degrade to an empty
    /// result, so it cannot be typed as Uuid here.
    pub doctor_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

fn require_week_start(params: &CalendarQueryParams) -> Result<NaiveDate, AppError> {
    params
        .week_start
        .ok_or_else(|| AppError::ValidationError("week_start is required".to_string()))
}

fn require_staff(identity: &Identity) -> Result<(), AppError> {
    if !identity.role.is_staff() {
        return Err(AppError::Forbidden(
            "only clinic staff can perform this action".to_string(),
        ));
    }
    Ok(())
}

fn require_dashboard_access(identity: &Identity) -> Result<(), AppError> {
    if !matches!(identity.role, Role::Secretary | Role::Admin | Role::Doctor) {
        return Err(AppError::Forbidden(
            "dashboard is limited to clinic staff and doctors".to_string(),
        ));
    }
    Ok(())
}

fn now_minutes() -> i32 {
    let now = Utc::now().time();
    (now.hour() * 60 + now.minute()) as i32
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

/// Materialize missing slots for the clinic's rolling horizon. Safe to call
/// from every calendar open; a fully seeded horizon reports zero inserts.
#[axum::debug_handler]
pub async fn seed_availability(
    State(state): State<Arc<SchedulingState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    require_staff(&identity)?;

    let inserted = state
        .seeder
        .ensure_horizon(identity.clinic_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "inserted_slots": inserted
    })))
}

#[axum::debug_handler]
pub async fn availability_overview(
    State(state): State<Arc<SchedulingState>>,
    Query(params): Query<CalendarQueryParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    let week_start = require_week_start(&params)?;

    let overview = state
        .overview
        .overview_by_doctor_and_day(
            identity.clinic_id,
            week_start,
            params.doctor_id.as_deref(),
            auth.token(),
        )
        .await?;

    Ok(Json(json!({ "overview": overview })))
}

#[axum::debug_handler]
pub async fn list_unbooked_slots(
    State(state): State<Arc<SchedulingState>>,
    Query(params): Query<CalendarQueryParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    let week_start = require_week_start(&params)?;

    let slots = state
        .overview
        .list_unbooked_with_doctor(
            identity.clinic_id,
            week_start,
            params.doctor_id.as_deref(),
            auth.token(),
        )
        .await?;

    let views: Vec<SlotView> = slots.into_iter().map(SlotView::from).collect();
    Ok(Json(json!({ "slots": views })))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<SchedulingState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_staff(&identity)?;

    let appointment = state
        .booking
        .create_appointment(&identity, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": AppointmentView::from(appointment),
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn add_secretary_note(
    State(state): State<Arc<SchedulingState>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<AddNoteRequest>,
) -> Result<Json<Value>, AppError> {
    require_staff(&identity)?;

    let appointment = state
        .booking
        .add_secretary_note(&identity, appointment_id, request.note, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": AppointmentView::from(appointment)
    })))
}

// ==============================================================================
// LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .lifecycle
        .confirm(&identity, appointment_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": AppointmentView::from(appointment)
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .lifecycle
        .cancel(&identity, appointment_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": AppointmentView::from(appointment)
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<SchedulingState>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .lifecycle
        .complete(&identity, appointment_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": AppointmentView::from(appointment)
    })))
}

// ==============================================================================
// DASHBOARD HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn todays_appointments(
    State(state): State<Arc<SchedulingState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    require_dashboard_access(&identity)?;

    let today = Utc::now().date_naive();
    let details = state
        .dashboard
        .todays_appointments(identity.clinic_id, today, auth.token())
        .await?;

    let views: Vec<AppointmentDetailsView> =
        details.into_iter().map(AppointmentDetailsView::from).collect();
    Ok(Json(json!({ "appointments": views })))
}

#[axum::debug_handler]
pub async fn past_appointments_today(
    State(state): State<Arc<SchedulingState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    require_dashboard_access(&identity)?;

    let today = Utc::now().date_naive();
    let details = state
        .dashboard
        .past_appointments_today(identity.clinic_id, today, now_minutes(), auth.token())
        .await?;

    let views: Vec<AppointmentDetailsView> =
        details.into_iter().map(AppointmentDetailsView::from).collect();
    Ok(Json(json!({ "appointments": views })))
}

#[axum::debug_handler]
pub async fn paginated_appointment_details(
    State(state): State<Arc<SchedulingState>>,
    Query(params): Query<PageParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    require_dashboard_access(&identity)?;

    let today = Utc::now().date_naive();
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(6);

    let paginated = state
        .dashboard
        .paginated_appointment_details(identity.clinic_id, today, page, limit, auth.token())
        .await?;

    let view = Paginated {
        items: paginated
            .items
            .into_iter()
            .map(AppointmentDetailsView::from)
            .collect::<Vec<_>>(),
        total: paginated.total,
        page: paginated.page,
        total_pages: paginated.total_pages,
    };

    Ok(Json(json!(view)))
}

// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use shared_models::error::AppError;

// ==============================================================================
// TIME-OF-DAY REPRESENTATION
// ==============================================================================

pub const MINUTES_PER_DAY: i32 = 24 * 60;

/// Render minutes-since-midnight as the "HH:MM" wire format.
pub fn minutes_to_hhmm(minutes: i32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Parse the "HH:MM" wire format into minutes since midnight. Times are kept
/// as integers everywhere inside the core so ordering never depends on string
/// comparison.
pub fn hhmm_to_minutes(raw: &str) -> Result<i32, SchedulingError> {
    let (hours, minutes) = raw
        .split_once(':')
        .ok_or_else(|| SchedulingError::Validation(format!("invalid time of day: {}", raw)))?;

    let hours: i32 = hours
        .parse()
        .map_err(|_| SchedulingError::Validation(format!("invalid time of day: {}", raw)))?;
    let minutes: i32 = minutes
        .parse()
        .map_err(|_| SchedulingError::Validation(format!("invalid time of day: {}", raw)))?;

    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(SchedulingError::Validation(format!(
            "time of day out of range: {}",
            raw
        )));
    }

    Ok(hours * 60 + minutes)
}

/// One catalog entry: a bookable time-of-day window within a clinic day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTime {
    pub start_minutes: i32,
    pub end_minutes: i32,
}

// ==============================================================================
// AVAILABILITY SLOT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub doctor_id: Uuid,
    pub slot_date: NaiveDate,
    pub start_minutes: i32,
    pub end_minutes: i32,
    pub is_booked: bool,
}

/// Insert shape for the seeder; the store assigns the id.
#[derive(Debug, Clone, Serialize)]
pub struct NewSlot {
    pub clinic_id: Uuid,
    pub doctor_id: Uuid,
    pub slot_date: NaiveDate,
    pub start_minutes: i32,
    pub end_minutes: i32,
    pub is_booked: bool,
}

/// The uniqueness key of a slot. The seeder's existence check and the store
/// constraint both use the full triple; keying on anything coarser leaves
/// partially seeded days that never get topped up.
pub type SlotKey = (Uuid, NaiveDate, i32);

impl AvailabilitySlot {
    pub fn key(&self) -> SlotKey {
        (self.doctor_id, self.slot_date, self.start_minutes)
    }
}

// ==============================================================================
// APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_minutes: i32,
    pub end_minutes: i32,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub secretary_note: SecretaryNote,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_minutes: i32,
    pub end_minutes: i32,
    pub status: AppointmentStatus,
    pub secretary_note: SecretaryNote,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Waiting,
    Confirmed,
    Cancelled,
    Done,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Waiting => write!(f, "waiting"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Done => write!(f, "done"),
        }
    }
}

/// Secretary note with exactly one legal transition: unset -> set. The store
/// enforces the same rule with a conditional update on the null column, so a
/// raced second write loses there too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum SecretaryNote {
    #[default]
    Unset,
    Set(String),
}

impl SecretaryNote {
    pub fn is_set(&self) -> bool {
        matches!(self, SecretaryNote::Set(_))
    }

    pub fn set(self, note: String) -> Result<SecretaryNote, SchedulingError> {
        match self {
            SecretaryNote::Unset => Ok(SecretaryNote::Set(note)),
            SecretaryNote::Set(_) => Err(SchedulingError::NoteAlreadySet),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SecretaryNote::Unset => None,
            SecretaryNote::Set(text) => Some(text),
        }
    }
}

impl From<Option<String>> for SecretaryNote {
    fn from(value: Option<String>) -> Self {
        match value {
            None => SecretaryNote::Unset,
            Some(text) => SecretaryNote::Set(text),
        }
    }
}

impl From<SecretaryNote> for Option<String> {
    fn from(value: SecretaryNote) -> Self {
        match value {
            SecretaryNote::Unset => None,
            SecretaryNote::Set(text) => Some(text),
        }
    }
}

// ==============================================================================
// COLLABORATOR PROJECTIONS
// ==============================================================================

/// The only doctor fields this cell may see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorRef {
    pub id: Uuid,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientBrief {
    pub full_name: String,
    pub birth_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorBrief {
    pub full_name: String,
}

/// Appointment joined with the minimal patient/doctor fields, produced by a
/// single embedded-select read at the store boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    #[serde(rename = "patients")]
    pub patient: PatientBrief,
    #[serde(rename = "doctors")]
    pub doctor: DoctorBrief,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub slot_id: Uuid,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddNoteRequest {
    pub note: String,
}

// ==============================================================================
// READ PROJECTIONS / RESPONSE MODELS
// ==============================================================================

/// One calendar cell: how many unbooked slots a doctor still has on a day.
#[derive(Debug, Clone, Serialize)]
pub struct DayAvailability {
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub date: NaiveDate,
    pub available_slot_count: usize,
}

#[derive(Debug, Clone)]
pub struct SlotWithDoctor {
    pub slot: AvailabilitySlot,
    pub doctor_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

impl From<SlotWithDoctor> for SlotView {
    fn from(value: SlotWithDoctor) -> Self {
        Self {
            id: value.slot.id,
            doctor_id: value.slot.doctor_id,
            doctor_name: value.doctor_name,
            date: value.slot.slot_date,
            start_time: minutes_to_hhmm(value.slot.start_minutes),
            end_time: minutes_to_hhmm(value.slot.end_minutes),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub status: AppointmentStatus,
    pub secretary_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Appointment> for AppointmentView {
    fn from(value: Appointment) -> Self {
        Self {
            id: value.id,
            patient_id: value.patient_id,
            doctor_id: value.doctor_id,
            date: value.date,
            start_time: minutes_to_hhmm(value.start_minutes),
            end_time: minutes_to_hhmm(value.end_minutes),
            status: value.status,
            secretary_note: value.secretary_note.into(),
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetailsView {
    #[serde(flatten)]
    pub appointment: AppointmentView,
    pub patient_name: String,
    pub patient_birth_date: NaiveDate,
    pub doctor_name: String,
}

impl From<AppointmentDetails> for AppointmentDetailsView {
    fn from(value: AppointmentDetails) -> Self {
        Self {
            appointment: value.appointment.into(),
            patient_name: value.patient.full_name,
            patient_birth_date: value.patient.birth_date,
            doctor_name: value.doctor.full_name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

impl<T> Paginated<T> {
    /// Slice a full result set into a 1-indexed page.
    pub fn paginate(all: Vec<T>, page: usize, limit: usize) -> Result<Paginated<T>, SchedulingError> {
        if page == 0 {
            return Err(SchedulingError::Validation("page is 1-indexed".to_string()));
        }
        if limit == 0 {
            return Err(SchedulingError::Validation("limit must be positive".to_string()));
        }

        let total = all.len();
        let total_pages = total.div_ceil(limit);
        let items = all
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .collect();

        Ok(Paginated {
            items,
            total,
            page,
            total_pages,
        })
    }
}

// ==============================================================================
// POLICY
// ==============================================================================

/// What happens to the claimed slot when its appointment is cancelled. The
/// conservative default keeps the slot consumed, matching the historical
/// contract; Release makes the time bookable again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotReleasePolicy {
    Retain,
    Release,
}

impl SlotReleasePolicy {
    pub fn from_flag(release_on_cancel: bool) -> Self {
        if release_on_cancel {
            SlotReleasePolicy::Release
        } else {
            SlotReleasePolicy::Retain
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulingError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("no doctors registered for this clinic")]
    NoDoctorsInClinic,

    #[error("slot not available")]
    SlotUnavailable,

    #[error("secretary note already set")]
    NoteAlreadySet,

    #[error("appointment already {0}")]
    AlreadyInTerminalState(AppointmentStatus),

    #[error("cannot move appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("store error: {0}")]
    Store(String),
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::Validation(msg) => AppError::ValidationError(msg),
            SchedulingError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            SchedulingError::NoDoctorsInClinic => {
                AppError::NotFound("no doctors registered for this clinic".to_string())
            }
            SchedulingError::SlotUnavailable => AppError::Conflict("slot not available".to_string()),
            SchedulingError::NoteAlreadySet => {
                AppError::Conflict("secretary note already set".to_string())
            }
            SchedulingError::AlreadyInTerminalState(status) => {
                AppError::Conflict(format!("appointment already {}", status))
            }
            SchedulingError::InvalidTransition { from, to } => {
                AppError::Conflict(format!("cannot move appointment from {} to {}", from, to))
            }
            SchedulingError::Forbidden(msg) => AppError::Forbidden(msg.to_string()),
            SchedulingError::Store(msg) => AppError::Database(msg),
        }
    }
}

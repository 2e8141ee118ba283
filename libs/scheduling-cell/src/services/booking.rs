// libs/scheduling-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use shared_database::store::StoreClient;
use shared_models::auth::Identity;

use crate::models::{
    Appointment, AppointmentStatus, CreateAppointmentRequest, NewAppointment, SchedulingError,
};
use crate::services::appointments::AppointmentStore;
use crate::services::doctors::DoctorDirectory;
use crate::services::slots::SlotStore;

/// Turns one unbooked slot into one waiting appointment. The slot claim is a
/// single conditional update; if the appointment insert fails afterwards the
/// claim is compensated, so a booked slot without an appointment cannot
/// survive this code path.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<StoreClient>,
    slots: SlotStore,
    appointments: AppointmentStore,
    doctors: DoctorDirectory,
}

impl BookingService {
    pub fn new(
        store: Arc<StoreClient>,
        slots: SlotStore,
        appointments: AppointmentStore,
        doctors: DoctorDirectory,
    ) -> Self {
        Self {
            store,
            slots,
            appointments,
            doctors,
        }
    }

    pub async fn create_appointment(
        &self,
        identity: &Identity,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        info!(
            "Booking slot {} for patient {} with doctor {}",
            request.slot_id, request.patient_id, request.doctor_id
        );

        if let Some(note) = &request.note {
            if note.trim().is_empty() {
                return Err(SchedulingError::Validation(
                    "note must not be empty".to_string(),
                ));
            }
        }

        // The doctor must exist in the caller's clinic before anything is
        // claimed; an unknown doctor is its own condition, not a slot miss.
        self.doctors
            .find_in_clinic(identity.clinic_id, request.doctor_id, auth_token)
            .await?
            .ok_or(SchedulingError::NotFound("doctor"))?;

        self.verify_patient_in_clinic(identity.clinic_id, request.patient_id, auth_token)
            .await?;

        let slot = self
            .slots
            .claim(request.slot_id, auth_token)
            .await?
            .ok_or(SchedulingError::SlotUnavailable)?;

        // The claim matched on id alone; cross-checks happen after, with the
        // claim rolled back on any mismatch.
        if slot.clinic_id != identity.clinic_id {
            self.compensate_claim(slot.id, auth_token).await;
            return Err(SchedulingError::Forbidden("slot belongs to another clinic"));
        }
        if slot.doctor_id != request.doctor_id {
            self.compensate_claim(slot.id, auth_token).await;
            return Err(SchedulingError::Validation(
                "slot does not belong to the requested doctor".to_string(),
            ));
        }

        let new_appointment = NewAppointment {
            clinic_id: identity.clinic_id,
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            date: slot.slot_date,
            start_minutes: slot.start_minutes,
            end_minutes: slot.end_minutes,
            status: AppointmentStatus::Waiting,
            secretary_note: request.note.into(),
            created_at: Utc::now(),
        };

        match self.appointments.insert(&new_appointment, auth_token).await {
            Ok(appointment) => {
                info!(
                    "Appointment {} created in waiting for slot {}",
                    appointment.id, slot.id
                );
                Ok(appointment)
            }
            Err(err) => {
                self.compensate_claim(slot.id, auth_token).await;
                Err(err)
            }
        }
    }

    /// One-shot secretary note. The store-side null guard decides; a second
    /// write is rejected, never overwritten.
    pub async fn add_secretary_note(
        &self,
        identity: &Identity,
        appointment_id: Uuid,
        note: String,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        if note.trim().is_empty() {
            return Err(SchedulingError::Validation(
                "note must not be empty".to_string(),
            ));
        }

        let appointment = self
            .appointments
            .get(appointment_id, auth_token)
            .await?
            .ok_or(SchedulingError::NotFound("appointment"))?;

        if appointment.clinic_id != identity.clinic_id {
            return Err(SchedulingError::Forbidden(
                "appointment belongs to another clinic",
            ));
        }

        // Cheap pre-check for the common case; the conditional update below
        // is what actually guarantees one-shot semantics under races.
        if appointment.secretary_note.is_set() {
            return Err(SchedulingError::NoteAlreadySet);
        }

        self.appointments
            .set_note_if_unset(appointment_id, note.trim(), auth_token)
            .await?
            .ok_or(SchedulingError::NoteAlreadySet)
    }

    async fn verify_patient_in_clinic(
        &self,
        clinic_id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        let path = format!(
            "/rest/v1/patients?id=eq.{}&clinic_id=eq.{}&select=id",
            patient_id, clinic_id
        );
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        if result.is_empty() {
            return Err(SchedulingError::NotFound("patient"));
        }

        Ok(())
    }

    /// Roll a claimed slot back to unbooked. Failure here is logged loudly:
    /// it is the one path that could otherwise leave a booked slot with no
    /// appointment behind.
    async fn compensate_claim(&self, slot_id: Uuid, auth_token: &str) {
        match self.slots.release(slot_id, auth_token).await {
            Ok(true) => warn!("Compensated claim on slot {}", slot_id),
            Ok(false) => error!(
                "Claim compensation for slot {} matched no row; manual check required",
                slot_id
            ),
            Err(err) => error!(
                "Claim compensation for slot {} failed: {}; manual check required",
                slot_id, err
            ),
        }
    }
}

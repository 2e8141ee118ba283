// libs/scheduling-cell/src/services/lifecycle.rs
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::auth::{Identity, Role};

use crate::models::{Appointment, AppointmentStatus, SchedulingError, SlotReleasePolicy};
use crate::services::appointments::AppointmentStore;
use crate::services::slots::SlotStore;

/// Validate that a status transition is allowed.
///
/// Terminal states report a distinct condition so the UI can say "already
/// cancelled" instead of showing a generic error banner.
pub fn validate_transition(
    current: AppointmentStatus,
    target: AppointmentStatus,
) -> Result<(), SchedulingError> {
    if is_terminal(current) {
        warn!("Transition attempted out of terminal state {:?}", current);
        return Err(SchedulingError::AlreadyInTerminalState(current));
    }

    if !valid_transitions(current).contains(&target) {
        warn!("Invalid status transition attempted: {:?} -> {:?}", current, target);
        return Err(SchedulingError::InvalidTransition {
            from: current,
            to: target,
        });
    }

    Ok(())
}

pub fn is_terminal(status: AppointmentStatus) -> bool {
    matches!(status, AppointmentStatus::Cancelled | AppointmentStatus::Done)
}

/// All valid next statuses for a given current status.
pub fn valid_transitions(current: AppointmentStatus) -> Vec<AppointmentStatus> {
    match current {
        AppointmentStatus::Waiting => vec![
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
        ],
        AppointmentStatus::Confirmed => vec![
            AppointmentStatus::Done,
            AppointmentStatus::Cancelled,
        ],
        // Terminal states - no transitions allowed
        AppointmentStatus::Cancelled => vec![],
        AppointmentStatus::Done => vec![],
    }
}

/// Role-scoped appointment lifecycle. Each entry point enforces clinic and
/// ownership scoping first (Forbidden, never NotFound, for someone else's
/// appointment), then validates the transition, then issues one conditional
/// status update so concurrent callers cannot double-apply it.
#[derive(Clone)]
pub struct AppointmentLifecycleService {
    appointments: AppointmentStore,
    slots: SlotStore,
    release_policy: SlotReleasePolicy,
}

impl AppointmentLifecycleService {
    pub fn new(
        appointments: AppointmentStore,
        slots: SlotStore,
        release_policy: SlotReleasePolicy,
    ) -> Self {
        Self {
            appointments,
            slots,
            release_policy,
        }
    }

    /// Patient confirms their own waiting appointment.
    pub async fn confirm(
        &self,
        identity: &Identity,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self.load_scoped(identity, appointment_id, auth_token).await?;

        if identity.role != Role::Patient {
            return Err(SchedulingError::Forbidden(
                "only the patient can confirm an appointment",
            ));
        }
        if appointment.patient_id != identity.user_id {
            return Err(SchedulingError::Forbidden(
                "appointment belongs to another patient",
            ));
        }

        validate_transition(appointment.status, AppointmentStatus::Confirmed)?;

        self.apply(
            appointment_id,
            &[AppointmentStatus::Waiting],
            AppointmentStatus::Confirmed,
            auth_token,
        )
        .await
    }

    /// Cancel on behalf of any of the roles that may do so. Patients may only
    /// cancel their own appointments; staff and doctors act clinic-wide.
    pub async fn cancel(
        &self,
        identity: &Identity,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self.load_scoped(identity, appointment_id, auth_token).await?;

        if identity.role == Role::Patient && appointment.patient_id != identity.user_id {
            return Err(SchedulingError::Forbidden(
                "appointment belongs to another patient",
            ));
        }

        validate_transition(appointment.status, AppointmentStatus::Cancelled)?;

        let cancelled = self
            .apply(
                appointment_id,
                &[AppointmentStatus::Waiting, AppointmentStatus::Confirmed],
                AppointmentStatus::Cancelled,
                auth_token,
            )
            .await?;

        if self.release_policy == SlotReleasePolicy::Release {
            // The slot is linked only by its natural key; releasing it makes
            // the time bookable again under the Release policy.
            self.slots
                .release_by_key(
                    cancelled.clinic_id,
                    cancelled.doctor_id,
                    cancelled.date,
                    cancelled.start_minutes,
                    auth_token,
                )
                .await?;
        }

        info!(
            "Appointment {} cancelled by {} ({})",
            appointment_id, identity.user_id, identity.role
        );
        Ok(cancelled)
    }

    /// Doctor marks their own confirmed appointment as done.
    pub async fn complete(
        &self,
        identity: &Identity,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self.load_scoped(identity, appointment_id, auth_token).await?;

        if identity.role != Role::Doctor {
            return Err(SchedulingError::Forbidden(
                "only the doctor can complete an appointment",
            ));
        }
        if appointment.doctor_id != identity.user_id {
            return Err(SchedulingError::Forbidden(
                "appointment belongs to another doctor",
            ));
        }

        validate_transition(appointment.status, AppointmentStatus::Done)?;

        self.apply(
            appointment_id,
            &[AppointmentStatus::Confirmed],
            AppointmentStatus::Done,
            auth_token,
        )
        .await
    }

    async fn load_scoped(
        &self,
        identity: &Identity,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
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

        Ok(appointment)
    }

    /// Issue the conditional update; on a miss, re-read to report precisely
    /// what a concurrent caller did to the appointment.
    async fn apply(
        &self,
        appointment_id: Uuid,
        expected: &[AppointmentStatus],
        target: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        match self
            .appointments
            .transition(appointment_id, expected, target, auth_token)
            .await?
        {
            Some(updated) => Ok(updated),
            None => {
                debug!(
                    "Conditional transition of {} to {} matched nothing, re-reading",
                    appointment_id, target
                );
                let current = self
                    .appointments
                    .get(appointment_id, auth_token)
                    .await?
                    .ok_or(SchedulingError::NotFound("appointment"))?;

                if is_terminal(current.status) {
                    Err(SchedulingError::AlreadyInTerminalState(current.status))
                } else {
                    Err(SchedulingError::InvalidTransition {
                        from: current.status,
                        to: target,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiting_can_confirm_or_cancel() {
        assert!(validate_transition(AppointmentStatus::Waiting, AppointmentStatus::Confirmed).is_ok());
        assert!(validate_transition(AppointmentStatus::Waiting, AppointmentStatus::Cancelled).is_ok());
    }

    #[test]
    fn confirmed_can_complete_or_cancel() {
        assert!(validate_transition(AppointmentStatus::Confirmed, AppointmentStatus::Done).is_ok());
        assert!(validate_transition(AppointmentStatus::Confirmed, AppointmentStatus::Cancelled).is_ok());
    }

    #[test]
    fn waiting_cannot_jump_to_done() {
        let err = validate_transition(AppointmentStatus::Waiting, AppointmentStatus::Done).unwrap_err();
        assert_eq!(
            err,
            SchedulingError::InvalidTransition {
                from: AppointmentStatus::Waiting,
                to: AppointmentStatus::Done,
            }
        );
    }

    #[test]
    fn terminal_states_reject_everything() {
        for terminal in [AppointmentStatus::Cancelled, AppointmentStatus::Done] {
            for target in [
                AppointmentStatus::Waiting,
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::Done,
            ] {
                let err = validate_transition(terminal, target).unwrap_err();
                assert_eq!(err, SchedulingError::AlreadyInTerminalState(terminal));
            }
        }
    }

    #[test]
    fn transition_table_is_closed_over_terminals() {
        assert!(valid_transitions(AppointmentStatus::Cancelled).is_empty());
        assert!(valid_transitions(AppointmentStatus::Done).is_empty());
    }
}

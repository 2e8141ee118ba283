// libs/scheduling-cell/src/services/appointments.rs
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::store::{prefer_representation, StoreClient};

use crate::models::{
    Appointment, AppointmentDetails, AppointmentStatus, NewAppointment, SchedulingError,
};

/// Columns the read projections are allowed to join in. Full patient or
/// doctor records never cross this boundary.
const DETAIL_SELECT: &str = "*,patients(full_name,birth_date),doctors(full_name)";

/// Persistence boundary for appointments. Status changes and the one-shot
/// note are conditional updates so a raced write loses at the store instead
/// of clobbering state.
#[derive(Clone)]
pub struct AppointmentStore {
    store: Arc<StoreClient>,
}

impl AppointmentStore {
    pub fn new(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    pub async fn get(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Appointment>, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        match result.into_iter().next() {
            None => Ok(None),
            Some(row) => {
                let appointment = serde_json::from_value(row).map_err(|e| {
                    SchedulingError::Store(format!("failed to parse appointment: {}", e))
                })?;
                Ok(Some(appointment))
            }
        }
    }

    pub async fn insert(
        &self,
        appointment: &NewAppointment,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let body = serde_json::to_value(appointment)
            .map_err(|e| SchedulingError::Store(format!("failed to encode appointment: {}", e)))?;

        let result: Vec<Value> = self
            .store
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(body),
                Some(prefer_representation()),
            )
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| SchedulingError::Store("appointment insert returned no row".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| SchedulingError::Store(format!("failed to parse appointment: {}", e)))
    }

    /// Conditional status transition: only applies while the current status
    /// is one of `expected`. None means the guard did not match (missing row
    /// or a concurrent transition won); the caller re-reads to find out which.
    pub async fn transition(
        &self,
        appointment_id: Uuid,
        expected: &[AppointmentStatus],
        target: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Option<Appointment>, SchedulingError> {
        debug!(
            "Transitioning appointment {} to {} (expecting one of {:?})",
            appointment_id, target, expected
        );

        let expected_list = expected
            .iter()
            .map(|status| status.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=in.({})",
            appointment_id, expected_list
        );

        let updated: Vec<Value> = self
            .store
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "status": target })),
                Some(prefer_representation()),
            )
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        match updated.into_iter().next() {
            None => Ok(None),
            Some(row) => {
                let appointment = serde_json::from_value(row).map_err(|e| {
                    SchedulingError::Store(format!("failed to parse appointment: {}", e))
                })?;
                Ok(Some(appointment))
            }
        }
    }

    /// One-shot note write: the null-column guard makes a second set lose at
    /// the store no matter how requests interleave.
    pub async fn set_note_if_unset(
        &self,
        appointment_id: Uuid,
        note: &str,
        auth_token: &str,
    ) -> Result<Option<Appointment>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&secretary_note=is.null",
            appointment_id
        );
        let updated: Vec<Value> = self
            .store
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "secretary_note": note })),
                Some(prefer_representation()),
            )
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        match updated.into_iter().next() {
            None => Ok(None),
            Some(row) => {
                let appointment = serde_json::from_value(row).map_err(|e| {
                    SchedulingError::Store(format!("failed to parse appointment: {}", e))
                })?;
                Ok(Some(appointment))
            }
        }
    }

    /// One clinic day of appointments with the minimal patient/doctor join,
    /// filtered and ordered at the store.
    pub async fn list_day_details(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
        filters: DayFilters<'_>,
        auth_token: &str,
    ) -> Result<Vec<AppointmentDetails>, SchedulingError> {
        let mut path = format!(
            "/rest/v1/appointments?clinic_id=eq.{}&date=eq.{}&select={}",
            clinic_id, date, DETAIL_SELECT
        );

        match filters.statuses {
            StatusFilter::OneOf(statuses) => {
                let list = statuses
                    .iter()
                    .map(|status| status.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                path.push_str(&format!("&status=in.({})", list));
            }
            StatusFilter::Not(status) => {
                path.push_str(&format!("&status=neq.{}", status));
            }
        }

        if let Some(latest_start) = filters.start_at_or_before {
            path.push_str(&format!("&start_minutes=lte.{}", latest_start));
        }

        match filters.order {
            SortOrder::Ascending => path.push_str("&order=start_minutes.asc"),
            SortOrder::Descending => path.push_str("&order=start_minutes.desc"),
        }

        if let Some(limit) = filters.limit {
            path.push_str(&format!("&limit={}", limit));
        }

        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AppointmentDetails>, _>>()
            .map_err(|e| SchedulingError::Store(format!("failed to parse appointments: {}", e)))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum StatusFilter<'a> {
    OneOf(&'a [AppointmentStatus]),
    Not(AppointmentStatus),
}

#[derive(Debug, Clone, Copy)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy)]
pub struct DayFilters<'a> {
    pub statuses: StatusFilter<'a>,
    pub start_at_or_before: Option<i32>,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

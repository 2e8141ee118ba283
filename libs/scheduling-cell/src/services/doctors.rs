use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::store::StoreClient;

use crate::models::{DoctorRef, SchedulingError};

/// Read-only view of the clinic's doctor roster. The scheduling cell only
/// ever sees id and display name; everything else about a doctor belongs to
/// other parts of the platform.
#[derive(Clone)]
pub struct DoctorDirectory {
    store: Arc<StoreClient>,
}

impl DoctorDirectory {
    pub fn new(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    pub async fn list_for_clinic(
        &self,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<DoctorRef>, SchedulingError> {
        debug!("Listing doctors for clinic {}", clinic_id);

        let path = format!(
            "/rest/v1/doctors?clinic_id=eq.{}&select=id,full_name&order=full_name.asc",
            clinic_id
        );
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        let doctors: Vec<DoctorRef> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<DoctorRef>, _>>()
            .map_err(|e| SchedulingError::Store(format!("failed to parse doctors: {}", e)))?;

        Ok(doctors)
    }

    pub async fn find_in_clinic(
        &self,
        clinic_id: Uuid,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<DoctorRef>, SchedulingError> {
        let path = format!(
            "/rest/v1/doctors?clinic_id=eq.{}&id=eq.{}&select=id,full_name",
            clinic_id, doctor_id
        );
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        match result.into_iter().next() {
            None => Ok(None),
            Some(row) => {
                let doctor = serde_json::from_value(row)
                    .map_err(|e| SchedulingError::Store(format!("failed to parse doctor: {}", e)))?;
                Ok(Some(doctor))
            }
        }
    }

    /// Doctor id -> display name for read-side projections.
    pub async fn name_index(
        &self,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<HashMap<Uuid, String>, SchedulingError> {
        let doctors = self.list_for_clinic(clinic_id, auth_token).await?;
        Ok(doctors
            .into_iter()
            .map(|doctor| (doctor.id, doctor.full_name))
            .collect())
    }
}

// libs/scheduling-cell/src/services/slots.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::store::{prefer_ignore_duplicates, prefer_representation, StoreClient};

use crate::models::{AvailabilitySlot, NewSlot, SchedulingError, SlotKey};

/// Persistence boundary for availability slots. Slots are the one shared
/// mutable resource with a concurrency hazard, so every mutation here is a
/// single conditional update; there is no read-then-write anywhere.
#[derive(Clone)]
pub struct SlotStore {
    store: Arc<StoreClient>,
}

impl SlotStore {
    pub fn new(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    /// Unbooked slots for a clinic within a date range, optionally narrowed
    /// to one doctor, ordered by (date, start).
    pub async fn list_unbooked(
        &self,
        clinic_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        doctor_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<AvailabilitySlot>, SchedulingError> {
        let mut path = format!(
            "/rest/v1/availability_slots?clinic_id=eq.{}&slot_date=gte.{}&slot_date=lte.{}&is_booked=eq.false",
            clinic_id, from, to
        );
        if let Some(doctor_id) = doctor_id {
            path.push_str(&format!("&doctor_id=eq.{}", doctor_id));
        }
        path.push_str("&order=slot_date.asc,start_minutes.asc");

        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        let slots: Vec<AvailabilitySlot> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AvailabilitySlot>, _>>()
            .map_err(|e| SchedulingError::Store(format!("failed to parse slots: {}", e)))?;

        Ok(slots)
    }

    /// Keys of every slot (booked or not) a clinic already has materialized
    /// in the range. The seeder diffs the catalog against this set, keyed by
    /// the full (doctor, date, start) triple.
    pub async fn existing_keys(
        &self,
        clinic_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: &str,
    ) -> Result<HashSet<SlotKey>, SchedulingError> {
        let path = format!(
            "/rest/v1/availability_slots?clinic_id=eq.{}&slot_date=gte.{}&slot_date=lte.{}&select=doctor_id,slot_date,start_minutes",
            clinic_id, from, to
        );

        #[derive(serde::Deserialize)]
        struct KeyRow {
            doctor_id: Uuid,
            slot_date: NaiveDate,
            start_minutes: i32,
        }

        let result: Vec<KeyRow> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        Ok(result
            .into_iter()
            .map(|row| (row.doctor_id, row.slot_date, row.start_minutes))
            .collect())
    }

    /// Batch-insert missing slots. The store's uniqueness constraint on
    /// (doctor_id, slot_date, start_minutes) plus ignore-duplicates makes a
    /// concurrent seeder a benign no-op; the returned count reflects rows
    /// actually inserted by this call.
    pub async fn insert_missing(
        &self,
        rows: &[NewSlot],
        auth_token: &str,
    ) -> Result<usize, SchedulingError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let body = serde_json::to_value(rows)
            .map_err(|e| SchedulingError::Store(format!("failed to encode slots: {}", e)))?;

        let inserted: Vec<Value> = self
            .store
            .request_with_headers(
                Method::POST,
                "/rest/v1/availability_slots?on_conflict=doctor_id,slot_date,start_minutes",
                Some(auth_token),
                Some(body),
                Some(prefer_ignore_duplicates()),
            )
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        info!("Inserted {} of {} planned availability slots", inserted.len(), rows.len());
        Ok(inserted.len())
    }

    /// The only legal claim primitive: one conditional update that flips
    /// is_booked false -> true. Under N concurrent claims of the same id the
    /// store applies exactly one; the rest see zero affected rows and get
    /// None back.
    pub async fn claim(
        &self,
        slot_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<AvailabilitySlot>, SchedulingError> {
        debug!("Claiming slot {}", slot_id);

        let path = format!(
            "/rest/v1/availability_slots?id=eq.{}&is_booked=eq.false",
            slot_id
        );
        let updated: Vec<Value> = self
            .store
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "is_booked": true })),
                Some(prefer_representation()),
            )
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        match updated.into_iter().next() {
            None => Ok(None),
            Some(row) => {
                let slot = serde_json::from_value(row)
                    .map_err(|e| SchedulingError::Store(format!("failed to parse slot: {}", e)))?;
                Ok(Some(slot))
            }
        }
    }

    /// Compensation for a claim whose appointment insert failed: flip the
    /// slot back so it can never stay booked without an appointment.
    pub async fn release(
        &self,
        slot_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, SchedulingError> {
        let path = format!(
            "/rest/v1/availability_slots?id=eq.{}&is_booked=eq.true",
            slot_id
        );
        let updated: Vec<Value> = self
            .store
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "is_booked": false })),
                Some(prefer_representation()),
            )
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        Ok(!updated.is_empty())
    }

    /// Release by the slot's natural key; used by the cancel path when the
    /// release-on-cancel policy is active. Appointments created outside the
    /// booking flow may have no matching slot, which is fine.
    pub async fn release_by_key(
        &self,
        clinic_id: Uuid,
        doctor_id: Uuid,
        slot_date: NaiveDate,
        start_minutes: i32,
        auth_token: &str,
    ) -> Result<bool, SchedulingError> {
        let path = format!(
            "/rest/v1/availability_slots?clinic_id=eq.{}&doctor_id=eq.{}&slot_date=eq.{}&start_minutes=eq.{}&is_booked=eq.true",
            clinic_id, doctor_id, slot_date, start_minutes
        );
        let updated: Vec<Value> = self
            .store
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "is_booked": false })),
                Some(prefer_representation()),
            )
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        if updated.is_empty() {
            warn!(
                "No booked slot to release for doctor {} on {} at {}",
                doctor_id, slot_date, start_minutes
            );
        }

        Ok(!updated.is_empty())
    }
}

// libs/scheduling-cell/src/services/overview.rs
use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use tracing::debug;
use uuid::Uuid;

use crate::models::{DayAvailability, SchedulingError, SlotWithDoctor};
use crate::services::doctors::DoctorDirectory;
use crate::services::slots::SlotStore;

/// Days covered by one calendar overview: the requested week start plus
/// twenty more, matching the three-week booking horizon.
const OVERVIEW_SPAN_DAYS: i64 = 20;

/// Read-only grouping of unbooked slots for calendar rendering. Tolerant by
/// contract: a doctor filter that does not parse or does not match yields an
/// empty result, never an error, so a bad query param degrades to an empty
/// calendar instead of an error banner.
#[derive(Clone)]
pub struct AvailabilityAggregator {
    slots: SlotStore,
    doctors: DoctorDirectory,
}

/// How a raw doctor-filter string resolved.
enum DoctorFilter {
    None,
    One(Uuid),
    Unresolvable,
}

fn resolve_doctor_filter(raw: Option<&str>) -> DoctorFilter {
    match raw {
        None => DoctorFilter::None,
        Some(value) => match Uuid::parse_str(value) {
            Ok(id) => DoctorFilter::One(id),
            Err(_) => DoctorFilter::Unresolvable,
        },
    }
}

impl AvailabilityAggregator {
    pub fn new(slots: SlotStore, doctors: DoctorDirectory) -> Self {
        Self { slots, doctors }
    }

    /// Unbooked slot counts grouped by (doctor, day) over
    /// `[week_start, week_start + 20 days]`.
    pub async fn overview_by_doctor_and_day(
        &self,
        clinic_id: Uuid,
        week_start: NaiveDate,
        doctor_filter: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<DayAvailability>, SchedulingError> {
        let doctor_id = match resolve_doctor_filter(doctor_filter) {
            DoctorFilter::None => None,
            DoctorFilter::One(id) => Some(id),
            DoctorFilter::Unresolvable => {
                debug!("Unresolvable doctor filter {:?}, returning empty overview", doctor_filter);
                return Ok(Vec::new());
            }
        };

        let until = week_start + Duration::days(OVERVIEW_SPAN_DAYS);
        let slots = self
            .slots
            .list_unbooked(clinic_id, week_start, until, doctor_id, auth_token)
            .await?;
        let names = self.doctors.name_index(clinic_id, auth_token).await?;

        // BTreeMap keeps the calendar ordered by day, then doctor.
        let mut grouped: BTreeMap<(NaiveDate, Uuid), usize> = BTreeMap::new();
        for slot in &slots {
            *grouped.entry((slot.slot_date, slot.doctor_id)).or_insert(0) += 1;
        }

        let overview = grouped
            .into_iter()
            .map(|((date, doctor_id), available_slot_count)| DayAvailability {
                doctor_id,
                doctor_name: names
                    .get(&doctor_id)
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_string()),
                date,
                available_slot_count,
            })
            .collect();

        Ok(overview)
    }

    /// Flat unbooked-slot list with the doctor name projection, for the slot
    /// picker. Same range and same filter tolerance as the overview.
    pub async fn list_unbooked_with_doctor(
        &self,
        clinic_id: Uuid,
        week_start: NaiveDate,
        doctor_filter: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<SlotWithDoctor>, SchedulingError> {
        let doctor_id = match resolve_doctor_filter(doctor_filter) {
            DoctorFilter::None => None,
            DoctorFilter::One(id) => Some(id),
            DoctorFilter::Unresolvable => return Ok(Vec::new()),
        };

        let until = week_start + Duration::days(OVERVIEW_SPAN_DAYS);
        let slots = self
            .slots
            .list_unbooked(clinic_id, week_start, until, doctor_id, auth_token)
            .await?;
        let names = self.doctors.name_index(clinic_id, auth_token).await?;

        Ok(slots
            .into_iter()
            .map(|slot| {
                let doctor_name = names
                    .get(&slot.doctor_id)
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_string());
                SlotWithDoctor { slot, doctor_name }
            })
            .collect())
    }
}

// libs/scheduling-cell/src/services/seeder.rs
use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{DoctorRef, NewSlot, SchedulingError, SlotKey, SlotTime};
use crate::services::catalog::daily_template;
use crate::services::doctors::DoctorDirectory;
use crate::services::slots::SlotStore;

/// Materializes missing availability slots for every doctor of a clinic over
/// a rolling horizon. Lazy (invoked when a calendar is opened) and fully
/// idempotent: planning is a pure diff against the slots that already exist,
/// and the insert tolerates duplicate keys from concurrent seeders.
#[derive(Clone)]
pub struct AvailabilitySeeder {
    doctors: DoctorDirectory,
    slots: SlotStore,
    horizon_days: i64,
}

impl AvailabilitySeeder {
    pub fn new(doctors: DoctorDirectory, slots: SlotStore, horizon_days: i64) -> Self {
        Self {
            doctors,
            slots,
            horizon_days,
        }
    }

    pub async fn ensure_horizon(
        &self,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<usize, SchedulingError> {
        self.ensure_horizon_for(clinic_id, self.horizon_days, auth_token)
            .await
    }

    pub async fn ensure_horizon_for(
        &self,
        clinic_id: Uuid,
        horizon_days: i64,
        auth_token: &str,
    ) -> Result<usize, SchedulingError> {
        let doctors = self.doctors.list_for_clinic(clinic_id, auth_token).await?;
        if doctors.is_empty() {
            // Distinct condition: the calendar UI branches on "no doctors"
            // instead of treating it as a seeding failure.
            return Err(SchedulingError::NoDoctorsInClinic);
        }

        let days = horizon_weekdays(Utc::now().date_naive(), horizon_days);
        let (Some(first), Some(last)) = (days.first(), days.last()) else {
            return Ok(0);
        };

        let existing = self
            .slots
            .existing_keys(clinic_id, *first, *last, auth_token)
            .await?;

        let planned = plan_missing_slots(clinic_id, &doctors, &days, &daily_template(), &existing);
        debug!(
            "Seeding clinic {}: {} doctors, {} weekdays, {} slots missing",
            clinic_id,
            doctors.len(),
            days.len(),
            planned.len()
        );

        if planned.is_empty() {
            info!("Availability horizon for clinic {} already materialized", clinic_id);
            return Ok(0);
        }

        self.slots.insert_missing(&planned, auth_token).await
    }
}

/// Calendar days in `[from, from + horizon_days)` excluding weekends.
pub fn horizon_weekdays(from: NaiveDate, horizon_days: i64) -> Vec<NaiveDate> {
    (0..horizon_days)
        .map(|offset| from + Duration::days(offset))
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

/// Pure diff of the full catalog against already-materialized slots. The
/// existence key is the full (doctor, date, start) triple, so a day that was
/// only partially seeded (e.g. by a crashed run) gets topped up instead of
/// being skipped wholesale.
pub fn plan_missing_slots(
    clinic_id: Uuid,
    doctors: &[DoctorRef],
    days: &[NaiveDate],
    template: &[SlotTime],
    existing: &HashSet<SlotKey>,
) -> Vec<NewSlot> {
    let mut planned = Vec::new();

    for doctor in doctors {
        for day in days {
            for slot in template {
                let key: SlotKey = (doctor.id, *day, slot.start_minutes);
                if existing.contains(&key) {
                    continue;
                }
                planned.push(NewSlot {
                    clinic_id,
                    doctor_id: doctor.id,
                    slot_date: *day,
                    start_minutes: slot.start_minutes,
                    end_minutes: slot.end_minutes,
                    is_booked: false,
                });
            }
        }
    }

    planned
}

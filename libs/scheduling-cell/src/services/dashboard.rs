// libs/scheduling-cell/src/services/dashboard.rs
use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::models::{AppointmentDetails, AppointmentStatus, Paginated, SchedulingError};
use crate::services::appointments::{AppointmentStore, DayFilters, SortOrder, StatusFilter};

/// The live-feed widget shows at most this many past appointments.
const RECENT_FEED_LIMIT: usize = 6;

/// Read projections for the staff dashboard. Every query is one clinic-day
/// read with the minimal patient/doctor join done at the store; the services
/// never fan out into per-row lookups.
#[derive(Clone)]
pub struct DashboardQueries {
    appointments: AppointmentStore,
}

impl DashboardQueries {
    pub fn new(appointments: AppointmentStore) -> Self {
        Self { appointments }
    }

    /// Today's confirmed and cancelled appointments, earliest first.
    pub async fn todays_appointments(
        &self,
        clinic_id: Uuid,
        today: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<AppointmentDetails>, SchedulingError> {
        self.appointments
            .list_day_details(
                clinic_id,
                today,
                DayFilters {
                    statuses: StatusFilter::OneOf(&[
                        AppointmentStatus::Confirmed,
                        AppointmentStatus::Cancelled,
                    ]),
                    start_at_or_before: None,
                    order: SortOrder::Ascending,
                    limit: None,
                },
                auth_token,
            )
            .await
    }

    /// Live feed: today's non-waiting appointments whose start time has
    /// passed, most recent first, capped to six.
    pub async fn past_appointments_today(
        &self,
        clinic_id: Uuid,
        today: NaiveDate,
        now_minutes: i32,
        auth_token: &str,
    ) -> Result<Vec<AppointmentDetails>, SchedulingError> {
        debug!(
            "Loading past appointments for clinic {} up to minute {}",
            clinic_id, now_minutes
        );

        self.appointments
            .list_day_details(
                clinic_id,
                today,
                DayFilters {
                    statuses: StatusFilter::Not(AppointmentStatus::Waiting),
                    start_at_or_before: Some(now_minutes),
                    order: SortOrder::Descending,
                    limit: Some(RECENT_FEED_LIMIT),
                },
                auth_token,
            )
            .await
    }

    /// Today's confirmed appointments as a 1-indexed page. The clinic day is
    /// small enough to read once; total and page come from the same snapshot
    /// so they can never disagree.
    pub async fn paginated_appointment_details(
        &self,
        clinic_id: Uuid,
        today: NaiveDate,
        page: usize,
        limit: usize,
        auth_token: &str,
    ) -> Result<Paginated<AppointmentDetails>, SchedulingError> {
        let all = self
            .appointments
            .list_day_details(
                clinic_id,
                today,
                DayFilters {
                    statuses: StatusFilter::OneOf(&[AppointmentStatus::Confirmed]),
                    start_at_or_before: None,
                    order: SortOrder::Ascending,
                    limit: None,
                },
                auth_token,
            )
            .await?;

        Paginated::paginate(all, page, limit)
    }
}

use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::store::StoreClient;

use crate::models::SlotReleasePolicy;

pub mod appointments;
pub mod booking;
pub mod catalog;
pub mod dashboard;
pub mod doctors;
pub mod lifecycle;
pub mod overview;
pub mod seeder;
pub mod slots;

use appointments::AppointmentStore;
use booking::BookingService;
use dashboard::DashboardQueries;
use doctors::DoctorDirectory;
use lifecycle::AppointmentLifecycleService;
use overview::AvailabilityAggregator;
use seeder::AvailabilitySeeder;
use slots::SlotStore;

/// One store handle and one instance of every scheduling service, built at
/// process start and passed into the router explicitly. Nothing in this cell
/// reaches for ambient global state.
#[derive(Clone)]
pub struct SchedulingState {
    pub config: AppConfig,
    pub booking: BookingService,
    pub lifecycle: AppointmentLifecycleService,
    pub seeder: AvailabilitySeeder,
    pub overview: AvailabilityAggregator,
    pub dashboard: DashboardQueries,
}

impl SchedulingState {
    pub fn new(config: &AppConfig) -> Self {
        let store = Arc::new(StoreClient::new(config));

        let slots = SlotStore::new(Arc::clone(&store));
        let appointments = AppointmentStore::new(Arc::clone(&store));
        let doctors = DoctorDirectory::new(Arc::clone(&store));

        let booking = BookingService::new(
            Arc::clone(&store),
            slots.clone(),
            appointments.clone(),
            doctors.clone(),
        );
        let lifecycle = AppointmentLifecycleService::new(
            appointments.clone(),
            slots.clone(),
            SlotReleasePolicy::from_flag(config.release_slot_on_cancel),
        );
        let seeder = AvailabilitySeeder::new(
            doctors.clone(),
            slots.clone(),
            config.availability_horizon_days,
        );
        let overview = AvailabilityAggregator::new(slots, doctors);
        let dashboard = DashboardQueries::new(appointments);

        Self {
            config: config.clone(),
            booking,
            lifecycle,
            seeder,
            overview,
            dashboard,
        }
    }
}

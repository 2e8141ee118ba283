use assert_matches::assert_matches;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::models::SchedulingError;
use scheduling_cell::services::catalog::daily_template;
use scheduling_cell::services::seeder::horizon_weekdays;
use scheduling_cell::SchedulingState;
use shared_utils::test_utils::{MockStoreResponses, TestConfig, TestIdentity};

const TOKEN: &str = "test-token";

fn state_for(mock_server: &MockServer) -> SchedulingState {
    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    SchedulingState::new(&config)
}

#[tokio::test]
async fn seeding_inserts_every_missing_slot() {
    let mock_server = MockServer::start().await;

    let clinic_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("clinic_id", format!("eq.{}", clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::doctor_row(doctor_id, "Dr. Adler")
        ])))
        .mount(&mock_server)
        .await;

    // Nothing materialized yet.
    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // Any 7 consecutive days hold exactly 5 weekdays, so the plan is
    // 1 doctor x 5 weekdays x 10 catalog slots.
    let expected = 5 * daily_template().len();
    let inserted_rows: Vec<serde_json::Value> =
        (0..expected).map(|_| json!({ "id": Uuid::new_v4() })).collect();

    Mock::given(method("POST"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("on_conflict", "doctor_id,slot_date,start_minutes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!(inserted_rows)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = state_for(&mock_server);
    let secretary = TestIdentity::secretary(clinic_id).to_identity();

    let inserted = state
        .seeder
        .ensure_horizon_for(secretary.clinic_id, 7, TOKEN)
        .await
        .unwrap();

    assert_eq!(inserted, expected);
}

#[tokio::test]
async fn fully_seeded_horizon_inserts_nothing() {
    let mock_server = MockServer::start().await;

    let clinic_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("clinic_id", format!("eq.{}", clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::doctor_row(doctor_id, "Dr. Adler")
        ])))
        .mount(&mock_server)
        .await;

    // Every (doctor, date, start) key the plan would produce already exists;
    // a booked slot counts exactly like an unbooked one here.
    let days = horizon_weekdays(Utc::now().date_naive(), 7);
    let existing: Vec<serde_json::Value> = days
        .iter()
        .flat_map(|day| {
            daily_template().into_iter().map(move |slot| {
                json!({
                    "doctor_id": doctor_id,
                    "slot_date": day,
                    "start_minutes": slot.start_minutes
                })
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(existing)))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let state = state_for(&mock_server);

    let inserted = state
        .seeder
        .ensure_horizon_for(clinic_id, 7, TOKEN)
        .await
        .unwrap();

    assert_eq!(inserted, 0);
}

#[tokio::test]
async fn clinic_without_doctors_is_a_distinct_condition() {
    let mock_server = MockServer::start().await;

    let clinic_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let state = state_for(&mock_server);

    let err = state
        .seeder
        .ensure_horizon(clinic_id, TOKEN)
        .await
        .unwrap_err();

    assert_matches!(err, SchedulingError::NoDoctorsInClinic);
}

use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::models::{AppointmentStatus, CreateAppointmentRequest, SchedulingError};
use scheduling_cell::SchedulingState;
use shared_utils::test_utils::{MockStoreResponses, TestConfig, TestIdentity};

const TOKEN: &str = "test-token";

fn state_for(mock_server: &MockServer) -> SchedulingState {
    let config = TestConfig::with_store_url(&mock_server.uri()).to_app_config();
    SchedulingState::new(&config)
}

fn booking_request(patient_id: Uuid, doctor_id: Uuid, slot_id: Uuid) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        patient_id,
        doctor_id,
        slot_id,
        note: None,
    }
}

async fn mount_doctor_and_patient(
    mock_server: &MockServer,
    clinic_id: Uuid,
    doctor_id: Uuid,
    patient_id: Uuid,
) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .and(query_param("clinic_id", format!("eq.{}", clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::doctor_row(doctor_id, "Dr. Adler")
        ])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": patient_id }
        ])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn booking_an_unbooked_slot_creates_waiting_appointment() {
    let mock_server = MockServer::start().await;

    let clinic_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let slot_id = Uuid::new_v4();

    mount_doctor_and_patient(&mock_server, clinic_id, doctor_id, patient_id).await;

    // The claim is one conditional update; the representation comes back with
    // the slot already flipped to booked.
    let claimed = MockStoreResponses::slot_row(slot_id, clinic_id, doctor_id, "2026-01-05", 480, true);
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", slot_id)))
        .and(query_param("is_booked", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([claimed])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::appointment_row(
                Uuid::new_v4(),
                clinic_id,
                patient_id,
                doctor_id,
                "2026-01-05",
                480,
                "waiting"
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = state_for(&mock_server);
    let secretary = TestIdentity::secretary(clinic_id).to_identity();

    let appointment = state
        .booking
        .create_appointment(&secretary, booking_request(patient_id, doctor_id, slot_id), TOKEN)
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Waiting);
    assert_eq!(appointment.patient_id, patient_id);
    assert_eq!(appointment.doctor_id, doctor_id);
    assert_eq!(appointment.start_minutes, 480);
}

#[tokio::test]
async fn losing_the_claim_race_reports_slot_unavailable() {
    let mock_server = MockServer::start().await;

    let clinic_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let slot_id = Uuid::new_v4();

    mount_doctor_and_patient(&mock_server, clinic_id, doctor_id, patient_id).await;

    // Zero affected rows: someone else already booked this slot.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", slot_id)))
        .and(query_param("is_booked", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let state = state_for(&mock_server);
    let secretary = TestIdentity::secretary(clinic_id).to_identity();

    let err = state
        .booking
        .create_appointment(&secretary, booking_request(patient_id, doctor_id, slot_id), TOKEN)
        .await
        .unwrap_err();

    assert_matches!(err, SchedulingError::SlotUnavailable);
}

#[tokio::test]
async fn failed_appointment_insert_compensates_the_claim() {
    let mock_server = MockServer::start().await;

    let clinic_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let slot_id = Uuid::new_v4();

    mount_doctor_and_patient(&mock_server, clinic_id, doctor_id, patient_id).await;

    let claimed = MockStoreResponses::slot_row(slot_id, clinic_id, doctor_id, "2026-01-05", 480, true);
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", slot_id)))
        .and(query_param("is_booked", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([claimed])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "storage exploded"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The slot must be flipped back; a booked slot with no appointment would
    // otherwise leak out of this flow.
    let released = MockStoreResponses::slot_row(slot_id, clinic_id, doctor_id, "2026-01-05", 480, false);
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", slot_id)))
        .and(query_param("is_booked", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([released])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = state_for(&mock_server);
    let secretary = TestIdentity::secretary(clinic_id).to_identity();

    let err = state
        .booking
        .create_appointment(&secretary, booking_request(patient_id, doctor_id, slot_id), TOKEN)
        .await
        .unwrap_err();

    assert_matches!(err, SchedulingError::Store(_));
}

#[tokio::test]
async fn unknown_doctor_is_reported_before_any_claim() {
    let mock_server = MockServer::start().await;

    let clinic_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let slot_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let state = state_for(&mock_server);
    let secretary = TestIdentity::secretary(clinic_id).to_identity();

    let err = state
        .booking
        .create_appointment(&secretary, booking_request(patient_id, doctor_id, slot_id), TOKEN)
        .await
        .unwrap_err();

    assert_matches!(err, SchedulingError::NotFound("doctor"));
}

#[tokio::test]
async fn secretary_note_is_one_shot() {
    let mock_server = MockServer::start().await;

    let clinic_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();
    let row = MockStoreResponses::appointment_row(
        appointment_id,
        clinic_id,
        Uuid::new_v4(),
        Uuid::new_v4(),
        "2026-01-05",
        480,
        "waiting",
    );

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&mock_server)
        .await;

    let mut noted = row.clone();
    noted["secretary_note"] = json!("bring referral letter");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(query_param("secretary_note", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([noted])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = state_for(&mock_server);
    let secretary = TestIdentity::secretary(clinic_id).to_identity();

    let updated = state
        .booking
        .add_secretary_note(
            &secretary,
            appointment_id,
            "bring referral letter".to_string(),
            TOKEN,
        )
        .await
        .unwrap();

    assert_eq!(updated.secretary_note.as_text(), Some("bring referral letter"));
}

#[tokio::test]
async fn second_note_is_rejected_not_overwritten() {
    let mock_server = MockServer::start().await;

    let clinic_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();
    let mut row = MockStoreResponses::appointment_row(
        appointment_id,
        clinic_id,
        Uuid::new_v4(),
        Uuid::new_v4(),
        "2026-01-05",
        480,
        "waiting",
    );
    row["secretary_note"] = json!("already here");

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let state = state_for(&mock_server);
    let secretary = TestIdentity::secretary(clinic_id).to_identity();

    let err = state
        .booking
        .add_secretary_note(&secretary, appointment_id, "new note".to_string(), TOKEN)
        .await
        .unwrap_err();

    assert_matches!(err, SchedulingError::NoteAlreadySet);
}

#[tokio::test]
async fn raced_note_write_loses_at_the_store() {
    let mock_server = MockServer::start().await;

    let clinic_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();
    let row = MockStoreResponses::appointment_row(
        appointment_id,
        clinic_id,
        Uuid::new_v4(),
        Uuid::new_v4(),
        "2026-01-05",
        480,
        "waiting",
    );

    // The read still sees no note, but the conditional update matches nothing
    // because a concurrent secretary got there first.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("secretary_note", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = state_for(&mock_server);
    let secretary = TestIdentity::secretary(clinic_id).to_identity();

    let err = state
        .booking
        .add_secretary_note(&secretary, appointment_id, "late note".to_string(), TOKEN)
        .await
        .unwrap_err();

    assert_matches!(err, SchedulingError::NoteAlreadySet);
}

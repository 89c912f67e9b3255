use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::services::discovery::DoctorDiscoveryService;
use shared_schedule::{clinic_offset, SlotWindow};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn ist_monday(h: u32, m: u32) -> DateTime<Utc> {
    clinic_offset()
        .with_ymd_and_hms(2025, 1, 6, h, m, 0)
        .unwrap()
        .with_timezone(&Utc)
}

fn slot(h: u32, m: u32) -> SlotWindow {
    let start = ist_monday(h, m);
    SlotWindow::new(start, start + Duration::minutes(30)).unwrap()
}

fn service_for(server: &MockServer) -> DoctorDiscoveryService {
    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    DoctorDiscoveryService::new(&config)
}

#[tokio::test]
async fn doctors_with_overlapping_consultations_are_anti_joined_out() {
    let server = MockServer::start().await;
    let busy_doctor = Uuid::new_v4();
    let free_doctor = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("specialty", "eq.Dermatology"))
        .and(query_param("available", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_row(&busy_doctor.to_string(), "Dr. Busy", "Dermatology", 500),
            MockSupabaseResponses::doctor_row(&free_doctor.to_string(), "Dr. Free", "Dermatology", 700),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    // The store's overlap filter reports one busy doctor for the window.
    Mock::given(method("GET"))
        .and(path("/rest/v1/consultations"))
        .and(query_param("status", "eq.pending"))
        .and(query_param("select", "doctor_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "doctor_id": busy_doctor }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server);
    let free = service
        .find_available_doctors("Dermatology", slot(9, 0), "token")
        .await
        .unwrap();

    assert_eq!(free.len(), 1);
    assert_eq!(free[0].id, free_doctor);
    assert_eq!(free[0].name, "Dr. Free");
    server.verify().await;
}

#[tokio::test]
async fn window_outside_all_shifts_returns_empty_without_a_busy_scan() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_row(&Uuid::new_v4().to_string(), "Dr. Asha Rao", "Dermatology", 500)
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/consultations"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let service = service_for(&server);

    // 06:00 is before any shift; the discovery must not bother the store
    // with a busy scan for an empty shortlist.
    let free = service
        .find_available_doctors("Dermatology", slot(6, 0), "token")
        .await
        .unwrap();

    assert!(free.is_empty());
    server.verify().await;
}

#[tokio::test]
async fn all_doctors_free_when_no_consultation_overlaps() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_row(&doctor_id.to_string(), "Dr. Asha Rao", "Dermatology", 500)
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/consultations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let service = service_for(&server);
    let free = service
        .find_available_doctors("Dermatology", slot(14, 0), "token")
        .await
        .unwrap();

    assert_eq!(free.len(), 1);
    assert_eq!(free[0].id, doctor_id);
}

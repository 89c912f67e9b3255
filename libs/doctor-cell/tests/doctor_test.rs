use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::models::DoctorError;
use doctor_cell::services::doctor::DoctorService;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn service_for(server: &MockServer) -> DoctorService {
    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    DoctorService::new(&config)
}

#[tokio::test]
async fn availability_cannot_change_with_pending_consultations() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/consultations"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4() }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let service = service_for(&server);
    let result = service.set_availability(doctor_id, false, "token").await;

    assert_matches!(result, Err(DoctorError::AvailabilityLocked));
    server.verify().await;
}

#[tokio::test]
async fn availability_changes_with_a_clear_calendar() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/consultations"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_row(&doctor_id.to_string(), "Dr. Asha Rao", "Dermatology", 500)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server);
    let result = service.set_availability(doctor_id, true, "token").await;

    assert!(result.is_ok());
    server.verify().await;
}

#[tokio::test]
async fn registration_rejects_a_duplicate_phone() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("phone", "eq.+911234567890"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_row(&Uuid::new_v4().to_string(), "Dr. Existing", "Dermatology", 500)
        ])))
        .mount(&server)
        .await;

    let service = service_for(&server);
    let request = doctor_cell::models::CreateDoctorRequest {
        name: "Dr. Asha Rao".to_string(),
        email: "doctor@example.com".to_string(),
        phone: "+911234567890".to_string(),
        gender: "Female".to_string(),
        dob: chrono::NaiveDate::from_ymd_opt(1980, 5, 14).unwrap(),
        fee: 500,
        specialty: "Dermatology".to_string(),
        profile_url: None,
    };

    let result = service
        .register_doctor(Uuid::new_v4(), request, "token")
        .await;

    assert_matches!(result, Err(DoctorError::AlreadyExists));
}

#[tokio::test]
async fn registration_rejects_a_non_positive_fee() {
    let server = MockServer::start().await;

    let service = service_for(&server);
    let request = doctor_cell::models::CreateDoctorRequest {
        name: "Dr. Asha Rao".to_string(),
        email: "doctor@example.com".to_string(),
        phone: "+911234567890".to_string(),
        gender: "Female".to_string(),
        dob: chrono::NaiveDate::from_ymd_opt(1980, 5, 14).unwrap(),
        fee: 0,
        specialty: "Dermatology".to_string(),
        profile_url: None,
    };

    let result = service
        .register_doctor(Uuid::new_v4(), request, "token")
        .await;

    assert_matches!(result, Err(DoctorError::Validation(_)));
}

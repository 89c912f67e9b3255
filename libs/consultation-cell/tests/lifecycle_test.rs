use assert_matches::assert_matches;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use consultation_cell::models::ConsultationError;
use consultation_cell::services::lifecycle::LifecycleService;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn consultation_row(
    consultation_id: Uuid,
    doctor_id: Uuid,
    patient_id: Uuid,
    start: DateTime<Utc>,
    room_id: Option<&str>,
) -> serde_json::Value {
    let mut row = MockSupabaseResponses::consultation_row(
        &doctor_id.to_string(),
        &patient_id.to_string(),
        &start.to_rfc3339(),
        &(start + Duration::minutes(30)).to_rfc3339(),
        "pending",
    );
    row["id"] = json!(consultation_id);
    if let Some(room_id) = room_id {
        row["room_id"] = json!(room_id);
    }
    row
}

async fn mount_consultation(server: &MockServer, row: &serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/consultations"))
        .and(query_param("id", format!("eq.{}", row["id"].as_str().unwrap())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(server)
        .await;
}

fn service_for(server: &MockServer) -> LifecycleService {
    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    LifecycleService::new(&config)
}

#[tokio::test]
async fn completing_a_consultation_releases_its_room() {
    let server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    let row = consultation_row(
        consultation_id,
        doctor_id,
        Uuid::new_v4(),
        Utc::now() - Duration::minutes(30),
        Some("room-1"),
    );
    mount_consultation(&server, &row).await;

    Mock::given(method("POST"))
        .and(path("/v2/rooms/deactivate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    // One PATCH clears the room reference, a second flips the status.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/consultations"))
        .and(query_param("id", format!("eq.{}", consultation_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .expect(2)
        .mount(&server)
        .await;

    let service = service_for(&server);
    let result = service
        .complete_consultation(doctor_id, consultation_id, "token")
        .await;

    assert!(result.is_ok());
    server.verify().await;
}

#[tokio::test]
async fn completing_without_a_room_skips_the_provider() {
    let server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    let row = consultation_row(
        consultation_id,
        doctor_id,
        Uuid::new_v4(),
        Utc::now() - Duration::minutes(30),
        None,
    );
    mount_consultation(&server, &row).await;

    Mock::given(method("POST"))
        .and(path("/v2/rooms/deactivate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/consultations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server);
    let result = service
        .complete_consultation(doctor_id, consultation_id, "token")
        .await;

    assert!(result.is_ok());
    server.verify().await;
}

#[tokio::test]
async fn only_the_owning_doctor_may_complete() {
    let server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();

    let row = consultation_row(
        consultation_id,
        Uuid::new_v4(),
        Uuid::new_v4(),
        Utc::now(),
        None,
    );
    mount_consultation(&server, &row).await;

    let service = service_for(&server);
    let result = service
        .complete_consultation(Uuid::new_v4(), consultation_id, "token")
        .await;

    assert_matches!(result, Err(ConsultationError::Unauthorized));
}

#[tokio::test]
async fn joining_long_before_the_start_is_rejected() {
    let server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    let row = consultation_row(
        consultation_id,
        Uuid::new_v4(),
        patient_id,
        Utc::now() + Duration::minutes(30),
        None,
    );
    mount_consultation(&server, &row).await;

    let service = service_for(&server);
    let result = service
        .join_consultation(patient_id, consultation_id, "token")
        .await;

    assert_matches!(result, Err(ConsultationError::JoinWindowNotOpen));
}

#[tokio::test]
async fn first_join_provisions_and_attaches_a_room() {
    let server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    let row = consultation_row(
        consultation_id,
        Uuid::new_v4(),
        patient_id,
        Utc::now() + Duration::minutes(5),
        None,
    );
    mount_consultation(&server, &row).await;

    Mock::given(method("POST"))
        .and(path("/v2/rooms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockSupabaseResponses::videosdk_room_response("room-abc"),
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/consultations"))
        .and(query_param("id", format!("eq.{}", consultation_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server);
    let join_info = service
        .join_consultation(patient_id, consultation_id, "token")
        .await
        .unwrap();

    assert_eq!(join_info.room_id, "room-abc");
    assert!(!join_info.token.is_empty());
    server.verify().await;
}

#[tokio::test]
async fn later_joins_reuse_the_existing_room() {
    let server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    let row = consultation_row(
        consultation_id,
        doctor_id,
        Uuid::new_v4(),
        Utc::now() + Duration::minutes(5),
        Some("room-xyz"),
    );
    mount_consultation(&server, &row).await;

    Mock::given(method("POST"))
        .and(path("/v2/rooms"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let service = service_for(&server);
    let join_info = service
        .join_consultation(doctor_id, consultation_id, "token")
        .await
        .unwrap();

    assert_eq!(join_info.room_id, "room-xyz");
    server.verify().await;
}

#[tokio::test]
async fn outsiders_cannot_read_a_consultation() {
    let server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();

    let row = consultation_row(
        consultation_id,
        Uuid::new_v4(),
        Uuid::new_v4(),
        Utc::now(),
        None,
    );
    mount_consultation(&server, &row).await;

    let service = service_for(&server);
    let result = service
        .get_for_participant(Uuid::new_v4(), consultation_id, "token")
        .await;

    assert_matches!(result, Err(ConsultationError::Unauthorized));
}

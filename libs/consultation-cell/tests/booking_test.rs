use assert_matches::assert_matches;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use consultation_cell::models::ConsultationError;
use consultation_cell::services::booking::BookingService;
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

struct BookingFixture {
    server: MockServer,
    doctor_id: Uuid,
    patient_id: Uuid,
}

impl BookingFixture {
    async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            doctor_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
        }
    }

    fn service(&self) -> BookingService {
        let config = TestConfig::with_mock_server(&self.server.uri()).to_app_config();
        BookingService::new(&config)
    }

    async fn mount_doctor_with_fee(&self, fee: i64) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/doctors"))
            .and(query_param("id", format!("eq.{}", self.doctor_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::doctor_row(
                    &self.doctor_id.to_string(),
                    "Dr. Asha Rao",
                    "Dermatology",
                    fee,
                )
            ])))
            .mount(&self.server)
            .await;
    }

    async fn mount_pending(&self, owner_param: &str, owner_id: Uuid, rows: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/consultations"))
            .and(query_param(owner_param, format!("eq.{}", owner_id)))
            .and(query_param("status", "eq.pending"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows))
            .mount(&self.server)
            .await;
    }

    async fn mount_free_calendars(&self) {
        self.mount_pending("doctor_id", self.doctor_id, json!([])).await;
        self.mount_pending("patient_id", self.patient_id, json!([])).await;
    }
}

#[tokio::test]
async fn booking_charges_then_persists_and_returns_the_id() {
    let fixture = BookingFixture::start().await;
    fixture.mount_doctor_with_fee(500).await;
    fixture.mount_free_calendars().await;

    Mock::given(method("POST"))
        .and(path("/v2/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockSupabaseResponses::square_payment_success("sq-pay-1", 500),
        ))
        .expect(1)
        .mount(&fixture.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::payment_row(500)
        ])))
        .expect(1)
        .mount(&fixture.server)
        .await;

    // The persisted row must carry exactly the requested window and fee.
    let window = slot(9, 0);
    Mock::given(method("POST"))
        .and(path("/rest/v1/consultations"))
        .and(wiremock::matchers::body_partial_json(json!({
            "doctor_id": fixture.doctor_id,
            "patient_id": fixture.patient_id,
            "start_time": window.start().to_rfc3339(),
            "end_time": window.end().to_rfc3339(),
            "fee": 500,
            "status": "pending"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::consultation_row(
                &fixture.doctor_id.to_string(),
                &fixture.patient_id.to_string(),
                &window.start().to_rfc3339(),
                &window.end().to_rfc3339(),
                "pending",
            )
        ])))
        .expect(1)
        .mount(&fixture.server)
        .await;

    let service = fixture.service();
    let result = service
        .book_slot(fixture.patient_id, fixture.doctor_id, window, "cnon-token", "token")
        .await;

    assert!(result.is_ok());
    fixture.server.verify().await;
}

#[tokio::test]
async fn conflicting_slot_is_rejected_before_any_charge() {
    let fixture = BookingFixture::start().await;
    fixture.mount_doctor_with_fee(500).await;

    fixture
        .mount_pending(
            "doctor_id",
            fixture.doctor_id,
            json!([MockSupabaseResponses::consultation_row(
                &fixture.doctor_id.to_string(),
                &Uuid::new_v4().to_string(),
                &ist_monday(9, 0).to_rfc3339(),
                &ist_monday(9, 30).to_rfc3339(),
                "pending",
            )]),
        )
        .await;
    fixture
        .mount_pending("patient_id", fixture.patient_id, json!([]))
        .await;

    // Charging for an unavailable slot is the defect this ordering avoids.
    Mock::given(method("POST"))
        .and(path("/v2/payments"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&fixture.server)
        .await;

    let service = fixture.service();
    let result = service
        .book_slot(fixture.patient_id, fixture.doctor_id, slot(9, 15), "cnon-token", "token")
        .await;

    assert_matches!(result, Err(ConsultationError::SlotUnavailable));
    fixture.server.verify().await;
}

#[tokio::test]
async fn declined_charge_persists_nothing() {
    let fixture = BookingFixture::start().await;
    fixture.mount_doctor_with_fee(500).await;
    fixture.mount_free_calendars().await;

    Mock::given(method("POST"))
        .and(path("/v2/payments"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(MockSupabaseResponses::square_payment_declined()),
        )
        .expect(1)
        .mount(&fixture.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&fixture.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/consultations"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&fixture.server)
        .await;

    let service = fixture.service();
    let result = service
        .book_slot(fixture.patient_id, fixture.doctor_id, slot(9, 0), "cnon-token", "token")
        .await;

    assert_matches!(result, Err(ConsultationError::PaymentFailed));
    fixture.server.verify().await;
}

#[tokio::test]
async fn unset_fee_fails_before_any_charge() {
    let fixture = BookingFixture::start().await;
    fixture.mount_doctor_with_fee(0).await;
    fixture.mount_free_calendars().await;

    Mock::given(method("POST"))
        .and(path("/v2/payments"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&fixture.server)
        .await;

    let service = fixture.service();
    let result = service
        .book_slot(fixture.patient_id, fixture.doctor_id, slot(9, 0), "cnon-token", "token")
        .await;

    assert_matches!(result, Err(ConsultationError::MissingFee));
    fixture.server.verify().await;
}

#[tokio::test]
async fn missing_doctor_is_reported_as_not_found() {
    let fixture = BookingFixture::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&fixture.server)
        .await;

    let service = fixture.service();
    let result = service
        .book_slot(fixture.patient_id, fixture.doctor_id, slot(9, 0), "cnon-token", "token")
        .await;

    assert_matches!(result, Err(ConsultationError::DoctorNotFound));
}

#[tokio::test]
async fn persistence_failure_after_capture_triggers_a_refund() {
    let fixture = BookingFixture::start().await;
    fixture.mount_doctor_with_fee(500).await;
    fixture.mount_free_calendars().await;

    Mock::given(method("POST"))
        .and(path("/v2/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockSupabaseResponses::square_payment_success("sq-pay-2", 500),
        ))
        .expect(1)
        .mount(&fixture.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::payment_row(500)
        ])))
        .expect(1)
        .mount(&fixture.server)
        .await;

    // The consultation insert is the step that fails.
    Mock::given(method("POST"))
        .and(path("/rest/v1/consultations"))
        .respond_with(ResponseTemplate::new(500).set_body_string("insert failed"))
        .expect(1)
        .mount(&fixture.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/refunds"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockSupabaseResponses::square_refund_response("sq-refund-1"),
        ))
        .expect(1)
        .mount(&fixture.server)
        .await;

    let service = fixture.service();
    let result = service
        .book_slot(fixture.patient_id, fixture.doctor_id, slot(9, 0), "cnon-token", "token")
        .await;

    assert_matches!(result, Err(ConsultationError::Database(_)));
    fixture.server.verify().await;
}

use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub square_base_url: String,
    pub square_access_token: String,
    pub videosdk_base_url: String,
    pub videosdk_api_key: String,
    pub videosdk_secret: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            square_base_url: "http://localhost:54322".to_string(),
            square_access_token: "test-square-token".to_string(),
            videosdk_base_url: "http://localhost:54323".to_string(),
            videosdk_api_key: "test-videosdk-key".to_string(),
            videosdk_secret: "test-videosdk-secret".to_string(),
        }
    }
}

impl TestConfig {
    /// Point every external collaborator at a wiremock server.
    pub fn with_mock_server(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            square_base_url: url.to_string(),
            videosdk_base_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            square_base_url: self.square_base_url.clone(),
            square_access_token: self.square_access_token.clone(),
            videosdk_base_url: self.videosdk_base_url.clone(),
            videosdk_api_key: self.videosdk_api_key.clone(),
            videosdk_secret: self.videosdk_secret.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    /// A doctor row with the default weekly shift plan (Mon-Fri, morning and
    /// evening shifts in clinic-zone minutes since midnight).
    pub fn doctor_row(doctor_id: &str, name: &str, specialty: &str, fee: i64) -> serde_json::Value {
        let mut shifts = Vec::new();
        for day in ["Mon", "Tue", "Wed", "Thu", "Fri"] {
            shifts.push(json!({
                "day_of_week": day,
                "start_time": 9 * 60,
                "end_time": 13 * 60,
                "slot_duration": 30
            }));
            shifts.push(json!({
                "day_of_week": day,
                "start_time": 14 * 60,
                "end_time": 18 * 60,
                "slot_duration": 30
            }));
        }

        json!({
            "id": doctor_id,
            "name": name,
            "email": "doctor@example.com",
            "phone": "+911234567890",
            "gender": "Female",
            "dob": "1980-05-14",
            "fee": fee,
            "specialty": specialty,
            "profile_url": "https://cdn.example.com/profiles/doctor.png",
            "available": true,
            "shifts": shifts,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient_row(patient_id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": patient_id,
            "name": name,
            "email": "patient@example.com",
            "phone": "+919876543210",
            "gender": "Male",
            "dob": "1992-11-02",
            "profile_url": "https://cdn.example.com/profiles/patient.png",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn consultation_row(
        doctor_id: &str,
        patient_id: &str,
        start_time: &str,
        end_time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "patient_id": patient_id,
            "payment_id": Uuid::new_v4(),
            "start_time": start_time,
            "end_time": end_time,
            "fee": 500,
            "room_id": null,
            "prescription_url": null,
            "status": status,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn payment_row(amount: i64) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "provider_payment_id": "sq-payment-id",
            "amount": amount,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn square_payment_success(payment_id: &str, amount: i64) -> serde_json::Value {
        json!({
            "payment": {
                "id": payment_id,
                "status": "COMPLETED",
                "amount_money": {
                    "amount": amount,
                    "currency": "USD"
                }
            }
        })
    }

    pub fn square_payment_declined() -> serde_json::Value {
        json!({
            "payment": {
                "id": "declined-payment",
                "status": "FAILED",
                "amount_money": {
                    "amount": 0,
                    "currency": "USD"
                }
            }
        })
    }

    pub fn square_refund_response(refund_id: &str) -> serde_json::Value {
        json!({
            "refund": {
                "id": refund_id,
                "status": "PENDING"
            }
        })
    }

    pub fn videosdk_room_response(room_id: &str) -> serde_json::Value {
        json!({
            "roomId": room_id
        })
    }
}

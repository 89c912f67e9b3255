use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::ConsultationError;

const ROOM_TIMEOUT_SECS: u64 = 10;
const SESSION_TOKEN_TTL_MINUTES: i64 = 120;

#[derive(Debug, Deserialize)]
struct CreateRoomResponse {
    #[serde(rename = "roomId")]
    room_id: String,
}

/// VideoSDK rooms client. Rooms are provisioned lazily on first join, after
/// the consultation has committed - never inside the booking transaction.
/// Based on: https://docs.videosdk.live/api-reference/realtime-communication
pub struct VideoRoomClient {
    client: Client,
    base_url: String,
    api_key: String,
    secret: String,
}

impl VideoRoomClient {
    pub fn new(config: &AppConfig) -> Result<Self, ConsultationError> {
        if !config.is_video_configured() {
            return Err(ConsultationError::Provider(
                "Video provider is not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(ROOM_TIMEOUT_SECS))
            .build()
            .map_err(|e| ConsultationError::Provider(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.videosdk_base_url.clone(),
            api_key: config.videosdk_api_key.clone(),
            secret: config.videosdk_secret.clone(),
        })
    }

    /// Short-lived HS256 token granting join access, signed with the account
    /// secret the same way the provider's dashboard issues them.
    pub fn session_token(&self) -> Result<String, ConsultationError> {
        let now = Utc::now().timestamp();
        let exp = now + SESSION_TOKEN_TTL_MINUTES * 60;

        let header = json!({ "alg": "HS256", "typ": "JWT" });
        let payload = json!({
            "apikey": self.api_key,
            "permissions": ["allow_join"],
            "version": 2,
            "iat": now,
            "exp": exp
        });

        let header_encoded = URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = URL_SAFE_NO_PAD.encode(payload.to_string());
        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes())
            .map_err(|_| ConsultationError::Provider("Invalid video secret".to_string()))?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, signature))
    }

    /// POST /v2/rooms
    pub async fn create_room(&self) -> Result<String, ConsultationError> {
        debug!("Creating video room");

        let token = self.session_token()?;
        let url = format!("{}/v2/rooms", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| ConsultationError::Provider(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| ConsultationError::Provider(e.to_string()))?;

        if !status.is_success() {
            error!("Room creation failed: {} - {}", status, response_text);
            return Err(ConsultationError::Provider(format!(
                "HTTP {}: {}",
                status, response_text
            )));
        }

        let room: CreateRoomResponse = serde_json::from_str(&response_text)
            .map_err(|e| ConsultationError::Provider(format!("Failed to parse room response: {}", e)))?;

        info!("Video room created: {}", room.room_id);
        Ok(room.room_id)
    }

    /// POST /v2/rooms/deactivate
    pub async fn delete_room(&self, room_id: &str) -> Result<(), ConsultationError> {
        debug!("Deactivating video room {}", room_id);

        let token = self.session_token()?;
        let url = format!("{}/v2/rooms/deactivate", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", token)
            .header("Content-Type", "application/json")
            .json(&json!({ "roomId": room_id }))
            .send()
            .await
            .map_err(|e| ConsultationError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let response_text = response.text().await.unwrap_or_default();
            error!("Room deactivation failed: {} - {}", status, response_text);
            return Err(ConsultationError::Provider(format!(
                "HTTP {}: {}",
                status, response_text
            )));
        }

        info!("Video room {} deactivated", room_id);
        Ok(())
    }
}

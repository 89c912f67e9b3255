use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub square_base_url: String,
    pub square_access_token: String,
    pub videosdk_base_url: String,
    pub videosdk_api_key: String,
    pub videosdk_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            square_base_url: env::var("SQUARE_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SQUARE_BASE_URL not set, using sandbox default");
                    "https://connect.squareupsandbox.com".to_string()
                }),
            square_access_token: env::var("SQUARE_ACCESS_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("SQUARE_ACCESS_TOKEN not set, using empty value");
                    String::new()
                }),
            videosdk_base_url: env::var("VIDEOSDK_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("VIDEOSDK_BASE_URL not set, using default");
                    "https://api.videosdk.live".to_string()
                }),
            videosdk_api_key: env::var("VIDEOSDK_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("VIDEOSDK_API_KEY not set, using empty value");
                    String::new()
                }),
            videosdk_secret: env::var("VIDEOSDK_SECRET")
                .unwrap_or_else(|_| {
                    warn!("VIDEOSDK_SECRET not set, using empty value");
                    String::new()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_payments_configured(&self) -> bool {
        !self.square_base_url.is_empty() && !self.square_access_token.is_empty()
    }

    pub fn is_video_configured(&self) -> bool {
        !self.videosdk_base_url.is_empty()
            && !self.videosdk_api_key.is_empty()
            && !self.videosdk_secret.is_empty()
    }
}

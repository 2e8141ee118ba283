use std::env;
use tracing::warn;

pub const DEFAULT_AVAILABILITY_HORIZON_DAYS: i64 = 21;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_url: String,
    pub store_api_key: String,
    pub jwt_secret: String,
    pub availability_horizon_days: i64,
    pub release_slot_on_cancel: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            store_url: env::var("STORE_URL")
                .unwrap_or_else(|_| {
                    warn!("STORE_URL not set, using empty value");
                    String::new()
                }),
            store_api_key: env::var("STORE_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("STORE_API_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            availability_horizon_days: env::var("AVAILABILITY_HORIZON_DAYS")
                .ok()
                .and_then(|raw| match raw.parse::<i64>() {
                    Ok(days) if days > 0 => Some(days),
                    _ => {
                        warn!("AVAILABILITY_HORIZON_DAYS is not a positive integer, using default");
                        None
                    }
                })
                .unwrap_or(DEFAULT_AVAILABILITY_HORIZON_DAYS),
            release_slot_on_cancel: env::var("RELEASE_SLOT_ON_CANCEL")
                .map(|raw| raw.eq_ignore_ascii_case("true") || raw == "1")
                .unwrap_or(false),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.store_url.is_empty()
            && !self.store_api_key.is_empty()
            && !self.jwt_secret.is_empty()
    }
}

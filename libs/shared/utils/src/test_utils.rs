use std::sync::Arc;
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::{AppConfig, DEFAULT_AVAILABILITY_HORIZON_DAYS};
use shared_models::auth::{Identity, Role};

pub struct TestConfig {
    pub jwt_secret: String,
    pub store_url: String,
    pub store_api_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            store_url: "http://localhost:54321".to_string(),
            store_api_key: "test-api-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_store_url(store_url: &str) -> Self {
        Self {
            store_url: store_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            store_url: self.store_url.clone(),
            store_api_key: self.store_api_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            availability_horizon_days: DEFAULT_AVAILABILITY_HORIZON_DAYS,
            release_slot_on_cancel: false,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestIdentity {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub clinic_id: Uuid,
}

impl TestIdentity {
    pub fn new(email: &str, role: Role, clinic_id: Uuid) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            role,
            clinic_id,
        }
    }

    pub fn patient(clinic_id: Uuid) -> Self {
        Self::new("patient@example.com", Role::Patient, clinic_id)
    }

    pub fn doctor(clinic_id: Uuid) -> Self {
        Self::new("doctor@example.com", Role::Doctor, clinic_id)
    }

    pub fn secretary(clinic_id: Uuid) -> Self {
        Self::new("secretary@example.com", Role::Secretary, clinic_id)
    }

    pub fn admin(clinic_id: Uuid) -> Self {
        Self::new("admin@example.com", Role::Admin, clinic_id)
    }

    pub fn to_identity(&self) -> Identity {
        Identity {
            user_id: self.user_id,
            role: self.role,
            clinic_id: self.clinic_id,
            email: Some(self.email.clone()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(identity: &TestIdentity, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": identity.user_id.to_string(),
            "email": identity.email,
            "role": identity.role.to_string(),
            "clinic_id": identity.clinic_id.to_string(),
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

    pub fn create_expired_token(identity: &TestIdentity, secret: &str) -> String {
        Self::create_test_token(identity, secret, Some(-1))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct MockStoreResponses;

impl MockStoreResponses {
    pub fn doctor_row(doctor_id: Uuid, full_name: &str) -> serde_json::Value {
        json!({
            "id": doctor_id,
            "full_name": full_name
        })
    }

    pub fn slot_row(
        slot_id: Uuid,
        clinic_id: Uuid,
        doctor_id: Uuid,
        slot_date: &str,
        start_minutes: i32,
        is_booked: bool,
    ) -> serde_json::Value {
        json!({
            "id": slot_id,
            "clinic_id": clinic_id,
            "doctor_id": doctor_id,
            "slot_date": slot_date,
            "start_minutes": start_minutes,
            "end_minutes": start_minutes + 15,
            "is_booked": is_booked
        })
    }

    pub fn appointment_row(
        appointment_id: Uuid,
        clinic_id: Uuid,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: &str,
        start_minutes: i32,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "clinic_id": clinic_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "date": date,
            "start_minutes": start_minutes,
            "end_minutes": start_minutes + 15,
            "status": status,
            "secretary_note": null,
            "created_at": "2026-01-05T08:00:00Z"
        })
    }

    pub fn appointment_detail_row(
        appointment_id: Uuid,
        clinic_id: Uuid,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: &str,
        start_minutes: i32,
        status: &str,
        patient_name: &str,
        doctor_name: &str,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "clinic_id": clinic_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "date": date,
            "start_minutes": start_minutes,
            "end_minutes": start_minutes + 15,
            "status": status,
            "secretary_note": null,
            "created_at": "2026-01-05T08:00:00Z",
            "patients": {
                "full_name": patient_name,
                "birth_date": "1990-01-01"
            },
            "doctors": {
                "full_name": doctor_name
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.store_url, "http://localhost:54321");
        assert_eq!(app_config.store_api_key, "test-api-key");
        assert!(!app_config.jwt_secret.is_empty());
        assert_eq!(app_config.availability_horizon_days, 21);
    }

    #[test]
    fn test_identity_creation() {
        let clinic_id = Uuid::new_v4();
        let identity = TestIdentity::doctor(clinic_id);
        assert_eq!(identity.role, Role::Doctor);
        assert_eq!(identity.clinic_id, clinic_id);

        let model = identity.to_identity();
        assert_eq!(model.user_id, identity.user_id);
        assert_eq!(model.clinic_id, clinic_id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let identity = TestIdentity::patient(Uuid::new_v4());
        let secret = "test-secret";
        let token = JwtTestUtils::create_test_token(&identity, secret, Some(1));

        assert!(token.contains('.'));
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_token_round_trip() {
        let config = TestConfig::default();
        let identity = TestIdentity::secretary(Uuid::new_v4());
        let token = JwtTestUtils::create_test_token(&identity, &config.jwt_secret, Some(1));

        let validated = crate::jwt::validate_token(&token, &config.jwt_secret).unwrap();
        assert_eq!(validated.user_id, identity.user_id);
        assert_eq!(validated.role, Role::Secretary);
        assert_eq!(validated.clinic_id, identity.clinic_id);
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = TestConfig::default();
        let identity = TestIdentity::patient(Uuid::new_v4());
        let token = JwtTestUtils::create_expired_token(&identity, &config.jwt_secret);

        assert!(crate::jwt::validate_token(&token, &config.jwt_secret).is_err());
    }
}

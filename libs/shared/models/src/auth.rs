use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub iat: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub clinic_id: Option<String>,
}

/// Caller role as carried in the token. Authorization decisions in the
/// cells are keyed on this plus clinic/ownership scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Secretary,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Role> {
        match raw {
            "patient" => Some(Role::Patient),
            "doctor" => Some(Role::Doctor),
            "secretary" => Some(Role::Secretary),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Secretary | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Doctor => write!(f, "doctor"),
            Role::Secretary => write!(f, "secretary"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Trusted identity context produced by the auth middleware. Every query a
/// cell issues is scoped by `clinic_id`; the core never authenticates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
    pub clinic_id: Uuid,
    pub email: Option<String>,
}

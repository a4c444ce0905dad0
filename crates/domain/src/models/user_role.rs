//! Caller roles as seen by the export pipeline.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Role of the authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    Admin,
    Applicant,
}

impl UserRole {
    /// Elevated roles bypass owner scoping and may export every data type.
    pub fn is_elevated(&self) -> bool {
        matches!(self, UserRole::SuperAdmin)
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "super_admin" => Ok(UserRole::SuperAdmin),
            "admin" => Ok(UserRole::Admin),
            "applicant" => Ok(UserRole::Applicant),
            _ => Err(format!("Unknown user role: {}", s)),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::SuperAdmin => write!(f, "super_admin"),
            UserRole::Admin => write!(f, "admin"),
            UserRole::Applicant => write!(f, "applicant"),
        }
    }
}

//! Caller identity extractor.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! user as `X-User-Id` and `X-User-Role` headers.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::models::UserRole;
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Caller {
    /// Owner restriction for job store queries: `None` lets elevated roles
    /// see every job.
    pub fn owner_scope(&self) -> Option<Uuid> {
        if self.role.is_elevated() {
            None
        } else {
            Some(self.user_id)
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, USER_ID_HEADER)?
            .parse::<Uuid>()
            .map_err(|_| ApiError::Unauthorized("Invalid user id".to_string()))?;

        let role = header_value(parts, USER_ROLE_HEADER)?
            .parse::<UserRole>()
            .map_err(|_| ApiError::Unauthorized("Invalid user role".to_string()))?;

        Ok(Caller { user_id, role })
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthorized(format!("Missing {} header", name)))
}

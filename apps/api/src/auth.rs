//! Actor identity extractor.
//!
//! Authentication itself is an external collaborator: the gateway in front
//! of this service verifies credentials and injects trusted `X-User-Id` and
//! `X-User-Role` headers. This module only reads them and gates which
//! transitions a caller may request.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Candidate,
    Recruiter,
    Admin,
}

impl Role {
    fn parse(s: &str) -> Option<Role> {
        match s.to_ascii_lowercase().as_str() {
            "candidate" => Some(Role::Candidate),
            "recruiter" => Some(Role::Recruiter),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// The authenticated caller, as asserted by the external auth layer.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.role == role || self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or(AppError::Unauthorized)?;

        let role = parts
            .headers
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
            .and_then(Role::parse)
            .ok_or(AppError::Unauthorized)?;

        Ok(Actor { id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!(Role::parse("Recruiter"), Some(Role::Recruiter));
        assert_eq!(Role::parse("CANDIDATE"), Some(Role::Candidate));
        assert_eq!(Role::parse("intern"), None);
    }

    #[test]
    fn test_admin_passes_any_role_check() {
        let actor = Actor {
            id: Uuid::new_v4(),
            role: Role::Admin,
        };
        assert!(actor.require_role(Role::Recruiter).is_ok());
        assert!(actor.require_role(Role::Candidate).is_ok());
    }

    #[test]
    fn test_candidate_cannot_act_as_recruiter() {
        let actor = Actor {
            id: Uuid::new_v4(),
            role: Role::Candidate,
        };
        assert!(actor.require_role(Role::Recruiter).is_err());
    }
}

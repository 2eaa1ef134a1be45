use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::error::AppError;

/// Caller identity, supplied by the gateway in front of this service.
///
/// `x-actor-id` carries the user id; `x-actor-role` is optional and
/// defaults to `member`.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    Member,
    Admin,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-actor-id")
            .and_then(|header| header.to_str().ok())
            .ok_or_else(|| {
                AppError::PermissionDenied("Missing x-actor-id header".to_string()).into_response()
            })?;

        let id = Uuid::parse_str(id).map_err(|_| {
            AppError::BadRequest("x-actor-id must be a valid UUID".to_string()).into_response()
        })?;

        let role = match parts
            .headers
            .get("x-actor-role")
            .and_then(|header| header.to_str().ok())
        {
            Some("admin") => ActorRole::Admin,
            Some("member") | None => ActorRole::Member,
            Some(other) => {
                return Err(AppError::BadRequest(format!("Unknown actor role: {}", other))
                    .into_response())
            }
        };

        Ok(Actor { id, role })
    }
}

//! Caller identity. Authentication happens upstream; this service only trusts the forwarded
//! user id header and stamps it on the records it writes.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use tracing::{trace, warn};

use crate::schemas::{ApiError, error_response};

pub const USER_ID_HEADER: &str = "x-user-id";

/// Stable id of the user making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub String);

impl Actor {
    pub fn id(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Actor(value.to_string()));

        match actor {
            Some(actor) => {
                trace!("Request made by {}", actor.id());
                Ok(actor)
            }
            None => {
                warn!("Rejecting request without {} header", USER_ID_HEADER);
                Err(error_response(
                    StatusCode::UNAUTHORIZED,
                    "MISSING_ACTOR",
                    format!("The {USER_ID_HEADER} header is required"),
                ))
            }
        }
    }
}

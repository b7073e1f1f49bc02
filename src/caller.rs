// src/caller.rs
use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::models::Uid;

/// Header the authentication layer in front of this service fills in.
pub const UID_HEADER: &str = "x-uid";

/// The logged-in user making the request. Guests (uid 0) are turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub uid: Uid,
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(UID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<Uid>().ok())
            .filter(|&uid| uid > 0)
            .map(|uid| Caller { uid })
            .ok_or(AppError::Unauthenticated)
    }
}

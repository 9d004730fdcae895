//! Bearer credential extraction.
//!
//! The comment service does not validate tokens itself. It forwards the
//! caller's token to the task service, which decides ownership.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::CommentError;

/// The raw token from an `Authorization: Bearer <token>` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = CommentError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok());

        match header.and_then(parse_bearer) {
            Some(token) => Ok(BearerToken(token.to_string())),
            None => {
                if header.is_some() {
                    tracing::warn!("Invalid Authorization header format");
                } else {
                    tracing::warn!("Missing Authorization header");
                }
                Err(CommentError::MissingCredential)
            }
        }
    }
}

fn parse_bearer(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

//! Body and path extractors that reject with the `{"detail"}` error shape.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::CommentError;

/// `Json<T>` whose rejections become a 400 `ConstraintViolation`.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = CommentError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidJson(value)),
            Err(rejection) => Err(reject_body(rejection)),
        }
    }
}

/// `Path<T>` whose rejections become a 400 `ConstraintViolation`.
#[derive(Debug, Clone)]
pub struct ValidPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = CommentError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ValidPath(value)),
            Err(rejection) => Err(reject_path(rejection)),
        }
    }
}

fn reject_body(rejection: JsonRejection) -> CommentError {
    tracing::warn!(status = %rejection.status(), "Rejected request body: {}", rejection.body_text());
    CommentError::ConstraintViolation(format!(
        "Некорректное тело запроса: {}",
        rejection.body_text()
    ))
}

fn reject_path(rejection: PathRejection) -> CommentError {
    tracing::warn!(status = %rejection.status(), "Rejected request path: {}", rejection.body_text());
    CommentError::ConstraintViolation(format!(
        "Некорректный адрес запроса: {}",
        rejection.body_text()
    ))
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::guard::GuardError;
use crate::models::DetailResponse;

/// Every failure a comment operation can surface to its caller.
///
/// Cache failures never appear here: they are logged and absorbed by the
/// service because the store decides the outcome.
#[derive(Debug, Error)]
pub enum CommentError {
    #[error("Комментарий не найден")]
    NotFound,

    #[error("Комментарии не найдены")]
    NothingToDelete,

    #[error("Не передан токен авторизации")]
    MissingCredential,

    #[error(transparent)]
    Ownership(#[from] GuardError),

    #[error("{0}")]
    ConstraintViolation(String),

    #[error("comment store timed out")]
    StoreTimeout,

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl CommentError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound | Self::NothingToDelete => StatusCode::NOT_FOUND,
            Self::MissingCredential => StatusCode::UNAUTHORIZED,
            Self::Ownership(GuardError::Unauthorized) => StatusCode::UNAUTHORIZED,
            Self::Ownership(GuardError::NotFound) => StatusCode::NOT_FOUND,
            Self::Ownership(GuardError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            Self::Ownership(GuardError::ServiceUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ConstraintViolation(_) => StatusCode::BAD_REQUEST,
            Self::StoreTimeout => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client. Internal details are only logged.
    fn public_detail(&self) -> String {
        match self {
            Self::Ownership(GuardError::Unauthorized) => {
                "Неверный токен для доступа к сервису задач".to_string()
            }
            Self::Ownership(GuardError::NotFound) => "У Вас нет задачи с таким id".to_string(),
            Self::Ownership(GuardError::RateLimited) => {
                "Слишком много запросов. Попробуйте позже.".to_string()
            }
            Self::Ownership(GuardError::ServiceUnavailable(_)) => {
                "Ошибка связи с сервисом задач.".to_string()
            }
            Self::StoreTimeout => "Хранилище комментариев не отвечает.".to_string(),
            Self::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for CommentError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            Self::Store(e) => tracing::error!("Internal error: {:#}", e),
            Self::StoreTimeout | Self::Ownership(GuardError::ServiceUnavailable(_)) => {
                tracing::error!("Upstream failure: {}", self)
            }
            _ => tracing::warn!("Request rejected ({}): {}", status, self),
        }

        (status, Json(DetailResponse::new(self.public_detail()))).into_response()
    }
}

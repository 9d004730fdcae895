use axum::{extract::State, response::IntoResponse, Json};

use super::auth::BearerToken;
use super::extract::{ValidJson, ValidPath};
use crate::error::CommentError;
use crate::models::*;
use crate::service::CommentService;

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Comments
// ============================================================

pub async fn create_comment(
    State(service): State<CommentService>,
    ValidPath(task_id): ValidPath<String>,
    BearerToken(token): BearerToken,
    ValidJson(input): ValidJson<CreateCommentInput>,
) -> Result<Json<Comment>, CommentError> {
    service
        .create_comment(&task_id, &token, input)
        .await
        .map(Json)
}

pub async fn list_comments(
    State(service): State<CommentService>,
    ValidPath(task_id): ValidPath<String>,
) -> Result<Json<CommentsResponse>, CommentError> {
    let comments = service.list_comments(&task_id).await?;
    Ok(Json(CommentsResponse { comments }))
}

pub async fn update_comment(
    State(service): State<CommentService>,
    ValidPath((task_id, comment_id)): ValidPath<(String, i64)>,
    BearerToken(token): BearerToken,
    ValidJson(input): ValidJson<UpdateCommentInput>,
) -> Result<Json<Comment>, CommentError> {
    service
        .update_comment(&task_id, comment_id, &token, &input.content)
        .await
        .map(Json)
}

pub async fn delete_comment(
    State(service): State<CommentService>,
    ValidPath((task_id, comment_id)): ValidPath<(String, i64)>,
    BearerToken(token): BearerToken,
) -> Result<Json<DetailResponse>, CommentError> {
    if service.delete_comment(&task_id, comment_id, &token).await? {
        Ok(Json(DetailResponse::new("Комментарий удалён")))
    } else {
        Err(CommentError::NotFound)
    }
}

pub async fn delete_comments_by_task(
    State(service): State<CommentService>,
    ValidPath(task_id): ValidPath<String>,
    BearerToken(token): BearerToken,
) -> Result<Json<DetailResponse>, CommentError> {
    match service.delete_comments_by_task(&task_id, &token).await? {
        0 => Err(CommentError::NothingToDelete),
        count => Ok(Json(DetailResponse::new(format!(
            "Удалено {} комментариев",
            count
        )))),
    }
}

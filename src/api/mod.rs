mod auth;
mod extract;
mod handlers;

pub use auth::BearerToken;
pub use extract::{ValidJson, ValidPath};

use axum::{
    routing::{get, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::service::CommentService;

pub fn create_router(service: CommentService) -> Router {
    Router::new()
        .route(
            "/comments/{task_id}",
            get(handlers::list_comments)
                .post(handlers::create_comment)
                .delete(handlers::delete_comments_by_task),
        )
        .route(
            "/comments/{task_id}/{comment_id}",
            put(handlers::update_comment).delete(handlers::delete_comment),
        )
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

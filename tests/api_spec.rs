use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;
use task_comments::api::create_router;
use task_comments::cache::MemoryCommentCache;
use task_comments::db::Database;
use task_comments::guard::{GuardError, OwnershipGuard};
use task_comments::models::*;
use task_comments::service::CommentService;

const OWNER: &str = "Bearer owner-token";

/// Task service stand-in: "owner-token" owns every task except "MISSING";
/// "busy-token" is always rate limited; anything else is rejected.
struct FakeTaskService;

#[async_trait]
impl OwnershipGuard for FakeTaskService {
    async fn check_ownership(&self, task_id: &str, credential: &str) -> Result<(), GuardError> {
        match credential {
            "busy-token" => Err(GuardError::RateLimited),
            "owner-token" if task_id == "MISSING" => Err(GuardError::NotFound),
            "owner-token" => Ok(()),
            _ => Err(GuardError::Unauthorized),
        }
    }
}

fn setup() -> TestServer {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    let service = CommentService::new(
        Arc::new(db),
        Arc::new(MemoryCommentCache::with_default_settings()),
        Arc::new(FakeTaskService),
    );
    let app = create_router(service);
    TestServer::new(app).expect("Failed to create test server")
}

fn new_comment(task_id: &str, content: &str) -> CreateCommentInput {
    CreateCommentInput {
        task_id: task_id.to_string(),
        user_id: 42,
        content: content.to_string(),
    }
}

async fn create_test_comment(server: &TestServer, task_id: &str, content: &str) -> Comment {
    server
        .post(&format!("/comments/{}", task_id))
        .add_header("Authorization", OWNER)
        .json(&new_comment(task_id, content))
        .await
        .json::<Comment>()
}

// ============================================================
// Health endpoint
// ============================================================

mod health {
    use super::*;

    #[tokio::test]
    async fn returns_ok() {
        let server = setup();

        let response = server.get("/health").await;

        response.assert_status_ok();
        response.assert_json(&json!({ "status": "ok" }));
    }
}

// ============================================================
// Create
// ============================================================

mod create {
    use super::*;

    #[tokio::test]
    async fn returns_the_stored_comment() {
        let server = setup();

        let response = server
            .post("/comments/T1")
            .add_header("Authorization", OWNER)
            .json(&new_comment("T1", "hello"))
            .await;

        response.assert_status_ok();
        let comment: Comment = response.json();
        assert_eq!(comment.id, 1);
        assert_eq!(comment.task_id, "T1");
        assert_eq!(comment.user_id, 42);
        assert_eq!(comment.content, "hello");
    }

    #[tokio::test]
    async fn requires_bearer_token() {
        let server = setup();

        let response = server
            .post("/comments/T1")
            .json(&new_comment("T1", "hello"))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        response.assert_json(&json!({ "detail": "Не передан токен авторизации" }));
    }

    #[tokio::test]
    async fn rejects_malformed_auth_header() {
        let server = setup();

        let response = server
            .post("/comments/T1")
            .add_header("Authorization", "Basic dXNlcjpwYXNz")
            .json(&new_comment("T1", "hello"))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_token_the_task_service_refuses() {
        let server = setup();

        let response = server
            .post("/comments/T1")
            .add_header("Authorization", "Bearer stranger")
            .json(&new_comment("T1", "hello"))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        response.assert_json(&json!({ "detail": "Неверный токен для доступа к сервису задач" }));

        let listed: CommentsResponse = server.get("/comments/T1").await.json();
        assert!(listed.comments.is_empty());
    }

    #[tokio::test]
    async fn returns_not_found_for_foreign_task() {
        let server = setup();

        let response = server
            .post("/comments/MISSING")
            .add_header("Authorization", OWNER)
            .json(&new_comment("MISSING", "hello"))
            .await;

        response.assert_status_not_found();
        response.assert_json(&json!({ "detail": "У Вас нет задачи с таким id" }));
    }

    #[tokio::test]
    async fn passes_rate_limit_through() {
        let server = setup();

        let response = server
            .post("/comments/T1")
            .add_header("Authorization", "Bearer busy-token")
            .json(&new_comment("T1", "hello"))
            .await;

        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn rejects_blank_content() {
        let server = setup();

        let response = server
            .post("/comments/T1")
            .add_header("Authorization", OWNER)
            .json(&new_comment("T1", "   "))
            .await;

        response.assert_status_bad_request();
        response.assert_json(&json!({ "detail": "Комментарий не может быть пустым" }));
    }

    #[tokio::test]
    async fn rejects_body_for_another_task() {
        let server = setup();

        let response = server
            .post("/comments/T1")
            .add_header("Authorization", OWNER)
            .json(&new_comment("T2", "hello"))
            .await;

        response.assert_status_bad_request();
    }
}

// ============================================================
// List
// ============================================================

mod list {
    use super::*;

    #[tokio::test]
    async fn returns_empty_list_for_unknown_task() {
        let server = setup();

        let response = server.get("/comments/T1").await;

        response.assert_status_ok();
        response.assert_json(&json!({ "comments": [] }));
    }

    #[tokio::test]
    async fn does_not_require_a_token() {
        let server = setup();
        create_test_comment(&server, "T1", "visible").await;

        let response = server.get("/comments/T1").await;

        response.assert_status_ok();
        let body: CommentsResponse = response.json();
        assert_eq!(body.comments.len(), 1);
    }

    #[tokio::test]
    async fn returns_task_comments_ordered_by_id() {
        let server = setup();
        let a = create_test_comment(&server, "T1", "first").await;
        create_test_comment(&server, "T2", "elsewhere").await;
        let b = create_test_comment(&server, "T1", "second").await;

        let body: CommentsResponse = server.get("/comments/T1").await.json();

        let ids: Vec<i64> = body.comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }
}

// ============================================================
// Update
// ============================================================

mod update {
    use super::*;

    #[tokio::test]
    async fn replaces_content() {
        let server = setup();
        let created = create_test_comment(&server, "T1", "draft").await;

        let response = server
            .put(&format!("/comments/T1/{}", created.id))
            .add_header("Authorization", OWNER)
            .json(&UpdateCommentInput {
                content: "final".to_string(),
            })
            .await;

        response.assert_status_ok();
        let updated: Comment = response.json();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.content, "final");

        let body: CommentsResponse = server.get("/comments/T1").await.json();
        assert_eq!(body.comments[0].content, "final");
    }

    #[tokio::test]
    async fn returns_not_found_for_missing_comment() {
        let server = setup();

        let response = server
            .put("/comments/T1/999")
            .add_header("Authorization", OWNER)
            .json(&UpdateCommentInput {
                content: "text".to_string(),
            })
            .await;

        response.assert_status_not_found();
        response.assert_json(&json!({ "detail": "Комментарий не найден" }));
    }

    #[tokio::test]
    async fn requires_bearer_token() {
        let server = setup();
        let created = create_test_comment(&server, "T1", "draft").await;

        let response = server
            .put(&format!("/comments/T1/{}", created.id))
            .json(&UpdateCommentInput {
                content: "final".to_string(),
            })
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}

// ============================================================
// Delete one
// ============================================================

mod delete_one {
    use super::*;

    #[tokio::test]
    async fn create_delete_then_list_is_empty() {
        let server = setup();
        let created = create_test_comment(&server, "T1", "hello").await;
        assert_eq!(created.id, 1);

        let response = server
            .delete("/comments/T1/1")
            .add_header("Authorization", OWNER)
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({ "detail": "Комментарий удалён" }));

        server
            .get("/comments/T1")
            .await
            .assert_json(&json!({ "comments": [] }));
    }

    #[tokio::test]
    async fn second_delete_is_not_found() {
        let server = setup();
        let created = create_test_comment(&server, "T1", "hello").await;
        let path = format!("/comments/T1/{}", created.id);

        server
            .delete(&path)
            .add_header("Authorization", OWNER)
            .await
            .assert_status_ok();

        let response = server.delete(&path).add_header("Authorization", OWNER).await;
        response.assert_status_not_found();
        response.assert_json(&json!({ "detail": "Комментарий не найден" }));
    }

    #[tokio::test]
    async fn keeps_sibling_comments() {
        let server = setup();
        let a = create_test_comment(&server, "T1", "a").await;
        let b = create_test_comment(&server, "T1", "b").await;

        server
            .delete(&format!("/comments/T1/{}", a.id))
            .add_header("Authorization", OWNER)
            .await
            .assert_status_ok();

        let body: CommentsResponse = server.get("/comments/T1").await.json();
        assert_eq!(body.comments.len(), 1);
        assert_eq!(body.comments[0].id, b.id);
    }

    #[tokio::test]
    async fn does_not_delete_comment_of_another_task() {
        let server = setup();
        let other = create_test_comment(&server, "T2", "theirs").await;

        server
            .delete(&format!("/comments/T1/{}", other.id))
            .add_header("Authorization", OWNER)
            .await
            .assert_status_not_found();

        let body: CommentsResponse = server.get("/comments/T2").await.json();
        assert_eq!(body.comments.len(), 1);
    }
}

// ============================================================
// Delete by task
// ============================================================

mod delete_all {
    use super::*;

    #[tokio::test]
    async fn reports_count_then_not_found() {
        let server = setup();
        create_test_comment(&server, "T1", "a").await;
        create_test_comment(&server, "T1", "b").await;

        let response = server
            .delete("/comments/T1")
            .add_header("Authorization", OWNER)
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "detail": "Удалено 2 комментариев" }));

        let response = server
            .delete("/comments/T1")
            .add_header("Authorization", OWNER)
            .await;
        response.assert_status_not_found();
        response.assert_json(&json!({ "detail": "Комментарии не найдены" }));
    }

    #[tokio::test]
    async fn leaves_other_tasks_alone() {
        let server = setup();
        create_test_comment(&server, "T1", "a").await;
        create_test_comment(&server, "T2", "b").await;

        server
            .delete("/comments/T1")
            .add_header("Authorization", OWNER)
            .await
            .assert_status_ok();

        let body: CommentsResponse = server.get("/comments/T2").await.json();
        assert_eq!(body.comments.len(), 1);
        let body: CommentsResponse = server.get("/comments/T1").await.json();
        assert!(body.comments.is_empty());
    }

    #[tokio::test]
    async fn requires_bearer_token() {
        let server = setup();

        server
            .delete("/comments/T1")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}

// ============================================================
// Malformed requests
// ============================================================

mod malformed {
    use super::*;
    use axum::body::Bytes;

    fn assert_bad_request_with_detail(response: &axum_test::TestResponse) {
        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert!(body["detail"].is_string(), "unexpected body: {}", body);
    }

    #[tokio::test]
    async fn unparseable_body_is_bad_request() {
        let server = setup();

        let response = server
            .post("/comments/T1")
            .add_header("Authorization", OWNER)
            .bytes(Bytes::from_static(b"{\"task_id\": \"T1\", "))
            .content_type("application/json")
            .await;

        assert_bad_request_with_detail(&response);
    }

    #[tokio::test]
    async fn body_missing_a_field_is_bad_request() {
        let server = setup();

        let response = server
            .post("/comments/T1")
            .add_header("Authorization", OWNER)
            .json(&json!({ "task_id": "T1", "content": "hello" }))
            .await;

        assert_bad_request_with_detail(&response);
        let body: CommentsResponse = server.get("/comments/T1").await.json();
        assert!(body.comments.is_empty());
    }

    #[tokio::test]
    async fn body_without_json_content_type_is_bad_request() {
        let server = setup();

        let response = server
            .put("/comments/T1/1")
            .add_header("Authorization", OWNER)
            .text("final")
            .await;

        assert_bad_request_with_detail(&response);
    }

    #[tokio::test]
    async fn non_numeric_comment_id_on_update_is_bad_request() {
        let server = setup();

        let response = server
            .put("/comments/T1/abc")
            .add_header("Authorization", OWNER)
            .json(&UpdateCommentInput {
                content: "final".to_string(),
            })
            .await;

        assert_bad_request_with_detail(&response);
    }

    #[tokio::test]
    async fn non_numeric_comment_id_on_delete_is_bad_request() {
        let server = setup();

        let response = server
            .delete("/comments/T1/abc")
            .add_header("Authorization", OWNER)
            .await;

        assert_bad_request_with_detail(&response);
    }
}

//! HTTP contract tests for the task and auth stores.
//!
//! Uses wiremock to stand in for the task API so request shapes and error
//! handling can be checked without a real server.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use serde_json::json;
use taskdesk::api::http::HttpApi;
use taskdesk::api::{ApiError, TokenSlot};
use taskdesk::store::{AuthStore, Operation, RequestPhase, TaskStore};
use taskdesk_proto::task::{NewTask, TaskId, TaskPriority, TaskStatus, TaskUpdate};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_api(server: &MockServer, token: TokenSlot) -> HttpApi {
    HttpApi::new(
        &format!("{}/api/", server.uri()),
        Duration::from_secs(5),
        token,
    )
    .unwrap()
}

fn task_json(id: &str, title: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "description": "",
        "status": status,
        "priority": "MEDIUM",
        "assigneeId": "u1",
        "createdAt": "2024-03-01T09:30:00",
        "updatedAt": "2024-03-01T09:30:00",
    })
}

fn user_json() -> serde_json::Value {
    json!({"id": "7", "username": "alice", "email": "alice@corp.test", "role": "USER"})
}

// ===========================================================================
// Task store
// ===========================================================================

#[tokio::test]
async fn list_replaces_mapping_in_server_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            task_json("b", "Second", "DONE"),
            task_json("a", "First", "TODO"),
        ])))
        .mount(&server)
        .await;

    let store = TaskStore::new(make_api(&server, TokenSlot::new()));
    store.list().await.unwrap();

    let titles: Vec<_> = store.tasks().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, ["Second", "First"]);
    let state = store.snapshot();
    assert!(!state.loading);
    assert!(state.error.is_none());
    assert_eq!(
        state.last_request,
        Some((Operation::List, RequestPhase::Succeeded))
    );
}

#[tokio::test]
async fn error_body_message_becomes_store_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/42"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "Not Found",
            "message": "Task not found with id: 42",
            "timestamp": "2024-03-01T09:30:00",
        })))
        .mount(&server)
        .await;

    let store = TaskStore::new(make_api(&server, TokenSlot::new()));
    let err = store.get(&TaskId::new("42")).await.unwrap_err();

    assert_eq!(
        err,
        ApiError::Server {
            status: 404,
            message: "Task not found with id: 42".to_string(),
        }
    );
    let error = store.error().unwrap();
    assert!(error.contains("Task not found with id: 42"));
    assert!(!store.is_loading());
}

#[tokio::test]
async fn plain_text_error_body_is_kept_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let store = TaskStore::new(make_api(&server, TokenSlot::new()));
    let err = store.list().await.unwrap_err();

    assert!(matches!(
        err,
        ApiError::Server { status: 500, ref message } if message == "Internal Server Error"
    ));
}

#[tokio::test]
async fn network_failure_keeps_mapping() {
    // Unpooled server so that dropping it actually shuts it down.
    let server = MockServer::builder().start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([task_json("1", "A", "TODO")])),
        )
        .mount(&server)
        .await;

    let store = TaskStore::new(make_api(&server, TokenSlot::new()));
    store.list().await.unwrap();
    drop(server);

    let err = store.list().await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(store.tasks().len(), 1);
    assert!(!store.is_loading());
    assert!(store.error().unwrap().starts_with("network error"));
}

#[tokio::test]
async fn undecodable_success_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/stats/count"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let store = TaskStore::new(make_api(&server, TokenSlot::new()));
    let err = store.stats().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn create_posts_body_and_appends_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .and(body_json(json!({
            "title": "Write report",
            "description": "",
            "status": "TODO",
            "priority": "HIGH",
            "assigneeId": "u1",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "9",
            "title": "Write report",
            "description": null,
            "status": "TODO",
            "priority": "HIGH",
            "assigneeId": "u1",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = TaskStore::new(make_api(&server, TokenSlot::new()));
    let mut new_task = NewTask::new("Write report");
    new_task.priority = TaskPriority::High;
    new_task.assignee_id = "u1".to_string();

    let created = store.create(&new_task).await.unwrap();
    assert_eq!(created.id, TaskId::new("9"));
    assert_eq!(created.description, "");
    assert_eq!(store.snapshot().get(&created.id), Some(&created));
}

#[tokio::test]
async fn update_sends_only_present_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/tasks/1"))
        .and(body_json(json!({"status": "IN_PROGRESS"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(task_json("1", "A", "IN_PROGRESS")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = TaskStore::new(make_api(&server, TokenSlot::new()));
    let updated = store
        .update(&TaskId::new("1"), &TaskUpdate::status(TaskStatus::InProgress))
        .await
        .unwrap();

    assert_eq!(updated.status, TaskStatus::InProgress);
    assert_eq!(store.tasks(), vec![updated]);
}

#[tokio::test]
async fn delete_accepts_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            task_json("1", "A", "TODO"),
            task_json("2", "B", "DONE"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/tasks/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = TaskStore::new(make_api(&server, TokenSlot::new()));
    store.list().await.unwrap();
    store.delete(&TaskId::new("1")).await.unwrap();

    let ids: Vec<_> = store.tasks().into_iter().map(|t| t.id).collect();
    assert_eq!(ids, [TaskId::new("2")]);
}

#[tokio::test]
async fn queries_hit_their_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/search"))
        .and(query_param("keyword", "quarterly report"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([task_json("1", "A", "TODO")])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/status/IN_PROGRESS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/assignee/u1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([task_json("1", "A", "TODO")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = TaskStore::new(make_api(&server, TokenSlot::new()));
    assert_eq!(store.search("quarterly report").await.unwrap().len(), 1);
    assert!(store.by_status(TaskStatus::InProgress).await.unwrap().is_empty());
    assert_eq!(store.by_assignee("u1").await.unwrap().len(), 1);

    // Query results are returned, not merged into the mapping.
    assert!(store.tasks().is_empty());
}

#[tokio::test]
async fn stats_decodes_counts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/stats/count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "todoCount": 3,
            "inProgressCount": 2,
            "doneCount": 5,
            "totalCount": 10,
        })))
        .mount(&server)
        .await;

    let store = TaskStore::new(make_api(&server, TokenSlot::new()));
    let stats = store.stats().await.unwrap();
    assert_eq!(stats.in_progress_count, 2);
    assert_eq!(stats.total_count, 10);
}

// ===========================================================================
// Auth store
// ===========================================================================

#[tokio::test]
async fn login_stores_token_and_later_requests_carry_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"username": "alice", "password": "secret"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"token": "abc", "user": user_json()})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .and(header("Authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let token = TokenSlot::new();
    let api = make_api(&server, token.clone());
    let auth = AuthStore::new(api.clone(), token.clone());
    let tasks = TaskStore::new(api);

    let user = auth.login("alice", "secret").await.unwrap();
    assert_eq!(user.username, "alice");
    assert!(auth.is_authenticated());
    assert_eq!(token.get().as_deref(), Some("abc"));

    tasks.list().await.unwrap();
}

#[tokio::test]
async fn bad_credentials_leave_store_signed_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "Unauthorized",
            "message": "Bad credentials",
        })))
        .mount(&server)
        .await;

    let token = TokenSlot::new();
    let auth = AuthStore::new(make_api(&server, token.clone()), token.clone());
    let err = auth.login("alice", "wrong").await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(!auth.is_authenticated());
    assert!(token.get().is_none());
    assert_eq!(
        auth.snapshot().error.as_deref(),
        Some("server returned 401: Bad credentials")
    );
}

#[tokio::test]
async fn rejected_token_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_string(""))
        .mount(&server)
        .await;

    let token = TokenSlot::new();
    let auth = AuthStore::new(make_api(&server, token.clone()), token.clone());
    auth.restore(Some("stale".to_string()));
    assert!(auth.is_authenticated());

    let err = auth.fetch_current_user().await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Server { status: 401, ref message } if message == "Unauthorized"
    ));
    assert!(!auth.is_authenticated());
    assert!(token.get().is_none());
}

#[tokio::test]
async fn current_user_is_stored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .mount(&server)
        .await;

    let token = TokenSlot::new();
    let auth = AuthStore::new(make_api(&server, token.clone()), token);
    auth.restore(Some("abc".to_string()));

    let user = auth.fetch_current_user().await.unwrap();
    assert_eq!(auth.snapshot().user, Some(user.clone()));
    assert_eq!(auth.session().unwrap().user, Some(user));
}

#[tokio::test]
async fn refresh_swaps_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(header("Authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "new"})))
        .expect(1)
        .mount(&server)
        .await;

    let token = TokenSlot::new();
    let auth = AuthStore::new(make_api(&server, token.clone()), token.clone());
    auth.restore(Some("old".to_string()));

    auth.refresh_token().await.unwrap();
    assert_eq!(token.get().as_deref(), Some("new"));
}

#[tokio::test]
async fn register_returns_server_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User registered successfully"))
        .mount(&server)
        .await;

    let token = TokenSlot::new();
    let auth = AuthStore::new(make_api(&server, token.clone()), token);
    let message = auth
        .register(&json!({"username": "bob", "email": "bob@corp.test", "password": "pw"}))
        .await
        .unwrap();

    assert_eq!(message, "User registered successfully");
    assert!(!auth.is_authenticated());
}

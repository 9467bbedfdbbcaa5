//! End-to-end tests: the client application against a live in-process server.
//!
//! Each test starts its own server on an ephemeral port and drives
//! [`App`] over HTTP exactly as the binary does.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use taskdesk::api::http::HttpApi;
use taskdesk::api::{ApiError, TokenSlot};
use taskdesk::app::{App, AppError};
use taskdesk::cli::{Command, ListFilter, TaskCommand, TaskFields};
use taskdesk::guard::Route;
use taskdesk_proto::task::{NewTask, TaskPriority, TaskStatus};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn start_app() -> (App<HttpApi>, tokio::task::JoinHandle<()>) {
    let (addr, handle) = taskdesk_server::routes::start_server("127.0.0.1:0")
        .await
        .unwrap();
    let token = TokenSlot::new();
    let api = HttpApi::new(
        &format!("http://{addr}/api/"),
        Duration::from_secs(5),
        token.clone(),
    )
    .unwrap();
    (App::new(api, token), handle)
}

async fn sign_in(app: &App<HttpApi>, username: &str) {
    app.run(Command::Login {
        username: Some(username.to_string()),
        password: "secret".to_string(),
    })
    .await
    .unwrap();
}

fn create(title: &str, fields: TaskFields) -> Command {
    Command::Tasks(TaskCommand::Create {
        title: title.to_string(),
        fields,
    })
}

/// The number at the end of the dashboard line for `card`.
fn card_value(lines: &[String], card: &str) -> u64 {
    lines
        .iter()
        .find(|line| line.trim_start().starts_with(card))
        .and_then(|line| line.split_whitespace().last())
        .and_then(|value| value.parse().ok())
        .unwrap_or_else(|| panic!("no {card} card in {lines:?}"))
}

// ===========================================================================
// Guard and session
// ===========================================================================

#[tokio::test]
async fn protected_commands_need_login() {
    let (app, _server) = start_app().await;

    assert_eq!(app.navigate(Route::Root), Route::Login);
    assert_eq!(app.navigate(Route::Tasks), Route::Login);
    assert!(matches!(
        app.run(Command::Dashboard).await,
        Err(AppError::LoginRequired)
    ));
    assert!(matches!(
        app.run(create("A", TaskFields::default())).await,
        Err(AppError::LoginRequired)
    ));

    sign_in(&app, "alice").await;
    assert_eq!(app.navigate(Route::Root), Route::Dashboard);
    assert_eq!(app.navigate(Route::Tasks), Route::Tasks);
}

#[tokio::test]
async fn login_me_refresh_logout() {
    let (app, _server) = start_app().await;

    let lines = app
        .run(Command::Login {
            username: Some("alice".to_string()),
            password: "secret".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(lines[0], "Signed in as alice");
    let first_token = app.auth().token().unwrap();
    assert_eq!(lines[1], format!("export TASKDESK_TOKEN={first_token}"));

    let me = app.run(Command::Me).await.unwrap();
    assert!(me[0].starts_with("alice <alice@example.com> (USER) id="));

    app.run(Command::Refresh).await.unwrap();
    let second_token = app.auth().token().unwrap();
    assert_ne!(first_token, second_token);

    // The refreshed token still identifies the same user.
    let user = app.auth().fetch_current_user().await.unwrap();
    assert_eq!(user.username, "alice");

    app.logout();
    assert!(!app.auth().is_authenticated());
    assert_eq!(app.navigate(Route::Dashboard), Route::Login);
}

#[tokio::test]
async fn register_then_login_keeps_email() {
    let (app, _server) = start_app().await;

    let lines = app
        .run(Command::Register {
            username: "bob".to_string(),
            email: "bob@corp.test".to_string(),
            password: "pw".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(lines, ["User registered successfully"]);
    assert!(!app.auth().is_authenticated());

    sign_in(&app, "bob").await;
    let me = app.run(Command::Me).await.unwrap();
    assert!(me[0].starts_with("bob <bob@corp.test>"));
}

#[tokio::test]
async fn unknown_token_is_cleared() {
    let (app, _server) = start_app().await;
    app.auth().restore(Some("not-a-real-token".to_string()));
    assert_eq!(app.navigate(Route::Dashboard), Route::Dashboard);

    let err = app.auth().fetch_current_user().await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Server {
            status: 401,
            message: "invalid or expired token".to_string(),
        }
    );
    assert!(!app.auth().is_authenticated());
    assert_eq!(app.navigate(Route::Dashboard), Route::Login);
}

// ===========================================================================
// Task lifecycle
// ===========================================================================

#[tokio::test]
async fn task_lifecycle_through_commands() {
    let (app, _server) = start_app().await;
    sign_in(&app, "admin").await;

    let created = app
        .run(create(
            "Write quarterly report",
            TaskFields {
                priority: Some(TaskPriority::High),
                assignee: Some("u1".to_string()),
                ..TaskFields::default()
            },
        ))
        .await
        .unwrap();
    assert!(created[0].starts_with("Created task "));
    app.run(create("Review budget", TaskFields::default()))
        .await
        .unwrap();

    let report = app.tasks().tasks()[0].clone();
    assert_eq!(report.title, "Write quarterly report");
    assert_eq!(report.priority, TaskPriority::High);
    assert!(report.created_at.is_some());

    let edited = app
        .run(Command::Tasks(TaskCommand::Edit {
            id: report.id.to_string(),
            title: None,
            fields: TaskFields {
                status: Some(TaskStatus::Done),
                ..TaskFields::default()
            },
        }))
        .await
        .unwrap();
    assert_eq!(edited, [format!("Updated task {}", report.id)]);

    let dashboard = app.run(Command::Dashboard).await.unwrap();
    assert_eq!(dashboard[0], "Dashboard");
    assert_eq!(card_value(&dashboard, "Total Tasks"), 2);
    assert_eq!(card_value(&dashboard, "Completed"), 1);
    assert_eq!(card_value(&dashboard, "Pending"), 1);

    let stats = app.run(Command::Stats).await.unwrap();
    assert!(stats.contains(&"Total Tasks: 2".to_string()));
    assert!(stats.contains(&"Completed: 1".to_string()));

    let found = app
        .run(Command::Tasks(TaskCommand::List(ListFilter {
            search: Some("quarterly".to_string()),
            ..ListFilter::default()
        })))
        .await
        .unwrap();
    assert!(found.iter().any(|line| line.contains("Write quarterly report")));
    assert!(!found.iter().any(|line| line.contains("Review budget")));

    let deleted = app
        .run(Command::Tasks(TaskCommand::Delete {
            id: report.id.to_string(),
        }))
        .await
        .unwrap();
    assert_eq!(deleted, [format!("Deleted task {}", report.id)]);
    assert_eq!(app.tasks().tasks().len(), 1);

    let missing = app
        .run(Command::Tasks(TaskCommand::Show {
            id: report.id.to_string(),
        }))
        .await
        .unwrap_err();
    assert!(matches!(
        missing,
        AppError::Api(ApiError::Server { status: 404, .. })
    ));
}

#[tokio::test]
async fn delete_by_regular_user_is_forbidden() {
    let (app, _server) = start_app().await;
    sign_in(&app, "alice").await;
    app.run(create("Keep me", TaskFields::default()))
        .await
        .unwrap();
    let id = app.tasks().tasks()[0].id.clone();

    let err = app
        .run(Command::Tasks(TaskCommand::Delete { id: id.to_string() }))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Api(ApiError::Server { status: 403, ref message }) if message == "Access is denied"
    ));
    assert_eq!(app.tasks().tasks().len(), 1);
    assert!(app.auth().is_authenticated());
    assert!(app.tasks().error().unwrap().contains("Access is denied"));
}

#[tokio::test]
async fn status_filter_and_empty_results() {
    let (app, _server) = start_app().await;
    sign_in(&app, "alice").await;
    app.run(create("A", TaskFields::default())).await.unwrap();

    let none = app
        .run(Command::Tasks(TaskCommand::List(ListFilter {
            status: Some(TaskStatus::InProgress),
            ..ListFilter::default()
        })))
        .await
        .unwrap();
    assert_eq!(none, ["No matching tasks."]);

    let todo = app.tasks().by_status(TaskStatus::Todo).await.unwrap();
    assert_eq!(todo.len(), 1);
}

#[tokio::test]
async fn validation_failure_is_reported() {
    let (app, _server) = start_app().await;
    sign_in(&app, "alice").await;

    let err = app.tasks().create(&NewTask::new("  ")).await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Server {
            status: 400,
            message: "Invalid input data: {title=Title is required}".to_string(),
        }
    );
    assert!(app.tasks().tasks().is_empty());
    assert!(app.tasks().error().unwrap().contains("Title is required"));
}

#[tokio::test]
async fn logout_clears_task_state() {
    let (app, _server) = start_app().await;
    sign_in(&app, "alice").await;
    app.run(create("A", TaskFields::default())).await.unwrap();
    assert_eq!(app.tasks().tasks().len(), 1);

    app.logout();
    assert!(app.tasks().tasks().is_empty());
    assert!(matches!(
        app.run(Command::Tasks(TaskCommand::List(ListFilter::default())))
            .await,
        Err(AppError::LoginRequired)
    ));
}

//! HTTP routes, handlers, and server startup.
//!
//! Everything is mounted under `/api`. Errors are answered with an
//! [`ErrorBody`] JSON payload; writes and the session endpoints require a
//! bearer token issued by `/api/auth/login`, and deleting a task requires
//! the `ADMIN` role.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use taskdesk_proto::auth::{LoginRequest, LoginResponse, RefreshResponse, User};
use taskdesk_proto::error::ErrorBody;
use taskdesk_proto::task::{NewTask, Task, TaskId, TaskStats, TaskStatus, TaskUpdate};
use tracing::{debug, info, warn};

use crate::config::Limits;
use crate::store::{PageRequest, ROLE_ADMIN, SessionStore, SortKey, TaskRepository};

/// `GET /tasks` with this page size and page 0 returns every task unsorted.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Shared server state.
#[derive(Default)]
pub struct ServerState {
    pub tasks: TaskRepository,
    pub sessions: SessionStore,
    limits: Limits,
}

impl ServerState {
    /// Empty state with default field limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty state with custom field limits.
    #[must_use]
    pub fn with_limits(limits: Limits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Replaces the usernames granted the `ADMIN` role.
    #[must_use]
    pub fn with_admins(mut self, admins: impl IntoIterator<Item = String>) -> Self {
        self.sessions = SessionStore::with_admins(admins);
        self
    }
}

/// A failed request, rendered as an [`ErrorBody`].
#[derive(Debug, thiserror::Error)]
pub enum ApiFailure {
    /// Field validation failed.
    #[error("Invalid input data: {0}")]
    Validation(String),

    /// The body or a path parameter could not be read.
    #[error("{0}")]
    BadRequest(String),

    /// No task with the given id.
    #[error("Task not found with id: {0}")]
    NotFound(TaskId),

    /// Missing, malformed, or unknown bearer token.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// Signed in, but the role does not allow the operation.
    #[error("Access is denied")]
    Forbidden,
}

impl ApiFailure {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    const fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation Failed",
            Self::BadRequest(_) => "Bad Request",
            Self::NotFound(_) => "Not Found",
            Self::Unauthorized(_) => "Unauthorized",
            Self::Forbidden => "Forbidden",
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), error = %self, "request failed");
        let body = ErrorBody {
            error: self.category().to_string(),
            message: self.to_string(),
            timestamp: Some(Utc::now().naive_utc()),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiFailure {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiFailure {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

type ApiResult<T> = Result<T, ApiFailure>;

/// Builds the router with every endpoint mounted under `/api`.
pub fn router(state: Arc<ServerState>) -> Router {
    let api = Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/search", get(search_tasks))
        .route("/tasks/stats/count", get(task_stats))
        .route("/tasks/status/{status}", get(tasks_by_status))
        .route("/tasks/assignee/{assignee_id}", get(tasks_by_assignee))
        .route(
            "/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/me", get(current_user));

    Router::new().nest("/api", api).with_state(state)
}

/// Starts the server on the given address with empty state.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(ServerState::new())).await
}

/// Starts the server with a pre-configured [`ServerState`] and returns the
/// bound address and the serving task's handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<ServerState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "server error");
        }
    });

    Ok((bound_addr, handle))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn bearer_token(headers: &HeaderMap) -> ApiResult<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(ApiFailure::Unauthorized("missing bearer token"))?;
    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or(ApiFailure::Unauthorized("malformed authorization header"))
}

async fn authenticate(state: &ServerState, headers: &HeaderMap) -> ApiResult<User> {
    let token = bearer_token(headers)?;
    state
        .sessions
        .user_for(token)
        .await
        .ok_or(ApiFailure::Unauthorized("invalid or expired token"))
}

fn check_fields(limits: Limits, title: Option<&str>, description: Option<&str>) -> ApiResult<()> {
    let mut errors = BTreeMap::new();
    if let Some(title) = title {
        if title.trim().is_empty() {
            errors.insert("title", "Title is required".to_string());
        } else if title.chars().count() > limits.max_title_len {
            errors.insert(
                "title",
                format!("Title must not exceed {} characters", limits.max_title_len),
            );
        }
    }
    if description.is_some_and(|d| d.chars().count() > limits.max_description_len) {
        errors.insert(
            "description",
            format!(
                "Description must not exceed {} characters",
                limits.max_description_len
            ),
        );
    }
    if errors.is_empty() {
        return Ok(());
    }
    let detail = errors
        .iter()
        .map(|(field, message)| format!("{field}={message}"))
        .collect::<Vec<_>>()
        .join(", ");
    Err(ApiFailure::Validation(format!("{{{detail}}}")))
}

// ---------------------------------------------------------------------------
// Task handlers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageParams {
    page: Option<usize>,
    size: Option<usize>,
    sort_by: Option<String>,
    sort_dir: Option<String>,
}

impl PageParams {
    /// `None` for the default listing, otherwise the page to cut.
    fn into_request(self) -> ApiResult<Option<PageRequest>> {
        let page = self.page.unwrap_or(0);
        let size = self.size.unwrap_or(DEFAULT_PAGE_SIZE);
        if size == 0 {
            return Err(ApiFailure::BadRequest(
                "Page size must not be less than one".to_string(),
            ));
        }
        let sort_by = match self.sort_by.as_deref() {
            None => SortKey::CreatedAt,
            Some(name) => SortKey::parse(name).ok_or_else(|| {
                ApiFailure::BadRequest(format!("No property '{name}' found for type 'Task'"))
            })?,
        };
        let descending = match self.sort_dir.as_deref() {
            None => true,
            Some(dir) if dir.eq_ignore_ascii_case("desc") => true,
            Some(dir) if dir.eq_ignore_ascii_case("asc") => false,
            Some(dir) => {
                return Err(ApiFailure::BadRequest(format!(
                    "Invalid value '{dir}' for orders given; has to be either 'desc' or 'asc'"
                )));
            }
        };
        if page == 0 && size == DEFAULT_PAGE_SIZE {
            return Ok(None);
        }
        Ok(Some(PageRequest {
            page,
            size,
            sort_by,
            descending,
        }))
    }
}

async fn list_tasks(
    State(state): State<Arc<ServerState>>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Task>>> {
    let Query(params) = params?;
    let tasks = match params.into_request()? {
        None => state.tasks.all().await,
        Some(request) => {
            debug!(?request, "list tasks page");
            state.tasks.page(request).await
        }
    };
    debug!(count = tasks.len(), "list tasks");
    Ok(Json(tasks))
}

async fn get_task(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let id = TaskId::new(id);
    state
        .tasks
        .get(&id)
        .await
        .map(Json)
        .ok_or(ApiFailure::NotFound(id))
}

async fn create_task(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Result<Json<NewTask>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    authenticate(&state, &headers).await?;
    let Json(new_task) = body?;
    check_fields(
        state.limits,
        Some(&new_task.title),
        Some(&new_task.description),
    )?;
    let task = state.tasks.insert(new_task).await;
    info!(id = %task.id, title = %task.title, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<TaskUpdate>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    authenticate(&state, &headers).await?;
    let Json(update) = body?;
    check_fields(
        state.limits,
        update.title.as_deref(),
        update.description.as_deref(),
    )?;
    let id = TaskId::new(id);
    let task = state
        .tasks
        .update(&id, &update)
        .await
        .ok_or(ApiFailure::NotFound(id))?;
    info!(id = %task.id, "task updated");
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let user = authenticate(&state, &headers).await?;
    if user.role != ROLE_ADMIN {
        return Err(ApiFailure::Forbidden);
    }
    let id = TaskId::new(id);
    if !state.tasks.delete(&id).await {
        return Err(ApiFailure::NotFound(id));
    }
    info!(%id, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn tasks_by_status(
    State(state): State<Arc<ServerState>>,
    Path(status): Path<String>,
) -> ApiResult<Json<Vec<Task>>> {
    let status = status
        .parse::<TaskStatus>()
        .map_err(|e| ApiFailure::BadRequest(e.to_string()))?;
    Ok(Json(state.tasks.by_status(status).await))
}

async fn tasks_by_assignee(
    State(state): State<Arc<ServerState>>,
    Path(assignee_id): Path<String>,
) -> Json<Vec<Task>> {
    Json(state.tasks.by_assignee(&assignee_id).await)
}

#[derive(Deserialize)]
struct SearchParams {
    keyword: String,
}

async fn search_tasks(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<Task>> {
    Json(state.tasks.search(&params.keyword).await)
}

async fn task_stats(State(state): State<Arc<ServerState>>) -> Json<TaskStats> {
    Json(state.tasks.stats().await)
}

// ---------------------------------------------------------------------------
// Auth handlers
// ---------------------------------------------------------------------------

async fn login(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(request) = body?;
    if request.username.trim().is_empty() {
        return Err(ApiFailure::Unauthorized("Bad credentials"));
    }
    let (token, user) = state.sessions.login(&request.username).await;
    info!(username = %user.username, "user signed in");
    Ok(Json(LoginResponse { token, user }))
}

async fn register(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> ApiResult<String> {
    let Json(payload) = body?;
    let username = payload
        .get("username")
        .and_then(serde_json::Value::as_str)
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiFailure::Validation("{username=Username is required}".to_string()))?;
    let email = payload.get("email").and_then(serde_json::Value::as_str);
    let user = state.sessions.register(username, email).await;
    info!(username = %user.username, "user registered");
    Ok("User registered successfully".to_string())
}

async fn refresh_token(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> ApiResult<Json<RefreshResponse>> {
    let token = bearer_token(&headers)?;
    let token = state
        .sessions
        .refresh(token)
        .await
        .ok_or(ApiFailure::Unauthorized("invalid or expired token"))?;
    Ok(Json(RefreshResponse { token }))
}

async fn current_user(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> ApiResult<Json<User>> {
    authenticate(&state, &headers).await.map(Json)
}

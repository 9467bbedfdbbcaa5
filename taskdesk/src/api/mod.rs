//! Remote Task API abstraction for `TaskDesk`.
//!
//! Defines the [`TaskApi`] and [`AuthApi`] traits the stores are written
//! against. Concrete implementations:
//! - [`http::HttpApi`]: JSON over HTTP via `reqwest`
//! - [`loopback::LoopbackApi`]: in-process API for testing

pub mod http;
pub mod loopback;

use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use taskdesk_proto::auth::{LoginRequest, LoginResponse, RefreshResponse, User};
use taskdesk_proto::task::{NewTask, Task, TaskId, TaskStats, TaskStatus, TaskUpdate};

/// Errors that can occur while talking to the Remote Task API.
///
/// The stores collapse every variant into a single error string; the
/// variants exist so callers and tests can tell the kinds apart.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (refused, timed out, DNS).
    #[error("network error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message from the error body, or the raw body.
        message: String,
    },

    /// A success response carried a body that could not be decoded.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// The configured base URL cannot address the endpoint.
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),

    /// The operation needs a session token and none is held.
    #[error("not signed in")]
    Unauthenticated,
}

impl ApiError {
    /// Returns `true` for errors that mean the session is no longer valid.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated | Self::Server { status: 401 | 403, .. }
        )
    }
}

/// Shared holder for the session's bearer token.
///
/// The auth store writes it; API clients read it when attaching the
/// `Authorization` header. Empty strings are never stored.
#[derive(Debug, Clone, Default)]
pub struct TokenSlot(Arc<RwLock<Option<String>>>);

impl TokenSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current token, if any.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.0.read().clone()
    }

    /// Replaces the token. `Some("")` is stored as `None`.
    pub fn set(&self, token: Option<String>) {
        *self.0.write() = token.filter(|t| !t.is_empty());
    }

    /// Removes the token.
    pub fn clear(&self) {
        *self.0.write() = None;
    }

    /// Returns `true` if a non-empty token is held.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.0.read().is_some()
    }
}

/// Task resource operations of the Remote Task API.
///
/// Every write answers with the server's full record; the stores never
/// construct task records themselves.
pub trait TaskApi: Send + Sync {
    /// `GET /tasks`: all tasks in server order.
    fn list_tasks(&self) -> impl Future<Output = Result<Vec<Task>, ApiError>> + Send;

    /// `GET /tasks/{id}`.
    fn get_task(&self, id: &TaskId) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `POST /tasks`.
    fn create_task(&self, task: &NewTask)
    -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `PUT /tasks/{id}` with a partial body.
    fn update_task(
        &self,
        id: &TaskId,
        update: &TaskUpdate,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `DELETE /tasks/{id}`.
    fn delete_task(&self, id: &TaskId) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `GET /tasks/status/{status}`.
    fn tasks_by_status(
        &self,
        status: TaskStatus,
    ) -> impl Future<Output = Result<Vec<Task>, ApiError>> + Send;

    /// `GET /tasks/assignee/{assigneeId}`.
    fn tasks_by_assignee(
        &self,
        assignee_id: &str,
    ) -> impl Future<Output = Result<Vec<Task>, ApiError>> + Send;

    /// `GET /tasks/search?keyword=...`: title or description contains the keyword.
    fn search_tasks(
        &self,
        keyword: &str,
    ) -> impl Future<Output = Result<Vec<Task>, ApiError>> + Send;

    /// `GET /tasks/stats/count`.
    fn task_stats(&self) -> impl Future<Output = Result<TaskStats, ApiError>> + Send;
}

/// Authentication operations of the Remote Task API.
///
/// Operations that need a session read it from the implementation's
/// [`TokenSlot`].
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login`.
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<LoginResponse, ApiError>> + Send;

    /// `POST /auth/register` with an arbitrary user payload; returns the response text.
    fn register(
        &self,
        user: &serde_json::Value,
    ) -> impl Future<Output = Result<String, ApiError>> + Send;

    /// `POST /auth/refresh`.
    fn refresh_token(&self) -> impl Future<Output = Result<RefreshResponse, ApiError>> + Send;

    /// `GET /auth/me`.
    fn current_user(&self) -> impl Future<Output = Result<User, ApiError>> + Send;
}

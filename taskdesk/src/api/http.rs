//! HTTP implementation of the Remote Task API.
//!
//! Sends JSON requests with `reqwest` to endpoints resolved against a base
//! URL (e.g. `http://127.0.0.1:8080/api/`). Path segments are
//! percent-encoded, so task ids and assignee ids are passed through opaque.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use taskdesk_proto::auth::{LoginRequest, LoginResponse, RefreshResponse, User};
use taskdesk_proto::error::ErrorBody;
use taskdesk_proto::task::{NewTask, Task, TaskId, TaskStats, TaskStatus, TaskUpdate};
use tracing::{debug, warn};
use url::Url;

use super::{ApiError, AuthApi, TaskApi, TokenSlot};

/// Remote Task API client over HTTP.
///
/// Cheap to clone: clones share the connection pool and the [`TokenSlot`].
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: Url,
    token: TokenSlot,
}

impl HttpApi {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if `base_url` does not parse or
    /// cannot carry a path, and [`ApiError::Transport`] if the underlying
    /// HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration, token: TokenSlot) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!(
                "{base_url}: cannot be used as a base"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// The session token slot this client reads from.
    #[must_use]
    pub const fn token_slot(&self) -> &TokenSlot {
        &self.token
    }

    /// Resolves path segments against the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Starts a request, attaching the bearer token when one is held.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(method = %method, url = %url, "api request");
        let builder = self.client.request(method, url);
        match self.token.get() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "api request failed");
            ApiError::Transport(e.to_string())
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(status = status.as_u16(), error = %e, "failed to read error body");
                None
            }
        };
        let message = error_message(status, body);
        warn!(status = status.as_u16(), message = %message, "api returned error");
        Err(ApiError::Server {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
        let response = Self::send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        Self::send_json(self.request(Method::GET, url)).await
    }
}

/// The `message` of an [`ErrorBody`], else the raw body, else the status reason.
fn error_message(status: StatusCode, body: Option<String>) -> String {
    let body = body.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(err) => err.message,
        Err(_) if !body.trim().is_empty() => body,
        Err(_) => status.canonical_reason().unwrap_or_default().to_string(),
    }
}

impl TaskApi for HttpApi {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.get_json(&["tasks"]).await
    }

    async fn get_task(&self, id: &TaskId) -> Result<Task, ApiError> {
        self.get_json(&["tasks", id.as_str()]).await
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        let url = self.endpoint(&["tasks"])?;
        Self::send_json(self.request(Method::POST, url).json(task)).await
    }

    async fn update_task(&self, id: &TaskId, update: &TaskUpdate) -> Result<Task, ApiError> {
        let url = self.endpoint(&["tasks", id.as_str()])?;
        Self::send_json(self.request(Method::PUT, url).json(update)).await
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), ApiError> {
        let url = self.endpoint(&["tasks", id.as_str()])?;
        Self::send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, ApiError> {
        self.get_json(&["tasks", "status", status.as_str()]).await
    }

    async fn tasks_by_assignee(&self, assignee_id: &str) -> Result<Vec<Task>, ApiError> {
        self.get_json(&["tasks", "assignee", assignee_id]).await
    }

    async fn search_tasks(&self, keyword: &str) -> Result<Vec<Task>, ApiError> {
        let mut url = self.endpoint(&["tasks", "search"])?;
        url.query_pairs_mut().append_pair("keyword", keyword);
        Self::send_json(self.request(Method::GET, url)).await
    }

    async fn task_stats(&self) -> Result<TaskStats, ApiError> {
        self.get_json(&["tasks", "stats", "count"]).await
    }
}

impl AuthApi for HttpApi {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let url = self.endpoint(&["auth", "login"])?;
        Self::send_json(self.request(Method::POST, url).json(request)).await
    }

    async fn register(&self, user: &serde_json::Value) -> Result<String, ApiError> {
        let url = self.endpoint(&["auth", "register"])?;
        let response = Self::send(self.request(Method::POST, url).json(user)).await?;
        response
            .text()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn refresh_token(&self) -> Result<RefreshResponse, ApiError> {
        let url = self.endpoint(&["auth", "refresh"])?;
        Self::send_json(self.request(Method::POST, url)).await
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        self.get_json(&["auth", "me"]).await
    }
}

//! Loopback API for testing.
//!
//! [`LoopbackApi`] answers every [`TaskApi`] and [`AuthApi`] call from an
//! in-process task list, the way the real service would: ids and timestamps
//! are assigned on create and every write returns the full record. Tests can
//! inject failures with [`LoopbackApi::fail_next`] and hold responses back
//! with [`LoopbackApi::pause`] to interleave overlapping requests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use taskdesk_proto::auth::{LoginRequest, LoginResponse, RefreshResponse, User};
use taskdesk_proto::task::{NewTask, Task, TaskId, TaskStats, TaskStatus, TaskUpdate};
use tokio::sync::watch;

use super::{ApiError, AuthApi, TaskApi, TokenSlot};

#[derive(Debug, Default)]
struct LoopbackState {
    tasks: Vec<Task>,
    next_id: u64,
    accounts: Vec<(String, String, User)>,
    sessions: Vec<(String, User)>,
    issued: u64,
    failures: VecDeque<ApiError>,
    requests: Vec<String>,
}

/// In-process Remote Task API backed by a plain task list.
///
/// Clones share state, so a test can keep a handle while a store owns
/// another.
#[derive(Debug, Clone)]
pub struct LoopbackApi {
    state: Arc<Mutex<LoopbackState>>,
    token: TokenSlot,
    paused: Arc<watch::Sender<bool>>,
    waiting: Arc<AtomicUsize>,
}

impl Default for LoopbackApi {
    fn default() -> Self {
        Self::new(TokenSlot::new())
    }
}

impl LoopbackApi {
    /// Creates an empty API that reads the session from `token`.
    #[must_use]
    pub fn new(token: TokenSlot) -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            state: Arc::new(Mutex::new(LoopbackState {
                next_id: 1,
                ..LoopbackState::default()
            })),
            token,
            paused: Arc::new(paused),
            waiting: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replaces the server-side task list.
    pub fn set_tasks(&self, tasks: Vec<Task>) {
        self.state.lock().tasks = tasks;
    }

    /// Returns the server-side task list.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    /// Registers an account that [`AuthApi::login`] will accept.
    pub fn add_account(&self, password: &str, user: User) {
        self.state
            .lock()
            .accounts
            .push((user.username.clone(), password.to_string(), user));
    }

    /// Invalidates every issued token, as a server-side expiry would.
    pub fn expire_sessions(&self) {
        self.state.lock().sessions.clear();
    }

    /// Makes the next request fail with `error` instead of being served.
    pub fn fail_next(&self, error: ApiError) {
        self.state.lock().failures.push_back(error);
    }

    /// Returns the requests served so far, as `METHOD /path` strings.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().requests.clone()
    }

    /// Holds every subsequent request until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    /// Releases held requests.
    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Number of requests currently held by [`pause`](Self::pause).
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Records the request, waits out a pause, and pops an injected failure.
    async fn enter(&self, request: String) -> Result<(), ApiError> {
        let mut paused = self.paused.subscribe();
        if *paused.borrow_and_update() {
            self.waiting.fetch_add(1, Ordering::SeqCst);
            while *paused.borrow_and_update() {
                if paused.changed().await.is_err() {
                    break;
                }
            }
            self.waiting.fetch_sub(1, Ordering::SeqCst);
        }

        let mut state = self.state.lock();
        state.requests.push(request);
        state.failures.pop_front().map_or(Ok(()), Err)
    }

    fn session_user(&self, state: &LoopbackState) -> Result<User, ApiError> {
        let token = self.token.get().ok_or_else(|| unauthorized("missing token"))?;
        state
            .sessions
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, user)| user.clone())
            .ok_or_else(|| unauthorized("invalid token"))
    }

    fn filtered(&self, keep: impl Fn(&Task) -> bool) -> Vec<Task> {
        self.state
            .lock()
            .tasks
            .iter()
            .filter(|t| keep(t))
            .cloned()
            .collect()
    }
}

fn not_found(id: &TaskId) -> ApiError {
    ApiError::Server {
        status: 404,
        message: format!("Task not found with id: {id}"),
    }
}

fn unauthorized(message: &str) -> ApiError {
    ApiError::Server {
        status: 401,
        message: message.to_string(),
    }
}

impl TaskApi for LoopbackApi {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.enter("GET /tasks".to_string()).await?;
        Ok(self.tasks())
    }

    async fn get_task(&self, id: &TaskId) -> Result<Task, ApiError> {
        self.enter(format!("GET /tasks/{id}")).await?;
        self.state
            .lock()
            .tasks
            .iter()
            .find(|t| t.id == *id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        self.enter("POST /tasks".to_string()).await?;
        let mut state = self.state.lock();
        let id = loop {
            let candidate = TaskId::new(state.next_id.to_string());
            state.next_id += 1;
            if !state.tasks.iter().any(|t| t.id == candidate) {
                break candidate;
            }
        };
        let created = task.clone().into_task(id, Utc::now().naive_utc());
        state.tasks.push(created.clone());
        drop(state);
        Ok(created)
    }

    async fn update_task(&self, id: &TaskId, update: &TaskUpdate) -> Result<Task, ApiError> {
        self.enter(format!("PUT /tasks/{id}")).await?;
        let mut state = self.state.lock();
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == *id)
            .ok_or_else(|| not_found(id))?;
        update.apply_to(task);
        task.updated_at = Some(Utc::now().naive_utc());
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), ApiError> {
        self.enter(format!("DELETE /tasks/{id}")).await?;
        let mut state = self.state.lock();
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != *id);
        if state.tasks.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, ApiError> {
        self.enter(format!("GET /tasks/status/{status}")).await?;
        Ok(self.filtered(|t| t.status == status))
    }

    async fn tasks_by_assignee(&self, assignee_id: &str) -> Result<Vec<Task>, ApiError> {
        self.enter(format!("GET /tasks/assignee/{assignee_id}")).await?;
        Ok(self.filtered(|t| t.assignee_id == assignee_id))
    }

    async fn search_tasks(&self, keyword: &str) -> Result<Vec<Task>, ApiError> {
        self.enter(format!("GET /tasks/search?keyword={keyword}")).await?;
        Ok(self.filtered(|t| t.title.contains(keyword) || t.description.contains(keyword)))
    }

    async fn task_stats(&self) -> Result<TaskStats, ApiError> {
        self.enter("GET /tasks/stats/count".to_string()).await?;
        Ok(TaskStats::tally(&self.state.lock().tasks))
    }
}

impl AuthApi for LoopbackApi {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.enter("POST /auth/login".to_string()).await?;
        let mut state = self.state.lock();
        let user = state
            .accounts
            .iter()
            .find(|(name, password, _)| *name == request.username && *password == request.password)
            .map(|(_, _, user)| user.clone())
            .ok_or_else(|| unauthorized("Bad credentials"))?;
        state.issued += 1;
        let token = format!("loopback-token-{}", state.issued);
        state.sessions.push((token.clone(), user.clone()));
        drop(state);
        Ok(LoginResponse { token, user })
    }

    async fn register(&self, user: &serde_json::Value) -> Result<String, ApiError> {
        self.enter("POST /auth/register".to_string()).await?;
        let username = user
            .get("username")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        Ok(format!("User {username} registered successfully"))
    }

    async fn refresh_token(&self) -> Result<RefreshResponse, ApiError> {
        self.enter("POST /auth/refresh".to_string()).await?;
        let mut state = self.state.lock();
        let user = self.session_user(&state)?;
        state.issued += 1;
        let token = format!("loopback-token-{}", state.issued);
        state.sessions.push((token.clone(), user));
        drop(state);
        Ok(RefreshResponse { token })
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        self.enter("GET /auth/me".to_string()).await?;
        let state = self.state.lock();
        self.session_user(&state)
    }
}

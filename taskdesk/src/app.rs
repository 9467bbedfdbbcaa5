//! Command dispatch for the `taskdesk` binary.
//!
//! [`App`] owns the auth and task stores, checks every command against the
//! navigation guard, runs the store operations, and renders the result as
//! text lines.

use taskdesk_proto::task::{Task, TaskId};
use tracing::info;

use crate::api::{ApiError, AuthApi, TaskApi, TokenSlot};
use crate::cli::{Command, ListFilter, TaskCommand, TaskFields};
use crate::guard::{self, Route};
use crate::store::{AuthStore, TaskStore};
use crate::views::dashboard::{self, DashboardStats};
use crate::views::task_list::{self, TaskForm, TaskRow};

/// Errors surfaced by [`App::run`].
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The command needs a session and none is held.
    #[error("you are not signed in; run `taskdesk login` and set TASKDESK_TOKEN")]
    LoginRequired,

    /// The API rejected or failed the request.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The command line was incomplete.
    #[error("{0}")]
    InvalidArgument(String),
}

/// Client application state.
pub struct App<A> {
    auth: AuthStore<A>,
    tasks: TaskStore<A>,
    default_username: Option<String>,
}

impl<A: TaskApi + AuthApi + Clone> App<A> {
    /// Creates an app whose stores share `api` and the session `token`.
    pub fn new(api: A, token: TokenSlot) -> Self {
        Self {
            auth: AuthStore::new(api.clone(), token),
            tasks: TaskStore::new(api),
            default_username: None,
        }
    }

    /// Username used by `login` when none is given.
    #[must_use]
    pub fn with_default_username(mut self, username: Option<String>) -> Self {
        self.default_username = username;
        self
    }

    /// The session store; its token authorizes every task request.
    pub const fn auth(&self) -> &AuthStore<A> {
        &self.auth
    }

    /// The task store behind the dashboard and task views.
    pub const fn tasks(&self) -> &TaskStore<A> {
        &self.tasks
    }

    /// Where a navigation to `route` lands with the current session.
    #[must_use]
    pub fn navigate(&self, route: Route) -> Route {
        guard::resolve(route, self.auth.token().as_deref())
    }

    /// Ends the session and clears all task state.
    pub fn logout(&self) {
        self.auth.logout();
        self.tasks.reset();
    }

    /// Runs one command and returns the lines to print.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::LoginRequired`] when the guard blocks the
    /// command, otherwise the error of the failed operation.
    pub async fn run(&self, command: Command) -> Result<Vec<String>, AppError> {
        let route = command.route();
        if self.navigate(route) != route {
            info!(%route, "navigation blocked, login required");
            return Err(AppError::LoginRequired);
        }

        match command {
            Command::Login { username, password } => self.login(username, &password).await,
            Command::Register {
                username,
                email,
                password,
            } => {
                let payload = serde_json::json!({
                    "username": username,
                    "email": email,
                    "password": password,
                });
                Ok(vec![self.auth.register(&payload).await?])
            }
            Command::Refresh => {
                self.auth.refresh_token().await?;
                Ok(vec![token_line(self.auth.token().as_deref())])
            }
            Command::Me => {
                let user = self.auth.fetch_current_user().await?;
                Ok(vec![format!(
                    "{} <{}> ({}) id={}",
                    user.username, user.email, user.role, user.id
                )])
            }
            Command::Dashboard => {
                self.tasks.list().await?;
                Ok(self.tasks.read(dashboard::render))
            }
            Command::Stats => {
                let stats = DashboardStats::from(self.tasks.stats().await?);
                Ok(stats
                    .cards()
                    .iter()
                    .map(|(title, value, _)| format!("{title}: {value}"))
                    .collect())
            }
            Command::Tasks(cmd) => self.run_tasks(cmd).await,
        }
    }

    async fn login(&self, username: Option<String>, password: &str) -> Result<Vec<String>, AppError> {
        let username = username
            .or_else(|| self.default_username.clone())
            .ok_or_else(|| AppError::InvalidArgument("no username given".to_string()))?;
        let user = self.auth.login(&username, password).await?;
        Ok(vec![
            format!("Signed in as {}", user.username),
            token_line(self.auth.token().as_deref()),
        ])
    }

    async fn run_tasks(&self, cmd: TaskCommand) -> Result<Vec<String>, AppError> {
        match cmd {
            TaskCommand::List(filter) => self.list(filter).await,
            TaskCommand::Show { id } => {
                let task = self.tasks.get(&TaskId::new(id)).await?;
                Ok(describe(&task))
            }
            TaskCommand::Create { title, fields } => {
                let mut form = TaskForm::blank();
                form.title = title;
                fill_form(&mut form, fields);
                let task = form.submit(&self.tasks).await?;
                Ok(vec![format!("Created task {}", task.id)])
            }
            TaskCommand::Edit { id, title, fields } => {
                let current = self.tasks.get(&TaskId::new(id)).await?;
                let mut form = TaskForm::editing(&current);
                if let Some(title) = title {
                    form.title = title;
                }
                fill_form(&mut form, fields);
                let task = form.submit(&self.tasks).await?;
                Ok(vec![format!("Updated task {}", task.id)])
            }
            TaskCommand::Delete { id } => {
                let id = TaskId::new(id);
                self.tasks.delete(&id).await?;
                Ok(vec![format!("Deleted task {id}")])
            }
        }
    }

    async fn list(&self, filter: ListFilter) -> Result<Vec<String>, AppError> {
        let found = match filter {
            ListFilter {
                status: Some(status),
                ..
            } => self.tasks.by_status(status).await?,
            ListFilter {
                assignee: Some(assignee),
                ..
            } => self.tasks.by_assignee(&assignee).await?,
            ListFilter {
                search: Some(keyword),
                ..
            } => self.tasks.search(&keyword).await?,
            ListFilter { .. } => {
                self.tasks.list().await?;
                return Ok(self.tasks.read(task_list::render));
            }
        };
        if found.is_empty() {
            return Ok(vec!["No matching tasks.".to_string()]);
        }
        let rows: Vec<TaskRow> = found.iter().map(TaskRow::from).collect();
        Ok(task_list::render_rows(&rows))
    }
}

fn fill_form(form: &mut TaskForm, fields: TaskFields) {
    if let Some(description) = fields.description {
        form.description = description;
    }
    if let Some(status) = fields.status {
        form.status = status;
    }
    if let Some(priority) = fields.priority {
        form.priority = priority;
    }
    if let Some(assignee) = fields.assignee {
        form.assignee_id = assignee;
    }
}

fn token_line(token: Option<&str>) -> String {
    format!("export TASKDESK_TOKEN={}", token.unwrap_or_default())
}

fn describe(task: &Task) -> Vec<String> {
    let timestamp = |t: Option<chrono::NaiveDateTime>| {
        t.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
    };
    vec![
        format!("id:          {}", task.id),
        format!("title:       {}", task.title),
        format!("description: {}", task.description),
        format!("status:      {}", task.status),
        format!("priority:    {}", task.priority),
        format!("assignee:    {}", task.assignee_id),
        format!("created:     {}", timestamp(task.created_at)),
        format!("updated:     {}", timestamp(task.updated_at)),
    ]
}

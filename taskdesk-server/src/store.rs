//! In-memory task repository and session registry.
//!
//! Both are guarded by [`RwLock`]s and shared through the server state.
//! Tasks are kept in insertion order, which is the order `GET /tasks`
//! returns them in.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{NaiveDateTime, Utc};
use taskdesk_proto::auth::User;
use taskdesk_proto::task::{NewTask, Task, TaskId, TaskStats, TaskStatus, TaskUpdate};
use tokio::sync::RwLock;
use uuid::Uuid;

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Task field a page can be sorted by, named as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Id,
    Title,
    Description,
    Status,
    Priority,
    AssigneeId,
    CreatedAt,
    UpdatedAt,
}

impl SortKey {
    /// Looks up a camelCase field name such as `createdAt`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "id" => Self::Id,
            "title" => Self::Title,
            "description" => Self::Description,
            "status" => Self::Status,
            "priority" => Self::Priority,
            "assigneeId" => Self::AssigneeId,
            "createdAt" => Self::CreatedAt,
            "updatedAt" => Self::UpdatedAt,
            _ => return None,
        })
    }

    /// Enums compare by wire name.
    fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::Title => a.title.cmp(&b.title),
            Self::Description => a.description.cmp(&b.description),
            Self::Status => a.status.as_str().cmp(b.status.as_str()),
            Self::Priority => a.priority.as_str().cmp(b.priority.as_str()),
            Self::AssigneeId => a.assignee_id.cmp(&b.assignee_id),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

/// One page of a sorted task listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page index.
    pub page: usize,
    /// Tasks per page, at least one.
    pub size: usize,
    pub sort_by: SortKey,
    pub descending: bool,
}

/// Task records in insertion order.
#[derive(Default)]
pub struct TaskRepository {
    tasks: RwLock<Vec<Task>>,
}

impl TaskRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All tasks in insertion order.
    pub async fn all(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }

    /// The tasks on one page after a stable sort. Past the end is empty.
    pub async fn page(&self, request: PageRequest) -> Vec<Task> {
        let mut tasks = self.all().await;
        tasks.sort_by(|a, b| {
            let order = request.sort_by.compare(a, b);
            if request.descending { order.reverse() } else { order }
        });
        tasks
            .into_iter()
            .skip(request.page.saturating_mul(request.size))
            .take(request.size)
            .collect()
    }

    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        self.tasks.read().await.iter().find(|t| t.id == *id).cloned()
    }

    /// Stores a new task under a fresh UUID v7 id and stamps both timestamps.
    pub async fn insert(&self, task: NewTask) -> Task {
        let created = task.into_task(TaskId::new(Uuid::now_v7().to_string()), now());
        self.tasks.write().await.push(created.clone());
        created
    }

    /// Applies the present fields of `update` and bumps `updated_at`.
    pub async fn update(&self, id: &TaskId, update: &TaskUpdate) -> Option<Task> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.iter_mut().find(|t| t.id == *id)?;
        update.apply_to(task);
        task.updated_at = Some(now());
        Some(task.clone())
    }

    /// Removes a task; returns `false` if the id was unknown.
    pub async fn delete(&self, id: &TaskId) -> bool {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| t.id != *id);
        tasks.len() != before
    }

    pub async fn by_status(&self, status: TaskStatus) -> Vec<Task> {
        self.filter(|t| t.status == status).await
    }

    pub async fn by_assignee(&self, assignee_id: &str) -> Vec<Task> {
        self.filter(|t| t.assignee_id == assignee_id).await
    }

    /// Tasks whose title or description contains `keyword` (case-sensitive).
    pub async fn search(&self, keyword: &str) -> Vec<Task> {
        self.filter(|t| t.title.contains(keyword) || t.description.contains(keyword))
            .await
    }

    pub async fn stats(&self) -> TaskStats {
        TaskStats::tally(self.tasks.read().await.iter())
    }

    async fn filter(&self, keep: impl Fn(&Task) -> bool) -> Vec<Task> {
        self.tasks
            .read()
            .await
            .iter()
            .filter(|t| keep(t))
            .cloned()
            .collect()
    }
}

/// Username that is granted `ADMIN` unless configured otherwise.
pub const DEFAULT_ADMIN: &str = "admin";

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_USER: &str = "USER";

/// Known users and the bearer tokens issued to them.
///
/// Credentials are not checked: any non-empty username signs in, and a
/// user record is created on first sight. Users named in `admins` get the
/// `ADMIN` role, everyone else `USER`.
pub struct SessionStore {
    users: RwLock<HashMap<String, User>>,
    tokens: RwLock<HashMap<String, String>>,
    admins: HashSet<String>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_admins([DEFAULT_ADMIN.to_string()])
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty registry granting `ADMIN` to exactly the given usernames.
    pub fn with_admins(admins: impl IntoIterator<Item = String>) -> Self {
        Self {
            users: RwLock::default(),
            tokens: RwLock::default(),
            admins: admins.into_iter().collect(),
        }
    }

    /// Records a user, keeping the existing record if the name is taken.
    pub async fn register(&self, username: &str, email: Option<&str>) -> User {
        self.users
            .write()
            .await
            .entry(username.to_string())
            .or_insert_with(|| new_user(username, email, self.admins.contains(username)))
            .clone()
    }

    /// Issues a token for `username`, creating the user if needed.
    pub async fn login(&self, username: &str) -> (String, User) {
        let user = self.register(username, None).await;
        let token = self.issue(username).await;
        (token, user)
    }

    /// The user a token belongs to.
    pub async fn user_for(&self, token: &str) -> Option<User> {
        let username = self.tokens.read().await.get(token).cloned()?;
        self.users.read().await.get(&username).cloned()
    }

    /// Revokes `token` and issues a replacement.
    pub async fn refresh(&self, token: &str) -> Option<String> {
        let username = self.tokens.write().await.remove(token)?;
        Some(self.issue(&username).await)
    }

    async fn issue(&self, username: &str) -> String {
        let token = Uuid::now_v7().to_string();
        self.tokens
            .write()
            .await
            .insert(token.clone(), username.to_string());
        token
    }
}

fn new_user(username: &str, email: Option<&str>, admin: bool) -> User {
    User {
        id: Uuid::now_v7().to_string(),
        username: username.to_string(),
        email: email.map_or_else(|| format!("{username}@example.com"), str::to_string),
        role: if admin { ROLE_ADMIN } else { ROLE_USER }.to_string(),
    }
}

//! Task store: the client's in-memory source of truth for tasks.
//!
//! `TaskStore` owns an ordered mapping of task id to [`Task`] plus a loading
//! flag and an optional error. Operations issue a request through a
//! [`TaskApi`] and reconcile the server's answer into the mapping:
//! - list replaces the whole mapping, in server order
//! - create appends the returned record
//! - update replaces the entry with the returned record (no field merge)
//! - delete removes the entry
//!
//! Overlapping operations are not sequenced: whichever response resolves
//! last determines the final state. [`TaskStore::reset`] discards any
//! response to a request issued before the reset.

use std::collections::HashMap;

use parking_lot::Mutex;
use taskdesk_proto::task::{NewTask, Task, TaskId, TaskStats, TaskStatus, TaskUpdate};
use tracing::{debug, info, warn};

use super::{Operation, RequestPhase};
use crate::api::{ApiError, TaskApi};

/// Snapshot of the task store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskState {
    /// Ids in display order (server order, creations appended).
    order: Vec<TaskId>,
    /// Task records keyed by id.
    by_id: HashMap<TaskId, Task>,
    /// `true` from the moment a request is issued until it resolves.
    pub loading: bool,
    /// Message of the most recent failure, cleared by the next success.
    pub error: Option<String>,
    /// The most recent operation and its phase.
    pub last_request: Option<(Operation, RequestPhase)>,
}

impl TaskState {
    /// Iterates tasks in display order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.by_id.get(id)
    }

    /// Number of tasks held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no tasks are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Replaces every task with `tasks`, keeping their order.
    fn replace_all(&mut self, tasks: &[Task]) {
        self.order.clear();
        self.by_id.clear();
        for task in tasks {
            self.upsert(task.clone());
        }
    }

    /// Replaces the entry with the same id, or appends a new one.
    fn upsert(&mut self, task: Task) {
        if !self.by_id.contains_key(&task.id) {
            self.order.push(task.id.clone());
        }
        self.by_id.insert(task.id.clone(), task);
    }

    fn remove(&mut self, id: &TaskId) -> Option<Task> {
        self.order.retain(|existing| existing != id);
        self.by_id.remove(id)
    }
}

struct Inner {
    state: TaskState,
    /// Bumped by `reset`; responses tagged with an older epoch are dropped.
    epoch: u64,
}

/// Owned, injectable task store backed by a [`TaskApi`].
pub struct TaskStore<A> {
    api: A,
    inner: Mutex<Inner>,
}

impl<A: TaskApi> TaskStore<A> {
    /// Creates an empty store that talks to `api`.
    pub fn new(api: A) -> Self {
        Self {
            api,
            inner: Mutex::new(Inner {
                state: TaskState::default(),
                epoch: 0,
            }),
        }
    }

    /// The API this store issues requests through.
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> TaskState {
        self.inner.lock().state.clone()
    }

    /// Runs `f` against the current state without copying it.
    pub fn read<R>(&self, f: impl FnOnce(&TaskState) -> R) -> R {
        f(&self.inner.lock().state)
    }

    /// Tasks in display order.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.read(|s| s.tasks().cloned().collect())
    }

    /// Whether a request is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.lock().state.loading
    }

    /// The most recent error message.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.inner.lock().state.error.clone()
    }

    /// Returns the store to its initial state and orphans in-flight requests.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = TaskState::default();
        inner.epoch += 1;
        info!(epoch = inner.epoch, "task store reset");
    }

    /// Fetches all tasks and replaces the mapping with them.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the request; the mapping is unchanged.
    pub async fn list(&self) -> Result<Vec<Task>, ApiError> {
        let epoch = self.begin(Operation::List);
        let result = self.api.list_tasks().await;
        self.finish(epoch, Operation::List, &result, |state, tasks| {
            state.replace_all(tasks);
        });
        result
    }

    /// Fetches one task and stores the returned record.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the request; the mapping is unchanged.
    pub async fn get(&self, id: &TaskId) -> Result<Task, ApiError> {
        let epoch = self.begin(Operation::Get);
        let result = self.api.get_task(id).await;
        self.finish(epoch, Operation::Get, &result, |state, task| {
            state.upsert(task.clone());
        });
        result
    }

    /// Creates a task and appends the server's record.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the request; the mapping is unchanged.
    pub async fn create(&self, task: &NewTask) -> Result<Task, ApiError> {
        let epoch = self.begin(Operation::Create);
        let result = self.api.create_task(task).await;
        self.finish(epoch, Operation::Create, &result, |state, task| {
            state.upsert(task.clone());
        });
        result
    }

    /// Sends a partial update and replaces the entry with the server's record.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the request; the prior entry is kept.
    pub async fn update(&self, id: &TaskId, update: &TaskUpdate) -> Result<Task, ApiError> {
        let epoch = self.begin(Operation::Update);
        let result = self.api.update_task(id, update).await;
        self.finish(epoch, Operation::Update, &result, |state, task| {
            state.upsert(task.clone());
        });
        result
    }

    /// Deletes a task and removes it from the mapping.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the request; the entry is kept.
    pub async fn delete(&self, id: &TaskId) -> Result<(), ApiError> {
        let epoch = self.begin(Operation::Delete);
        let result = self.api.delete_task(id).await;
        self.finish(epoch, Operation::Delete, &result, |state, ()| {
            state.remove(id);
        });
        result
    }

    /// Queries tasks with the given status. The mapping is not touched.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the request.
    pub async fn by_status(&self, status: TaskStatus) -> Result<Vec<Task>, ApiError> {
        let epoch = self.begin(Operation::ByStatus);
        let result = self.api.tasks_by_status(status).await;
        self.finish(epoch, Operation::ByStatus, &result, |_, _| {});
        result
    }

    /// Queries tasks assigned to `assignee_id`. The mapping is not touched.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the request.
    pub async fn by_assignee(&self, assignee_id: &str) -> Result<Vec<Task>, ApiError> {
        let epoch = self.begin(Operation::ByAssignee);
        let result = self.api.tasks_by_assignee(assignee_id).await;
        self.finish(epoch, Operation::ByAssignee, &result, |_, _| {});
        result
    }

    /// Keyword search over titles and descriptions. The mapping is not touched.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the request.
    pub async fn search(&self, keyword: &str) -> Result<Vec<Task>, ApiError> {
        let epoch = self.begin(Operation::Search);
        let result = self.api.search_tasks(keyword).await;
        self.finish(epoch, Operation::Search, &result, |_, _| {});
        result
    }

    /// Fetches server-side per-status counts.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the request.
    pub async fn stats(&self) -> Result<TaskStats, ApiError> {
        let epoch = self.begin(Operation::Stats);
        let result = self.api.task_stats().await;
        self.finish(epoch, Operation::Stats, &result, |_, _| {});
        result
    }

    /// Marks the store busy and returns the epoch the request belongs to.
    fn begin(&self, op: Operation) -> u64 {
        let mut inner = self.inner.lock();
        inner.state.loading = true;
        inner.state.last_request = Some((op, RequestPhase::Pending));
        debug!(?op, "task request issued");
        inner.epoch
    }

    /// Applies a resolved request, unless the store was reset meanwhile.
    fn finish<T>(
        &self,
        epoch: u64,
        op: Operation,
        result: &Result<T, ApiError>,
        apply: impl FnOnce(&mut TaskState, &T),
    ) {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            debug!(?op, "discarding response issued before reset");
            return;
        }
        let state = &mut inner.state;
        state.loading = false;
        match result {
            Ok(value) => {
                apply(state, value);
                state.error = None;
                state.last_request = Some((op, RequestPhase::Succeeded));
                info!(?op, tasks = state.len(), "task request succeeded");
            }
            Err(e) => {
                let message = e.to_string();
                warn!(?op, error = %message, "task request failed");
                state.error = Some(message.clone());
                state.last_request = Some((op, RequestPhase::Failed(message)));
            }
        }
    }
}

//! Task list table and the create/edit form.

use taskdesk_proto::task::{NewTask, Task, TaskId, TaskPriority, TaskStatus, TaskUpdate};

use super::{Chip, ChipColor, LOADING_INDICATOR};
use crate::api::{ApiError, TaskApi};
use crate::store::{TaskState, TaskStore};

/// Chip color for a status.
#[must_use]
pub const fn status_color(status: TaskStatus) -> ChipColor {
    match status {
        TaskStatus::Done => ChipColor::Success,
        TaskStatus::InProgress => ChipColor::Warning,
        TaskStatus::Todo => ChipColor::Default,
    }
}

/// Chip color for a priority.
#[must_use]
pub const fn priority_color(priority: TaskPriority) -> ChipColor {
    match priority {
        TaskPriority::High => ChipColor::Error,
        TaskPriority::Medium => ChipColor::Warning,
        TaskPriority::Low => ChipColor::Info,
    }
}

/// One row of the task table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    /// Server-assigned id.
    pub id: TaskId,
    pub title: String,
    /// Shown as-is; empty when the task has none.
    pub description: String,
    /// Status chip, e.g. `IN_PROGRESS` in [`ChipColor::Warning`].
    pub status: Chip,
    /// Priority chip, e.g. `HIGH` in [`ChipColor::Error`].
    pub priority: Chip,
    /// Assignee id, empty when unassigned.
    pub assignee: String,
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            status: Chip {
                label: task.status.to_string(),
                color: status_color(task.status),
            },
            priority: Chip {
                label: task.priority.to_string(),
                color: priority_color(task.priority),
            },
            assignee: task.assignee_id.clone(),
        }
    }
}

/// Rows for every task in store order.
#[must_use]
pub fn rows(state: &TaskState) -> Vec<TaskRow> {
    state.tasks().map(TaskRow::from).collect()
}

const HEADERS: [&str; 6] = ["ID", "Title", "Description", "Status", "Priority", "Assignee"];

/// Renders `tasks` as an aligned text table.
#[must_use]
pub fn render_rows(tasks: &[TaskRow]) -> Vec<String> {
    let cells: Vec<[String; 6]> = tasks
        .iter()
        .map(|row| {
            [
                row.id.to_string(),
                row.title.clone(),
                row.description.clone(),
                row.status.to_string(),
                row.priority.to_string(),
                row.assignee.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |cols: &[String]| {
        cols.iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(cells.len() + 1);
    lines.push(format_line(&HEADERS.map(str::to_string)[..]));
    for row in &cells {
        lines.push(format_line(&row[..]));
    }
    lines
}

/// Renders the task list view for a store snapshot.
#[must_use]
pub fn render(state: &TaskState) -> Vec<String> {
    if state.loading {
        return vec![LOADING_INDICATOR.to_string()];
    }
    let mut lines = vec!["Tasks".to_string()];
    if state.is_empty() {
        lines.push("No tasks.".to_string());
    } else {
        lines.extend(render_rows(&rows(state)));
    }
    if let Some(error) = &state.error {
        lines.push(format!("Error: {error}"));
    }
    lines
}

/// The task editor dialog.
///
/// Holds every editable field. When opened on an existing task, submitting
/// sends all fields as an update; otherwise it creates a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
    editing: Option<TaskId>,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee_id: String,
}

impl Default for TaskForm {
    fn default() -> Self {
        Self::blank()
    }
}

impl TaskForm {
    /// An empty form for creating a task.
    #[must_use]
    pub fn blank() -> Self {
        Self {
            editing: None,
            title: String::new(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            assignee_id: String::new(),
        }
    }

    /// A form pre-filled from `task`.
    #[must_use]
    pub fn editing(task: &Task) -> Self {
        Self {
            editing: Some(task.id.clone()),
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            assignee_id: task.assignee_id.clone(),
        }
    }

    /// The id being edited, if any.
    #[must_use]
    pub const fn editing_id(&self) -> Option<&TaskId> {
        self.editing.as_ref()
    }

    /// Heading of the form: "Edit Task" or "Create New Task".
    #[must_use]
    pub const fn dialog_title(&self) -> &'static str {
        if self.editing.is_some() {
            "Edit Task"
        } else {
            "Create New Task"
        }
    }

    /// Label of the submit action: "Update" or "Create".
    #[must_use]
    pub const fn submit_label(&self) -> &'static str {
        if self.editing.is_some() { "Update" } else { "Create" }
    }

    /// Create body built from the form.
    #[must_use]
    pub fn to_new_task(&self) -> NewTask {
        NewTask {
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status,
            priority: self.priority,
            assignee_id: self.assignee_id.clone(),
        }
    }

    /// Update body carrying every form field.
    #[must_use]
    pub fn to_update(&self) -> TaskUpdate {
        TaskUpdate {
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            status: Some(self.status),
            priority: Some(self.priority),
            assignee_id: Some(self.assignee_id.clone()),
        }
    }

    /// Dispatches Update when editing, Create otherwise.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the store operation.
    pub async fn submit<A: TaskApi>(&self, store: &TaskStore<A>) -> Result<Task, ApiError> {
        match &self.editing {
            Some(id) => store.update(id, &self.to_update()).await,
            None => store.create(&self.to_new_task()).await,
        }
    }
}

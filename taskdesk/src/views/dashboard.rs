//! Dashboard: four count cards derived from the task store.

use taskdesk_proto::task::{Task, TaskStats};

use super::{ChipColor, LOADING_INDICATOR};
use crate::store::TaskState;

/// Counts shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    /// Every task in the store.
    pub total: u64,
    /// Tasks in `DONE`.
    pub completed: u64,
    /// Tasks in `IN_PROGRESS`.
    pub in_progress: u64,
    /// Tasks in `TODO`.
    pub pending: u64,
}

impl DashboardStats {
    /// Counts `tasks` by status.
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        Self::from(TaskStats::tally(tasks))
    }

    /// The cards in display order: title, value, accent color.
    #[must_use]
    pub const fn cards(&self) -> [(&'static str, u64, ChipColor); 4] {
        [
            ("Total Tasks", self.total, ChipColor::Info),
            ("Completed", self.completed, ChipColor::Success),
            ("In Progress", self.in_progress, ChipColor::Warning),
            ("Pending", self.pending, ChipColor::Error),
        ]
    }
}

impl From<TaskStats> for DashboardStats {
    fn from(stats: TaskStats) -> Self {
        Self {
            total: stats.total_count,
            completed: stats.done_count,
            in_progress: stats.in_progress_count,
            pending: stats.todo_count,
        }
    }
}

/// Renders the dashboard for a task-store snapshot.
#[must_use]
pub fn render(state: &TaskState) -> Vec<String> {
    if state.loading {
        return vec![LOADING_INDICATOR.to_string()];
    }
    let mut lines = vec!["Dashboard".to_string()];
    let stats = DashboardStats::from_tasks(state.tasks());
    for (title, value, _) in stats.cards() {
        lines.push(format!("  {title:<12} {value:>5}"));
    }
    if let Some(error) = &state.error {
        lines.push(format!("Error: {error}"));
    }
    lines
}

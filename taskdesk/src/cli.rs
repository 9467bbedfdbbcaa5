//! Subcommands of the `taskdesk` binary.

use clap::{Args, Subcommand};
use taskdesk_proto::task::{TaskPriority, TaskStatus};

use crate::guard::Route;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sign in and print the session token.
    Login {
        /// Account name (default: `[session] username` from the config file).
        username: Option<String>,
        #[arg(long, env = "TASKDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account.
    Register {
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "TASKDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Exchange the session token for a fresh one.
    Refresh,
    /// Show the signed-in user.
    Me,
    /// Task counts by status.
    Dashboard,
    /// Server-side task counts.
    Stats,
    /// List and edit tasks.
    #[command(subcommand)]
    Tasks(TaskCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum TaskCommand {
    /// List tasks, optionally filtered.
    List(ListFilter),
    /// Show one task.
    Show { id: String },
    /// Create a task.
    Create {
        title: String,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Edit a task; omitted fields keep their current value.
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Delete a task.
    Delete { id: String },
}

/// At most one server-side filter.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
#[group(multiple = false)]
pub struct ListFilter {
    #[arg(long)]
    pub status: Option<TaskStatus>,
    #[arg(long)]
    pub assignee: Option<String>,
    /// Keyword matched against title and description.
    #[arg(long)]
    pub search: Option<String>,
}

/// Optional task fields shared by `create` and `edit`.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFields {
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub status: Option<TaskStatus>,
    #[arg(long)]
    pub priority: Option<TaskPriority>,
    #[arg(long)]
    pub assignee: Option<String>,
}

impl Command {
    /// The screen this command stands in for, checked by the navigation guard.
    #[must_use]
    pub const fn route(&self) -> Route {
        match self {
            Self::Login { .. } | Self::Register { .. } => Route::Login,
            Self::Refresh | Self::Me | Self::Dashboard | Self::Stats => Route::Dashboard,
            Self::Tasks(_) => Route::Tasks,
        }
    }
}

//! Client-side state containers synchronized with the Remote Task API.
//!
//! Each store is an owned value constructed with the API it talks to; there
//! is no global state. Every operation moves through three observable
//! phases: pending, then succeeded or failed. Failures are recorded as a
//! single error string on the store and never panic.

pub mod auth;
pub mod tasks;

pub use auth::{AuthState, AuthStore, Session};
pub use tasks::{TaskState, TaskStore};

/// Which store operation a [`RequestPhase`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Fetch all tasks.
    List,
    /// Fetch a single task.
    Get,
    /// Create a task.
    Create,
    /// Partially update a task.
    Update,
    /// Delete a task.
    Delete,
    /// Query tasks by status.
    ByStatus,
    /// Query tasks by assignee.
    ByAssignee,
    /// Keyword search.
    Search,
    /// Per-status counts.
    Stats,
    /// Sign in.
    Login,
    /// Create an account.
    Register,
    /// Exchange the token for a fresh one.
    Refresh,
    /// Re-hydrate the signed-in user.
    CurrentUser,
}

/// Observable phase of the most recent request issued by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPhase {
    /// The request has been issued and has not resolved.
    Pending,
    /// The request resolved successfully and its result was applied.
    Succeeded,
    /// The request failed; the message is also the store's error.
    Failed(String),
}

impl RequestPhase {
    /// Returns `true` while the request is in flight.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

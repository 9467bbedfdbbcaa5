//! Error body returned by the task API on non-success responses.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// JSON error payload: a short category plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Short category such as `Validation Failed` or `Not Found`.
    pub error: String,
    /// Human-readable detail.
    pub message: String,
    /// When the error was produced, if the server stamps it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
}

impl ErrorBody {
    /// Builds an error body without a timestamp.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            timestamp: None,
        }
    }
}

//! Plain-text views over the stores.
//!
//! Views are pure: they read a store snapshot and return lines for the
//! terminal. Dispatching operations is left to the caller.

pub mod dashboard;
pub mod task_list;

use std::fmt;

/// Semantic color of a status or priority chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipColor {
    /// Neutral.
    Default,
    /// Informational.
    Info,
    /// Positive outcome.
    Success,
    /// Needs attention.
    Warning,
    /// Urgent.
    Error,
}

impl ChipColor {
    /// Lowercase name, used as the chip's text tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ChipColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A labelled chip, e.g. a task's status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chip {
    /// Text shown in the chip.
    pub label: String,
    /// Semantic color.
    pub color: ChipColor,
}

impl fmt::Display for Chip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.label)
    }
}

/// Shown instead of content while a store request is in flight.
pub const LOADING_INDICATOR: &str = "Loading...";

//! Shared wire definitions for the `TaskDesk` task API.
//!
//! Every type here is the JSON shape exchanged between the client stores and
//! the Remote Task API. Field names are camelCase and enum values are
//! upper snake case on the wire.

pub mod auth;
pub mod error;
pub mod task;

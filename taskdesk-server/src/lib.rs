//! `TaskDesk` reference server library.
//!
//! An in-memory implementation of the task API, used for local development
//! and end-to-end tests of the client.

pub mod config;
pub mod routes;
pub mod store;

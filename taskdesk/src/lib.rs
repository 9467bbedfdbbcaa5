//! `TaskDesk`: task-management client library.

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod guard;
pub mod store;
pub mod views;

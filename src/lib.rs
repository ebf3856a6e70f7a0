//! nxrelease - triage merged pull requests onto release-notes project boards

pub mod board;
pub mod commands;
pub mod config;
pub mod error;
pub mod github;
pub mod history;
pub mod import;
pub mod pager;
pub mod reconcile;
pub mod telemetry;
pub mod template;
pub mod triage;
pub mod ui;

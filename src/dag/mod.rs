// src/dag/mod.rs

//! Task paths and their execution.
//!
//! - [`patterns`] compiles and expands wildcard sources.
//! - [`paths`] finds terminal declarations and assembles paths.
//! - [`scheduler`] runs paths through the collaborator lifecycle.
//! - [`report`] describes how each queued path ended.

pub mod paths;
pub mod patterns;
pub mod report;
pub mod scheduler;

pub use paths::{TaskPath, discover_paths};
pub use report::{PathReport, PathStatus, RunReport};
pub use scheduler::Scheduler;

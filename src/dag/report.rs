// src/dag/report.rs

//! Outcome of one scheduler run.

use std::fmt;

use tracing::{info, warn};

/// How a single pass over a queued path ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStatus {
    /// Every task was either skipped (target present) or ran successfully.
    Completed,
    /// A task failed construction, a lifecycle check, or returned an error.
    Failed { task: String, reason: String },
    /// Waiting for a file; the path was queued again behind fresh work.
    Deferred { waiting_for: String },
    /// Waiting for a file that nothing left in the queue can produce.
    Abandoned { waiting_for: String },
    /// A task injected `count` additional paths; the path was queued again
    /// after them.
    Injected { task: String, count: usize },
}

impl fmt::Display for PathStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStatus::Completed => write!(f, "completed"),
            PathStatus::Failed { task, reason } => write!(f, "failed at '{task}': {reason}"),
            PathStatus::Deferred { waiting_for } => write!(f, "deferred (waiting for {waiting_for})"),
            PathStatus::Abandoned { waiting_for } => {
                write!(f, "abandoned ({waiting_for} was never produced)")
            }
            PathStatus::Injected { task, count } => {
                write!(f, "requeued after '{task}' injected {count} path(s)")
            }
        }
    }
}

/// One processed queue entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathReport {
    /// Task identities, oldest first.
    pub chain: Vec<String>,
    pub status: PathStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Paths found by discovery (before deferrals and injections).
    pub discovered: usize,
    pub entries: Vec<PathReport>,
    /// Tasks whose `run` completed successfully.
    pub executed: usize,
    /// Tasks skipped because their target already existed.
    pub skipped: usize,
}

impl RunReport {
    pub fn new(discovered: usize) -> Self {
        Self {
            discovered,
            ..Self::default()
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &PathReport> {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, PathStatus::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn count(&self, pred: impl Fn(&PathStatus) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.status)).count()
    }

    pub fn log_summary(&self) {
        for entry in &self.entries {
            match entry.status {
                PathStatus::Failed { .. } | PathStatus::Abandoned { .. } => warn!(
                    path = %entry.chain.join(" -> "),
                    status = %entry.status,
                    "path result"
                ),
                _ => info!(
                    path = %entry.chain.join(" -> "),
                    status = %entry.status,
                    "path result"
                ),
            }
        }
        info!(
            discovered = self.discovered,
            processed = self.entries.len(),
            executed = self.executed,
            skipped = self.skipped,
            failed = self.count(|s| matches!(s, PathStatus::Failed { .. })),
            "run finished"
        );
    }
}

// src/task/mod.rs

//! Collaborator lifecycle contract.
//!
//! Every task kind implements [`Task`]. The scheduler drives it through:
//!
//! 1. [`Task::target_exists`]: skip when already materialized;
//! 2. [`FileDependent`] (optional): wait for a file from another path;
//! 3. [`TaskInjector`] (optional): inject additional, undeclared work;
//! 4. [`Task::pre_check`] → [`Task::run`] → [`Task::post_check`].
//!
//! Construction is validation: a kind's constructor rejects malformed
//! parameters with [`TaskchainError::ValidationError`](crate::errors::TaskchainError).
//!
//! Built-in kinds:
//! - [`copy`]: copy `src` to `target` (also used by `publish`).
//! - [`command`]: run a shell command.
//! - [`merge`]: concatenate every file matching a wildcard `src`.
//! - [`join`]: append a second file (`join_with`) to `src`.
//! - [`snapshot`]: import files from an inbox directory, with catch-up.

pub mod atomic;
pub mod command;
pub mod copy;
pub mod join;
pub mod merge;
pub mod params;
pub mod snapshot;

use std::cmp::Ordering;

use crate::config::model::{Declaration, RunIdentity};
use crate::store::KvStore;

/// What a collaborator gets to see while it runs.
pub struct TaskEnv<'a> {
    pub identity: &'a RunIdentity,
    pub store: &'a mut KvStore,
}

/// Base lifecycle shared by every kind.
pub trait Task {
    fn declaration(&self) -> &Declaration;

    /// Whether the target is already materialized. Defaults to "target is a
    /// regular file".
    fn target_exists(&self) -> bool {
        self.declaration().target_path().is_file()
    }

    fn pre_check(&mut self, _env: &mut TaskEnv<'_>) -> anyhow::Result<bool> {
        Ok(true)
    }

    /// Perform the transformation. `Ok(false)` means "nothing to do"; the rest
    /// of the path is skipped.
    fn run(&mut self, env: &mut TaskEnv<'_>) -> anyhow::Result<bool>;

    fn post_check(&mut self, _env: &mut TaskEnv<'_>) -> anyhow::Result<bool> {
        Ok(true)
    }

    fn as_file_dependent(&self) -> Option<&dyn FileDependent> {
        None
    }

    fn as_injector(&mut self) -> Option<&mut dyn TaskInjector> {
        None
    }
}

/// A task that needs a file produced by some other, unrelated path.
pub trait FileDependent {
    /// Name of the parameter holding the root-relative path of that file.
    fn depends_on_attribute(&self) -> Option<&str>;
}

/// A task that can discover more work than was declared.
pub trait TaskInjector {
    fn additional_tasks(&mut self, env: &mut TaskEnv<'_>) -> anyhow::Result<Vec<InjectedWork>>;
}

/// One unit of injected work.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectedWork {
    /// Appended to names, sources and targets of the cloned path. Also the
    /// ordering key (oldest first).
    pub identifier: String,
    /// Parameters replaced on the injecting task's clone.
    pub overrides: toml::Table,
}

impl InjectedWork {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            overrides: toml::Table::new(),
        }
    }

    pub fn with_override(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.overrides.insert(key.to_string(), value.into());
        self
    }
}

/// Order identifiers oldest-first: numerically when both are unsigned
/// integers, lexically otherwise.
pub fn compare_identifiers(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_compare_numerically_when_possible() {
        assert_eq!(compare_identifiers("9", "10"), Ordering::Less);
        assert_eq!(compare_identifiers("20180414", "20180413"), Ordering::Greater);
        assert_eq!(compare_identifiers("b", "a"), Ordering::Greater);
    }
}

// src/registry.rs

//! Compile-time registry of task kinds.
//!
//! Each kind maps to a constructor plus three flags:
//! - `wildcard_source`: `src` is a glob matched against other targets;
//! - `no_source`: the kind legitimately has no `src`;
//! - `restricted_target`: the target must never feed another task.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::model::{Declaration, RunIdentity};
use crate::errors::{Result, TaskchainError};
use crate::task::{self, Task};

/// Constructor for a collaborator. Validates the declaration's parameters.
pub type TaskFactory =
    Arc<dyn Fn(&Declaration, &RunIdentity) -> Result<Box<dyn Task>> + Send + Sync>;

#[derive(Clone)]
pub struct KindSpec {
    factory: TaskFactory,
    wildcard_source: bool,
    no_source: bool,
    restricted_target: bool,
}

impl fmt::Debug for KindSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindSpec")
            .field("wildcard_source", &self.wildcard_source)
            .field("no_source", &self.no_source)
            .field("restricted_target", &self.restricted_target)
            .finish_non_exhaustive()
    }
}

impl KindSpec {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&Declaration, &RunIdentity) -> Result<Box<dyn Task>> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            wildcard_source: false,
            no_source: false,
            restricted_target: false,
        }
    }

    pub fn wildcard_source(mut self) -> Self {
        self.wildcard_source = true;
        self
    }

    pub fn no_source(mut self) -> Self {
        self.no_source = true;
        self
    }

    pub fn restricted_target(mut self) -> Self {
        self.restricted_target = true;
        self
    }

    pub fn is_wildcard_source(&self) -> bool {
        self.wildcard_source
    }

    pub fn is_no_source(&self) -> bool {
        self.no_source
    }

    pub fn is_restricted_target(&self) -> bool {
        self.restricted_target
    }

    pub fn build(&self, decl: &Declaration, identity: &RunIdentity) -> Result<Box<dyn Task>> {
        (self.factory)(decl, identity)
    }
}

/// Kind name → [`KindSpec`]. Kind names are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    kinds: BTreeMap<String, KindSpec>,
}

impl KindRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in kinds:
    ///
    /// | kind       | flags             |
    /// |------------|-------------------|
    /// | `copy`     |                   |
    /// | `publish`  | restricted target |
    /// | `command`  |                   |
    /// | `merge`    | wildcard source   |
    /// | `join`     |                   |
    /// | `snapshot` | no source         |
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry
            .register("copy", KindSpec::new(task::copy::CopyTask::boxed))
            .register(
                "publish",
                KindSpec::new(task::copy::CopyTask::boxed).restricted_target(),
            )
            .register("command", KindSpec::new(task::command::CommandTask::boxed))
            .register(
                "merge",
                KindSpec::new(task::merge::MergeTask::boxed).wildcard_source(),
            )
            .register("join", KindSpec::new(task::join::JoinTask::boxed))
            .register(
                "snapshot",
                KindSpec::new(task::snapshot::SnapshotTask::boxed).no_source(),
            );
        registry
    }

    /// Register (or replace) a kind.
    pub fn register(&mut self, kind: &str, spec: KindSpec) -> &mut Self {
        self.kinds.insert(kind.to_lowercase(), spec);
        self
    }

    pub fn get(&self, kind: &str) -> Option<&KindSpec> {
        self.kinds.get(&kind.to_lowercase())
    }

    /// Spec for a declaration's kind; unknown kinds are a configuration error.
    pub fn spec_for(&self, decl: &Declaration) -> Result<&KindSpec> {
        self.get(&decl.kind).ok_or_else(|| {
            TaskchainError::config(format!(
                "task '{}' uses unknown kind '{}' (known kinds: {})",
                decl.id(),
                decl.kind,
                self.kinds.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    pub fn is_wildcard_source(&self, kind: &str) -> bool {
        self.get(kind).is_some_and(KindSpec::is_wildcard_source)
    }

    /// Construct (and thereby validate) the collaborator for `decl`.
    pub fn build(&self, decl: &Declaration, identity: &RunIdentity) -> Result<Box<dyn Task>> {
        self.spec_for(decl)?.build(decl, identity)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }
}

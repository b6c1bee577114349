// src/engine/mod.rs

//! Run orchestration.
//!
//! [`Engine`] owns the kind registry and one validated declaration set and
//! offers the three things a caller can do with them:
//! - [`Engine::validate`]: kind-aware validation plus path discovery;
//! - [`Engine::visualize`]: validation plus path rendering;
//! - [`Engine::execute`]: validation, checksum guard, scheduling.
//!
//! Structural errors (configuration, validation, checksum, cycles) abort
//! before any task runs. Task failures never do; they end up in the
//! [`RunReport`].

use std::path::PathBuf;

use tracing::info;

use crate::config::model::DeclarationSet;
use crate::config::validate_with_registry;
use crate::dag::{RunReport, Scheduler, TaskPath, discover_paths};
use crate::errors::Result;
use crate::registry::KindRegistry;
use crate::store::{KvStore, checksum};
use crate::types::ChecksumPolicy;
use crate::visualize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub checksum: ChecksumPolicy,
}

#[derive(Debug)]
pub struct Engine {
    registry: KindRegistry,
    declarations: DeclarationSet,
    options: EngineOptions,
}

impl Engine {
    pub fn new(registry: KindRegistry, declarations: DeclarationSet, options: EngineOptions) -> Self {
        Self {
            registry,
            declarations,
            options,
        }
    }

    pub fn declarations(&self) -> &DeclarationSet {
        &self.declarations
    }

    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    /// Kind-aware validation and path discovery. Returns the paths.
    pub fn validate(&self) -> Result<Vec<TaskPath>> {
        validate_with_registry(&self.declarations, &self.registry)?;
        self.discover_paths()
    }

    pub fn discover_paths(&self) -> Result<Vec<TaskPath>> {
        discover_paths(&self.declarations, &self.registry)
    }

    /// Validate, then write the HTML overview. Returns its location and the
    /// plain-text listing.
    pub fn visualize(&self) -> Result<(PathBuf, String)> {
        let paths = self.validate()?;
        visualize::visualize(&self.declarations, &self.registry, &paths)
    }

    /// Validate, guard the checksum and run every path.
    ///
    /// The digest is only recorded for declarations that passed every
    /// structural check, path discovery included.
    pub fn execute(&self) -> Result<RunReport> {
        let paths = self.validate()?;

        let identity = self.declarations.identity();
        let mut store = KvStore::open(&identity.root, &identity.name)?;

        let outcome = checksum::check(
            &mut store,
            self.declarations.source_text(),
            self.options.checksum,
        )?;
        info!(run = %identity.name, outcome = ?outcome, "checksum guard passed");

        let report = Scheduler::new(&self.registry, identity).run(paths, &mut store);

        store.flush()?;
        Ok(report)
    }
}

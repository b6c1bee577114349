// src/task/snapshot.rs

//! `snapshot`: import one file from an inbox directory.
//!
//! Inbox files are identified by their file stem (`20180414.csv` →
//! `20180414`). Without `snapshot_id` the newest stem is imported. Imported
//! identifiers are recorded in the KV store under the `ledger` section:
//!
//! ```toml
//! [daily]
//! processed_ids = ["20180413", "20180414"]
//! newest_processed_id = "20180414"
//! ```
//!
//! With `catch_up = true` the task injects one unit of work for every inbox
//! file that was never imported, so the downstream path runs once per
//! missed snapshot.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

use crate::config::model::{Declaration, RunIdentity};
use crate::dag::patterns;
use crate::errors::{Result, TaskchainError};
use crate::task::{
    InjectedWork, Task, TaskEnv, TaskInjector, atomic, compare_identifiers, params,
};

pub const PROCESSED_IDS: &str = "processed_ids";
pub const NEWEST_PROCESSED_ID: &str = "newest_processed_id";

#[derive(Debug)]
pub struct SnapshotTask {
    decl: Declaration,
    pattern: String,
    snapshot_id: Option<String>,
    catch_up: bool,
    ledger: String,
}

impl SnapshotTask {
    pub fn new(decl: &Declaration, identity: &RunIdentity) -> Result<Self> {
        let id = decl.id().to_string();

        let inbox = params::required_str(decl, "inbox")?;
        if Path::new(inbox).is_absolute() {
            return Err(TaskchainError::validation(
                id,
                &["inbox"],
                "must be relative to run_root",
            ));
        }
        let inbox = identity.root.join(inbox);
        if !inbox.is_dir() {
            return Err(TaskchainError::validation(
                id,
                &["inbox"],
                format!("{} is not a directory", inbox.display()),
            ));
        }

        let file_pattern = params::optional_str(decl, "pattern")?.unwrap_or("*");
        let pattern = format!("{}/{}", inbox.display(), file_pattern);
        patterns::compile_glob(&pattern)?;

        Ok(Self {
            decl: decl.clone(),
            pattern,
            snapshot_id: params::optional_str(decl, "snapshot_id")?.map(str::to_string),
            catch_up: params::optional_bool(decl, "catch_up", false)?,
            ledger: params::optional_str(decl, "ledger")?
                .unwrap_or(&decl.name)
                .to_string(),
        })
    }

    pub fn boxed(decl: &Declaration, identity: &RunIdentity) -> Result<Box<dyn Task>> {
        Ok(Box::new(Self::new(decl, identity)?))
    }

    /// Inbox files as `(identifier, path)`, oldest first.
    fn available(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut files: Vec<(String, PathBuf)> = patterns::existing_matches(&self.pattern)?
            .into_iter()
            .filter_map(|path| {
                let stem = path.file_stem()?.to_string_lossy().into_owned();
                Some((stem, path))
            })
            .collect();
        files.sort_by(|a, b| compare_identifiers(&a.0, &b.0));
        Ok(files)
    }

    fn selected(&self) -> Result<Option<(String, PathBuf)>> {
        let available = self.available()?;
        Ok(match &self.snapshot_id {
            Some(wanted) => available.into_iter().find(|(id, _)| id == wanted),
            None => available.into_iter().last(),
        })
    }

    fn record(&self, env: &mut TaskEnv<'_>, id: &str) -> Result<()> {
        let section = Some(self.ledger.as_str());

        let mut processed = env
            .store
            .get_list(PROCESSED_IDS, section)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        if !processed.iter().any(|p| p == id) {
            processed.push(id.to_string());
            processed.sort_by(|a, b| compare_identifiers(a, b));
        }

        let newest = match env.store.get_text(NEWEST_PROCESSED_ID, section) {
            Some(prev) if compare_identifiers(prev, id) == Ordering::Greater => prev.to_string(),
            _ => id.to_string(),
        };

        env.store.put(PROCESSED_IDS, processed, section, false)?;
        env.store.put(NEWEST_PROCESSED_ID, newest, section, true)
    }
}

impl Task for SnapshotTask {
    fn declaration(&self) -> &Declaration {
        &self.decl
    }

    fn pre_check(&mut self, _env: &mut TaskEnv<'_>) -> anyhow::Result<bool> {
        if self.selected()?.is_none() {
            info!(
                task = %self.decl.id(),
                pattern = %self.pattern,
                snapshot_id = ?self.snapshot_id,
                "no matching snapshot in inbox"
            );
            return Ok(false);
        }
        Ok(true)
    }

    fn run(&mut self, env: &mut TaskEnv<'_>) -> anyhow::Result<bool> {
        let Some((id, path)) = self.selected()? else {
            return Ok(false);
        };
        debug!(task = %self.decl.id(), snapshot_id = %id, src = %path.display(), "importing snapshot");

        let contents = std::fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        atomic::write_atomic(self.decl.target_path(), &contents)?;
        self.record(env, &id)?;
        Ok(true)
    }

    fn as_injector(&mut self) -> Option<&mut dyn TaskInjector> {
        Some(self)
    }
}

impl TaskInjector for SnapshotTask {
    fn additional_tasks(&mut self, env: &mut TaskEnv<'_>) -> anyhow::Result<Vec<InjectedWork>> {
        if !self.catch_up {
            return Ok(Vec::new());
        }

        let processed = env
            .store
            .get_list(PROCESSED_IDS, Some(&self.ledger))
            .unwrap_or_default();
        let current = self.selected()?.map(|(id, _)| id);

        let missed: Vec<InjectedWork> = self
            .available()?
            .into_iter()
            .map(|(id, _)| id)
            .filter(|id| Some(id) != current.as_ref() && !processed.contains(id))
            .map(|id| {
                InjectedWork::new(id.clone())
                    .with_override("snapshot_id", id)
                    .with_override("catch_up", false)
                    .with_override("ledger", self.ledger.clone())
            })
            .collect();

        if !missed.is_empty() {
            info!(task = %self.decl.id(), missed = missed.len(), "catching up on missed snapshots");
        }
        Ok(missed)
    }
}

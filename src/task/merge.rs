// src/task/merge.rs

//! `merge`: concatenate every existing file matching the wildcard `src`,
//! in path order, into `target`.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::model::{Declaration, RunIdentity};
use crate::dag::patterns;
use crate::errors::Result;
use crate::task::{Task, TaskEnv, atomic, params};

#[derive(Debug)]
pub struct MergeTask {
    decl: Declaration,
    pattern: String,
}

impl MergeTask {
    pub fn new(decl: &Declaration) -> Result<Self> {
        let pattern = params::required_src(decl)?.to_string();
        patterns::compile_glob(&pattern)?;
        Ok(Self {
            decl: decl.clone(),
            pattern,
        })
    }

    pub fn boxed(decl: &Declaration, _identity: &RunIdentity) -> Result<Box<dyn Task>> {
        Ok(Box::new(Self::new(decl)?))
    }

    /// Matching inputs, excluding the target itself.
    fn inputs(&self) -> Result<Vec<PathBuf>> {
        let target = self.decl.target_path();
        Ok(patterns::existing_matches(&self.pattern)?
            .into_iter()
            .filter(|p| p != target)
            .collect())
    }
}

impl Task for MergeTask {
    fn declaration(&self) -> &Declaration {
        &self.decl
    }

    fn run(&mut self, _env: &mut TaskEnv<'_>) -> anyhow::Result<bool> {
        let inputs = self.inputs()?;
        if inputs.is_empty() {
            info!(task = %self.decl.id(), pattern = %self.pattern, "nothing to merge");
            return Ok(false);
        }
        debug!(task = %self.decl.id(), inputs = inputs.len(), "merging");
        atomic::concat_atomic(&inputs, self.decl.target_path())?;
        Ok(true)
    }
}

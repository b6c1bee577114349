// src/task/copy.rs

//! `copy` / `publish`: copy `src` to `target`.

use std::path::PathBuf;

use anyhow::Context;
use tracing::debug;

use crate::config::model::{Declaration, RunIdentity};
use crate::errors::Result;
use crate::task::{Task, TaskEnv, atomic, params};

#[derive(Debug)]
pub struct CopyTask {
    decl: Declaration,
    src: PathBuf,
}

impl CopyTask {
    pub fn new(decl: &Declaration) -> Result<Self> {
        let src = PathBuf::from(params::required_src(decl)?);
        Ok(Self {
            decl: decl.clone(),
            src,
        })
    }

    pub fn boxed(decl: &Declaration, _identity: &RunIdentity) -> Result<Box<dyn Task>> {
        Ok(Box::new(Self::new(decl)?))
    }
}

impl Task for CopyTask {
    fn declaration(&self) -> &Declaration {
        &self.decl
    }

    fn pre_check(&mut self, _env: &mut TaskEnv<'_>) -> anyhow::Result<bool> {
        Ok(self.src.is_file())
    }

    fn run(&mut self, _env: &mut TaskEnv<'_>) -> anyhow::Result<bool> {
        let target = self.decl.target_path();
        debug!(task = %self.decl.id(), src = %self.src.display(), target = %target.display(), "copying");
        let contents =
            std::fs::read(&self.src).with_context(|| format!("read {}", self.src.display()))?;
        atomic::write_atomic(target, &contents)?;
        Ok(true)
    }

    fn post_check(&mut self, _env: &mut TaskEnv<'_>) -> anyhow::Result<bool> {
        Ok(self.decl.target_path().is_file())
    }
}

// src/task/join.rs

//! `join`: `target` = `src` followed by `join_with`.
//!
//! `join_with` is usually produced by an unrelated path, so the task
//! declares it as a file dependency and the scheduler defers it until the
//! file shows up.

use std::path::PathBuf;

use crate::config::model::{Declaration, RunIdentity};
use crate::errors::{Result, TaskchainError};
use crate::task::{FileDependent, Task, TaskEnv, atomic, params};

pub const JOIN_WITH: &str = "join_with";

#[derive(Debug)]
pub struct JoinTask {
    decl: Declaration,
    src: PathBuf,
    join_with: PathBuf,
}

impl JoinTask {
    pub fn new(decl: &Declaration, identity: &RunIdentity) -> Result<Self> {
        let src = PathBuf::from(params::required_src(decl)?);
        let relative = params::required_str(decl, JOIN_WITH)?;
        if std::path::Path::new(relative).is_absolute() {
            return Err(TaskchainError::validation(
                decl.id().to_string(),
                &[JOIN_WITH],
                "must be relative to run_root",
            ));
        }
        Ok(Self {
            decl: decl.clone(),
            src,
            join_with: identity.root.join(relative),
        })
    }

    pub fn boxed(decl: &Declaration, identity: &RunIdentity) -> Result<Box<dyn Task>> {
        Ok(Box::new(Self::new(decl, identity)?))
    }
}

impl FileDependent for JoinTask {
    fn depends_on_attribute(&self) -> Option<&str> {
        Some(JOIN_WITH)
    }
}

impl Task for JoinTask {
    fn declaration(&self) -> &Declaration {
        &self.decl
    }

    fn pre_check(&mut self, _env: &mut TaskEnv<'_>) -> anyhow::Result<bool> {
        Ok(self.src.is_file() && self.join_with.is_file())
    }

    fn run(&mut self, _env: &mut TaskEnv<'_>) -> anyhow::Result<bool> {
        atomic::concat_atomic(&[&self.src, &self.join_with], self.decl.target_path())?;
        Ok(true)
    }

    fn as_file_dependent(&self) -> Option<&dyn FileDependent> {
        Some(self)
    }
}

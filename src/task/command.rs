// src/task/command.rs

//! `command`: run a shell command that turns `src` into `target`.
//!
//! The command sees `SRC`, `TARGET` and `TARGET_TMP` in its environment and
//! is expected to write `TARGET_TMP`; on success it is renamed to `TARGET`.
//! A command that writes `TARGET` directly is also accepted.

use std::path::PathBuf;
use std::process::Command;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::config::model::{Declaration, RunIdentity};
use crate::errors::Result;
use crate::task::{Task, TaskEnv, atomic, params};

#[derive(Debug)]
pub struct CommandTask {
    decl: Declaration,
    cmd: String,
    src: Option<PathBuf>,
    workdir: PathBuf,
}

impl CommandTask {
    pub fn new(decl: &Declaration, identity: &RunIdentity) -> Result<Self> {
        let cmd = params::required_str(decl, "cmd")?.to_string();
        Ok(Self {
            decl: decl.clone(),
            cmd,
            src: decl.src_path().map(PathBuf::from),
            workdir: identity.root.clone(),
        })
    }

    pub fn boxed(decl: &Declaration, identity: &RunIdentity) -> Result<Box<dyn Task>> {
        Ok(Box::new(Self::new(decl, identity)?))
    }

    fn shell(&self) -> Command {
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        }
    }
}

impl Task for CommandTask {
    fn declaration(&self) -> &Declaration {
        &self.decl
    }

    fn pre_check(&mut self, _env: &mut TaskEnv<'_>) -> anyhow::Result<bool> {
        Ok(self.src.as_ref().is_none_or(|src| src.is_file()))
    }

    fn run(&mut self, _env: &mut TaskEnv<'_>) -> anyhow::Result<bool> {
        let target = self.decl.target_path();
        let tmp = atomic::temp_path_for(target);
        atomic::ensure_parent(target)?;

        let mut cmd = self.shell();
        cmd.current_dir(&self.workdir)
            .env("TARGET", target)
            .env("TARGET_TMP", &tmp);
        if let Some(src) = &self.src {
            cmd.env("SRC", src);
        }

        info!(task = %self.decl.id(), cmd = %self.cmd, "starting command");
        let output = cmd
            .output()
            .with_context(|| format!("spawning process for task '{}'", self.decl.id()))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!(task = %self.decl.id(), "stdout: {}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!(task = %self.decl.id(), "stderr: {}", line);
        }

        if !output.status.success() {
            warn!(
                task = %self.decl.id(),
                exit_code = output.status.code().unwrap_or(-1),
                "command failed"
            );
            let _ = std::fs::remove_file(&tmp);
            return Ok(false);
        }

        if tmp.is_file() {
            atomic::commit(&tmp, target)?;
        }
        Ok(true)
    }

    fn post_check(&mut self, _env: &mut TaskEnv<'_>) -> anyhow::Result<bool> {
        let produced = self.decl.target_path().is_file();
        if !produced {
            warn!(task = %self.decl.id(), target = %self.decl.target, "command exited cleanly but produced no target");
        }
        Ok(produced)
    }
}

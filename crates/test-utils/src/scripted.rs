//! Scripted task kinds for scheduler tests.
//!
//! Behaviour is driven by declaration parameters:
//! - `outcome`: `"ok"` (default), `"fail_pre"`, `"fail_run"`, `"error"`,
//!   `"fail_post"`;
//! - `depends_on`: root-relative file the task waits for;
//! - `inject`: identifiers returned as additional work (cleared on the
//!   injected clones).
//!
//! A successful run writes `target` as the contents of `src` (when it
//! exists) followed by a `<name>` line, so chains can be checked by reading
//! the terminal target.
//!
//! Every lifecycle call is recorded in a shared [`Journal`].

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use taskchain::config::{Declaration, RunIdentity};
use taskchain::errors::Result;
use taskchain::registry::{KindRegistry, KindSpec};
use taskchain::task::{FileDependent, InjectedWork, Task, TaskEnv, TaskInjector};

/// Shared record of lifecycle calls, as `"<event> <kind> <name>"`.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: &str, decl: &Declaration) {
        self.events
            .lock()
            .unwrap()
            .push(format!("{event} {} {}", decl.kind, decl.name));
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Names of tasks whose `run` was called, in order.
    pub fn runs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| {
                e.strip_prefix("run ")
                    .and_then(|rest| rest.split_once(' '))
                    .map(|(_, name)| name.to_string())
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

pub struct ScriptedTask {
    decl: Declaration,
    journal: Journal,
    outcome: String,
    depends_on: bool,
    inject: Vec<String>,
}

impl ScriptedTask {
    pub fn new(decl: &Declaration, journal: Journal) -> Self {
        let inject = decl
            .param("inject")
            .and_then(toml::Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            outcome: decl.param_str("outcome").unwrap_or("ok").to_string(),
            depends_on: decl.param("depends_on").is_some(),
            inject,
            decl: decl.clone(),
            journal,
        }
    }

    fn src(&self) -> Option<PathBuf> {
        self.decl.src_path().map(PathBuf::from)
    }
}

impl Task for ScriptedTask {
    fn declaration(&self) -> &Declaration {
        &self.decl
    }

    fn pre_check(&mut self, _env: &mut TaskEnv<'_>) -> anyhow::Result<bool> {
        self.journal.record("pre", &self.decl);
        Ok(self.outcome != "fail_pre")
    }

    fn run(&mut self, _env: &mut TaskEnv<'_>) -> anyhow::Result<bool> {
        self.journal.record("run", &self.decl);
        match self.outcome.as_str() {
            "fail_run" => return Ok(false),
            "error" => return Err(anyhow!("scripted failure in {}", self.decl.id())),
            _ => {}
        }

        let mut contents = match self.src() {
            Some(src) if src.is_file() => std::fs::read_to_string(src)?,
            _ => String::new(),
        };
        contents.push_str(&self.decl.name);
        contents.push('\n');

        let target = self.decl.target_path();
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(target, contents)?;
        Ok(true)
    }

    fn post_check(&mut self, _env: &mut TaskEnv<'_>) -> anyhow::Result<bool> {
        self.journal.record("post", &self.decl);
        Ok(self.outcome != "fail_post")
    }

    fn as_file_dependent(&self) -> Option<&dyn FileDependent> {
        if self.depends_on { Some(self) } else { None }
    }

    fn as_injector(&mut self) -> Option<&mut dyn TaskInjector> {
        if self.inject.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl FileDependent for ScriptedTask {
    fn depends_on_attribute(&self) -> Option<&str> {
        Some("depends_on")
    }
}

impl TaskInjector for ScriptedTask {
    fn additional_tasks(&mut self, _env: &mut TaskEnv<'_>) -> anyhow::Result<Vec<InjectedWork>> {
        self.journal.record("inject", &self.decl);
        Ok(self
            .inject
            .iter()
            .map(|id| {
                InjectedWork::new(id.clone())
                    .with_override("inject", toml::Value::Array(Vec::new()))
            })
            .collect())
    }
}

fn spec(journal: &Journal) -> KindSpec {
    let journal = journal.clone();
    KindSpec::new(move |decl: &Declaration, _identity: &RunIdentity| -> Result<Box<dyn Task>> {
        Ok(Box::new(ScriptedTask::new(decl, journal.clone())))
    })
}

/// Registry with scripted kinds:
///
/// | kind     | flags             |
/// |----------|-------------------|
/// | `step`   |                   |
/// | `gather` | wildcard source   |
/// | `sink`   | restricted target |
/// | `origin` | no source         |
pub fn registry(journal: &Journal) -> KindRegistry {
    let mut registry = KindRegistry::empty();
    registry
        .register("step", spec(journal))
        .register("gather", spec(journal).wildcard_source())
        .register("sink", spec(journal).restricted_target())
        .register("origin", spec(journal).no_source());
    registry
}

// src/dag/scheduler.rs

//! Sequential path scheduler.
//!
//! The work queue is an append-only list plus a cursor. Paths are visited
//! one at a time, tasks oldest ancestor first. While a path is being
//! processed the queue may grow:
//!
//! - a task waiting for a file from another path re-queues its path behind
//!   the remaining work (deferral). A re-queued path that comes up again
//!   and is still waiting is only re-queued once more if some task ran in
//!   the meantime or fresh work is still queued; otherwise it is abandoned;
//! - a task that injects additional work queues one cloned path per unit,
//!   followed by its own path again (injection).
//!
//! A failing task only ends its own path; sibling paths keep running.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, info_span, warn};

use crate::config::model::{Declaration, RunIdentity};
use crate::dag::paths::TaskPath;
use crate::dag::report::{PathReport, PathStatus, RunReport};
use crate::registry::KindRegistry;
use crate::store::KvStore;
use crate::task::{InjectedWork, Task, TaskEnv, compare_identifiers};

/// A queue entry.
#[derive(Debug, Clone)]
struct QueuedPath {
    path: TaskPath,
    /// Executed-task count at the time the path was re-queued while waiting
    /// for a file. `None` for paths that were never deferred.
    deferred_at: Option<usize>,
}

/// Drives discovered paths through the collaborator lifecycle.
#[derive(Debug)]
pub struct Scheduler<'a> {
    registry: &'a KindRegistry,
    identity: &'a RunIdentity,
}

/// Mutable state of one run.
#[derive(Debug, Default)]
struct RunState {
    queue: Vec<QueuedPath>,
    cursor: usize,
    /// Task identity → identifiers already injected in this run.
    injected: HashMap<String, HashSet<String>>,
    report: RunReport,
}

impl RunState {
    /// Whether anything other than deferred re-tries is still queued.
    fn has_fresh_work_pending(&self) -> bool {
        self.queue[self.cursor + 1..]
            .iter()
            .any(|q| q.deferred_at.is_none())
    }

    /// Whether the path at the cursor may wait for another turn.
    ///
    /// A first-time path waits whenever it is not the last queued entry. A
    /// path that already waited once only waits again if a task ran since it
    /// was re-queued or fresh work is still pending; a full pass without
    /// progress means the file will never show up.
    fn may_wait_again(&self) -> bool {
        match self.queue[self.cursor].deferred_at {
            None => self.cursor + 1 < self.queue.len(),
            Some(at) => self.report.executed > at || self.has_fresh_work_pending(),
        }
    }

    fn push(&mut self, path: TaskPath) {
        self.queue.push(QueuedPath {
            path,
            deferred_at: None,
        });
    }

    fn push_deferred(&mut self, path: TaskPath) {
        let at = self.report.executed;
        self.queue.push(QueuedPath {
            path,
            deferred_at: Some(at),
        });
    }
}

impl<'a> Scheduler<'a> {
    pub fn new(registry: &'a KindRegistry, identity: &'a RunIdentity) -> Self {
        Self { registry, identity }
    }

    /// Process `paths` (and everything they enqueue) to completion.
    pub fn run(&self, paths: Vec<TaskPath>, store: &mut KvStore) -> RunReport {
        let span = info_span!("run", run = %self.identity.name);
        let _guard = span.enter();

        info!(paths = paths.len(), "detected task paths");

        let mut state = RunState {
            report: RunReport::new(paths.len()),
            ..RunState::default()
        };
        for path in paths {
            state.push(path);
        }

        while state.cursor < state.queue.len() {
            let path = state.queue[state.cursor].path.clone();
            info!(
                position = state.cursor + 1,
                queued = state.queue.len(),
                path = %path,
                "running path"
            );

            let status = self.run_path(&path, &mut state, store);
            match &status {
                PathStatus::Failed { task, reason } => warn!(
                    path = %path,
                    task = %task,
                    reason = %reason,
                    "rest of the path skipped"
                ),
                other => debug!(path = %path, status = %other, "path finished"),
            }

            state.report.entries.push(PathReport {
                chain: path.ids(),
                status,
            });
            state.cursor += 1;
        }

        state.report.log_summary();
        state.report
    }

    fn run_path(&self, path: &TaskPath, state: &mut RunState, store: &mut KvStore) -> PathStatus {
        for (index, decl) in path.steps().iter().enumerate() {
            let id = decl.id().to_string();

            let mut task = match self.registry.build(decl, self.identity) {
                Ok(task) => task,
                Err(err) => return failed(&id, format!("could not construct task: {err}")),
            };

            if task.target_exists() {
                debug!(task = %id, target = %decl.target, "target exists; skipping");
                state.report.skipped += 1;
                continue;
            }

            if let Some(status) = self.wait_for_dependency(task.as_ref(), path, state) {
                return status;
            }

            if let Some(status) = self.inject(task.as_mut(), path, index, state, store) {
                return status;
            }

            let mut env = TaskEnv {
                identity: self.identity,
                store: &mut *store,
            };

            match task.pre_check(&mut env) {
                Ok(true) => {}
                Ok(false) => return failed(&id, "pre-check did not pass"),
                Err(err) => return failed(&id, format!("pre-check error: {err:#}")),
            }

            info!(task = %id, "running task");
            match task.run(&mut env) {
                Ok(true) => state.report.executed += 1,
                Ok(false) => return failed(&id, "task did not run successfully"),
                Err(err) => return failed(&id, format!("run error: {err:#}")),
            }

            match task.post_check(&mut env) {
                Ok(true) => {}
                Ok(false) => return failed(&id, "post-check did not pass"),
                Err(err) => return failed(&id, format!("post-check error: {err:#}")),
            }
        }

        PathStatus::Completed
    }

    /// `Some(status)` when the path has to stop because a file it depends on
    /// is missing.
    fn wait_for_dependency(
        &self,
        task: &dyn Task,
        path: &TaskPath,
        state: &mut RunState,
    ) -> Option<PathStatus> {
        let decl = task.declaration();
        let attribute = task.as_file_dependent()?.depends_on_attribute()?;

        let Some(file) = decl.param_path(attribute, &self.identity.root) else {
            return Some(failed(
                &decl.id().to_string(),
                format!("depends on '{attribute}' but it is not set"),
            ));
        };
        let waiting_for = file.to_string_lossy().into_owned();

        if file.is_file() {
            info!(task = %decl.id(), file = %waiting_for, "depending file is ready");
            return None;
        }

        if state.may_wait_again() {
            info!(
                task = %decl.id(),
                file = %waiting_for,
                "depending file not there yet; path continues after the other paths"
            );
            state.push_deferred(path.clone());
            Some(PathStatus::Deferred { waiting_for })
        } else {
            warn!(
                task = %decl.id(),
                file = %waiting_for,
                "depending file was never generated and no remaining path made progress"
            );
            Some(PathStatus::Abandoned { waiting_for })
        }
    }

    /// `Some(status)` when the task injected work and the path was re-queued.
    fn inject(
        &self,
        task: &mut dyn Task,
        path: &TaskPath,
        index: usize,
        state: &mut RunState,
        store: &mut KvStore,
    ) -> Option<PathStatus> {
        let id = task.declaration().id().to_string();
        let injector = task.as_injector()?;

        let mut env = TaskEnv {
            identity: self.identity,
            store,
        };
        let work = match injector.additional_tasks(&mut env) {
            Ok(work) => work,
            Err(err) => return Some(failed(&id, format!("injection error: {err:#}"))),
        };

        let seen = state.injected.entry(id.clone()).or_default();
        let mut fresh: Vec<InjectedWork> = work
            .into_iter()
            .filter(|w| seen.insert(w.identifier.clone()))
            .collect();
        if fresh.is_empty() {
            debug!(task = %id, "no additional paths");
            return None;
        }

        fresh.sort_by(|a, b| compare_identifiers(&a.identifier, &b.identifier));
        info!(
            task = %id,
            additional = fresh.len(),
            identifiers = ?fresh.iter().map(|w| w.identifier.as_str()).collect::<Vec<_>>(),
            "extending the run with additional paths"
        );

        let count = fresh.len();
        for work in &fresh {
            state.push(clone_for_injection(path, index, work));
        }
        state.push(path.clone());

        Some(PathStatus::Injected { task: id, count })
    }
}

/// Clone `path` for one unit of injected work.
///
/// Tasks before the injector are kept as they are. The injector gets its
/// name and target suffixed plus the unit's overrides. Later tasks get name,
/// source and target suffixed so they chain onto the injector's new target.
pub fn clone_for_injection(path: &TaskPath, injector: usize, work: &InjectedWork) -> TaskPath {
    let steps = path
        .steps()
        .iter()
        .enumerate()
        .map(|(index, decl)| match index.cmp(&injector) {
            std::cmp::Ordering::Less => decl.clone(),
            std::cmp::Ordering::Equal => with_overrides(decl.with_suffix(&work.identifier, false), work),
            std::cmp::Ordering::Greater => decl.with_suffix(&work.identifier, true),
        })
        .collect();
    TaskPath::new(steps)
}

fn with_overrides(mut decl: Declaration, work: &InjectedWork) -> Declaration {
    for (key, value) in &work.overrides {
        decl.params.insert(key.clone(), value.clone());
    }
    decl
}

fn failed(task: &str, reason: impl Into<String>) -> PathStatus {
    PathStatus::Failed {
        task: task.to_string(),
        reason: reason.into(),
    }
}

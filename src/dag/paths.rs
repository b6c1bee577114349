// src/dag/paths.rs

//! Task path discovery.
//!
//! A *path* is a chain of declarations linked by `target` → `src`, stored
//! oldest ancestor first. Paths are found by locating terminal declarations
//! (targets nobody consumes) and walking backwards through producers.
//!
//! For a wildcard-source declaration the producer is the declaration whose
//! target glob-matches its `src`. A wildcard source with more than one
//! declared producer is rejected; there is no sensible order to pick one.

use std::fmt;

use globset::GlobMatcher;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, info};

use crate::config::model::{Declaration, DeclarationSet};
use crate::dag::patterns::compile_glob;
use crate::errors::{Result, TaskchainError};
use crate::registry::KindRegistry;

/// Ordered chain of declarations, oldest ancestor first.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPath {
    steps: Vec<Declaration>,
}

impl TaskPath {
    pub fn new(steps: Vec<Declaration>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Declaration] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The declaration nobody consumes.
    pub fn terminal(&self) -> Option<&Declaration> {
        self.steps.last()
    }

    /// Task identities, oldest first.
    pub fn ids(&self) -> Vec<String> {
        self.steps.iter().map(|d| d.id().to_string()).collect()
    }
}

impl fmt::Display for TaskPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ids().join(" -> "))
    }
}

/// Producer lookup over one declaration set.
struct Linker<'a> {
    declarations: &'a [Declaration],
    /// Compiled `src` pattern for wildcard-source declarations.
    matchers: Vec<Option<GlobMatcher>>,
}

impl<'a> Linker<'a> {
    fn new(set: &'a DeclarationSet, registry: &KindRegistry) -> Result<Self> {
        let declarations = set.declarations();
        let mut matchers = Vec::with_capacity(declarations.len());
        for decl in declarations {
            let matcher = match decl.src.as_deref() {
                Some(src) if registry.spec_for(decl)?.is_wildcard_source() => {
                    Some(compile_glob(src)?)
                }
                _ => None,
            };
            matchers.push(matcher);
        }
        Ok(Self {
            declarations,
            matchers,
        })
    }

    /// Whether `index`'s target is never consumed by another declaration.
    fn is_terminal(&self, index: usize) -> bool {
        let target = &self.declarations[index].target;
        !self.declarations.iter().enumerate().any(|(other, decl)| {
            other != index
                && (decl.src.as_deref() == Some(target.as_str())
                    || self.matchers[other]
                        .as_ref()
                        .is_some_and(|m| m.is_match(target)))
        })
    }

    /// First declaration (in declaration order) producing `index`'s source.
    fn producer_of(&self, index: usize) -> Result<Option<usize>> {
        let decl = &self.declarations[index];
        let Some(src) = decl.src.as_deref() else {
            return Ok(None);
        };

        let mut producers = self
            .declarations
            .iter()
            .enumerate()
            .filter(|(other, candidate)| {
                *other != index
                    && match &self.matchers[index] {
                        Some(matcher) => matcher.is_match(&candidate.target),
                        None => candidate.target == src,
                    }
            })
            .map(|(other, _)| other);

        let first = producers.next();
        if let (Some(first), Some(second)) = (first, producers.next()) {
            return Err(TaskchainError::config(format!(
                "task '{}': wildcard source '{}' matches the targets of both '{}' and '{}'; \
                 a source may have at most one declared producer",
                decl.id(),
                src,
                self.declarations[first].id(),
                self.declarations[second].id()
            )));
        }
        Ok(first)
    }
}

/// Discover every path in `set`, in terminal-declaration order.
///
/// Fails with [`TaskchainError::PathCycle`] when producers form a cycle or a
/// declaration ends up on no path at all.
pub fn discover_paths(set: &DeclarationSet, registry: &KindRegistry) -> Result<Vec<TaskPath>> {
    let linker = Linker::new(set, registry)?;
    let declarations = set.declarations();

    let mut producers = Vec::with_capacity(declarations.len());
    for index in 0..declarations.len() {
        producers.push(linker.producer_of(index)?);
    }
    ensure_acyclic(declarations, &producers)?;

    let mut paths = Vec::new();
    let mut covered = vec![false; declarations.len()];

    for terminal in (0..declarations.len()).filter(|&i| linker.is_terminal(i)) {
        let mut chain = vec![terminal];
        let mut current = terminal;

        while let Some(producer) = producers[current] {
            if chain.len() > declarations.len() {
                return Err(TaskchainError::PathCycle(format!(
                    "walk from '{}' did not terminate",
                    declarations[terminal].id()
                )));
            }
            chain.push(producer);
            current = producer;
        }

        chain.reverse();
        for &index in &chain {
            covered[index] = true;
        }
        let path = TaskPath::new(chain.into_iter().map(|i| declarations[i].clone()).collect());
        debug!(path = %path, "path discovered");
        paths.push(path);
    }

    if let Some(orphan) = covered.iter().position(|c| !c) {
        return Err(TaskchainError::PathCycle(format!(
            "task '{}' is not reachable from any terminal task",
            declarations[orphan].id()
        )));
    }

    info!(run = %set.identity().name, paths = paths.len(), "task paths discovered");
    Ok(paths)
}

/// Producer → consumer edges must form a DAG.
fn ensure_acyclic(declarations: &[Declaration], producers: &[Option<usize>]) -> Result<()> {
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for index in 0..declarations.len() {
        graph.add_node(index);
    }
    for (consumer, producer) in producers.iter().enumerate() {
        if let Some(producer) = producer {
            graph.add_edge(*producer, consumer, ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(TaskchainError::PathCycle(format!(
            "source/target chain loops through task '{}'",
            declarations[cycle.node_id()].id()
        ))),
    }
}

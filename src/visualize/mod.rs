// src/visualize/mod.rs

//! Path visualization.
//!
//! Renders the discovered paths to `<run_root>/paths_<run_name>.html` and to
//! a plain-text listing. A task that already appeared in an earlier path is
//! marked as shared instead of being repeated. File dependencies (such as
//! `join_with`) are shown together with the task producing the file.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use minijinja::{Environment, context};
use serde::Serialize;
use tracing::info;

use crate::config::model::{Declaration, DeclarationSet, RunIdentity};
use crate::dag::TaskPath;
use crate::errors::Result;
use crate::registry::KindRegistry;

const PATHS_TEMPLATE: &str = include_str!("paths.html");

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PathView {
    pub steps: Vec<StepView>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StepView {
    pub kind: String,
    pub name: String,
    pub target: String,
    /// Already rendered as part of an earlier path.
    pub shared: bool,
    /// Terminal task of its path.
    pub last: bool,
    pub dependency: Option<DependencyView>,
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DependencyView {
    pub attribute: String,
    pub file: String,
    /// `"<kind> <name>"` of the declaration producing the file.
    pub producer: Option<String>,
}

/// Turn discovered paths into renderable views.
pub fn prepare(
    set: &DeclarationSet,
    registry: &KindRegistry,
    paths: &[TaskPath],
) -> Result<Vec<PathView>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut views = Vec::with_capacity(paths.len());

    for path in paths {
        let mut steps = Vec::with_capacity(path.len());
        for (index, decl) in path.steps().iter().enumerate() {
            let id = decl.id().to_string();
            steps.push(StepView {
                kind: decl.kind.clone(),
                name: decl.name.clone(),
                target: decl.target.clone(),
                shared: !seen.insert(id),
                last: index + 1 == path.len(),
                dependency: dependency_of(set, registry, decl)?,
                params: decl
                    .params
                    .iter()
                    .map(|(k, v)| (k.clone(), display_value(v)))
                    .collect(),
            });
        }
        views.push(PathView { steps });
    }

    Ok(views)
}

fn dependency_of(
    set: &DeclarationSet,
    registry: &KindRegistry,
    decl: &Declaration,
) -> Result<Option<DependencyView>> {
    let task = registry.build(decl, set.identity())?;
    let Some(attribute) = task.as_file_dependent().and_then(|d| d.depends_on_attribute()) else {
        return Ok(None);
    };
    let Some(file) = decl.param_path(attribute, &set.identity().root) else {
        return Ok(None);
    };
    let file = file.to_string_lossy().into_owned();
    let producer = set
        .declarations()
        .iter()
        .find(|other| other.target == file)
        .map(|other| other.id().to_string());

    Ok(Some(DependencyView {
        attribute: attribute.to_string(),
        file,
        producer,
    }))
}

fn display_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render the HTML page.
pub fn render_html(
    identity: &RunIdentity,
    views: &[PathView],
    generated_at: DateTime<Local>,
) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("paths", PATHS_TEMPLATE)?;
    let template = env.get_template("paths")?;
    let rendered = template.render(context! {
        run_name => identity.name.as_str(),
        run_root => identity.root.to_string_lossy(),
        generated_at => generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        paths => views,
    })?;
    Ok(rendered)
}

/// Plain-text listing, one block per path.
pub fn render_text(views: &[PathView]) -> String {
    let mut out = String::new();
    for (index, view) in views.iter().enumerate() {
        let _ = writeln!(out, "path {}:", index + 1);
        for step in &view.steps {
            let marker = if step.shared { " (shared)" } else { "" };
            let _ = writeln!(out, "  {} {} -> {}{}", step.kind, step.name, step.target, marker);
            if let Some(dep) = &step.dependency {
                let producer = dep.producer.as_deref().unwrap_or("not produced by any task");
                let _ = writeln!(out, "      needs {} = {} ({})", dep.attribute, dep.file, producer);
            }
        }
    }
    out
}

/// Location of the HTML page for `identity`.
pub fn html_path(identity: &RunIdentity) -> PathBuf {
    let name: String = identity.name.chars().filter(|c| !c.is_whitespace()).collect();
    identity.root.join(format!("paths_{name}.html"))
}

/// Render both forms, write the HTML page and return its location together
/// with the text listing.
pub fn visualize(
    set: &DeclarationSet,
    registry: &KindRegistry,
    paths: &[TaskPath],
) -> Result<(PathBuf, String)> {
    let views = prepare(set, registry, paths)?;
    let html = render_html(set.identity(), &views, Local::now())?;
    let path = html_path(set.identity());
    fs::write(&path, html)?;
    info!(path = ?path, paths = views.len(), "paths visualized");
    Ok((path, render_text(&views)))
}

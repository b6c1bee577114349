// src/config/validate.rs

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::model::{
    Declaration, DeclarationSet, RESERVED_ATTRIBUTES, RawDeclaration, RawDeclarationFile,
    RunIdentity,
};
use crate::dag::patterns::{compile_glob, existing_matches};
use crate::errors::{Result, TaskchainError};
use crate::registry::KindRegistry;

impl DeclarationSet {
    /// Run the structural checks that do not need the kind registry and
    /// resolve `src` / `target` against the run root.
    pub fn from_raw(raw: RawDeclarationFile, source_text: String) -> Result<Self> {
        let identity = validate_identity(&raw)?;
        ensure_has_tasks(&raw)?;

        let mut declarations = Vec::with_capacity(raw.task.len());
        for (index, entry) in raw.task.into_iter().enumerate() {
            declarations.push(resolve_declaration(index, entry, &identity.root)?);
        }

        ensure_unique_identities(&declarations)?;
        ensure_unique_targets(&declarations)?;

        Ok(DeclarationSet::new_unchecked(identity, declarations, source_text))
    }
}

fn validate_identity(raw: &RawDeclarationFile) -> Result<RunIdentity> {
    let name = match raw.run_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            return Err(TaskchainError::config(
                "declarations need a run name (run_name = \"...\")",
            ));
        }
    };

    let root = match raw.run_root.as_deref().map(str::trim) {
        Some(root) if !root.is_empty() => Path::new(root).to_path_buf(),
        _ => {
            return Err(TaskchainError::config(
                "declarations need a run root directory (run_root = \"/abs/path\")",
            ));
        }
    };

    if !root.is_absolute() {
        return Err(TaskchainError::config(format!(
            "run_root {:?} must be an absolute path",
            root
        )));
    }
    if !root.is_dir() {
        return Err(TaskchainError::config(format!(
            "run_root {:?} does not exist; please create it",
            root
        )));
    }

    Ok(RunIdentity { name, root })
}

fn ensure_has_tasks(raw: &RawDeclarationFile) -> Result<()> {
    if raw.task.is_empty() {
        return Err(TaskchainError::config(
            "declarations must contain at least one [[task]] entry",
        ));
    }
    Ok(())
}

fn resolve_declaration(index: usize, entry: RawDeclaration, root: &Path) -> Result<Declaration> {
    let label = |field: &str| format!("[[task]] #{} is missing '{}'", index + 1, field);

    let kind = non_empty(entry.kind.as_deref()).ok_or_else(|| TaskchainError::config(label("kind")))?;
    let name = non_empty(entry.name.as_deref()).ok_or_else(|| TaskchainError::config(label("name")))?;
    let id = format!("{kind} {name}");

    if kind.contains(char::is_whitespace) || name.contains(char::is_whitespace) {
        return Err(TaskchainError::config(format!(
            "task '{id}': kind and name must not contain whitespace"
        )));
    }

    if let Some(reserved) = RESERVED_ATTRIBUTES
        .iter()
        .find(|attr| entry.params.contains_key(**attr))
    {
        return Err(TaskchainError::config(format!(
            "task '{id}' cannot define the reserved attribute '{reserved}' \
             (reserved: {})",
            RESERVED_ATTRIBUTES.join(", ")
        )));
    }

    let target = non_empty(entry.target.as_deref())
        .ok_or_else(|| TaskchainError::config(format!("task '{id}' is missing 'target'")))?;
    let target = resolve_path(&id, "target", target, root)?;

    let src = match non_empty(entry.src.as_deref()) {
        Some(src) => Some(resolve_path(&id, "src", src, root)?),
        None => None,
    };

    Ok(Declaration {
        kind: kind.to_lowercase(),
        name: name.to_string(),
        src,
        target,
        params: entry.params,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn resolve_path(id: &str, field: &str, value: &str, root: &Path) -> Result<String> {
    let path = Path::new(value);
    if path.is_absolute() {
        return Err(TaskchainError::config(format!(
            "task '{id}': {field} '{value}' is absolute; use a path relative to run_root"
        )));
    }
    if path.extension().is_none() {
        return Err(TaskchainError::config(format!(
            "task '{id}': {field} '{value}' needs a file extension"
        )));
    }
    Ok(root.join(path).to_string_lossy().into_owned())
}

fn ensure_unique_identities(declarations: &[Declaration]) -> Result<()> {
    let mut seen = HashSet::new();
    for decl in declarations {
        if !seen.insert((decl.kind.as_str(), decl.name.as_str())) {
            return Err(TaskchainError::config(format!(
                "task '{}' is declared more than once",
                decl.id()
            )));
        }
    }
    Ok(())
}

fn ensure_unique_targets(declarations: &[Declaration]) -> Result<()> {
    let mut seen = HashSet::new();
    for decl in declarations {
        if !seen.insert(decl.target.as_str()) {
            return Err(TaskchainError::config(format!(
                "task '{}': target '{}' is already produced by another task; every target must be unique",
                decl.id(),
                decl.target
            )));
        }
    }
    Ok(())
}

/// Kind-aware validation.
///
/// Checks kinds, sources and restricted targets, then constructs every
/// collaborator so that per-task parameter validation happens before
/// anything runs.
pub fn validate_with_registry(set: &DeclarationSet, registry: &KindRegistry) -> Result<()> {
    info!(
        run = %set.identity().name,
        declarations = set.declarations().len(),
        "validating declarations"
    );

    for decl in set.declarations() {
        let spec = registry.spec_for(decl)?;

        if spec.is_restricted_target() {
            ensure_target_not_consumed(set, registry, decl)?;
        }

        match decl.src.as_deref() {
            None if !spec.is_no_source() => {
                return Err(TaskchainError::config(format!(
                    "task '{}' needs a 'src' (kind '{}' is not a no-source kind)",
                    decl.id(),
                    decl.kind
                )));
            }
            None => {}
            Some(_) if spec.is_no_source() => {
                debug!(task = %decl.id(), "no-source kind with a src; leaving it to the task");
            }
            Some(src) => validate_source(set, decl, src, spec.is_wildcard_source())?,
        }

        let task = registry.build(decl, set.identity())?;

        if let Some(attribute) = task.as_file_dependent().and_then(|d| d.depends_on_attribute()) {
            ensure_dependency_reachable(set, decl, attribute)?;
        }
    }

    info!(run = %set.identity().name, "declarations verified");
    Ok(())
}

fn validate_source(set: &DeclarationSet, decl: &Declaration, src: &str, wildcard: bool) -> Result<()> {
    if Path::new(src).is_file() {
        if set.is_declared_target(src) {
            warn!(
                task = %decl.id(),
                src,
                "source already exists and is also a declared target; it will be overwritten when its producer runs"
            );
        }
        return Ok(());
    }

    if set.is_declared_target(src) {
        return Ok(());
    }

    if wildcard {
        let matcher = compile_glob(src)?;
        let produced = set
            .declarations()
            .iter()
            .any(|other| other.target != decl.target && matcher.is_match(&other.target));
        if produced || !existing_matches(src)?.is_empty() {
            return Ok(());
        }
        return Err(TaskchainError::config(format!(
            "task '{}': wildcard source '{}' matches no declared target and no existing file",
            decl.id(),
            src
        )));
    }

    Err(TaskchainError::config(format!(
        "task '{}': source '{}' does not exist and no task produces it",
        decl.id(),
        src
    )))
}

fn ensure_target_not_consumed(
    set: &DeclarationSet,
    registry: &KindRegistry,
    decl: &Declaration,
) -> Result<()> {
    for other in set.declarations() {
        if other.target == decl.target {
            continue;
        }
        let Some(src) = other.src.as_deref() else {
            continue;
        };

        let consumed = if src == decl.target {
            true
        } else if registry.is_wildcard_source(&other.kind) {
            compile_glob(src)?.is_match(&decl.target)
        } else {
            false
        };

        if consumed {
            return Err(TaskchainError::config(format!(
                "task '{}' has a restricted target but '{}' uses it as its source",
                decl.id(),
                other.id()
            )));
        }
    }
    Ok(())
}

fn ensure_dependency_reachable(set: &DeclarationSet, decl: &Declaration, attribute: &str) -> Result<()> {
    let Some(path) = decl.param_path(attribute, &set.identity().root) else {
        return Err(TaskchainError::validation(
            decl.id().to_string(),
            &[attribute],
            "task depends on this attribute but it is not set",
        ));
    };

    let path_str = path.to_string_lossy();
    if path.is_file() || set.is_declared_target(&path_str) {
        return Ok(());
    }

    Err(TaskchainError::config(format!(
        "task '{}' depends on '{}' ({}) which does not exist and is not produced by any task",
        decl.id(),
        path_str,
        attribute
    )))
}

// src/config/model.rs

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Run-level fields that no declaration may define for itself.
pub const RESERVED_ATTRIBUTES: [&str; 3] = ["run_name", "run_root", "task_name"];

/// Declaration file as read from TOML (after placeholder substitution).
///
/// ```toml
/// run_name = "demo"
/// run_root = "/srv/runs/demo"
///
/// [[task]]
/// kind = "copy"
/// name = "ingest"
/// src = "in.json"
/// target = "mid.json"
///
/// [[task]]
/// kind = "command"
/// name = "shape"
/// src = "mid.json"
/// target = "out.json"
/// cmd = "jq -c . \"$SRC\" > \"$TARGET_TMP\""
/// ```
///
/// Nothing is validated yet; see [`DeclarationSet::from_raw`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawDeclarationFile {
    #[serde(default)]
    pub run_name: Option<String>,

    #[serde(default)]
    pub run_root: Option<String>,

    /// `[[task]]` entries in declaration order.
    #[serde(default)]
    pub task: Vec<RawDeclaration>,
}

/// A single `[[task]]` entry.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawDeclaration {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub src: Option<String>,
    pub target: Option<String>,

    /// Everything else: kind-specific parameters.
    #[serde(flatten)]
    pub params: toml::Table,
}

/// Identity of a run: its name and the absolute directory it works in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdentity {
    pub name: String,
    pub root: PathBuf,
}

/// A validated task declaration.
///
/// `src` and `target` are absolute (joined onto the run root). For
/// wildcard-source kinds `src` is a glob pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub kind: String,
    pub name: String,
    pub src: Option<String>,
    pub target: String,
    pub params: toml::Table,
}

impl Declaration {
    /// `"<kind> <name>"`.
    pub fn id(&self) -> TaskId<'_> {
        TaskId {
            kind: &self.kind,
            name: &self.name,
        }
    }

    pub fn target_path(&self) -> &Path {
        Path::new(&self.target)
    }

    pub fn src_path(&self) -> Option<&Path> {
        self.src.as_deref().map(Path::new)
    }

    pub fn param(&self, key: &str) -> Option<&toml::Value> {
        self.params.get(key)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(toml::Value::as_str)
    }

    /// Resolve a root-relative path parameter. Absolute values are returned
    /// as they are.
    pub fn param_path(&self, key: &str, root: &Path) -> Option<PathBuf> {
        self.param_str(key).map(|value| root.join(value))
    }

    /// Clone this declaration for one unit of injected work.
    ///
    /// `name` and `target` always get the identifier appended; `src` only
    /// when `suffix_src` is set.
    pub fn with_suffix(&self, identifier: &str, suffix_src: bool) -> Declaration {
        let mut cloned = self.clone();
        cloned.name = format!("{}-{}", self.name, identifier);
        cloned.target = suffix_file_name(&self.target, identifier);
        if suffix_src {
            cloned.src = self.src.as_deref().map(|src| suffix_file_name(src, identifier));
        }
        cloned
    }
}

/// Borrowed `"<kind> <name>"` identity, used in logs and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskId<'a> {
    pub kind: &'a str,
    pub name: &'a str,
}

impl fmt::Display for TaskId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// Validated declarations for one run.
#[derive(Debug, Clone)]
pub struct DeclarationSet {
    identity: RunIdentity,
    declarations: Vec<Declaration>,
    /// Declaration text before placeholder substitution (checksum input).
    source_text: String,
}

impl DeclarationSet {
    /// Construct without validation. Prefer [`DeclarationSet::from_raw`].
    pub(crate) fn new_unchecked(
        identity: RunIdentity,
        declarations: Vec<Declaration>,
        source_text: String,
    ) -> Self {
        Self {
            identity,
            declarations,
            source_text,
        }
    }

    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn find(&self, kind: &str, name: &str) -> Option<&Declaration> {
        self.declarations
            .iter()
            .find(|d| d.kind == kind && d.name == name)
    }

    /// Whether any declaration produces `target`.
    pub fn is_declared_target(&self, target: &str) -> bool {
        self.declarations.iter().any(|d| d.target == target)
    }
}

/// Insert `suffix` between the file stem and the extension:
/// `/run/out.json` + `42` → `/run/out42.json`.
pub fn suffix_file_name(path: &str, suffix: &str) -> String {
    let file_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[file_start..].rfind('.') {
        Some(dot) if dot > 0 => {
            let dot = file_start + dot;
            format!("{}{}{}", &path[..dot], suffix, &path[dot..])
        }
        _ => format!("{path}{suffix}"),
    }
}

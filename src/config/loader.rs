// src/config/loader.rs

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{DeclarationSet, RawDeclarationFile};
use crate::config::placeholders::substitute;
use crate::errors::{Result, TaskchainError};

/// Read the raw declaration text from disk.
pub fn read_source(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(TaskchainError::config(format!(
            "declaration file {:?} does not exist",
            path
        )));
    }
    Ok(fs::read_to_string(path)?)
}

/// Substitute placeholders and deserialize, without semantic validation.
pub fn parse_raw(text: &str, placeholders: &BTreeMap<String, String>) -> Result<RawDeclarationFile> {
    let substituted = substitute(text, placeholders)?;
    let raw: RawDeclarationFile = toml::from_str(&substituted)?;
    Ok(raw)
}

/// Parse declaration text and run the structural checks.
///
/// The returned set keeps the original text (before placeholder
/// substitution) for the checksum guard.
pub fn parse_declarations(
    text: &str,
    placeholders: &BTreeMap<String, String>,
) -> Result<DeclarationSet> {
    let raw = parse_raw(text, placeholders)?;
    DeclarationSet::from_raw(raw, text.to_string())
}

/// Load a declaration file from disk and run the structural checks.
///
/// This is the recommended entry point:
///
/// - reads the file,
/// - substitutes `{{placeholders}}`,
/// - deserializes TOML,
/// - checks run identity, targets, extensions and reserved attributes.
///
/// Kind-aware checks need the registry and live in
/// [`validate_with_registry`](crate::config::validate_with_registry).
pub fn load_declarations(
    path: impl AsRef<Path>,
    placeholders: &BTreeMap<String, String>,
) -> Result<DeclarationSet> {
    let path = path.as_ref();
    let text = read_source(path)?;
    let set = parse_declarations(&text, placeholders)?;
    debug!(
        path = ?path,
        declarations = set.declarations().len(),
        "declarations loaded"
    );
    Ok(set)
}

// src/dag/patterns.rs

//! Glob helpers for wildcard-source kinds.
//!
//! Patterns are absolute (joined onto the run root) and use `*` the way
//! shell `fnmatch` does: it also crosses `/`.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};

use crate::errors::{Result, TaskchainError};

const GLOB_META: [char; 4] = ['*', '?', '[', '{'];

/// Compile a single glob pattern.
pub fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    let glob = Glob::new(pattern).map_err(|e| {
        TaskchainError::config(format!("invalid wildcard pattern '{pattern}': {e}"))
    })?;
    Ok(glob.compile_matcher())
}

/// Whether `pattern` contains glob metacharacters at all.
pub fn is_pattern(pattern: &str) -> bool {
    pattern.contains(GLOB_META)
}

/// Longest directory prefix of `pattern` that contains no metacharacters.
fn literal_base(pattern: &str) -> PathBuf {
    let literal_end = pattern.find(GLOB_META).unwrap_or(pattern.len());
    match pattern[..literal_end].rfind('/') {
        Some(0) => PathBuf::from("/"),
        Some(slash) => PathBuf::from(&pattern[..slash]),
        None => PathBuf::from("."),
    }
}

/// Collect existing files matching `pattern`, sorted.
///
/// Only the directory tree below the pattern's literal prefix is walked.
pub fn existing_matches(pattern: &str) -> Result<Vec<PathBuf>> {
    if !is_pattern(pattern) {
        let path = Path::new(pattern);
        return Ok(if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let matcher = compile_glob(pattern)?;
    let base = literal_base(pattern);
    if !base.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let mut stack = vec![base];

    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() && matcher.is_match(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_like_fnmatch() {
        let m = compile_glob("/run/out_*.json").unwrap();
        assert!(m.is_match("/run/out_1.json"));
        assert!(m.is_match("/run/out_a/b.json"));
        assert!(!m.is_match("/run/out.json"));
    }

    #[test]
    fn literal_base_stops_before_first_metacharacter() {
        assert_eq!(literal_base("/run/data/out_*.json"), PathBuf::from("/run/data"));
        assert_eq!(literal_base("/run/*/x.json"), PathBuf::from("/run"));
        assert_eq!(literal_base("/*.json"), PathBuf::from("/"));
    }

    #[test]
    fn existing_matches_walks_below_the_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("out_1.json"), "1").unwrap();
        std::fs::write(dir.path().join("nested/out_2.json"), "2").unwrap();
        std::fs::write(dir.path().join("other.json"), "x").unwrap();

        let pattern = format!("{}/*out_*.json", dir.path().display());
        let found = existing_matches(&pattern).unwrap();

        assert_eq!(
            found,
            vec![dir.path().join("nested/out_2.json"), dir.path().join("out_1.json")]
        );
    }
}

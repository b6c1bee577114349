// src/task/atomic.rs

//! Atomic target writes.
//!
//! The existence check treats any present target as complete, so targets are
//! always written to a temporary sibling first and renamed into place.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Temporary sibling used while `target` is being produced.
pub fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    target.with_file_name(name)
}

/// Move a finished temporary file into place.
pub fn commit(tmp: &Path, target: &Path) -> Result<()> {
    fs::rename(tmp, target)
        .with_context(|| format!("replace {} with {}", target.display(), tmp.display()))
}

/// Write `contents` to `target` atomically.
pub fn write_atomic(target: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent(target)?;
    let tmp = temp_path_for(target);
    fs::write(&tmp, contents).with_context(|| format!("write temp file {}", tmp.display()))?;
    commit(&tmp, target)
}

/// Write the concatenation of `sources` to `target` atomically.
pub fn concat_atomic<P: AsRef<Path>>(sources: &[P], target: &Path) -> Result<()> {
    ensure_parent(target)?;
    let tmp = temp_path_for(target);
    {
        let mut out = fs::File::create(&tmp)
            .with_context(|| format!("create temp file {}", tmp.display()))?;
        for source in sources {
            let source = source.as_ref();
            let mut input = fs::File::open(source)
                .with_context(|| format!("open {}", source.display()))?;
            std::io::copy(&mut input, &mut out)
                .with_context(|| format!("copy {} into {}", source.display(), tmp.display()))?;
        }
        out.flush()?;
    }
    commit(&tmp, target)
}

pub fn ensure_parent(target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    Ok(())
}

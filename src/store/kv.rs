// src/store/kv.rs

//! Durable key/value store backing the checksum guard and task bookkeeping.
//!
//! The store lives at `<dir>/<name>.state.toml`:
//!
//! ```toml
//! [root]
//! run_checksum = "5f1d..."
//!
//! [sections.fetch]
//! newest_processed_id = "20180414"
//! processed_ids = ["20180413", "20180414"]
//! ```
//!
//! Mutations stay in memory until [`KvStore::flush`] is called (or `put` is
//! called with `force = true`). [`KvStore::reload`] throws away anything that
//! was not flushed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{Result, TaskchainError};

/// File suffix appended to the run name.
pub const STORE_FILE_SUFFIX: &str = ".state.toml";

/// A stored value: a single string or an ordered list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreValue {
    Text(String),
    List(Vec<String>),
}

impl StoreValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StoreValue::Text(s) => Some(s),
            StoreValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            StoreValue::List(items) => Some(items),
            StoreValue::Text(_) => None,
        }
    }
}

impl From<String> for StoreValue {
    fn from(value: String) -> Self {
        StoreValue::Text(value)
    }
}

impl From<&str> for StoreValue {
    fn from(value: &str) -> Self {
        StoreValue::Text(value.to_string())
    }
}

impl From<Vec<String>> for StoreValue {
    fn from(value: Vec<String>) -> Self {
        StoreValue::List(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    root: BTreeMap<String, StoreValue>,
    #[serde(default)]
    sections: BTreeMap<String, BTreeMap<String, StoreValue>>,
}

/// Key/value store for one run directory.
#[derive(Debug)]
pub struct KvStore {
    path: PathBuf,
    data: StoreData,
}

impl KvStore {
    /// Open (or create empty) the store for run `name` inside `dir`.
    ///
    /// `dir` must already exist; only the backing file is created.
    pub fn open(dir: impl AsRef<Path>, name: &str) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(TaskchainError::config(format!(
                "cannot open state store: directory {:?} does not exist",
                dir
            )));
        }

        let path = dir.join(format!("{name}{STORE_FILE_SUFFIX}"));
        let mut store = Self {
            path,
            data: StoreData::default(),
        };

        if store.path.is_file() {
            store.data = read_data(&store.path)?;
        } else {
            store.flush()?;
        }

        debug!(path = ?store.path, "state store opened");
        Ok(store)
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up `key`, either at the root level or inside `section`.
    pub fn get(&self, key: &str, section: Option<&str>) -> Option<&StoreValue> {
        match section {
            Some(section) => self.data.sections.get(section)?.get(key),
            None => self.data.root.get(key),
        }
    }

    /// Like [`get`](Self::get) but only returns text values.
    pub fn get_text(&self, key: &str, section: Option<&str>) -> Option<&str> {
        self.get(key, section).and_then(StoreValue::as_text)
    }

    /// Like [`get`](Self::get) but only returns list values.
    pub fn get_list(&self, key: &str, section: Option<&str>) -> Option<&[String]> {
        self.get(key, section).and_then(StoreValue::as_list)
    }

    /// Set `key` to `value`. With `force`, the store is flushed right away.
    pub fn put(
        &mut self,
        key: &str,
        value: impl Into<StoreValue>,
        section: Option<&str>,
        force: bool,
    ) -> Result<()> {
        let value = value.into();
        match section {
            Some(section) => {
                self.data
                    .sections
                    .entry(section.to_string())
                    .or_default()
                    .insert(key.to_string(), value);
            }
            None => {
                self.data.root.insert(key.to_string(), value);
            }
        }

        if force {
            self.flush()?;
        }
        Ok(())
    }

    /// Persist the in-memory state (temp file + rename).
    pub fn flush(&self) -> Result<()> {
        let contents = toml::to_string(&self.data)?;
        let tmp_path = self.path.with_extension("toml.tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, &self.path)?;
        debug!(path = ?self.path, "state store flushed");
        Ok(())
    }

    /// Drop unflushed mutations and re-read the backing file.
    pub fn reload(&mut self) -> Result<()> {
        self.data = if self.path.is_file() {
            read_data(&self.path)?
        } else {
            StoreData::default()
        };
        debug!(path = ?self.path, "state store reloaded");
        Ok(())
    }
}

fn read_data(path: &Path) -> Result<StoreData> {
    let contents = fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

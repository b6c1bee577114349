#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use taskchain::config::{DeclarationSet, parse_declarations};
use taskchain::errors::Result;

/// Builder for declaration text, to simplify test setup.
pub struct DeclarationsBuilder {
    run_name: String,
    root: PathBuf,
    tasks: Vec<TaskBuilder>,
}

impl DeclarationsBuilder {
    pub fn new(root: &Path) -> Self {
        Self {
            run_name: "test-run".to_string(),
            root: root.to_path_buf(),
            tasks: Vec::new(),
        }
    }

    pub fn run_name(mut self, name: &str) -> Self {
        self.run_name = name.to_string();
        self
    }

    pub fn task(mut self, task: TaskBuilder) -> Self {
        self.tasks.push(task);
        self
    }

    /// Render the declaration file.
    pub fn to_toml(&self) -> String {
        let mut out = format!(
            "run_name = {}\nrun_root = {}\n",
            quote(&self.run_name),
            quote(&self.root.to_string_lossy())
        );
        for task in &self.tasks {
            out.push('\n');
            out.push_str(&task.to_toml());
        }
        out
    }

    /// Write the declaration file to `path` and return the text.
    pub fn write(&self, path: &Path) -> String {
        let text = self.to_toml();
        std::fs::write(path, &text).expect("write declaration file");
        text
    }

    pub fn try_build(&self) -> Result<DeclarationSet> {
        parse_declarations(&self.to_toml(), &BTreeMap::new())
    }

    pub fn build(&self) -> DeclarationSet {
        self.try_build()
            .expect("Failed to build valid declarations from builder")
    }
}

/// Builder for a single `[[task]]` entry.
#[derive(Clone)]
pub struct TaskBuilder {
    kind: String,
    name: String,
    src: Option<String>,
    target: Option<String>,
    /// Already rendered TOML values.
    params: Vec<(String, String)>,
}

impl TaskBuilder {
    pub fn new(kind: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            src: None,
            target: None,
            params: Vec::new(),
        }
    }

    pub fn src(mut self, src: &str) -> Self {
        self.src = Some(src.to_string());
        self
    }

    pub fn target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_string(), quote(value)));
        self
    }

    pub fn flag(mut self, key: &str, value: bool) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn list(mut self, key: &str, values: &[&str]) -> Self {
        let items: Vec<String> = values.iter().map(|v| quote(v)).collect();
        self.params
            .push((key.to_string(), format!("[{}]", items.join(", "))));
        self
    }

    fn to_toml(&self) -> String {
        let mut out = format!(
            "[[task]]\nkind = {}\nname = {}\n",
            quote(&self.kind),
            quote(&self.name)
        );
        if let Some(src) = &self.src {
            out.push_str(&format!("src = {}\n", quote(src)));
        }
        if let Some(target) = &self.target {
            out.push_str(&format!("target = {}\n", quote(target)));
        }
        for (key, value) in &self.params {
            out.push_str(&format!("{key} = {value}\n"));
        }
        out
    }
}

fn quote(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

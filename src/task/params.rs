// src/task/params.rs

//! Typed access to kind-specific parameters, with validation errors that
//! name the task and the field.

use crate::config::model::Declaration;
use crate::errors::{Result, TaskchainError};

pub fn required_str<'a>(decl: &'a Declaration, key: &str) -> Result<&'a str> {
    match decl.param(key) {
        Some(toml::Value::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(toml::Value::String(_)) | None => Err(TaskchainError::validation(
            decl.id().to_string(),
            &[key],
            "parameter cannot be empty",
        )),
        Some(_) => Err(TaskchainError::validation(
            decl.id().to_string(),
            &[key],
            "parameter must be a string",
        )),
    }
}

pub fn optional_str<'a>(decl: &'a Declaration, key: &str) -> Result<Option<&'a str>> {
    match decl.param(key) {
        None => Ok(None),
        Some(toml::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(toml::Value::String(s)) => Ok(Some(s)),
        Some(toml::Value::Integer(_)) => Err(TaskchainError::validation(
            decl.id().to_string(),
            &[key],
            "parameter must be a string; quote numeric identifiers",
        )),
        Some(_) => Err(TaskchainError::validation(
            decl.id().to_string(),
            &[key],
            "parameter must be a string",
        )),
    }
}

pub fn optional_bool(decl: &Declaration, key: &str, default: bool) -> Result<bool> {
    match decl.param(key) {
        None => Ok(default),
        Some(toml::Value::Boolean(b)) => Ok(*b),
        Some(_) => Err(TaskchainError::validation(
            decl.id().to_string(),
            &[key],
            "parameter must be true or false",
        )),
    }
}

/// `src` for kinds that cannot work without one.
pub fn required_src(decl: &Declaration) -> Result<&str> {
    decl.src.as_deref().ok_or_else(|| {
        TaskchainError::validation(decl.id().to_string(), &["src"], "parameter cannot be empty")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(params: &str) -> Declaration {
        Declaration {
            kind: "command".into(),
            name: "x".into(),
            src: None,
            target: "/run/x.json".into(),
            params: toml::from_str(params).unwrap(),
        }
    }

    #[test]
    fn required_str_rejects_missing_blank_and_non_strings() {
        assert!(required_str(&decl(""), "cmd").is_err());
        assert!(required_str(&decl("cmd = \"  \""), "cmd").is_err());
        assert!(required_str(&decl("cmd = 1"), "cmd").is_err());
        assert_eq!(required_str(&decl("cmd = \"echo\""), "cmd").unwrap(), "echo");
    }

    #[test]
    fn validation_errors_name_task_and_field() {
        let err = required_str(&decl(""), "cmd").unwrap_err();
        match err {
            TaskchainError::ValidationError { task, fields, .. } => {
                assert_eq!(task, "command x");
                assert_eq!(fields, vec!["cmd".to_string()]);
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn optional_bool_uses_default() {
        assert!(optional_bool(&decl(""), "flag", true).unwrap());
        assert!(!optional_bool(&decl("flag = false"), "flag", true).unwrap());
        assert!(optional_bool(&decl("flag = \"yes\""), "flag", false).is_err());
    }
}

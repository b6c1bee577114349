// tests/error_handling.rs

use std::collections::BTreeMap;
use std::io::Write;

use tempfile::NamedTempFile;
use taskchain::config::{load_declarations, parse_assignments, parse_declarations};
use taskchain::errors::TaskchainError;

fn header(root: &std::path::Path) -> String {
    format!("run_name = \"errs\"\nrun_root = \"{}\"\n", root.display())
}

#[test]
fn test_missing_declaration_file_returns_config_error() {
    let result = load_declarations("/definitely/not/here.toml", &BTreeMap::new());

    match result {
        Err(TaskchainError::ConfigError(msg)) => {
            assert!(msg.contains("does not exist"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_undefined_placeholder_is_named_in_the_error() {
    let dir = tempfile::tempdir().unwrap();
    let text = format!(
        "{}\n[[task]]\nkind = \"copy\"\nname = \"a\"\nsrc = \"{{{{feed}}}}.json\"\ntarget = \"out.json\"\n",
        header(dir.path())
    );

    match parse_declarations(&text, &BTreeMap::new()) {
        Err(TaskchainError::ConfigError(msg)) => assert!(msg.contains("feed")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }

    let placeholders = parse_assignments(["feed=daily"]).unwrap();
    let set = parse_declarations(&text, &placeholders).unwrap();
    assert!(set.declarations()[0].src.as_deref().unwrap().ends_with("daily.json"));
}

#[test]
fn test_malformed_placeholder_assignment() {
    let result = parse_assignments(["novalue"]);
    assert!(matches!(result, Err(TaskchainError::ConfigError(_))));
}

#[test]
fn test_invalid_toml_returns_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "run_name = \"x\"\n[[task]\nkind = ").unwrap();

    let result = load_declarations(file.path(), &BTreeMap::new());

    match result {
        Err(TaskchainError::TomlError(_)) => {}
        Err(e) => panic!("Expected TomlError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_missing_run_root_directory() {
    let text = "run_name = \"x\"\nrun_root = \"/definitely/not/a/dir\"\n\n[[task]]\nkind = \"copy\"\nname = \"a\"\nsrc = \"in.json\"\ntarget = \"out.json\"\n";

    match parse_declarations(text, &BTreeMap::new()) {
        Err(TaskchainError::ConfigError(msg)) => assert!(msg.contains("does not exist")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_empty_declaration_file() {
    let dir = tempfile::tempdir().unwrap();

    match parse_declarations(&header(dir.path()), &BTreeMap::new()) {
        Err(TaskchainError::ConfigError(msg)) => assert!(msg.contains("at least one")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_duplicate_identity() {
    let dir = tempfile::tempdir().unwrap();
    let text = format!(
        "{}\n[[task]]\nkind = \"copy\"\nname = \"a\"\nsrc = \"in.json\"\ntarget = \"one.json\"\n\n\
         [[task]]\nkind = \"copy\"\nname = \"a\"\nsrc = \"in.json\"\ntarget = \"two.json\"\n",
        header(dir.path())
    );

    match parse_declarations(&text, &BTreeMap::new()) {
        Err(TaskchainError::ConfigError(msg)) => assert!(msg.contains("more than once")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

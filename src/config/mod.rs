// src/config/mod.rs

//! Declaration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed declaration model (`model.rs`).
//! - Substitute `{{placeholders}}` in the raw text (`placeholders.rs`).
//! - Load a declaration file from disk (`loader.rs`).
//! - Validate structure, then kinds and sources against a registry
//!   (`validate.rs`).

pub mod loader;
pub mod model;
pub mod placeholders;
pub mod validate;

pub use loader::{load_declarations, parse_declarations, parse_raw, read_source};
pub use model::{
    Declaration, DeclarationSet, RESERVED_ATTRIBUTES, RawDeclaration, RawDeclarationFile,
    RunIdentity, TaskId,
};
pub use placeholders::parse_assignments;
pub use validate::validate_with_registry;

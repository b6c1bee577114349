// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod registry;
pub mod store;
pub mod task;
pub mod types;
pub mod visualize;

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::{load_declarations, parse_assignments};
use crate::dag::PathStatus;
use crate::engine::{Engine, EngineOptions};
use crate::registry::KindRegistry;
use crate::types::RunMode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - placeholder parsing and declaration loading
/// - the built-in kind registry
/// - the engine in the selected mode
pub fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let placeholders = parse_assignments(&args.placeholders)?;
    let declarations = load_declarations(&config_path, &placeholders)?;

    let options = EngineOptions {
        checksum: args.checksum_policy(),
    };
    let engine = Engine::new(KindRegistry::builtin(), declarations, options);

    match args.mode() {
        RunMode::Validate => {
            let paths = engine.validate()?;
            info!(paths = paths.len(), "declarations are valid");
        }
        RunMode::Visualize => {
            let (html, listing) = engine.visualize()?;
            print!("{listing}");
            println!("overview written to {}", html.display());
        }
        RunMode::Execute => {
            let report = engine.execute()?;
            let failed = report.count(|s| matches!(s, PathStatus::Failed { .. }));
            if failed > 0 {
                info!(failed, "some paths did not complete; see the log above");
            }
        }
    }

    Ok(())
}

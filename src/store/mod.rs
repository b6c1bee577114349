// src/store/mod.rs

//! Durable run state.
//!
//! - [`kv`] is the key/value store opened once per run directory.
//! - [`checksum`] guards the store against silently changed declarations.

pub mod checksum;
pub mod kv;

pub use checksum::{ChecksumOutcome, CHECKSUM_KEY};
pub use kv::{KvStore, StoreValue};

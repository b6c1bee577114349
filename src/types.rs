// src/types.rs

use std::str::FromStr;

use serde::Deserialize;

/// What to do when the declaration checksum differs from the previous run.
///
/// - `Enforce`: refuse to run (default).
/// - `Overwrite`: accept the new declarations and record their digest.
/// - `Ignore`: run anyway but keep the old digest, so the warning repeats
///   until the mismatch is resolved one way or the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumPolicy {
    #[default]
    Enforce,
    Overwrite,
    Ignore,
}

impl FromStr for ChecksumPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enforce" => Ok(ChecksumPolicy::Enforce),
            "overwrite" => Ok(ChecksumPolicy::Overwrite),
            "ignore" => Ok(ChecksumPolicy::Ignore),
            other => Err(format!(
                "invalid checksum policy: {other} (expected \"enforce\", \"overwrite\" or \"ignore\")"
            )),
        }
    }
}

/// Top-level mode selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Validate declarations and stop.
    Validate,
    /// Validate, discover paths and render them.
    Visualize,
    /// Validate, guard the checksum and run every path.
    #[default]
    Execute,
}

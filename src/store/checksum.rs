// src/store/checksum.rs

//! Checksum guard for the declaration text.
//!
//! Collaborators keep durable state in the [`KvStore`] whose meaning depends
//! on the shape of the declarations. When the declaration text changes between
//! two executions of the same run, the guard refuses to continue unless the
//! caller explicitly overwrites or ignores the recorded digest.

use sha1::{Digest, Sha1};
use tracing::{info, warn};

use crate::errors::{Result, TaskchainError};
use crate::store::kv::KvStore;
use crate::types::ChecksumPolicy;

/// Reserved root-level key holding the last accepted digest.
pub const CHECKSUM_KEY: &str = "run_checksum";

/// What the guard did for this execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumOutcome {
    /// No digest was recorded before; the current one is now stored.
    Recorded(String),
    /// The recorded digest matches.
    Unchanged(String),
    /// The recorded digest differed and was replaced.
    Overwritten { previous: String, current: String },
    /// The recorded digest differs but the mismatch is ignored for this run.
    /// The store keeps the previous digest.
    Ignored { previous: String, current: String },
}

/// SHA-1 hex digest of the raw declaration text.
pub fn digest(text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare the digest of `text` against the one recorded in `store`.
pub fn check(store: &mut KvStore, text: &str, policy: ChecksumPolicy) -> Result<ChecksumOutcome> {
    let current = digest(text);
    let previous = store.get_text(CHECKSUM_KEY, None).map(str::to_string);

    let outcome = match previous {
        None => {
            store.put(CHECKSUM_KEY, current.as_str(), None, true)?;
            ChecksumOutcome::Recorded(current)
        }
        Some(previous) if previous == current => ChecksumOutcome::Unchanged(current),
        Some(previous) => match policy {
            ChecksumPolicy::Enforce => {
                warn!(%previous, %current, "declaration checksum does not match the previous run");
                return Err(TaskchainError::ChecksumMismatch { previous, current });
            }
            ChecksumPolicy::Overwrite => {
                warn!(%previous, %current, "overwriting recorded declaration checksum");
                store.put(CHECKSUM_KEY, current.as_str(), None, true)?;
                ChecksumOutcome::Overwritten { previous, current }
            }
            ChecksumPolicy::Ignore => {
                warn!(
                    %previous,
                    %current,
                    "declaration checksum does not match; ignoring for this run only"
                );
                ChecksumOutcome::Ignored { previous, current }
            }
        },
    };

    info!(outcome = ?outcome, "declaration checksum check finished");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_sha1_hex() {
        assert_eq!(digest("abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn first_run_records_digest() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = KvStore::open(dir.path(), "demo").unwrap();

        let outcome = check(&mut store, "text", ChecksumPolicy::Enforce).unwrap();
        assert_eq!(outcome, ChecksumOutcome::Recorded(digest("text")));

        store.reload().unwrap();
        assert_eq!(store.get_text(CHECKSUM_KEY, None), Some(digest("text").as_str()));
    }

    #[test]
    fn changed_text_is_rejected_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = KvStore::open(dir.path(), "demo").unwrap();
        check(&mut store, "one", ChecksumPolicy::Enforce).unwrap();

        let err = check(&mut store, "two", ChecksumPolicy::Enforce).unwrap_err();
        assert!(matches!(err, TaskchainError::ChecksumMismatch { .. }));
    }

    #[test]
    fn ignore_leaves_previous_digest_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = KvStore::open(dir.path(), "demo").unwrap();
        check(&mut store, "one", ChecksumPolicy::Enforce).unwrap();

        let outcome = check(&mut store, "two", ChecksumPolicy::Ignore).unwrap();
        assert!(matches!(outcome, ChecksumOutcome::Ignored { .. }));
        assert_eq!(store.get_text(CHECKSUM_KEY, None), Some(digest("one").as_str()));

        // Still a mismatch next time.
        assert!(check(&mut store, "two", ChecksumPolicy::Enforce).is_err());
    }
}

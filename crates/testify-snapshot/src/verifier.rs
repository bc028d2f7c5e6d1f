//! Golden-file verification.
//!
//! # Design
//! - One verifier per suite owns the suite's `.snap` file in memory and
//!   writes it back whenever a snapshot is recorded or updated.
//! - Run context (tests executed, identifiers verified) lives on the verifier
//!   and is passed explicitly through [`Expect`]; there is no global state.
//! - State sits behind a `Mutex` so tests of one suite may run in parallel; a
//!   poisoned lock is recovered.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::config::SnapshotConfig;
use crate::dsl::{Expect, Snapshotter};
use crate::error::{SnapshotError, SnapshotResult};
use crate::snapshot::Snapshot;
use crate::store::SnapshotFile;

/// Compares snapshots against, and records them into, a suite's golden file.
#[derive(Debug)]
pub struct SnapshotVerifier {
    config: SnapshotConfig,
    suite: String,
    state: Mutex<VerifierState>,
}

#[derive(Debug)]
struct VerifierState {
    file: SnapshotFile,
    verified: BTreeSet<String>,
    tests_run: BTreeSet<String>,
}

impl SnapshotVerifier {
    /// Open the golden file for `suite` (typically `module_path!()`).
    ///
    /// # Errors
    ///
    /// Returns an error if an existing snapshot file cannot be read or parsed.
    pub fn new(config: SnapshotConfig, suite: impl Into<String>) -> SnapshotResult<Self> {
        let suite = suite.into();
        let file = SnapshotFile::load(config.snapshot_file(&suite))?;
        Ok(Self {
            config,
            suite,
            state: Mutex::new(VerifierState {
                file,
                verified: BTreeSet::new(),
                tests_run: BTreeSet::new(),
            }),
        })
    }

    /// Open the golden file for `suite` using [`SnapshotConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be resolved or the snapshot
    /// file cannot be read.
    pub fn from_env(suite: impl Into<String>) -> SnapshotResult<Self> {
        Self::new(SnapshotConfig::from_env()?, suite)
    }

    /// Suite name as supplied.
    #[must_use]
    pub fn suite(&self) -> &str {
        &self.suite
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Start expectations for `test`, counting it as executed.
    #[must_use]
    pub fn expect(&self, test: impl Into<String>) -> Expect<'_> {
        let test = test.into();
        self.lock().tests_run.insert(test.clone());
        Expect::new(self, test)
    }

    /// Shorthand for `Snapshotter::new(self.expect(test))`.
    #[must_use]
    pub fn snapshotter(&self, test: impl Into<String>) -> Snapshotter<'_> {
        Snapshotter::new(self.expect(test))
    }

    /// Number of distinct tests that called [`SnapshotVerifier::expect`].
    #[must_use]
    pub fn tests_run(&self) -> usize {
        self.lock().tests_run.len()
    }

    /// Compare `snapshot` with the stored entry for `test`.
    ///
    /// A missing entry is recorded unless running in CI. A differing entry is
    /// overwritten when the update filter selects it.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::DuplicateSnapshot`] when the identifier was
    /// already verified in this run, [`SnapshotError::SnapshotMissing`] in CI
    /// mode, [`SnapshotError::SnapshotMismatch`] on a difference, and
    /// [`SnapshotError::Io`] if the file cannot be written.
    pub fn verify(&self, test: &str, snapshot: &Snapshot) -> SnapshotResult<()> {
        let identifier = snapshot.identifier(&self.suite, test);
        let mut state = self.lock();

        if !state.verified.insert(identifier.clone()) {
            return Err(SnapshotError::DuplicateSnapshot { identifier });
        }

        let Some(expected) = state.file.get(&identifier) else {
            if self.config.ci {
                return Err(SnapshotError::SnapshotMissing {
                    identifier,
                    path: state.file.path().to_path_buf(),
                });
            }
            info!(%identifier, format = %snapshot.format(), "recording new snapshot");
            state.file.insert(identifier, snapshot.body().to_string());
            return state.file.persist();
        };

        if expected == snapshot.body() {
            return Ok(());
        }

        if self.config.should_update(&identifier) {
            info!(%identifier, "updating snapshot");
            state.file.insert(identifier, snapshot.body().to_string());
            return state.file.persist();
        }

        Err(SnapshotError::SnapshotMismatch {
            expected: expected.to_string(),
            actual: snapshot.body().to_string(),
            identifier,
        })
    }

    /// Check for stored entries that no test verified in this run.
    ///
    /// Orphans fail validation when `fail_on_orphans` is set and more than one
    /// test ran; otherwise they are logged.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::OrphanedSnapshots`] listing the orphaned
    /// identifiers.
    pub fn validate_snapshots(&self) -> SnapshotResult<()> {
        let state = self.lock();
        let orphans: Vec<String> = state
            .file
            .identifiers()
            .filter(|identifier| !state.verified.contains(*identifier))
            .map(str::to_string)
            .collect();
        if orphans.is_empty() {
            return Ok(());
        }

        if self.config.fail_on_orphans && state.tests_run.len() > 1 {
            return Err(SnapshotError::OrphanedSnapshots {
                path: state.file.path().to_path_buf(),
                identifiers: orphans,
            });
        }

        warn!(
            path = %state.file.path().display(),
            orphans = ?orphans,
            "snapshot file holds entries not verified in this run"
        );
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, VerifierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! Snapshot configuration.
//!
//! # Design
//! - Resolution order: defaults, then `snapshot.yaml` in the crate root, then
//!   environment variables.
//! - Environment access is injected as a lookup closure so resolution stays
//!   testable without mutating process state.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{SnapshotError, SnapshotResult};

/// Optional configuration file looked up in the crate root.
pub const CONFIG_FILE_NAME: &str = "snapshot.yaml";
/// Default directory holding `.snap` files, relative to the crate root.
pub const DEFAULT_SNAPSHOT_DIR: &str = "tests/__snapshots__";
/// Default environment variable signalling a CI run.
pub const DEFAULT_CI_ENV_VAR: &str = "CI";
/// Extension of snapshot files.
pub const SNAPSHOT_FILE_EXTENSION: &str = "snap";
/// Overrides `snapshot_dir`.
pub const SNAPSHOT_DIR_ENV: &str = "TESTIFY_SNAPSHOT_DIR";
/// Overrides `update_snapshot`.
pub const UPDATE_SNAPSHOT_ENV: &str = "TESTIFY_UPDATE_SNAPSHOT";
/// Overrides `fail_on_orphans`.
pub const FAIL_ON_ORPHANS_ENV: &str = "TESTIFY_FAIL_ON_ORPHANS";

/// Resolved snapshot settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotConfig {
    /// Directory holding `.snap` files; relative paths are joined to the crate root.
    pub snapshot_dir: PathBuf,
    /// Update filter: `None` never updates, `""`/`all`/`true`/`*` updates
    /// everything, anything else is an identifier prefix.
    pub update_snapshot: Option<String>,
    /// Environment variable whose truthy value marks a CI run.
    pub ci_env_var: String,
    /// Whether unverified stored snapshots fail validation.
    pub fail_on_orphans: bool,
    /// Resolved CI flag; never read from the file.
    #[serde(skip)]
    pub ci: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from(DEFAULT_SNAPSHOT_DIR),
            update_snapshot: None,
            ci_env_var: DEFAULT_CI_ENV_VAR.to_string(),
            fail_on_orphans: true,
            ci: false,
        }
    }
}

impl SnapshotConfig {
    /// Resolve configuration for the crate rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if `snapshot.yaml` exists but cannot be read or parsed,
    /// or if an environment override holds an invalid value.
    pub fn load<F>(root: &Path, lookup: F) -> SnapshotResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::from_file(&root.join(CONFIG_FILE_NAME))?;

        if let Some(dir) = lookup(SNAPSHOT_DIR_ENV).filter(|value| !value.trim().is_empty()) {
            config.snapshot_dir = PathBuf::from(dir);
        }
        if let Some(filter) = lookup(UPDATE_SNAPSHOT_ENV) {
            config.update_snapshot = Some(filter);
        }
        if let Some(value) = lookup(FAIL_ON_ORPHANS_ENV) {
            config.fail_on_orphans = parse_flag(FAIL_ON_ORPHANS_ENV, &value)?;
        }
        config.ci = ci_flag_value(lookup(&config.ci_env_var).as_deref());
        if config.snapshot_dir.is_relative() {
            config.snapshot_dir = root.join(&config.snapshot_dir);
        }

        debug!(
            snapshot_dir = %config.snapshot_dir.display(),
            ci = config.ci,
            update = ?config.update_snapshot,
            "resolved snapshot configuration"
        );
        Ok(config)
    }

    /// Resolve configuration from the process environment, rooted at
    /// `CARGO_MANIFEST_DIR` (or the working directory outside cargo).
    ///
    /// # Errors
    ///
    /// See [`SnapshotConfig::load`].
    pub fn from_env() -> SnapshotResult<Self> {
        let root = std::env::var_os("CARGO_MANIFEST_DIR").map_or_else(|| PathBuf::from("."), PathBuf::from);
        Self::load(&root, |name| std::env::var(name).ok())
    }

    /// Snapshot file for `suite`; `::` separators become `.`.
    #[must_use]
    pub fn snapshot_file(&self, suite: &str) -> PathBuf {
        self.snapshot_dir.join(format!(
            "{}.{SNAPSHOT_FILE_EXTENSION}",
            suite.replace("::", ".")
        ))
    }

    /// Whether a differing stored snapshot for `identifier` may be overwritten.
    #[must_use]
    pub fn should_update(&self, identifier: &str) -> bool {
        let Some(filter) = self.update_snapshot.as_deref().map(str::trim) else {
            return false;
        };
        match filter.to_ascii_lowercase().as_str() {
            "" | "all" | "true" | "1" | "*" => true,
            "none" | "false" | "0" | "no" | "off" => false,
            _ => identifier.starts_with(filter),
        }
    }

    fn from_file(path: &Path) -> SnapshotResult<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SnapshotError::Io {
                    operation: "config.read",
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| SnapshotError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn parse_flag(field: &'static str, value: &str) -> SnapshotResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SnapshotError::InvalidConfig {
            field,
            value: value.to_string(),
        }),
    }
}

fn ci_flag_value(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        !matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "false" | "no" | "off"
        )
    })
}

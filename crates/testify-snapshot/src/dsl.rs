//! Fluent entry points used from tests.
//!
//! ```no_run
//! use serde::Serialize;
//! use testify_snapshot::SnapshotVerifier;
//!
//! #[derive(Serialize)]
//! struct User {
//!     id: u32,
//!     password: String,
//! }
//!
//! # fn main() -> testify_snapshot::SnapshotResult<()> {
//! let verifier = SnapshotVerifier::from_env(module_path!())?;
//! let user = User { id: 1, password: "secret".to_string() };
//! verifier
//!     .snapshotter("user_is_rendered")
//!     .json()
//!     .with_scenario("masked")
//!     .with_masked_field("$..password")
//!     .snapshot(&user)?;
//! verifier.validate_snapshots()?;
//! # Ok(())
//! # }
//! ```

use std::fmt::Display;

use serde::Serialize;

use crate::error::SnapshotResult;
use crate::serializer::{
    Base64SnapshotSerializer, JsonSnapshotSerializer, PlainSnapshotSerializer, SnapshotSerializer,
};
use crate::snapshot::Snapshot;
use crate::verifier::SnapshotVerifier;

/// Expectation context for one test: the verifier plus the test name.
#[derive(Debug, Clone)]
pub struct Expect<'a> {
    verifier: &'a SnapshotVerifier,
    test: String,
}

impl<'a> Expect<'a> {
    pub(crate) const fn new(verifier: &'a SnapshotVerifier, test: String) -> Self {
        Self { verifier, test }
    }

    /// Name of the test the expectations belong to.
    #[must_use]
    pub fn test_name(&self) -> &str {
        &self.test
    }

    /// Verify an already serialized snapshot.
    ///
    /// # Errors
    ///
    /// See [`SnapshotVerifier::verify`].
    pub fn to_match_snapshot(&self, snapshot: &Snapshot) -> SnapshotResult<()> {
        self.verifier.verify(&self.test, snapshot)
    }
}

/// Chooses the serializer for the next snapshot.
#[derive(Debug, Clone)]
pub struct Snapshotter<'a> {
    expect: Expect<'a>,
}

impl<'a> Snapshotter<'a> {
    /// Wrap an expectation context.
    #[must_use]
    pub const fn new(expect: Expect<'a>) -> Self {
        Self { expect }
    }

    /// Canonical JSON snapshots with optional masking.
    #[must_use]
    pub fn json(&self) -> JsonSnapshotDsl<'a> {
        JsonSnapshotDsl {
            expect: self.expect.clone(),
            scenario: None,
            masked_field_paths: Vec::new(),
        }
    }

    /// Snapshots of the value's `Display` output.
    #[must_use]
    pub fn plain(&self) -> PlainSnapshotDsl<'a> {
        PlainSnapshotDsl {
            expect: self.expect.clone(),
            scenario: None,
        }
    }

    /// Base64 snapshots of binary payloads.
    #[must_use]
    pub fn base64(&self) -> Base64SnapshotDsl<'a> {
        Base64SnapshotDsl {
            expect: self.expect.clone(),
            scenario: None,
        }
    }
}

/// JSON snapshot builder.
#[derive(Debug, Clone)]
pub struct JsonSnapshotDsl<'a> {
    expect: Expect<'a>,
    scenario: Option<String>,
    masked_field_paths: Vec<String>,
}

impl JsonSnapshotDsl<'_> {
    /// Label the snapshot so one test can hold several.
    #[must_use]
    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    /// Mask exactly one path, replacing any previously configured paths.
    #[must_use]
    pub fn with_masked_field(mut self, path: impl Into<String>) -> Self {
        self.masked_field_paths = vec![path.into()];
        self
    }

    /// Mask the given paths, replacing any previously configured paths.
    #[must_use]
    pub fn with_masked_fields<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.masked_field_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Serialize `value` and verify it against the golden file.
    ///
    /// # Errors
    ///
    /// Returns serialization errors from the JSON pipeline and verification
    /// errors from [`SnapshotVerifier::verify`].
    pub fn snapshot<T>(&self, value: &T) -> SnapshotResult<()>
    where
        T: Serialize + ?Sized,
    {
        let serializer = JsonSnapshotSerializer::new(self.masked_field_paths.iter().cloned());
        let snapshot = serializer.serialize(value, self.scenario.as_deref())?;
        self.expect.to_match_snapshot(&snapshot)
    }
}

/// Plain-text snapshot builder.
#[derive(Debug, Clone)]
pub struct PlainSnapshotDsl<'a> {
    expect: Expect<'a>,
    scenario: Option<String>,
}

impl PlainSnapshotDsl<'_> {
    /// Label the snapshot so one test can hold several.
    #[must_use]
    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    /// Render `value` through `Display` and verify it.
    ///
    /// # Errors
    ///
    /// See [`SnapshotVerifier::verify`].
    pub fn snapshot<T>(&self, value: &T) -> SnapshotResult<()>
    where
        T: Display + ?Sized,
    {
        let snapshot = PlainSnapshotSerializer.serialize(value, self.scenario.as_deref())?;
        self.expect.to_match_snapshot(&snapshot)
    }
}

/// Base64 snapshot builder.
#[derive(Debug, Clone)]
pub struct Base64SnapshotDsl<'a> {
    expect: Expect<'a>,
    scenario: Option<String>,
}

impl Base64SnapshotDsl<'_> {
    /// Label the snapshot so one test can hold several.
    #[must_use]
    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    /// Encode `bytes` and verify them.
    ///
    /// # Errors
    ///
    /// See [`SnapshotVerifier::verify`].
    pub fn snapshot<B>(&self, bytes: &B) -> SnapshotResult<()>
    where
        B: AsRef<[u8]> + ?Sized,
    {
        let snapshot = Base64SnapshotSerializer.serialize(bytes, self.scenario.as_deref())?;
        self.expect.to_match_snapshot(&snapshot)
    }
}

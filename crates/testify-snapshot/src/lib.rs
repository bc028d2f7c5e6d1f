#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Deterministic snapshot testing.
//!
//! JSON snapshots go through a fixed pipeline: [`canonical`] encodes the value
//! with sorted keys and ordered collections, [`mask`](mod@mask) redacts
//! selected paths, and [`format`](mod@format) indents the result.
//! [`SnapshotVerifier`] compares the output with a per-suite golden file.
//!
//! Layout: `canonical.rs` (ordering rules), `mask/` (path grammar and
//! redaction), `format.rs` (pretty printer), `serializer.rs` (JSON, plain and
//! base64 serializers), `verifier.rs` and `store.rs` (golden files),
//! `dsl.rs` (fluent test API), `config.rs`, `error.rs`.

pub mod canonical;
pub mod config;
pub mod dsl;
pub mod error;
pub mod format;
pub mod mask;
pub mod serializer;
pub mod snapshot;
pub mod verifier;

mod store;

pub use canonical::{CanonicalError, canonical_document, canonicalize};
pub use config::SnapshotConfig;
pub use dsl::{Base64SnapshotDsl, Expect, JsonSnapshotDsl, PlainSnapshotDsl, Snapshotter};
pub use error::{SnapshotError, SnapshotResult};
pub use format::pretty_print;
pub use mask::{MASK_MARKER, MaskEvaluationError, MaskPath, MaskPathError, mask};
pub use serializer::{
    Base64SnapshotSerializer, JsonSnapshotSerializer, PlainSnapshotSerializer, SnapshotSerializer,
    serialize,
};
pub use snapshot::{SerializerType, Snapshot};
pub use verifier::SnapshotVerifier;

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

//! Logging setup shared by binaries and test suites that use testify.
//!
//! The snapshot crates only emit `tracing` events; this crate decides where
//! they go. Layout: `init.rs` (subscriber installation), `error.rs` (error types).

pub mod error;
pub mod init;

pub use error::{Result, TelemetryError};
pub use init::{
    DEFAULT_LOG_LEVEL, DEFAULT_TEST_LOG_LEVEL, LogFormat, LoggingConfig, TEST_LOG_ENV,
    TEST_LOG_FORMAT_ENV, init_logging, init_test_logging,
};

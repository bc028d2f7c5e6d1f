//! Snapshot serializers.
//!
//! # Design
//! - [`serialize`] is the JSON pipeline: canonicalize, mask, pretty-print,
//!   then wrap into a [`Snapshot`]. Every stage failure surfaces as
//!   [`SnapshotError`], and no partial body is ever returned.
//! - Plain and base64 serializers share the `[\n...\n]` envelope so every
//!   stored body starts and ends on its own line.

use std::fmt::Display;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use tracing::instrument;

use crate::canonical::canonical_document;
use crate::error::{SnapshotError, SnapshotResult};
use crate::format::pretty_print;
use crate::mask::{MaskPath, compile_paths, mask_document};
use crate::snapshot::{SerializerType, Snapshot};

/// Serialize `value` into a JSON snapshot, masking `mask_paths`.
///
/// # Errors
///
/// Returns [`SnapshotError::InvalidMaskPath`] or
/// [`SnapshotError::MaskEvaluation`] for masking problems, and
/// [`SnapshotError::Serialization`] or [`SnapshotError::Encode`] when the
/// value cannot be encoded.
pub fn serialize<T, S>(value: &T, mask_paths: &[S], scenario: Option<&str>) -> SnapshotResult<Snapshot>
where
    T: Serialize + ?Sized,
    S: AsRef<str>,
{
    let compiled = compile_paths(mask_paths)?;
    serialize_compiled(value, &compiled, scenario)
}

#[instrument(name = "snapshot.serialize_json", skip(value, mask_paths), fields(masks = mask_paths.len()))]
fn serialize_compiled<T>(
    value: &T,
    mask_paths: &[MaskPath],
    scenario: Option<&str>,
) -> SnapshotResult<Snapshot>
where
    T: Serialize + ?Sized,
{
    let mut document = canonical_document(value)?;
    mask_document(&mut document, mask_paths)?;
    let compact = serde_json::to_string(&document).map_err(|source| SnapshotError::Encode {
        operation: "serialize.render",
        source,
    })?;
    Ok(
        Snapshot::new(pretty_print(&compact), SerializerType::Json)
            .with_scenario(scenario.map(str::to_string)),
    )
}

/// Turns a value into a [`Snapshot`] body.
pub trait SnapshotSerializer<T: ?Sized> {
    /// Serialize `value`, labelling the snapshot with `scenario`.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] when the value cannot be rendered.
    fn serialize(&self, value: &T, scenario: Option<&str>) -> SnapshotResult<Snapshot>;
}

/// JSON serializer with a fixed list of masked field paths.
#[derive(Debug, Clone, Default)]
pub struct JsonSnapshotSerializer {
    masked_field_paths: Vec<String>,
}

impl JsonSnapshotSerializer {
    /// Create a serializer masking the given paths.
    #[must_use]
    pub fn new<I, S>(masked_field_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            masked_field_paths: masked_field_paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Paths masked by this serializer.
    #[must_use]
    pub fn masked_field_paths(&self) -> &[String] {
        &self.masked_field_paths
    }
}

impl<T> SnapshotSerializer<T> for JsonSnapshotSerializer
where
    T: Serialize + ?Sized,
{
    fn serialize(&self, value: &T, scenario: Option<&str>) -> SnapshotResult<Snapshot> {
        serialize(value, &self.masked_field_paths, scenario)
    }
}

/// Serializer rendering a value through `Display` as `[\n{value}\n]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainSnapshotSerializer;

impl<T> SnapshotSerializer<T> for PlainSnapshotSerializer
where
    T: Display + ?Sized,
{
    fn serialize(&self, value: &T, scenario: Option<&str>) -> SnapshotResult<Snapshot> {
        Ok(wrap_body(&value.to_string(), SerializerType::Text, scenario))
    }
}

/// Serializer encoding binary payloads as standard base64 inside `[\n...\n]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64SnapshotSerializer;

impl<T> SnapshotSerializer<T> for Base64SnapshotSerializer
where
    T: AsRef<[u8]> + ?Sized,
{
    fn serialize(&self, value: &T, scenario: Option<&str>) -> SnapshotResult<Snapshot> {
        Ok(wrap_body(
            &STANDARD.encode(value.as_ref()),
            SerializerType::Base64,
            scenario,
        ))
    }
}

fn wrap_body(rendered: &str, format: SerializerType, scenario: Option<&str>) -> Snapshot {
    Snapshot::new(format!("[\n{rendered}\n]"), format).with_scenario(scenario.map(str::to_string))
}

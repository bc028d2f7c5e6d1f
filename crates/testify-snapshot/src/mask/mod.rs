//! Field masking over canonical documents.
//!
//! # Design
//! - Every path is compiled before the document is touched; a single invalid
//!   path rejects the whole request.
//! - Paths run in caller order and overwrite matches with [`MASK_MARKER`].
//! - Shape mismatches are errors only while the path prefix is definite;
//!   after a wildcard, union, slice or deep scan they are skipped.

mod path;

use std::ops::Range;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::canonical::kind_of;
use crate::error::{SnapshotError, SnapshotResult};

pub use path::{MaskPath, MaskPathError, Segment, Selector};

/// Replacement written over every masked value.
pub const MASK_MARKER: &str = "***MASKED***";

/// Errors raised while applying a parsed path to a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaskEvaluationError {
    /// A member step reached a value that is not an object.
    #[error("expected an object at {at}, found {found}")]
    ExpectedObject {
        /// Normalized location of the offending value.
        at: String,
        /// JSON kind found there.
        found: &'static str,
    },
    /// An index or slice step reached a value that is not an array.
    #[error("expected an array at {at}, found {found}")]
    ExpectedArray {
        /// Normalized location of the offending value.
        at: String,
        /// JSON kind found there.
        found: &'static str,
    },
    /// The path selects the document root itself.
    #[error("the document root cannot be masked")]
    RootNotMaskable,
}

/// Mask `paths` in the compact JSON document `json`.
///
/// # Errors
///
/// Returns [`SnapshotError::InvalidMaskPath`] if any path fails to parse,
/// [`SnapshotError::MaskEvaluation`] if a definite path does not fit the
/// document shape, and [`SnapshotError::Encode`] if `json` is not valid JSON.
pub fn mask<S>(json: &str, paths: &[S]) -> SnapshotResult<String>
where
    S: AsRef<str>,
{
    let compiled = compile_paths(paths)?;
    let mut document: Value =
        serde_json::from_str(json).map_err(|source| SnapshotError::Encode {
            operation: "mask.parse",
            source,
        })?;
    mask_document(&mut document, &compiled)?;
    serde_json::to_string(&document).map_err(|source| SnapshotError::Encode {
        operation: "mask.render",
        source,
    })
}

/// Parse every path, reporting all invalid ones together.
///
/// # Errors
///
/// Returns [`SnapshotError::InvalidMaskPath`] listing each path that failed to
/// parse, with the first failure as source.
pub fn compile_paths<S>(paths: &[S]) -> SnapshotResult<Vec<MaskPath>>
where
    S: AsRef<str>,
{
    let mut compiled = Vec::with_capacity(paths.len());
    let mut invalid = Vec::new();
    let mut first_error = None;

    for raw in paths {
        let raw = raw.as_ref();
        match MaskPath::parse(raw) {
            Ok(path) => compiled.push(path),
            Err(err) => {
                invalid.push(raw.to_string());
                first_error.get_or_insert(err);
            }
        }
    }

    first_error.map_or(Ok(compiled), |source| {
        Err(SnapshotError::InvalidMaskPath {
            paths: invalid,
            source,
        })
    })
}

/// Apply compiled paths in order; returns the number of values masked.
///
/// # Errors
///
/// Returns [`SnapshotError::MaskEvaluation`] for the first path whose definite
/// prefix does not fit the document.
pub fn mask_document(document: &mut Value, paths: &[MaskPath]) -> SnapshotResult<usize> {
    let mut total = 0;
    for path in paths {
        let masked = apply(document, path).map_err(|source| SnapshotError::MaskEvaluation {
            path: path.as_str().to_string(),
            source,
        })?;
        debug!(path = %path, masked, "applied mask path");
        total += masked;
    }
    Ok(total)
}

fn apply(document: &mut Value, path: &MaskPath) -> Result<usize, MaskEvaluationError> {
    if path.segments().is_empty() {
        return Err(MaskEvaluationError::RootNotMaskable);
    }
    walk(document, path, 0, true)
}

/// Evaluate the steps from `step` onward against `node`.
fn walk(
    node: &mut Value,
    path: &MaskPath,
    step: usize,
    definite: bool,
) -> Result<usize, MaskEvaluationError> {
    let Some(segment) = path.segments().get(step) else {
        *node = Value::String(MASK_MARKER.to_string());
        return Ok(1);
    };

    match segment {
        Segment::Child(selector) => {
            let next_definite = definite && segment.is_definite();
            let mut masked = 0;
            for child in select(node, selector, path, step, definite)? {
                masked += walk(child, path, step + 1, next_definite)?;
            }
            Ok(masked)
        }
        Segment::Descendant(selector) => scan(node, selector, path, step),
    }
}

/// Deep scan: apply `selector` to `node` and every value below it.
fn scan(
    node: &mut Value,
    selector: &Selector,
    path: &MaskPath,
    step: usize,
) -> Result<usize, MaskEvaluationError> {
    let mut masked = 0;
    match node {
        Value::Object(members) => {
            for child in members.values_mut() {
                masked += scan(child, selector, path, step)?;
            }
        }
        Value::Array(elements) => {
            for child in elements.iter_mut() {
                masked += scan(child, selector, path, step)?;
            }
        }
        _ => {}
    }
    for child in select(node, selector, path, step, false)? {
        masked += walk(child, path, step + 1, false)?;
    }
    Ok(masked)
}

fn select<'v>(
    node: &'v mut Value,
    selector: &Selector,
    path: &MaskPath,
    step: usize,
    definite: bool,
) -> Result<Vec<&'v mut Value>, MaskEvaluationError> {
    let mismatch = |error: MaskEvaluationError| {
        if definite { Err(error) } else { Ok(Vec::new()) }
    };

    match (selector, node) {
        (Selector::Wildcard, Value::Object(members)) => Ok(members.values_mut().collect()),
        (Selector::Wildcard, Value::Array(elements)) => Ok(elements.iter_mut().collect()),
        (Selector::Wildcard, _) => Ok(Vec::new()),
        (Selector::Names(names), Value::Object(members)) => Ok(members
            .iter_mut()
            .filter(|(key, _)| names.iter().any(|name| name == *key))
            .map(|(_, value)| value)
            .collect()),
        (Selector::Names(_), other) => mismatch(MaskEvaluationError::ExpectedObject {
            at: path.location(step),
            found: kind_of(other),
        }),
        (Selector::Indices(indices), Value::Array(elements)) => {
            let len = elements.len();
            let wanted: Vec<usize> = indices
                .iter()
                .filter_map(|index| resolve_index(*index, len))
                .collect();
            Ok(elements
                .iter_mut()
                .enumerate()
                .filter(|(position, _)| wanted.contains(position))
                .map(|(_, value)| value)
                .collect())
        }
        (Selector::Slice { start, end }, Value::Array(elements)) => {
            let range = resolve_slice(*start, *end, elements.len());
            Ok(elements[range].iter_mut().collect())
        }
        (Selector::Indices(_) | Selector::Slice { .. }, other) => {
            mismatch(MaskEvaluationError::ExpectedArray {
                at: path.location(step),
                found: kind_of(other),
            })
        }
    }
}

/// Resolve a possibly negative index; `None` when out of range.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if index < 0 {
        let back = usize::try_from(index.unsigned_abs()).ok()?;
        len.checked_sub(back)
    } else {
        usize::try_from(index).ok().filter(|position| *position < len)
    }
}

/// Clamp slice bounds to `0..len`; an inverted range selects nothing.
fn resolve_slice(start: Option<i64>, end: Option<i64>, len: usize) -> Range<usize> {
    let clamp = |bound: i64| {
        let magnitude = usize::try_from(bound.unsigned_abs()).unwrap_or(usize::MAX);
        if bound < 0 {
            len.saturating_sub(magnitude)
        } else {
            magnitude.min(len)
        }
    };
    let start = start.map_or(0, clamp);
    let end = end.map_or(len, clamp);
    start..end.max(start)
}

//! Canonical JSON encoding of arbitrary `Serialize` values.
//!
//! # Design
//! - A dedicated `serde::Serializer` builds the document, so collection
//!   sequences (`Vec`, sets, deques) can be told apart from fixed-size tuples
//!   and arrays, which keep their order.
//! - Object members are gathered in a `BTreeMap`, giving code-point key order
//!   independent of `serde_json` feature flags.
//! - Null members are dropped and collection elements are sorted when they
//!   share a natural order; otherwise iteration order is kept and a warning
//!   is logged.
//! - `NaN` and the infinities are written as the strings `"NaN"`,
//!   `"Infinity"` and `"-Infinity"` so such fields stay visible.
//! - Unit variants are written as their names, so collections of them sort by
//!   name rather than declaration order.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Display;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde::ser;
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::warn;

use crate::error::{SnapshotError, SnapshotResult};

/// Number of elements quoted in the unsortable-collection warning.
const WARN_EXAMPLE_COUNT: usize = 3;

/// Errors raised while walking a value graph.
#[derive(Debug, Error)]
pub enum CanonicalError {
    /// A map key serialized to something other than a scalar.
    #[error("map key must be a string, number, boolean or unit variant")]
    KeyMustBeScalar {
        /// JSON kind the key serialized to.
        found: &'static str,
    },
    /// A map value arrived without a preceding key.
    #[error("map value serialized before its key")]
    ValueWithoutKey,
    /// The value's `Serialize` implementation reported an error.
    #[error("{message}")]
    Custom {
        /// Message supplied by the `Serialize` implementation.
        message: String,
    },
}

impl ser::Error for CanonicalError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Custom {
            message: msg.to_string(),
        }
    }
}

/// Encode `value` as compact canonical JSON, wrapped in a one-element array.
///
/// # Errors
///
/// Returns [`SnapshotError::Serialization`] when the value graph cannot be
/// represented (for example non-scalar map keys or a failing `Serialize`
/// implementation).
pub fn canonicalize<T>(value: &T) -> SnapshotResult<String>
where
    T: Serialize + ?Sized,
{
    let document = canonical_document(value)?;
    serde_json::to_string(&document).map_err(|source| SnapshotError::Encode {
        operation: "canonicalize",
        source,
    })
}

/// Build the canonical document for `value`.
///
/// The root is treated as the sole element of a collection, so a null root
/// yields an empty array.
///
/// # Errors
///
/// Returns [`SnapshotError::Serialization`] when the value graph cannot be
/// represented.
pub fn canonical_document<T>(value: &T) -> SnapshotResult<Value>
where
    T: Serialize + ?Sized,
{
    let root = value
        .serialize(CanonicalSerializer)
        .map_err(|source| SnapshotError::Serialization { source })?;
    Ok(Value::Array(order_collection(vec![root])))
}

/// Drop null elements and sort the rest when they share a natural order.
///
/// Strings, numbers and booleans each have a natural order; any other mix
/// keeps iteration order and logs a warning.
#[must_use]
pub fn order_collection(elements: Vec<Value>) -> Vec<Value> {
    let mut elements: Vec<Value> = elements
        .into_iter()
        .filter(|element| !element.is_null())
        .collect();
    if elements.len() < 2 {
        return elements;
    }

    if let Some(compare) = natural_order(&elements) {
        elements.sort_by(compare);
    } else {
        warn!(
            kinds = %describe_kinds(&elements),
            examples = %describe_examples(&elements),
            "collection elements have no common natural order; keeping iteration order (consider a custom Serialize impl)"
        );
    }
    elements
}

/// JSON kind name used in diagnostics.
pub(crate) const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

type Comparator = fn(&Value, &Value) -> Ordering;

fn natural_order(elements: &[Value]) -> Option<Comparator> {
    let first = elements.first()?;
    let compare: Comparator = match first {
        Value::String(_) => compare_strings,
        Value::Number(_) => compare_numbers,
        Value::Bool(_) => compare_bools,
        _ => return None,
    };
    let kind = kind_of(first);
    elements
        .iter()
        .all(|element| kind_of(element) == kind)
        .then_some(compare)
}

fn compare_strings(left: &Value, right: &Value) -> Ordering {
    left.as_str().cmp(&right.as_str())
}

fn compare_bools(left: &Value, right: &Value) -> Ordering {
    left.as_bool().cmp(&right.as_bool())
}

fn compare_numbers(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => compare_number(left, right),
        _ => Ordering::Equal,
    }
}

fn compare_number(left: &Number, right: &Number) -> Ordering {
    if let (Some(left), Some(right)) = (left.as_i64(), right.as_i64()) {
        return left.cmp(&right);
    }
    if let (Some(left), Some(right)) = (left.as_u64(), right.as_u64()) {
        return left.cmp(&right);
    }
    left.as_f64()
        .partial_cmp(&right.as_f64())
        .unwrap_or(Ordering::Equal)
}

fn describe_kinds(elements: &[Value]) -> String {
    let mut kinds: Vec<&str> = elements.iter().map(kind_of).collect();
    kinds.sort_unstable();
    kinds.dedup();
    kinds.join(", ")
}

fn describe_examples(elements: &[Value]) -> String {
    elements
        .iter()
        .take(WARN_EXAMPLE_COUNT)
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Non-finite floats have no JSON number form and are written as strings.
fn float_value(value: f64) -> Value {
    Number::from_f64(value).map_or_else(
        || {
            let name = if value.is_nan() {
                "NaN"
            } else if value.is_sign_positive() {
                "Infinity"
            } else {
                "-Infinity"
            };
            Value::String(name.to_owned())
        },
        Value::Number,
    )
}

fn into_object(members: BTreeMap<String, Value>) -> Value {
    Value::Object(members.into_iter().collect::<Map<String, Value>>())
}

fn variant_object(variant: &str, payload: Value) -> Value {
    let mut members = BTreeMap::new();
    if !payload.is_null() {
        members.insert(variant.to_owned(), payload);
    }
    into_object(members)
}

fn map_key(key: Value) -> Result<String, CanonicalError> {
    match key {
        Value::String(key) => Ok(key),
        Value::Number(key) => Ok(key.to_string()),
        Value::Bool(key) => Ok(key.to_string()),
        other => Err(CanonicalError::KeyMustBeScalar {
            found: kind_of(&other),
        }),
    }
}

/// Serializer producing canonical `serde_json::Value` trees.
struct CanonicalSerializer;

impl ser::Serializer for CanonicalSerializer {
    type Ok = Value;
    type Error = CanonicalError;
    type SerializeSeq = CollectionBuilder;
    type SerializeTuple = ArrayBuilder;
    type SerializeTupleStruct = ArrayBuilder;
    type SerializeTupleVariant = TupleVariantBuilder;
    type SerializeMap = ObjectBuilder;
    type SerializeStruct = ObjectBuilder;
    type SerializeStructVariant = StructVariantBuilder;

    fn serialize_bool(self, v: bool) -> Result<Value, CanonicalError> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, CanonicalError> {
        Ok(Value::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, CanonicalError> {
        Ok(Value::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, CanonicalError> {
        Ok(Value::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, CanonicalError> {
        Ok(Value::from(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, CanonicalError> {
        Ok(Value::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, CanonicalError> {
        Ok(Value::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, CanonicalError> {
        Ok(Value::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, CanonicalError> {
        Ok(Value::from(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Value, CanonicalError> {
        // Shortest decimal form of the f32, not its widened f64 expansion.
        let widened = v.to_string().parse::<f64>().unwrap_or_else(|_| f64::from(v));
        Ok(float_value(widened))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, CanonicalError> {
        Ok(float_value(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, CanonicalError> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, CanonicalError> {
        Ok(Value::String(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, CanonicalError> {
        Ok(Value::String(STANDARD.encode(v)))
    }

    fn serialize_none(self) -> Result<Value, CanonicalError> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value, CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, CanonicalError> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, CanonicalError> {
        Ok(Value::Object(Map::new()))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value, CanonicalError> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        let payload = value.serialize(self)?;
        Ok(variant_object(variant, payload))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<CollectionBuilder, CanonicalError> {
        Ok(CollectionBuilder {
            elements: Vec::with_capacity(len.unwrap_or_default()),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<ArrayBuilder, CanonicalError> {
        Ok(ArrayBuilder {
            elements: Vec::with_capacity(len),
        })
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<ArrayBuilder, CanonicalError> {
        self.serialize_tuple(len)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<TupleVariantBuilder, CanonicalError> {
        Ok(TupleVariantBuilder {
            variant,
            elements: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<ObjectBuilder, CanonicalError> {
        Ok(ObjectBuilder::default())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<ObjectBuilder, CanonicalError> {
        Ok(ObjectBuilder::default())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<StructVariantBuilder, CanonicalError> {
        Ok(StructVariantBuilder {
            variant,
            object: ObjectBuilder::default(),
        })
    }
}

/// Unordered-collection sequence; sorted on completion.
struct CollectionBuilder {
    elements: Vec<Value>,
}

impl ser::SerializeSeq for CollectionBuilder {
    type Ok = Value;
    type Error = CanonicalError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        self.elements.push(value.serialize(CanonicalSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, CanonicalError> {
        Ok(Value::Array(order_collection(self.elements)))
    }
}

/// Fixed-size tuple or array; order and nulls preserved.
struct ArrayBuilder {
    elements: Vec<Value>,
}

impl ser::SerializeTuple for ArrayBuilder {
    type Ok = Value;
    type Error = CanonicalError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        self.elements.push(value.serialize(CanonicalSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, CanonicalError> {
        Ok(Value::Array(self.elements))
    }
}

impl ser::SerializeTupleStruct for ArrayBuilder {
    type Ok = Value;
    type Error = CanonicalError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeTuple::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, CanonicalError> {
        ser::SerializeTuple::end(self)
    }
}

struct TupleVariantBuilder {
    variant: &'static str,
    elements: Vec<Value>,
}

impl ser::SerializeTupleVariant for TupleVariantBuilder {
    type Ok = Value;
    type Error = CanonicalError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        self.elements.push(value.serialize(CanonicalSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, CanonicalError> {
        Ok(variant_object(self.variant, Value::Array(self.elements)))
    }
}

/// Struct or map members in key order; null members skipped.
#[derive(Default)]
struct ObjectBuilder {
    members: BTreeMap<String, Value>,
    pending_key: Option<String>,
}

impl ObjectBuilder {
    fn insert(&mut self, key: String, value: Value) {
        if !value.is_null() {
            self.members.insert(key, value);
        }
    }
}

impl ser::SerializeMap for ObjectBuilder {
    type Ok = Value;
    type Error = CanonicalError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        self.pending_key = Some(map_key(key.serialize(CanonicalSerializer)?)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .pending_key
            .take()
            .ok_or(CanonicalError::ValueWithoutKey)?;
        let value = value.serialize(CanonicalSerializer)?;
        self.insert(key, value);
        Ok(())
    }

    fn end(self) -> Result<Value, CanonicalError> {
        Ok(into_object(self.members))
    }
}

impl ser::SerializeStruct for ObjectBuilder {
    type Ok = Value;
    type Error = CanonicalError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        let value = value.serialize(CanonicalSerializer)?;
        self.insert(key.to_owned(), value);
        Ok(())
    }

    fn end(self) -> Result<Value, CanonicalError> {
        Ok(into_object(self.members))
    }
}

struct StructVariantBuilder {
    variant: &'static str,
    object: ObjectBuilder,
}

impl ser::SerializeStructVariant for StructVariantBuilder {
    type Ok = Value;
    type Error = CanonicalError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeStruct::serialize_field(&mut self.object, key, value)
    }

    fn end(self) -> Result<Value, CanonicalError> {
        Ok(variant_object(
            self.variant,
            into_object(self.object.members),
        ))
    }
}

//! Coercion from dynamic JSON values to the fixed set of indexable scalar
//! kinds.
//!
//! `serde_json::Value` already is the sealed tagged union spec §9 calls for
//! (`Null | Bool | Number | String | Array | Object`); this module only adds
//! the narrower `IndexedValue` that the index codec actually stores, plus
//! the coercion rule from one to the other.

use crate::util::f64_to_bytes;

/// Type tags, fixed and stable on disk.
pub const TAG_BOOL: u8 = 0x01;
pub const TAG_STRING: u8 = 0x02;
pub const TAG_FLOAT64: u8 = 0x03;
pub const TAG_NIL: u8 = 0x04;
/// Sentinel: value is not indexed (arrays, objects, other).
pub const TAG_NO_INDEX: u8 = 0x00;

/// The scalar kinds the index codec understands, plus the `NoIndex`
/// sentinel for everything it doesn't.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexedValue {
    Bool(bool),
    String(String),
    Float64(f64),
    Nil,
    NoIndex,
}

impl IndexedValue {
    /// Coerce a parsed JSON value into the narrower indexable set. Booleans
    /// map to `Bool`, strings to `String`, all numeric inputs (integers and
    /// floats alike) to `Float64`, null to `Nil`, and arrays/objects to
    /// `NoIndex`.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => IndexedValue::Bool(*b),
            serde_json::Value::String(s) => IndexedValue::String(s.clone()),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => IndexedValue::Float64(f),
                None => IndexedValue::NoIndex,
            },
            serde_json::Value::Null => IndexedValue::Nil,
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => IndexedValue::NoIndex,
        }
    }

    /// The fixed on-disk type tag for this value.
    pub fn tag(&self) -> u8 {
        match self {
            IndexedValue::Bool(_) => TAG_BOOL,
            IndexedValue::String(_) => TAG_STRING,
            IndexedValue::Float64(_) => TAG_FLOAT64,
            IndexedValue::Nil => TAG_NIL,
            IndexedValue::NoIndex => TAG_NO_INDEX,
        }
    }

    /// The raw value-bytes encoding used inside an index key (before the
    /// separator and primary key are appended). `None` for `NoIndex`.
    pub fn value_bytes(&self) -> Option<Vec<u8>> {
        match self {
            IndexedValue::Bool(b) => Some(vec![if *b { 1 } else { 0 }]),
            IndexedValue::String(s) => Some(s.as_bytes().to_vec()),
            IndexedValue::Float64(f) => Some(f64_to_bytes(*f).to_vec()),
            IndexedValue::Nil => Some(Vec::new()),
            IndexedValue::NoIndex => None,
        }
    }
}

/// Anything that can be coerced into an [`IndexedValue`] for query inputs
/// (`PropValueMatch`, `PropValuePrefix`, `PropValueRange` arguments).
pub trait ToIndexedValue {
    fn to_indexed_value(&self) -> IndexedValue;
}

impl ToIndexedValue for bool {
    fn to_indexed_value(&self) -> IndexedValue {
        IndexedValue::Bool(*self)
    }
}

impl ToIndexedValue for str {
    fn to_indexed_value(&self) -> IndexedValue {
        IndexedValue::String(self.to_string())
    }
}

impl ToIndexedValue for String {
    fn to_indexed_value(&self) -> IndexedValue {
        IndexedValue::String(self.clone())
    }
}

impl ToIndexedValue for f64 {
    fn to_indexed_value(&self) -> IndexedValue {
        IndexedValue::Float64(*self)
    }
}

impl ToIndexedValue for i64 {
    fn to_indexed_value(&self) -> IndexedValue {
        IndexedValue::Float64(*self as f64)
    }
}

impl ToIndexedValue for serde_json::Value {
    fn to_indexed_value(&self) -> IndexedValue {
        IndexedValue::from_json(self)
    }
}

impl<T: ToIndexedValue + ?Sized> ToIndexedValue for &T {
    fn to_indexed_value(&self) -> IndexedValue {
        (**self).to_indexed_value()
    }
}

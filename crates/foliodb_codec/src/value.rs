//! Dynamic document value type.

use crate::document::Document;
use std::hash::{Hash, Hasher};

/// A dynamic document field value.
///
/// `Value` is the closed set of types a document field can hold. Equality
/// and hashing are **total** (usable as a map key) and implement the
/// engine's numeric coercion policy: an integer and a float compare equal
/// when they denote the same real number, so `Value::Integer(30)` equals
/// `Value::Float(30.0)`. This matters for index lookups and uniqueness
/// checks, where `{"age": 30}` and `{"age": 30.0}` must collide.
///
/// NaN floats compare equal to each other so that equality stays total;
/// JSON cannot represent NaN, so such values never come out of the codec.
#[derive(Debug, Clone)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// Double-precision float.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Array of values.
    Array(Vec<Value>),
    /// Nested document.
    Object(Document),
}

impl Value {
    /// Returns `true` if the value is `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the integer value, if this is an `Integer`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the numeric value as a float, if this is numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string slice, if this is a `String`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Converts a float to the integer it denotes, if it denotes one exactly.
///
/// The upper bound is exclusive because `2^63` is representable as `f64`
/// while `i64::MAX` is not; `2^63` must not be treated as `i64::MAX`.
#[allow(clippy::cast_possible_truncation)]
fn float_as_i64(f: f64) -> Option<i64> {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    if f.fract() == 0.0 && f >= -TWO_POW_63 && f < TWO_POW_63 {
        Some(f as i64)
    } else {
        None
    }
}

fn float_eq(a: f64, b: f64) -> bool {
    // IEEE equality, except NaN equals NaN so the relation stays total.
    a == b || (a.is_nan() && b.is_nan())
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => float_eq(*a, *b),
            (Self::Integer(n), Self::Float(f)) | (Self::Float(f), Self::Integer(n)) => {
                float_as_i64(*f) == Some(*n)
            }
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Null => state.write_u8(0),
            Self::Bool(b) => {
                state.write_u8(1);
                b.hash(state);
            }
            Self::Integer(n) => {
                state.write_u8(2);
                n.hash(state);
            }
            // Integral floats hash as the integer they equal; everything
            // else hashes by bit pattern with NaN canonicalized.
            Self::Float(f) => match float_as_i64(*f) {
                Some(n) => {
                    state.write_u8(2);
                    n.hash(state);
                }
                None => {
                    state.write_u8(3);
                    let bits = if f.is_nan() {
                        f64::NAN.to_bits()
                    } else {
                        f.to_bits()
                    };
                    state.write_u64(bits);
                }
            },
            Self::String(s) => {
                state.write_u8(4);
                s.hash(state);
            }
            Self::Array(items) => {
                state.write_u8(5);
                items.hash(state);
            }
            Self::Object(doc) => {
                state.write_u8(6);
                doc.hash(state);
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Self::Object(doc)
    }
}

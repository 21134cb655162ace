//! JSON encoding and decoding for documents.
//!
//! Documents serialize as UTF-8 JSON objects. Deserialization accepts any
//! JSON object and maps numbers onto the tagged value space: integers that
//! fit a signed 64-bit decode as [`Value::Integer`], fractional or
//! overflowing numbers decode as [`Value::Float`].

use crate::document::Document;
use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// Serializes a document to compact JSON bytes.
pub fn to_vec(doc: &Document) -> CodecResult<Vec<u8>> {
    Ok(serde_json::to_vec(doc)?)
}

/// Serializes a document to pretty-printed JSON bytes.
pub fn to_vec_pretty(doc: &Document) -> CodecResult<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(doc)?)
}

/// Deserializes a document from JSON bytes.
///
/// Fails with [`CodecError::Json`] if the payload is not valid JSON or its
/// root is not an object.
pub fn from_slice(bytes: &[u8]) -> CodecResult<Document> {
    Ok(serde_json::from_slice(bytes)?)
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Integer(n) => serializer.serialize_i64(*n),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => items.serialize(serializer),
            Self::Object(doc) => doc.serialize(serializer),
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, n: i64) -> Result<Value, E> {
        Ok(Value::Integer(n))
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_u64<E: de::Error>(self, n: u64) -> Result<Value, E> {
        match i64::try_from(n) {
            Ok(signed) => Ok(Value::Integer(signed)),
            Err(_) => Ok(Value::Float(n as f64)),
        }
    }

    fn visit_f64<E: de::Error>(self, f: f64) -> Result<Value, E> {
        Ok(Value::Float(f))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<Value, E> {
        Ok(Value::String(s.to_string()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> Result<Value, E> {
        Ok(Value::String(s))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Value, A::Error> {
        DocumentVisitor.visit_map(map).map(Value::Object)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = Document;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Document, A::Error> {
        let mut doc = Document::new();
        while let Some((field, value)) = map.next_entry::<String, Value>()? {
            doc.insert(field, value);
        }
        Ok(doc)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(DocumentVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(doc: &Document) -> Document {
        from_slice(&to_vec(doc).unwrap()).unwrap()
    }

    #[test]
    fn empty_document() {
        let doc = Document::new();
        assert_eq!(to_vec(&doc).unwrap(), b"{}");
        assert_eq!(roundtrip(&doc), doc);
    }

    #[test]
    fn scalar_fields_roundtrip() {
        let doc = Document::new()
            .with("null", Value::Null)
            .with("bool", true)
            .with("int", 42)
            .with("float", 2.5)
            .with("string", "hello");
        assert_eq!(roundtrip(&doc), doc);
    }

    #[test]
    fn integers_stay_integers() {
        let doc = roundtrip(&Document::new().with("n", i64::MAX).with("m", i64::MIN));
        assert_eq!(doc.get("n"), Some(&Value::Integer(i64::MAX)));
        assert_eq!(doc.get("m"), Some(&Value::Integer(i64::MIN)));
    }

    #[test]
    fn overflowing_integer_decodes_as_float() {
        // 2^63 does not fit i64.
        let doc = from_slice(br#"{"n": 9223372036854775808}"#).unwrap();
        assert!(matches!(doc.get("n"), Some(Value::Float(_))));
    }

    #[test]
    fn fractional_number_decodes_as_float() {
        let doc = from_slice(br#"{"n": 1.25}"#).unwrap();
        assert_eq!(doc.get("n"), Some(&Value::Float(1.25)));
    }

    #[test]
    fn integral_float_reencodes_as_float() {
        // serde_json keeps the ".0" marker, so Float(3.0) survives a
        // round-trip as a float rather than collapsing to an integer.
        let doc = Document::new().with("n", 3.0);
        let bytes = to_vec(&doc).unwrap();
        assert_eq!(bytes, br#"{"n":3.0}"#);
        assert_eq!(roundtrip(&doc), doc);
    }

    #[test]
    fn nested_structures_roundtrip() {
        let doc = Document::new()
            .with(
                "tags",
                vec![Value::from("a"), Value::from("b"), Value::Integer(3)],
            )
            .with(
                "address",
                Document::new().with("city", "Paris").with("zip", 75000),
            );
        assert_eq!(roundtrip(&doc), doc);
    }

    #[test]
    fn root_must_be_object() {
        assert!(from_slice(b"[1, 2, 3]").is_err());
        assert!(from_slice(b"42").is_err());
        assert!(from_slice(b"not json at all").is_err());
    }

    #[test]
    fn id_field_roundtrips() {
        let mut doc = Document::new().with("name", "Ada");
        doc.set_id("17f0c2ab");
        assert_eq!(roundtrip(&doc).id(), Some("17f0c2ab"));
    }
}

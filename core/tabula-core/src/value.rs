//! Typed value layer: scalar values, their canonical binary form, and the
//! per-type total ordering used by every downstream component.
//!
//! The wire format is little-endian. `Int32` serializes to 4 bytes of
//! two's-complement, `Float64` to the 8-byte IEEE-754 bit pattern, and
//! `String` to a 4-byte non-negative length prefix followed by the raw
//! UTF-8 payload.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{TabulaError, TabulaResult};

/// Closed set of scalar column types.
///
/// Adding a type means extending the codec and the comparator together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabularType {
    Int32,
    Float64,
    String,
}

impl fmt::Display for TabularType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TabularType::Int32 => "Int32",
            TabularType::Float64 => "Float64",
            TabularType::String => "String",
        };
        f.write_str(name)
    }
}

/// A scalar value at the public API boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int32(i32),
    Float64(f64),
    String(String),
}

impl Value {
    /// The type tag of this value.
    pub fn tabular_type(&self) -> TabularType {
        match self {
            Value::Int32(_) => TabularType::Int32,
            Value::Float64(_) => TabularType::Float64,
            Value::String(_) => TabularType::String,
        }
    }

    /// Serializes the value into its canonical binary form.
    pub fn to_blob(&self) -> Blob {
        match self {
            Value::Int32(v) => Blob(v.to_le_bytes().to_vec()),
            Value::Float64(v) => Blob(v.to_le_bytes().to_vec()),
            Value::String(s) => {
                let payload = s.as_bytes();
                let mut buf = Vec::with_capacity(4 + payload.len());
                buf.extend_from_slice(&(payload.len() as i32).to_le_bytes());
                buf.extend_from_slice(payload);
                Blob(buf)
            }
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// Opaque byte sequence holding one serialized scalar.
///
/// Equality and hashing are defined on the raw bytes; ordering is only
/// meaningful through [`compare`] with the owning column's type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Blob(Vec<u8>);

impl Blob {
    /// The raw serialized bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Byte length of the serialized form.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Blob(bytes)
    }
}

/// Deserializes a blob back into a typed value.
///
/// The exact inverse of [`Value::to_blob`]: trailing bytes, truncation, a
/// negative length prefix, or a non-UTF-8 payload all fail with
/// [`TabulaError::InvalidData`].
pub fn deserialize(ty: TabularType, blob: &Blob) -> TabulaResult<Value> {
    let bytes = blob.as_bytes();
    match ty {
        TabularType::Int32 => {
            let raw: [u8; 4] = bytes.try_into().map_err(|_| {
                TabulaError::InvalidData(format!("expected 4 bytes for Int32, got {}", bytes.len()))
            })?;
            Ok(Value::Int32(i32::from_le_bytes(raw)))
        }
        TabularType::Float64 => {
            let raw: [u8; 8] = bytes.try_into().map_err(|_| {
                TabulaError::InvalidData(format!(
                    "expected 8 bytes for Float64, got {}",
                    bytes.len()
                ))
            })?;
            Ok(Value::Float64(f64::from_le_bytes(raw)))
        }
        TabularType::String => {
            if bytes.len() < 4 {
                return Err(TabulaError::InvalidData(
                    "truncated string length prefix".to_string(),
                ));
            }
            let len = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            if len < 0 {
                return Err(TabulaError::InvalidData(format!(
                    "negative string length {len}"
                )));
            }
            let payload = &bytes[4..];
            if payload.len() != len as usize {
                return Err(TabulaError::InvalidData(format!(
                    "string length prefix {len} does not match payload of {} bytes",
                    payload.len()
                )));
            }
            let text = std::str::from_utf8(payload).map_err(|_| {
                TabulaError::InvalidData("string payload is not valid UTF-8".to_string())
            })?;
            Ok(Value::String(text.to_string()))
        }
    }
}

/// Total-order comparison of two blobs under a type tag.
///
/// Numeric types decode and compare numerically; `Float64` uses the
/// IEEE-754 total order, so every bit pattern (NaN included) has a
/// defined rank. Strings compare byte-lexicographically on the UTF-8
/// payload, length prefix excluded. Blobs not produced by the serializer
/// compare by raw bytes.
pub fn compare(ty: TabularType, a: &Blob, b: &Blob) -> Ordering {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    match ty {
        TabularType::Int32 => match (decode_i32(a), decode_i32(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => a.cmp(b),
        },
        TabularType::Float64 => match (decode_f64(a), decode_f64(b)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => a.cmp(b),
        },
        TabularType::String => string_payload(a).cmp(string_payload(b)),
    }
}

fn decode_i32(bytes: &[u8]) -> Option<i32> {
    <[u8; 4]>::try_from(bytes).ok().map(i32::from_le_bytes)
}

fn decode_f64(bytes: &[u8]) -> Option<f64> {
    <[u8; 8]>::try_from(bytes).ok().map(f64::from_le_bytes)
}

fn string_payload(bytes: &[u8]) -> &[u8] {
    bytes.get(4..).unwrap_or(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_int32_wire_format() {
        let blob = Value::Int32(0x0403_0201).to_blob();
        assert_eq!(blob.as_bytes(), &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_string_wire_format() {
        let blob = Value::String("hi".to_string()).to_blob();
        assert_eq!(blob.as_bytes(), &[2, 0, 0, 0, b'h', b'i']);
    }

    #[test]
    fn test_float64_roundtrip() {
        let value = Value::Float64(85.5);
        let blob = value.to_blob();
        assert_eq!(blob.len(), 8);
        assert_eq!(deserialize(TabularType::Float64, &blob).unwrap(), value);
    }

    #[test]
    fn test_empty_string_roundtrip() {
        let value = Value::String(String::new());
        let blob = value.to_blob();
        assert_eq!(blob.as_bytes(), &[0, 0, 0, 0]);
        assert_eq!(deserialize(TabularType::String, &blob).unwrap(), value);
    }

    #[test]
    fn test_deserialize_truncated_int32() {
        let blob = Blob::from(vec![1, 2, 3]);
        assert!(matches!(
            deserialize(TabularType::Int32, &blob),
            Err(TabulaError::InvalidData(_))
        ));
    }

    #[test]
    fn test_deserialize_trailing_bytes_rejected() {
        let blob = Blob::from(vec![1, 2, 3, 4, 5]);
        assert!(deserialize(TabularType::Int32, &blob).is_err());
    }

    #[test]
    fn test_deserialize_negative_string_length() {
        let blob = Blob::from((-1i32).to_le_bytes().to_vec());
        assert!(matches!(
            deserialize(TabularType::String, &blob),
            Err(TabulaError::InvalidData(_))
        ));
    }

    #[test]
    fn test_deserialize_short_string_payload() {
        let mut bytes = 5i32.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"hi");
        assert!(deserialize(TabularType::String, &Blob::from(bytes)).is_err());
    }

    #[test]
    fn test_deserialize_invalid_utf8() {
        let mut bytes = 2i32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        assert!(deserialize(TabularType::String, &Blob::from(bytes)).is_err());
    }

    #[test]
    fn test_compare_int32_negative_below_positive() {
        let a = Value::Int32(-5).to_blob();
        let b = Value::Int32(3).to_blob();
        assert_eq!(compare(TabularType::Int32, &a, &b), Ordering::Less);
    }

    #[test]
    fn test_compare_string_ignores_length_prefix() {
        // "ab" has the longer prefix but sorts before "b" on payload bytes.
        let a = Value::from("ab").to_blob();
        let b = Value::from("b").to_blob();
        assert_eq!(compare(TabularType::String, &a, &b), Ordering::Less);
    }

    #[test]
    fn test_compare_float64_total_order() {
        let neg = Value::Float64(-1.5).to_blob();
        let pos = Value::Float64(2.5).to_blob();
        let nan = Value::Float64(f64::NAN).to_blob();
        assert_eq!(compare(TabularType::Float64, &neg, &pos), Ordering::Less);
        assert_eq!(compare(TabularType::Float64, &nan, &nan), Ordering::Equal);
    }

    proptest! {
        #[test]
        fn prop_roundtrip_int32(v in any::<i32>()) {
            let value = Value::Int32(v);
            prop_assert_eq!(
                deserialize(TabularType::Int32, &value.to_blob()).unwrap(),
                value
            );
        }

        #[test]
        fn prop_roundtrip_float64(v in any::<f64>()) {
            let value = Value::Float64(v);
            let back = deserialize(TabularType::Float64, &value.to_blob()).unwrap();
            match back {
                Value::Float64(w) => prop_assert_eq!(v.to_bits(), w.to_bits()),
                other => prop_assert!(false, "wrong variant: {:?}", other),
            }
        }

        #[test]
        fn prop_roundtrip_string(s in ".*") {
            let value = Value::String(s);
            prop_assert_eq!(
                deserialize(TabularType::String, &value.to_blob()).unwrap(),
                value
            );
        }

        #[test]
        fn prop_compare_int32_matches_native_order(a in any::<i32>(), b in any::<i32>()) {
            let left = Value::Int32(a).to_blob();
            let right = Value::Int32(b).to_blob();
            prop_assert_eq!(compare(TabularType::Int32, &left, &right), a.cmp(&b));
        }
    }
}

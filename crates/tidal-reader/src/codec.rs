//! Per-domain value capability
//!
//! [`PageValue`] is the only place the read path varies by value domain: how a
//! page's value stream is encoded and decoded, and how a typed value maps to and
//! from the dynamic [`Value`]. Predicates compare through `PartialOrd`, which is
//! the natural order of each domain (bytes lexicographically, `false < true`).

use crate::error::{ReadError, Result};
use std::fmt::Debug;
use tidal_compression::{
    BooleanDecoder, BooleanEncoder, DictionaryDecoder, DictionaryEncoder, Float32Decoder,
    GorillaDecoder, GorillaEncoder, Int32Decoder, IntegerDecoder, IntegerEncoder, ValueDecoder,
};
use tidal_core::{DataType, Value};

/// A value type that can be stored in an encoded page
pub trait PageValue: Clone + PartialOrd + Debug + Send + Sync + 'static {
    /// Domain tag stored alongside the page
    const DATA_TYPE: DataType;

    /// Streaming decoder over a page's value bytes
    type Decoder<'a>: ValueDecoder<Item = Self>;

    /// Open a decoder over `count` encoded values
    fn decoder(bytes: &[u8], count: usize) -> Result<Self::Decoder<'_>>;

    /// Encode a value column
    fn encode_values(values: &[Self]) -> Result<Vec<u8>>;

    /// Convert from the dynamic form
    fn from_value(value: Value) -> Result<Self>;

    /// Convert into the dynamic form
    fn into_value(self) -> Value;

    /// Numeric view used by the statistics aggregations
    fn to_f64(&self) -> Option<f64>;
}

fn mismatch<T: PageValue>(value: &Value) -> ReadError {
    ReadError::TypeMismatch {
        expected: T::DATA_TYPE,
        actual: value.data_type(),
    }
}

impl PageValue for bool {
    const DATA_TYPE: DataType = DataType::Boolean;
    type Decoder<'a> = BooleanDecoder<'a>;

    fn decoder(bytes: &[u8], count: usize) -> Result<Self::Decoder<'_>> {
        Ok(BooleanDecoder::new(bytes, count))
    }

    fn encode_values(values: &[Self]) -> Result<Vec<u8>> {
        let mut encoder = BooleanEncoder::new();
        for &v in values {
            encoder.encode(v);
        }
        Ok(encoder.finish())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(v) => Ok(v),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Boolean(self)
    }

    fn to_f64(&self) -> Option<f64> {
        None
    }
}

impl PageValue for i32 {
    const DATA_TYPE: DataType = DataType::Int32;
    type Decoder<'a> = Int32Decoder<'a>;

    fn decoder(bytes: &[u8], count: usize) -> Result<Self::Decoder<'_>> {
        Ok(Int32Decoder::new(bytes, count))
    }

    fn encode_values(values: &[Self]) -> Result<Vec<u8>> {
        let mut encoder = IntegerEncoder::with_capacity(values.len());
        for &v in values {
            encoder.encode(v as i64);
        }
        Ok(encoder.finish())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int32(v) => Ok(v),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Int32(self)
    }

    fn to_f64(&self) -> Option<f64> {
        Some(*self as f64)
    }
}

impl PageValue for i64 {
    const DATA_TYPE: DataType = DataType::Int64;
    type Decoder<'a> = IntegerDecoder<'a>;

    fn decoder(bytes: &[u8], count: usize) -> Result<Self::Decoder<'_>> {
        Ok(IntegerDecoder::new(bytes, count))
    }

    fn encode_values(values: &[Self]) -> Result<Vec<u8>> {
        let mut encoder = IntegerEncoder::with_capacity(values.len());
        for &v in values {
            encoder.encode(v);
        }
        Ok(encoder.finish())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int64(v) => Ok(v),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Int64(self)
    }

    fn to_f64(&self) -> Option<f64> {
        Some(*self as f64)
    }
}

impl PageValue for f32 {
    const DATA_TYPE: DataType = DataType::Float;
    type Decoder<'a> = Float32Decoder<'a>;

    fn decoder(bytes: &[u8], count: usize) -> Result<Self::Decoder<'_>> {
        Ok(Float32Decoder::new(bytes, count))
    }

    fn encode_values(values: &[Self]) -> Result<Vec<u8>> {
        let mut encoder = GorillaEncoder::new();
        for &v in values {
            encoder.encode(v as f64);
        }
        Ok(encoder.finish())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(v),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn to_f64(&self) -> Option<f64> {
        Some(*self as f64)
    }
}

impl PageValue for f64 {
    const DATA_TYPE: DataType = DataType::Double;
    type Decoder<'a> = GorillaDecoder<'a>;

    fn decoder(bytes: &[u8], count: usize) -> Result<Self::Decoder<'_>> {
        Ok(GorillaDecoder::new(bytes, count))
    }

    fn encode_values(values: &[Self]) -> Result<Vec<u8>> {
        let mut encoder = GorillaEncoder::new();
        for &v in values {
            encoder.encode(v);
        }
        Ok(encoder.finish())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Double(v) => Ok(v),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Double(self)
    }

    fn to_f64(&self) -> Option<f64> {
        Some(*self)
    }
}

impl PageValue for Vec<u8> {
    const DATA_TYPE: DataType = DataType::Text;
    type Decoder<'a> = DictionaryDecoder<'a>;

    fn decoder(bytes: &[u8], count: usize) -> Result<Self::Decoder<'_>> {
        Ok(DictionaryDecoder::from_bytes(bytes, count)?)
    }

    fn encode_values(values: &[Self]) -> Result<Vec<u8>> {
        let mut encoder = DictionaryEncoder::new();
        for v in values {
            encoder.encode(v)?;
        }
        Ok(encoder.finish())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn into_value(self) -> Value {
        Value::Text(self)
    }

    fn to_f64(&self) -> Option<f64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<T: PageValue + PartialEq>(values: Vec<T>) {
        let bytes = T::encode_values(&values).unwrap();
        let mut decoder = T::decoder(&bytes, values.len()).unwrap();
        let mut decoded = Vec::new();
        while let Some(v) = decoder.decode_next().unwrap() {
            decoded.push(v);
        }
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_every_domain_decodes() {
        roundtrip(vec![true, false, true]);
        roundtrip(vec![1_i32, -5, i32::MAX]);
        roundtrip(vec![1_i64, 1 << 50, -9]);
        roundtrip(vec![0.5_f32, -2.25]);
        roundtrip(vec![10.0_f64, 10.5, 11.0]);
        roundtrip(vec![b"on".to_vec(), b"off".to_vec(), b"on".to_vec()]);
    }

    #[test]
    fn test_value_conversion() {
        assert_eq!(i32::from_value(Value::Int32(7)).unwrap(), 7);
        assert_eq!(7_i32.into_value(), Value::Int32(7));
        assert_eq!(
            Vec::<u8>::from_value(Value::text("x")).unwrap(),
            b"x".to_vec()
        );

        let err = i64::from_value(Value::Int32(7)).unwrap_err();
        assert!(matches!(
            err,
            ReadError::TypeMismatch {
                expected: DataType::Int64,
                actual: DataType::Int32
            }
        ));
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(3_i32.to_f64(), Some(3.0));
        assert_eq!(1.5_f32.to_f64(), Some(1.5));
        assert_eq!(true.to_f64(), None);
        assert_eq!(b"a".to_vec().to_f64(), None);
    }

    #[test]
    fn test_natural_order() {
        assert!(false < true);
        assert!(b"abc".to_vec() < b"abd".to_vec());
        assert!(b"ab".to_vec() < b"abc".to_vec());
    }
}

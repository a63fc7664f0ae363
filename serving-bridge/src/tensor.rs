//! Numeric buffers parsed from caller-supplied strings, and their
//! `TensorProto` encoding.

use std::str::FromStr;

use half::f16;

use crate::dtype::ElementType;
use crate::error::BridgeError;
use crate::proto::{TensorProto, TensorShapeProto};

/// Caller values parsed into the declared element type.
///
/// Always interpreted as a row vector: a tensor built from a buffer of `n`
/// elements has shape `(1, n)`.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericBuffer {
    Float16(Vec<f16>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Uint8(Vec<u8>),
    Uint16(Vec<u16>),
    Uint32(Vec<u32>),
    Uint64(Vec<u64>),
    Bool(Vec<bool>),
    String(Vec<String>),
}

impl NumericBuffer {
    /// Parse every value as `dtype`. Fails on the first value that does not
    /// parse; nothing is coerced.
    pub fn parse(dtype: ElementType, values: &[String]) -> Result<Self, BridgeError> {
        Ok(match dtype {
            ElementType::Float16 => Self::Float16(
                parse_with(dtype, values, |s| s.parse::<f64>().ok().map(f16::from_f64))?,
            ),
            ElementType::Float32 => Self::Float32(parse_all(dtype, values)?),
            ElementType::Float64 => Self::Float64(parse_all(dtype, values)?),
            ElementType::Int8 => Self::Int8(parse_all(dtype, values)?),
            ElementType::Int16 => Self::Int16(parse_all(dtype, values)?),
            ElementType::Int32 => Self::Int32(parse_all(dtype, values)?),
            ElementType::Int64 => Self::Int64(parse_all(dtype, values)?),
            ElementType::Uint8 => Self::Uint8(parse_all(dtype, values)?),
            ElementType::Uint16 => Self::Uint16(parse_all(dtype, values)?),
            ElementType::Uint32 => Self::Uint32(parse_all(dtype, values)?),
            ElementType::Uint64 => Self::Uint64(parse_all(dtype, values)?),
            ElementType::Bool => Self::Bool(parse_with(dtype, values, parse_bool)?),
            ElementType::String => Self::String(values.to_vec()),
        })
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Float16(_) => ElementType::Float16,
            Self::Float32(_) => ElementType::Float32,
            Self::Float64(_) => ElementType::Float64,
            Self::Int8(_) => ElementType::Int8,
            Self::Int16(_) => ElementType::Int16,
            Self::Int32(_) => ElementType::Int32,
            Self::Int64(_) => ElementType::Int64,
            Self::Uint8(_) => ElementType::Uint8,
            Self::Uint16(_) => ElementType::Uint16,
            Self::Uint32(_) => ElementType::Uint32,
            Self::Uint64(_) => ElementType::Uint64,
            Self::Bool(_) => ElementType::Bool,
            Self::String(_) => ElementType::String,
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Float16(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Int8(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Uint8(v) => v.len(),
            Self::Uint16(v) => v.len(),
            Self::Uint32(v) => v.len(),
            Self::Uint64(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::String(v) => v.len(),
        }
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shape of the row-vector matrix this buffer represents.
    pub fn shape(&self) -> [i64; 2] {
        [1, self.len() as i64]
    }

    /// Encode as a `TensorProto`. Fixed-width types go into `tensor_content`
    /// as little-endian bytes; strings go into `string_val`.
    pub fn into_tensor_proto(self) -> TensorProto {
        let mut tensor = TensorProto {
            dtype: self.element_type().data_type() as i32,
            tensor_shape: Some(TensorShapeProto::from_dims(&self.shape())),
            ..Default::default()
        };

        match self {
            Self::Float16(v) => tensor.tensor_content = le_bytes(&v, |x| x.to_le_bytes()),
            Self::Float32(v) => tensor.tensor_content = le_bytes(&v, |x| x.to_le_bytes()),
            Self::Float64(v) => tensor.tensor_content = le_bytes(&v, |x| x.to_le_bytes()),
            Self::Int8(v) => tensor.tensor_content = le_bytes(&v, |x| x.to_le_bytes()),
            Self::Int16(v) => tensor.tensor_content = le_bytes(&v, |x| x.to_le_bytes()),
            Self::Int32(v) => tensor.tensor_content = le_bytes(&v, |x| x.to_le_bytes()),
            Self::Int64(v) => tensor.tensor_content = le_bytes(&v, |x| x.to_le_bytes()),
            Self::Uint8(v) => tensor.tensor_content = v,
            Self::Uint16(v) => tensor.tensor_content = le_bytes(&v, |x| x.to_le_bytes()),
            Self::Uint32(v) => tensor.tensor_content = le_bytes(&v, |x| x.to_le_bytes()),
            Self::Uint64(v) => tensor.tensor_content = le_bytes(&v, |x| x.to_le_bytes()),
            Self::Bool(v) => tensor.tensor_content = v.into_iter().map(u8::from).collect(),
            Self::String(v) => tensor.string_val = v.into_iter().map(String::into_bytes).collect(),
        }

        tensor
    }
}

// ── Parsing helpers ───────────────────────────────────────────────────────

fn parse_all<T: FromStr>(dtype: ElementType, values: &[String]) -> Result<Vec<T>, BridgeError> {
    parse_with(dtype, values, |s| s.parse::<T>().ok())
}

fn parse_with<T>(
    dtype: ElementType,
    values: &[String],
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<T>, BridgeError> {
    values
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            parse(raw.trim()).ok_or_else(|| BridgeError::InvalidValue {
                index,
                value: raw.clone(),
                dtype: dtype.as_str(),
            })
        })
        .collect()
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") || s == "1" {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") || s == "0" {
        Some(false)
    } else {
        None
    }
}

fn le_bytes<T, const N: usize>(values: &[T], to_bytes: impl Fn(&T) -> [u8; N]) -> Vec<u8> {
    values.iter().flat_map(to_bytes).collect()
}

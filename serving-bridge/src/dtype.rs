use std::fmt;
use std::str::FromStr;

use crate::error::BridgeError;
use crate::proto::DataType;

/// Element types accepted in the `input_type` parameter.
///
/// The mapping from names to types is closed: anything not listed in
/// [`ElementType::from_name`] is rejected with [`BridgeError::UnsupportedType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Float16,
    Float32,
    Float64,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Bool,
    String,
}

impl ElementType {
    #[cfg(test)]
    pub const ALL: [ElementType; 13] = [
        Self::Float16,
        Self::Float32,
        Self::Float64,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Uint8,
        Self::Uint16,
        Self::Uint32,
        Self::Uint64,
        Self::Bool,
        Self::String,
    ];

    /// Resolve a type name. Accepts the NumPy-style names plus the
    /// TensorFlow aliases `half`, `float` and `double`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "float16" | "half" => Some(Self::Float16),
            "float32" | "float" => Some(Self::Float32),
            "float64" | "double" => Some(Self::Float64),
            "int8" => Some(Self::Int8),
            "int16" => Some(Self::Int16),
            "int32" => Some(Self::Int32),
            "int64" => Some(Self::Int64),
            "uint8" => Some(Self::Uint8),
            "uint16" => Some(Self::Uint16),
            "uint32" => Some(Self::Uint32),
            "uint64" => Some(Self::Uint64),
            "bool" => Some(Self::Bool),
            "string" => Some(Self::String),
            _ => None,
        }
    }

    /// Canonical name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Float16 => "float16",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Bool => "bool",
            Self::String => "string",
        }
    }

    pub const fn data_type(self) -> DataType {
        match self {
            Self::Float16 => DataType::DtHalf,
            Self::Float32 => DataType::DtFloat,
            Self::Float64 => DataType::DtDouble,
            Self::Int8 => DataType::DtInt8,
            Self::Int16 => DataType::DtInt16,
            Self::Int32 => DataType::DtInt32,
            Self::Int64 => DataType::DtInt64,
            Self::Uint8 => DataType::DtUint8,
            Self::Uint16 => DataType::DtUint16,
            Self::Uint32 => DataType::DtUint32,
            Self::Uint64 => DataType::DtUint64,
            Self::Bool => DataType::DtBool,
            Self::String => DataType::DtString,
        }
    }

    /// Width in bytes of one element inside `tensor_content`.
    /// `None` for variable-length strings.
    #[cfg(test)]
    pub const fn byte_width(self) -> Option<usize> {
        match self {
            Self::Int8 | Self::Uint8 | Self::Bool => Some(1),
            Self::Float16 | Self::Int16 | Self::Uint16 => Some(2),
            Self::Float32 | Self::Int32 | Self::Uint32 => Some(4),
            Self::Float64 | Self::Int64 | Self::Uint64 => Some(8),
            Self::String => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| BridgeError::UnsupportedType(s.to_string()))
    }
}

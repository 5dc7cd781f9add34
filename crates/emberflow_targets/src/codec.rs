//! Per-column typed (de)serialization.
//!
//! Each codec declares how one column is represented on the wire:
//! [`ColumnCodec::encode`] maps the in-memory value to its serialized form
//! before CSV writing, [`ColumnCodec::decode`] maps it back after parsing,
//! and [`ColumnCodec::wire_type`] names the dtype the CSV cell is parsed
//! with. `decode(encode(x)) == x` must hold for every value the column may
//! carry. Nulls pass through both directions untouched.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat};
use thiserror::Error;

use crate::error::{Result, TargetError};
use crate::frame::Value;

/// Declared on-wire representation of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Bool,
    Int,
    Float,
    Text,
}

impl WireType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
        }
    }

    /// Parse a CSV cell into the declared representation. Empty cells are
    /// null.
    pub fn coerce(&self, column: &str, cell: &str) -> Result<Value> {
        if cell.is_empty() {
            return Ok(Value::Null);
        }
        let parsed = match self {
            Self::Bool => cell.parse::<bool>().ok().map(Value::Bool),
            Self::Int => cell.parse::<i64>().ok().map(Value::Int),
            Self::Float => cell.parse::<f64>().ok().map(Value::Float),
            Self::Text => Some(Value::Str(cell.to_string())),
        };
        parsed.ok_or_else(|| TargetError::Parse {
            column: column.to_string(),
            value: cell.to_string(),
            wire_type: *self,
        })
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Infer a value for a column with no declared codec.
pub(crate) fn infer(cell: &str) -> Value {
    if cell.is_empty() {
        Value::Null
    } else if let Ok(i) = cell.parse::<i64>() {
        Value::Int(i)
    } else if let Ok(f) = cell.parse::<f64>() {
        Value::Float(f)
    } else if let Ok(b) = cell.parse::<bool>() {
        Value::Bool(b)
    } else {
        Value::Str(cell.to_string())
    }
}

/// Failure applying a column transform.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CodecError {
    message: String,
}

impl CodecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Codec operation result type.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Transform pair plus wire representation for one column.
pub trait ColumnCodec: Send + Sync {
    /// The dtype CSV cells of this column are parsed with.
    fn wire_type(&self) -> WireType;

    /// In-memory value -> serialized value, applied before writing.
    fn encode(&self, value: Value) -> CodecResult<Value>;

    /// Serialized value -> in-memory value, applied after parsing.
    fn decode(&self, value: Value) -> CodecResult<Value>;
}

/// Column name -> codec. Columns absent from the map pass through with no
/// transform and inferred types.
pub type ColumnTypes = HashMap<String, Arc<dyn ColumnCodec>>;

fn unexpected(expected: &str, value: &Value) -> CodecError {
    CodecError::new(format!("expected {expected} value, got {value:?}"))
}

/// Identity codec for text columns.
pub struct TextCodec;

impl ColumnCodec for TextCodec {
    fn wire_type(&self) -> WireType {
        WireType::Text
    }

    fn encode(&self, value: Value) -> CodecResult<Value> {
        match value {
            Value::Null | Value::Str(_) => Ok(value),
            other => Err(unexpected("text", &other)),
        }
    }

    fn decode(&self, value: Value) -> CodecResult<Value> {
        self.encode(value)
    }
}

/// Identity codec for integer columns.
pub struct IntCodec;

impl ColumnCodec for IntCodec {
    fn wire_type(&self) -> WireType {
        WireType::Int
    }

    fn encode(&self, value: Value) -> CodecResult<Value> {
        match value {
            Value::Null | Value::Int(_) => Ok(value),
            other => Err(unexpected("integer", &other)),
        }
    }

    fn decode(&self, value: Value) -> CodecResult<Value> {
        self.encode(value)
    }
}

/// Identity codec for float columns.
pub struct FloatCodec;

impl ColumnCodec for FloatCodec {
    fn wire_type(&self) -> WireType {
        WireType::Float
    }

    fn encode(&self, value: Value) -> CodecResult<Value> {
        match value {
            Value::Null | Value::Float(_) => Ok(value),
            other => Err(unexpected("float", &other)),
        }
    }

    fn decode(&self, value: Value) -> CodecResult<Value> {
        self.encode(value)
    }
}

/// Booleans stored as 0/1 integers.
pub struct BoolCodec;

impl ColumnCodec for BoolCodec {
    fn wire_type(&self) -> WireType {
        WireType::Int
    }

    fn encode(&self, value: Value) -> CodecResult<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Bool(b) => Ok(Value::Int(i64::from(b))),
            other => Err(unexpected("bool", &other)),
        }
    }

    fn decode(&self, value: Value) -> CodecResult<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Int(0) => Ok(Value::Bool(false)),
            Value::Int(1) => Ok(Value::Bool(true)),
            Value::Int(n) => Err(CodecError::new(format!("boolean flag out of range: {n}"))),
            other => Err(unexpected("integer flag", &other)),
        }
    }
}

/// RFC 3339 timestamps stored as epoch seconds.
///
/// In-memory values are whole-second UTC timestamps in the `Z`-suffixed
/// canonical form; sub-second precision is rejected rather than silently
/// truncated.
pub struct TimestampCodec;

impl ColumnCodec for TimestampCodec {
    fn wire_type(&self) -> WireType {
        WireType::Int
    }

    fn encode(&self, value: Value) -> CodecResult<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Str(s) => {
                let dt = DateTime::parse_from_rfc3339(&s)
                    .map_err(|e| CodecError::new(format!("invalid timestamp '{s}': {e}")))?;
                if dt.timestamp_subsec_nanos() != 0 {
                    return Err(CodecError::new(format!(
                        "timestamp '{s}' has sub-second precision"
                    )));
                }
                Ok(Value::Int(dt.timestamp()))
            }
            other => Err(unexpected("timestamp string", &other)),
        }
    }

    fn decode(&self, value: Value) -> CodecResult<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Int(secs) => {
                let dt = DateTime::from_timestamp(secs, 0)
                    .ok_or_else(|| CodecError::new(format!("epoch seconds out of range: {secs}")))?;
                Ok(Value::Str(dt.to_rfc3339_opts(SecondsFormat::Secs, true)))
            }
            other => Err(unexpected("epoch seconds", &other)),
        }
    }
}

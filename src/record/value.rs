use std::fmt;

use super::error::{RecordError, RecordResult};
use super::schema::ColumnType;

/// Represents a single column value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    String(String),
}

impl Value {
    /// Parse a textual value for a column of type `column_type`
    pub fn parse(text: &str, column_type: &ColumnType) -> RecordResult<Self> {
        let mismatch = || RecordError::TypeMismatch {
            expected: column_type.to_string(),
            actual: format!("{:?}", text),
        };

        match column_type {
            ColumnType::Int => text.trim().parse().map(Value::Int).map_err(|_| mismatch()),
            ColumnType::Float => text
                .trim()
                .parse()
                .map(Value::Float)
                .map_err(|_| mismatch()),
            ColumnType::String(_) if text.contains('\0') => Err(mismatch()),
            ColumnType::String(_) => Ok(Value::String(text.to_string())),
        }
    }

    /// Encode into `out`, which must be exactly `column_type.size()` bytes.
    /// Strings longer than the column are cut at a character boundary.
    /// NUL terminates a stored string, so strings containing one are rejected.
    pub fn encode_into(&self, column_type: &ColumnType, out: &mut [u8]) -> RecordResult<()> {
        column_type.validate()?;
        if out.len() != column_type.size() {
            return Err(RecordError::TypeMismatch {
                expected: format!("{} bytes for {}", column_type.size(), column_type),
                actual: format!("{} bytes", out.len()),
            });
        }

        match (self, column_type) {
            (Value::Int(i), ColumnType::Int) => out.copy_from_slice(&i.to_le_bytes()),
            (Value::Float(f), ColumnType::Float) => out.copy_from_slice(&f.to_le_bytes()),
            (Value::String(s), ColumnType::String(_)) if s.contains('\0') => {
                return Err(RecordError::TypeMismatch {
                    expected: format!("{} without NUL bytes", column_type),
                    actual: format!("{:?}", s),
                });
            }
            (Value::String(s), ColumnType::String(width)) => {
                let mut end = s.len().min(*width);
                while !s.is_char_boundary(end) {
                    end -= 1;
                }
                out.fill(0);
                out[..end].copy_from_slice(&s.as_bytes()[..end]);
            }
            _ => {
                return Err(RecordError::TypeMismatch {
                    expected: column_type.to_string(),
                    actual: format!("{:?}", self),
                });
            }
        }
        Ok(())
    }

    /// Decode a value previously written by [`Value::encode_into`]
    pub fn decode(bytes: &[u8], column_type: &ColumnType) -> RecordResult<Self> {
        column_type.validate()?;
        if bytes.len() != column_type.size() {
            return Err(RecordError::CorruptPage(format!(
                "expected {} bytes for {}, got {}",
                column_type.size(),
                column_type,
                bytes.len()
            )));
        }

        match column_type {
            ColumnType::Int => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(bytes);
                Ok(Value::Int(i32::from_le_bytes(buf)))
            }
            ColumnType::Float => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(bytes);
                Ok(Value::Float(f32::from_le_bytes(buf)))
            }
            ColumnType::String(_) => {
                // Find the first null byte (string terminator)
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                let s = String::from_utf8(bytes[..end].to_vec())
                    .map_err(|e| RecordError::CorruptPage(format!("invalid UTF-8: {}", e)))?;
                Ok(Value::String(s))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

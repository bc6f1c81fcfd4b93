use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use super::error::{RecordError, RecordResult};

static COLUMN_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(?:(int)|(float)|string(\d+))$").expect("column type pattern is valid")
});

/// Fixed-width column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    Int,           // 4 bytes
    Float,         // 4 bytes
    String(usize), // n bytes (fixed length)
}

impl ColumnType {
    /// Get the size in bytes for this column type
    pub fn size(&self) -> usize {
        match self {
            ColumnType::Int => 4,
            ColumnType::Float => 4,
            ColumnType::String(n) => *n,
        }
    }

    /// Reject zero-width strings, the one malformed shape the enum can hold
    pub fn validate(&self) -> RecordResult<()> {
        match self {
            ColumnType::Int | ColumnType::Float => Ok(()),
            ColumnType::String(0) => Err(RecordError::InvalidColumnType(self.to_string())),
            ColumnType::String(_) => Ok(()),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Int => write!(f, "int"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::String(n) => write!(f, "string{}", n),
        }
    }
}

impl FromStr for ColumnType {
    type Err = RecordError;

    /// Parse `int`, `float` or `string<n>` (case-insensitive, n > 0)
    fn from_str(s: &str) -> RecordResult<Self> {
        let invalid = || RecordError::InvalidColumnType(s.to_string());
        let caps = COLUMN_TYPE_RE.captures(s.trim()).ok_or_else(invalid)?;

        let column_type = if caps.get(1).is_some() {
            ColumnType::Int
        } else if caps.get(2).is_some() {
            ColumnType::Float
        } else {
            let width = caps
                .get(3)
                .and_then(|m| m.as_str().parse::<usize>().ok())
                .ok_or_else(invalid)?;
            ColumnType::String(width)
        };

        column_type.validate()?;
        Ok(column_type)
    }
}

impl TryFrom<String> for ColumnType {
    type Error = RecordError;

    fn try_from(s: String) -> RecordResult<Self> {
        s.parse()
    }
}

impl From<ColumnType> for String {
    fn from(ct: ColumnType) -> Self {
        ct.to_string()
    }
}

/// Relation schema: name plus ordered column types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelSchema {
    name: String,
    column_count: usize,
    column_types: Vec<ColumnType>,
}

impl RelSchema {
    /// Create a schema, checking the declared column count and every type
    pub fn new(
        name: impl Into<String>,
        column_count: usize,
        column_types: Vec<ColumnType>,
    ) -> RecordResult<Self> {
        if column_types.is_empty() {
            return Err(RecordError::InvalidColumnType(
                "a relation needs at least one column".to_string(),
            ));
        }
        if column_count != column_types.len() {
            return Err(RecordError::ArityMismatch {
                expected: column_count,
                actual: column_types.len(),
            });
        }
        for ct in &column_types {
            ct.validate()?;
        }

        Ok(Self {
            name: name.into(),
            column_count,
            column_types,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn column_types(&self) -> &[ColumnType] {
        &self.column_types
    }

    /// Sum of the fixed widths of all columns, saturating at `usize::MAX`
    pub fn record_size(&self) -> usize {
        self.column_types
            .iter()
            .fold(0, |total, c| total.saturating_add(c.size()))
    }
}

impl fmt::Display for RelSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: Vec<String> = self.column_types.iter().map(|c| c.to_string()).collect();
        write!(f, "{} ({})", self.name, types.join(", "))
    }
}

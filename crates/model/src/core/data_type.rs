use serde::{Deserialize, Serialize};
use std::fmt;

/// Column types of the ingest tables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DataType {
    VarChar,
    Int,
    Decimal,
    TimestampNaive,
    Null,
}

impl DataType {
    /// Whether a value of type `other` may be written into a column of this type.
    /// `Null` is accepted everywhere; nullability is the destination's concern.
    pub fn accepts(&self, other: DataType) -> bool {
        other == DataType::Null || *self == other
    }

    pub fn sql_name(&self) -> &'static str {
        match self {
            DataType::VarChar => "VARCHAR",
            DataType::Int => "NUMBER(38,0)",
            DataType::Decimal => "NUMBER(10,2)",
            DataType::TimestampNaive => "TIMESTAMP_NTZ",
            DataType::Null => "NULL",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// A named, typed column of a destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub data_type: DataType,
}

impl Column {
    pub const fn new(name: &'static str, data_type: DataType) -> Self {
        Self { name, data_type }
    }
}

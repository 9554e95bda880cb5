//! Field data types.

use serde::{Deserialize, Serialize};

/// Logical data type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Date,
    Text,
    Number,
    Boolean,
}

/// Types that support ordering comparators (gt/ge/lt/le/between).
pub const CONTINUOUS_TYPES: [DataType; 2] = [DataType::Number, DataType::Date];

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataType::Date => "date",
            DataType::Text => "text",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
        };
        write!(f, "{}", name)
    }
}

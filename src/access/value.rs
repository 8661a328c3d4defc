use std::fmt;

/// Longest TEXT value, in bytes, that can be stored.
pub const MAX_TEXT_LEN: usize = 255;

/// Column types supported by the database. The discriminant is the on-disk tag.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int = 0,
    Text = 1,
    Bool = 2,
}

impl DataType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DataType::Int),
            1 => Some(DataType::Text),
            2 => Some(DataType::Bool),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Int => "INT",
            DataType::Text => "TEXT",
            DataType::Bool => "BOOL",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Values that can be stored in a record field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Int(i32),
    Bool(bool),
    Text(String),
}

impl Value {
    /// Get the data type of this value
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(DataType::Int),
            Value::Bool(_) => Some(DataType::Bool),
            Value::Text(_) => Some(DataType::Text),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is compatible with the given data type
    pub fn is_compatible_with(&self, data_type: DataType) -> bool {
        match self.data_type() {
            None => true, // NULL is compatible with any type
            Some(own) => own == data_type,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "'{}'", v),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_conversion() {
        assert_eq!(DataType::from_u8(0), Some(DataType::Int));
        assert_eq!(DataType::from_u8(1), Some(DataType::Text));
        assert_eq!(DataType::from_u8(2), Some(DataType::Bool));
        assert_eq!(DataType::from_u8(99), None);
        assert_eq!(DataType::Text as u8, 1);
    }

    #[test]
    fn test_value_compatibility() {
        assert!(Value::Null.is_compatible_with(DataType::Int));
        assert!(Value::Bool(true).is_compatible_with(DataType::Bool));
        assert!(Value::Int(42).is_compatible_with(DataType::Int));
        assert!(Value::from("hello").is_compatible_with(DataType::Text));

        assert!(!Value::Bool(true).is_compatible_with(DataType::Int));
        assert!(!Value::Int(42).is_compatible_with(DataType::Text));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from("x").as_text(), Some("x"));
        assert_eq!(Value::Int(7).as_text(), None);
        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::from("Alice").to_string(), "'Alice'");
        assert_eq!(DataType::Bool.to_string(), "BOOL");
    }
}

//! Typed configuration values.

use std::fmt;

use chrono::{DateTime, Local};

use crate::error::{Result, StagehandError};

/// A configuration, argument or option value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// Free-form text.
    Str(String),
    /// Signed integer.
    Int(i64),
    /// Boolean flag.
    Bool(bool),
    /// Ordered list of strings.
    List(Vec<String>),
    /// Point in time.
    Time(DateTime<Local>),
}

impl ConfigValue {
    /// Name of the variant, used in cast errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
            Self::List(_) => "list",
            Self::Time(_) => "time",
        }
    }

    /// Render the value as trimmed text. Never fails.
    pub fn as_string(&self) -> String {
        self.to_string().trim().to_string()
    }

    /// Borrow the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Read as an integer, reporting a cast error for `name`.
    pub fn try_int(&self, name: &str) -> Result<i64> {
        match self {
            Self::Int(i) => Ok(*i),
            other => Err(cast_error(name, "int", other)),
        }
    }

    /// Read as a boolean, reporting a cast error for `name`.
    pub fn try_bool(&self, name: &str) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(cast_error(name, "bool", other)),
        }
    }

    /// Read as a list, reporting a cast error for `name`.
    pub fn try_list(&self, name: &str) -> Result<&[String]> {
        match self {
            Self::List(items) => Ok(items),
            other => Err(cast_error(name, "list", other)),
        }
    }

    /// Read as a timestamp, reporting a cast error for `name`.
    pub fn try_time(&self, name: &str) -> Result<DateTime<Local>> {
        match self {
            Self::Time(t) => Ok(*t),
            other => Err(cast_error(name, "time", other)),
        }
    }
}

fn cast_error(name: &str, expected: &'static str, found: &ConfigValue) -> StagehandError {
    StagehandError::InvalidCast {
        name: name.to_string(),
        expected,
        found: found.type_name(),
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Bool(b) => write!(f, "{}", b),
            Self::List(items) => f.write_str(&items.join(" ")),
            Self::Time(t) => f.write_str(&t.to_rfc3339()),
        }
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for ConfigValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<DateTime<Local>> for ConfigValue {
    fn from(value: DateTime<Local>) -> Self {
        Self::Time(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_string_trims_whitespace() {
        let value = ConfigValue::from("  padded \n");
        assert_eq!(value.as_string(), "padded");
    }

    #[test]
    fn as_string_renders_every_variant() {
        assert_eq!(ConfigValue::Int(42).as_string(), "42");
        assert_eq!(ConfigValue::Bool(true).as_string(), "true");
        assert_eq!(ConfigValue::from(vec!["a", "b"]).as_string(), "a b");
    }

    #[test]
    fn try_int_rejects_strings() {
        let err = ConfigValue::from("8080").try_int("port").unwrap_err();
        assert!(matches!(
            err,
            StagehandError::InvalidCast {
                expected: "int",
                found: "string",
                ..
            }
        ));
    }

    #[test]
    fn typed_accessors_read_matching_variants() {
        assert_eq!(ConfigValue::Int(3).try_int("n").unwrap(), 3);
        assert!(ConfigValue::Bool(true).try_bool("b").unwrap());
        assert_eq!(
            ConfigValue::from(vec!["x"]).try_list("l").unwrap(),
            &["x".to_string()]
        );
    }

    #[test]
    fn time_round_trips_through_accessor() {
        let now = Local::now();
        assert_eq!(ConfigValue::from(now).try_time("started").unwrap(), now);
    }

    #[test]
    fn as_str_only_for_strings() {
        assert_eq!(ConfigValue::from("x").as_str(), Some("x"));
        assert_eq!(ConfigValue::Int(1).as_str(), None);
    }
}

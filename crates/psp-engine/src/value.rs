//! Typed values bound to variables and function parameters.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use psp_model::Level;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    String,
    Integer,
    Level,
    File,
    FileList,
    StringList,
}

impl ValueType {
    pub const ALL: [ValueType; 6] = [
        ValueType::String,
        ValueType::Integer,
        ValueType::Level,
        ValueType::File,
        ValueType::FileList,
        ValueType::StringList,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::String => "STRING",
            ValueType::Integer => "INTEGER",
            ValueType::Level => "LEVEL",
            ValueType::File => "FILE",
            ValueType::FileList => "FILE_LIST",
            ValueType::StringList => "STRING_LIST",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ValueType::ALL
            .into_iter()
            .find(|value_type| value_type.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EngineError::UnknownValueType {
                name: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Value {
    String(String),
    Integer(i64),
    Level(Level),
    File(PathBuf),
    FileList(Vec<PathBuf>),
    StringList(Vec<String>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::Integer(_) => ValueType::Integer,
            Value::Level(_) => ValueType::Level,
            Value::File(_) => ValueType::File,
            Value::FileList(_) => ValueType::FileList,
            Value::StringList(_) => ValueType::StringList,
        }
    }

    /// Text substituted for `${NAME}` in expressions. Only scalar text-like
    /// values qualify.
    pub fn as_pattern_text(&self) -> Option<String> {
        match self {
            Value::String(text) => Some(text.clone()),
            Value::Integer(number) => Some(number.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(text) => write!(f, "'{text}'"),
            Value::Integer(number) => write!(f, "{number}"),
            Value::Level(level) => write!(f, "{level}"),
            Value::File(path) => write!(f, "{}", path.display()),
            Value::FileList(paths) => write!(f, "[{} files]", paths.len()),
            Value::StringList(items) => write!(f, "[{} strings]", items.len()),
        }
    }
}

/// Outcome of evaluating a value: exactly one of data or error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueEvaluation {
    value_type: ValueType,
    outcome: Result<Value, String>,
}

impl ValueEvaluation {
    pub fn ok(value: Value) -> Self {
        Self {
            value_type: value.value_type(),
            outcome: Ok(value),
        }
    }

    /// A failed evaluation still knows the type it would have produced.
    pub fn failed(value_type: ValueType, message: impl Into<String>) -> Self {
        Self {
            value_type,
            outcome: Err(message.into()),
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn data(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.outcome.as_ref().err().map(String::as_str)
    }

    pub fn outcome(&self) -> Result<&Value, &str> {
        self.outcome.as_ref().map_err(String::as_str)
    }
}

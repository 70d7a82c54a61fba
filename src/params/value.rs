//! Typed parameter values.

use serde_json::{json, Value};

use crate::error::SearchError;

/// Declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    Int,
    Unsigned,
    Float,
    Str,
    FloatVec,
}

impl ParamKind {
    pub fn name(self) -> &'static str {
        match self {
            ParamKind::Bool => "bool",
            ParamKind::Int => "int",
            ParamKind::Unsigned => "unsigned",
            ParamKind::Float => "float",
            ParamKind::Str => "string",
            ParamKind::FloatVec => "float list",
        }
    }
}

/// A parameter value of one of the supported types.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Unsigned(u64),
    Float(f64),
    Str(String),
    FloatVec(Vec<f64>),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Unsigned(_) => ParamKind::Unsigned,
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Str(_) => ParamKind::Str,
            ParamValue::FloatVec(_) => ParamKind::FloatVec,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Bool(b) => json!(b),
            ParamValue::Int(i) => json!(i),
            ParamValue::Unsigned(u) => json!(u),
            ParamValue::Float(f) => json!(f),
            ParamValue::Str(s) => json!(s),
            ParamValue::FloatVec(v) => json!(v),
        }
    }

    /// Decodes a JSON value against a declared kind.
    pub fn from_json(parameter: &str, kind: ParamKind, value: &Value) -> Result<Self, SearchError> {
        let mismatch = || {
            SearchError::incorrect_parameter(
                parameter,
                format!("expected a {} value, got `{value}`", kind.name()),
            )
        };
        match kind {
            ParamKind::Bool => value.as_bool().map(ParamValue::Bool).ok_or_else(mismatch),
            ParamKind::Int => value.as_i64().map(ParamValue::Int).ok_or_else(mismatch),
            ParamKind::Unsigned => value.as_u64().map(ParamValue::Unsigned).ok_or_else(mismatch),
            ParamKind::Float => value.as_f64().map(ParamValue::Float).ok_or_else(mismatch),
            ParamKind::Str => value
                .as_str()
                .map(|s| ParamValue::Str(s.to_string()))
                .ok_or_else(mismatch),
            ParamKind::FloatVec => value
                .as_array()
                .and_then(|items| {
                    items
                        .iter()
                        .map(Value::as_f64)
                        .collect::<Option<Vec<f64>>>()
                })
                .map(ParamValue::FloatVec)
                .ok_or_else(mismatch),
        }
    }

    /// Parses a command-line token against a declared kind. Float lists
    /// are comma-separated.
    pub fn parse(parameter: &str, kind: ParamKind, text: &str) -> Result<Self, SearchError> {
        let mismatch = || {
            SearchError::incorrect_parameter(
                parameter,
                format!("`{text}` is not a valid {}", kind.name()),
            )
        };
        match kind {
            ParamKind::Bool => match text {
                "true" | "1" => Ok(ParamValue::Bool(true)),
                "false" | "0" => Ok(ParamValue::Bool(false)),
                _ => Err(mismatch()),
            },
            ParamKind::Int => text.parse().map(ParamValue::Int).map_err(|_| mismatch()),
            ParamKind::Unsigned => text
                .parse()
                .map(ParamValue::Unsigned)
                .map_err(|_| mismatch()),
            ParamKind::Float => text.parse().map(ParamValue::Float).map_err(|_| mismatch()),
            ParamKind::Str => Ok(ParamValue::Str(text.to_string())),
            ParamKind::FloatVec => text
                .split(',')
                .map(|item| item.trim().parse::<f64>())
                .collect::<Result<Vec<f64>, _>>()
                .map(ParamValue::FloatVec)
                .map_err(|_| mismatch()),
        }
    }
}

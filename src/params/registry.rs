//! Parameter boxes and the registry surfaces.

use std::fmt::Write as _;

use serde_json::{Map, Value};

use super::{ParamKind, ParamValue};
use crate::error::SearchError;

/// One named, typed parameter.
///
/// The explicit value is distinct from the default: a parameter with a
/// default but no explicit value reads as the default yet reports
/// `is_set() == false`.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    description: String,
    kind: ParamKind,
    default: Option<ParamValue>,
    value: Option<ParamValue>,
}

impl Parameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Explicit value if set, else the default.
    pub fn effective(&self) -> Option<&ParamValue> {
        self.value.as_ref().or(self.default.as_ref())
    }
}

/// The parameters of one named component, keyed by a prefix.
#[derive(Debug, Clone)]
pub struct ParameterBox {
    prefix: String,
    description: String,
    params: Vec<Parameter>,
}

impl ParameterBox {
    pub fn new(prefix: impl Into<String>, description: impl Into<String>) -> Self {
        ParameterBox {
            prefix: prefix.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Declares a parameter; the builder form of registration.
    pub fn declare(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        kind: ParamKind,
        default: Option<ParamValue>,
    ) -> Self {
        let name = name.into();
        debug_assert!(
            default.as_ref().is_none_or(|d| d.kind() == kind),
            "default of `{name}` does not match its declared kind"
        );
        self.params.push(Parameter {
            name,
            description: description.into(),
            kind,
            default,
            value: None,
        });
        self
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    fn qualified(&self, name: &str) -> String {
        format!("{}::{}", self.prefix, name)
    }

    fn find(&self, name: &str) -> Result<&Parameter, SearchError> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| {
                SearchError::incorrect_parameter(self.qualified(name), "unknown parameter")
            })
    }

    fn find_mut(&mut self, name: &str) -> Result<&mut Parameter, SearchError> {
        let qualified = self.qualified(name);
        self.params
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| SearchError::incorrect_parameter(qualified, "unknown parameter"))
    }

    /// Whether the parameter carries an explicit value.
    pub fn is_set(&self, name: &str) -> bool {
        self.find(name).map(|p| p.is_set()).unwrap_or(false)
    }

    /// Reads a parameter (explicit value or default); fails with
    /// `ParameterNotSet` when neither exists.
    pub fn get(&self, name: &str) -> Result<&ParamValue, SearchError> {
        let param = self.find(name)?;
        param
            .effective()
            .ok_or_else(|| SearchError::ParameterNotSet(self.qualified(name)))
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, SearchError> {
        match self.get(name)? {
            ParamValue::Bool(b) => Ok(*b),
            other => Err(self.kind_mismatch(name, ParamKind::Bool, other)),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<i64, SearchError> {
        match self.get(name)? {
            ParamValue::Int(i) => Ok(*i),
            other => Err(self.kind_mismatch(name, ParamKind::Int, other)),
        }
    }

    pub fn get_unsigned(&self, name: &str) -> Result<u64, SearchError> {
        match self.get(name)? {
            ParamValue::Unsigned(u) => Ok(*u),
            other => Err(self.kind_mismatch(name, ParamKind::Unsigned, other)),
        }
    }

    pub fn get_float(&self, name: &str) -> Result<f64, SearchError> {
        match self.get(name)? {
            ParamValue::Float(f) => Ok(*f),
            other => Err(self.kind_mismatch(name, ParamKind::Float, other)),
        }
    }

    pub fn get_str(&self, name: &str) -> Result<&str, SearchError> {
        match self.get(name)? {
            ParamValue::Str(s) => Ok(s),
            other => Err(self.kind_mismatch(name, ParamKind::Str, other)),
        }
    }

    pub fn get_float_vec(&self, name: &str) -> Result<&[f64], SearchError> {
        match self.get(name)? {
            ParamValue::FloatVec(v) => Ok(v),
            other => Err(self.kind_mismatch(name, ParamKind::FloatVec, other)),
        }
    }

    fn kind_mismatch(&self, name: &str, expected: ParamKind, got: &ParamValue) -> SearchError {
        SearchError::incorrect_parameter(
            self.qualified(name),
            format!("expected {}, holds {}", expected.name(), got.kind().name()),
        )
    }

    /// Sets a parameter to an explicit value of the declared kind.
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<(), SearchError> {
        let qualified = self.qualified(name);
        let param = self.find_mut(name)?;
        if value.kind() != param.kind {
            return Err(SearchError::incorrect_parameter(
                qualified,
                format!(
                    "expected a {} value, got {}",
                    param.kind.name(),
                    value.kind().name()
                ),
            ));
        }
        param.value = Some(value);
        Ok(())
    }

    /// Sets a parameter from a command-line token.
    pub fn set_from_str(&mut self, name: &str, text: &str) -> Result<(), SearchError> {
        let qualified = self.qualified(name);
        let kind = self.find(name)?.kind;
        let value = ParamValue::parse(&qualified, kind, text)?;
        self.set(name, value)
    }

    /// JSON view `{name: value}` of every parameter with an effective
    /// value.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for param in &self.params {
            if let Some(value) = param.effective() {
                map.insert(param.name.clone(), value.to_json());
            }
        }
        Value::Object(map)
    }

    /// Applies a `{name: value}` object.
    pub fn apply_json(&mut self, value: &Value) -> Result<(), SearchError> {
        let Some(object) = value.as_object() else {
            return Err(SearchError::incorrect_parameter(
                &self.prefix,
                "expected a JSON object of parameter values",
            ));
        };
        for (name, entry) in object {
            let qualified = self.qualified(name);
            let kind = self.find(name)?.kind;
            let value = ParamValue::from_json(&qualified, kind, entry)?;
            self.set(name, value)?;
        }
        Ok(())
    }
}

/// Outcome of command-line parsing.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParseOutcome {
    /// Options that matched no registered parameter, reported back to
    /// the caller.
    pub unknown: Vec<String>,
    /// Whether `--help` appeared.
    pub help_requested: bool,
}

/// All parameter boxes of a program.
#[derive(Debug, Default)]
pub struct ParameterRegistry {
    boxes: Vec<ParameterBox>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        ParameterRegistry { boxes: Vec::new() }
    }

    pub fn with_box(mut self, parameters: ParameterBox) -> Self {
        self.boxes.push(parameters);
        self
    }

    pub fn find(&self, prefix: &str) -> Option<&ParameterBox> {
        self.boxes.iter().find(|b| b.prefix == prefix)
    }

    pub fn find_mut(&mut self, prefix: &str) -> Option<&mut ParameterBox> {
        self.boxes.iter_mut().find(|b| b.prefix == prefix)
    }

    /// JSON view `{prefix: {name: value}}`.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for parameters in &self.boxes {
            map.insert(parameters.prefix.clone(), parameters.to_json());
        }
        Value::Object(map)
    }

    /// Applies a `{prefix: {name: value}}` object.
    pub fn apply_json(&mut self, value: &Value) -> Result<(), SearchError> {
        let Some(object) = value.as_object() else {
            return Err(SearchError::incorrect_parameter(
                "parameters",
                "expected a JSON object keyed by prefix",
            ));
        };
        for (prefix, entries) in object {
            let Some(parameters) = self.find_mut(prefix) else {
                return Err(SearchError::incorrect_parameter(
                    prefix,
                    "unknown parameter prefix",
                ));
            };
            parameters.apply_json(entries)?;
        }
        Ok(())
    }

    /// Consumes `--<prefix>::<name> <value>` (or `--…=<value>`) options;
    /// anything unrecognized is reported in the outcome.
    pub fn parse_args(&mut self, args: &[String]) -> Result<ParseOutcome, SearchError> {
        let mut outcome = ParseOutcome::default();
        let mut iter = args.iter().peekable();
        while let Some(arg) = iter.next() {
            if arg == "--help" {
                outcome.help_requested = true;
                continue;
            }
            let Some(flag) = arg.strip_prefix("--") else {
                outcome.unknown.push(arg.clone());
                continue;
            };
            let (flag, inline_value) = match flag.split_once('=') {
                Some((flag, value)) => (flag, Some(value.to_string())),
                None => (flag, None),
            };
            let Some((prefix, name)) = flag.split_once("::") else {
                outcome.unknown.push(arg.clone());
                continue;
            };
            let Some(parameters) = self.find_mut(prefix) else {
                outcome.unknown.push(arg.clone());
                continue;
            };
            if parameters.find(name).is_err() {
                outcome.unknown.push(arg.clone());
                continue;
            }
            let value = match inline_value {
                Some(value) => value,
                None => iter
                    .next()
                    .ok_or_else(|| {
                        SearchError::incorrect_parameter(
                            format!("{prefix}::{name}"),
                            "missing value",
                        )
                    })?
                    .clone(),
            };
            parameters.set_from_str(name, &value)?;
        }
        Ok(outcome)
    }

    /// Auto-generated usage text.
    pub fn help_text(&self) -> String {
        let mut text = String::from("Options:\n");
        for parameters in &self.boxes {
            let _ = writeln!(text, "  [{}] {}", parameters.prefix, parameters.description);
            for param in &parameters.params {
                let mut line = format!(
                    "    --{}::{} <{}>",
                    parameters.prefix,
                    param.name(),
                    param.kind().name()
                );
                let _ = write!(line, "  {}", param.description());
                if let Some(default) = &param.default {
                    let _ = write!(line, " (default: {})", default.to_json());
                }
                let _ = writeln!(text, "{line}");
            }
        }
        text
    }
}

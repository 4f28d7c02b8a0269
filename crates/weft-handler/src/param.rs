use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
  String,
  Integer,
  Float,
  Boolean,
  Array,
  Object,
  FilePath,
  Email,
  Url,
}

impl ParameterType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ParameterType::String => "string",
      ParameterType::Integer => "integer",
      ParameterType::Float => "float",
      ParameterType::Boolean => "boolean",
      ParameterType::Array => "array",
      ParameterType::Object => "object",
      ParameterType::FilePath => "file_path",
      ParameterType::Email => "email",
      ParameterType::Url => "url",
    }
  }

  /// Whether the JSON value has the right shape for this type.
  pub fn accepts(&self, value: &Value) -> bool {
    match self {
      ParameterType::String
      | ParameterType::FilePath
      | ParameterType::Email
      | ParameterType::Url => value.is_string(),
      ParameterType::Integer => value.is_i64() || value.is_u64(),
      ParameterType::Float => value.is_number(),
      ParameterType::Boolean => value.is_boolean(),
      ParameterType::Array => value.is_array(),
      ParameterType::Object => value.is_object(),
    }
  }
}

impl fmt::Display for ParameterType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Describes one named input or output value of a handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
  pub name: String,
  #[serde(rename = "type")]
  pub param_type: ParameterType,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub description: String,
  pub required: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub choices: Option<Vec<Value>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub min_value: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_value: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pattern: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub example: Option<Value>,
}

impl ParameterSchema {
  /// A required parameter with no constraints.
  pub fn new(name: impl Into<String>, param_type: ParameterType) -> Self {
    Self {
      name: name.into(),
      param_type,
      description: String::new(),
      required: true,
      default: None,
      choices: None,
      min_value: None,
      max_value: None,
      pattern: None,
      example: None,
    }
  }

  pub fn description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  pub fn optional(mut self) -> Self {
    self.required = false;
    self
  }

  /// Set a default. A parameter with a default is optional.
  pub fn default_value(mut self, value: impl Into<Value>) -> Self {
    self.default = Some(value.into());
    self.required = false;
    self
  }

  pub fn choices<I, V>(mut self, choices: I) -> Self
  where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
  {
    self.choices = Some(choices.into_iter().map(Into::into).collect());
    self
  }

  pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
    self.min_value = min;
    self.max_value = max;
    self
  }

  pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
    self.pattern = Some(pattern.into());
    self
  }

  pub fn example(mut self, value: impl Into<Value>) -> Self {
    self.example = Some(value.into());
    self
  }

  /// Whether `default` respects `choices`.
  pub fn default_is_valid_choice(&self) -> bool {
    match (&self.default, &self.choices) {
      (Some(default), Some(choices)) => choices.contains(default),
      _ => true,
    }
  }

  fn violation(&self, message: String) -> ParameterViolation {
    ParameterViolation {
      parameter: self.name.clone(),
      message,
    }
  }

  /// Check a supplied value against the declared constraints.
  pub fn check_value(&self, value: &Value) -> Vec<ParameterViolation> {
    if !self.param_type.accepts(value) {
      return vec![self.violation(format!(
        "expected {}, got {}",
        self.param_type,
        json_kind(value)
      ))];
    }

    let mut violations = Vec::new();

    if let Some(choices) = &self.choices
      && !choices.contains(value)
    {
      violations.push(self.violation(format!("{} is not one of the allowed choices", value)));
    }

    if let Some(n) = value.as_f64() {
      if let Some(min) = self.min_value
        && n < min
      {
        violations.push(self.violation(format!("{} is below the minimum {}", n, min)));
      }
      if let Some(max) = self.max_value
        && n > max
      {
        violations.push(self.violation(format!("{} is above the maximum {}", n, max)));
      }
    }

    if let Some(s) = value.as_str() {
      match self.param_type {
        ParameterType::Email if !looks_like_email(s) => {
          violations.push(self.violation(format!("'{}' is not a valid email address", s)));
        }
        ParameterType::Url => {
          if let Err(e) = url::Url::parse(s) {
            violations.push(self.violation(format!("'{}' is not a valid URL: {}", s, e)));
          }
        }
        _ => {}
      }

      if let Some(pattern) = &self.pattern {
        match Regex::new(pattern) {
          Ok(re) if !re.is_match(s) => {
            violations.push(self.violation(format!("'{}' does not match pattern '{}'", s, pattern)));
          }
          Ok(_) => {}
          Err(e) => {
            violations.push(self.violation(format!("invalid pattern '{}': {}", pattern, e)));
          }
        }
      }
    }

    violations
  }
}

/// One failed constraint on one parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterViolation {
  pub parameter: String,
  pub message: String,
}

impl fmt::Display for ParameterViolation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.parameter, self.message)
  }
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(n) if n.is_f64() => "float",
    Value::Number(_) => "integer",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

fn looks_like_email(s: &str) -> bool {
  let Some((local, domain)) = s.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && !domain.contains('@')
    && !s.chars().any(char::is_whitespace)
    && domain
      .split_once('.')
      .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

//! Typed accessors for handler parameters.

use crate::Params;
use crate::error::HandlerError;

/// A required string parameter.
pub fn require_str<'a>(params: &'a Params, name: &str) -> Result<&'a str, HandlerError> {
  match params.get(name) {
    None | Some(serde_json::Value::Null) => Err(HandlerError::MissingParameter {
      name: name.to_string(),
    }),
    Some(value) => value
      .as_str()
      .ok_or_else(|| HandlerError::invalid(name, "expected a string")),
  }
}

/// An optional string parameter. `null` counts as absent.
pub fn optional_str<'a>(params: &'a Params, name: &str) -> Result<Option<&'a str>, HandlerError> {
  match params.get(name) {
    None | Some(serde_json::Value::Null) => Ok(None),
    Some(value) => value
      .as_str()
      .map(Some)
      .ok_or_else(|| HandlerError::invalid(name, "expected a string")),
  }
}

/// An optional integer parameter. Integral strings are accepted.
pub fn optional_i64(params: &Params, name: &str) -> Result<Option<i64>, HandlerError> {
  match params.get(name) {
    None | Some(serde_json::Value::Null) => Ok(None),
    Some(serde_json::Value::String(s)) => s
      .trim()
      .parse()
      .map(Some)
      .map_err(|_| HandlerError::invalid(name, format!("'{}' is not an integer", s))),
    Some(value) => value
      .as_i64()
      .map(Some)
      .ok_or_else(|| HandlerError::invalid(name, "expected an integer")),
  }
}

/// An optional float parameter. Numeric strings are accepted.
pub fn optional_f64(params: &Params, name: &str) -> Result<Option<f64>, HandlerError> {
  match params.get(name) {
    None | Some(serde_json::Value::Null) => Ok(None),
    Some(serde_json::Value::String(s)) => s
      .trim()
      .parse()
      .map(Some)
      .map_err(|_| HandlerError::invalid(name, format!("'{}' is not a number", s))),
    Some(value) => value
      .as_f64()
      .map(Some)
      .ok_or_else(|| HandlerError::invalid(name, "expected a number")),
  }
}

/// An optional boolean parameter. `"true"`/`"false"` strings are accepted.
pub fn optional_bool(params: &Params, name: &str) -> Result<Option<bool>, HandlerError> {
  match params.get(name) {
    None | Some(serde_json::Value::Null) => Ok(None),
    Some(serde_json::Value::Bool(b)) => Ok(Some(*b)),
    Some(serde_json::Value::String(s)) => match s.to_lowercase().as_str() {
      "true" => Ok(Some(true)),
      "false" => Ok(Some(false)),
      _ => Err(HandlerError::invalid(name, format!("'{}' is not a boolean", s))),
    },
    Some(_) => Err(HandlerError::invalid(name, "expected a boolean")),
  }
}

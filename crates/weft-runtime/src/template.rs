//! Context placeholders in step parameters.
//!
//! The grammar is deliberately narrow: a string value that is exactly
//! `{{context.<key>}}` is replaced by `context[<key>]`. Anything else,
//! including strings that merely contain a placeholder, is left untouched.
//! A placeholder whose key is absent stays as the original literal.

use serde_json::Value;
use weft_handler::Params;

const PREFIX: &str = "{{context.";
const SUFFIX: &str = "}}";

/// Extract the context key from a whole-string placeholder.
fn placeholder_key(s: &str) -> Option<&str> {
  if s.len() < PREFIX.len() + SUFFIX.len() {
    return None;
  }
  s.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)
}

/// Whether the string is a `{{context.<key>}}` placeholder.
pub fn is_placeholder(s: &str) -> bool {
  placeholder_key(s).is_some()
}

/// Substitute placeholders in a value, recursing through objects and arrays.
pub fn substitute(value: &Value, context: &Params) -> Value {
  match value {
    Value::String(s) => match placeholder_key(s).and_then(|key| context.get(key)) {
      Some(found) => found.clone(),
      None => value.clone(),
    },
    Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, context)).collect()),
    Value::Object(map) => Value::Object(substitute_params(map, context)),
    other => other.clone(),
  }
}

/// Substitute placeholders in every parameter value.
pub fn substitute_params(params: &Params, context: &Params) -> Params {
  params
    .iter()
    .map(|(k, v)| (k.clone(), substitute(v, context)))
    .collect()
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single step in a workflow definition.
///
/// `parameters` values may contain `{{context.<key>}}` placeholders that are
/// substituted from the execution context right before the step runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDef {
  /// Positive, unique within the workflow. Orders steps that have no
  /// explicit dependencies.
  pub step_number: u32,

  /// Display name. Defaults to the handler name in reports.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,

  pub handler_name: String,

  #[serde(default)]
  pub parameters: serde_json::Map<String, serde_json::Value>,

  /// Handler output key -> context key.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub output_mapping: BTreeMap<String, String>,

  /// Boolean predicate over the context. Absent means always run.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition_expression: Option<String>,

  /// Steps that must succeed before this one starts.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub depends_on: Vec<u32>,

  /// Re-attempts after the first failure.
  #[serde(default)]
  pub retry_count: u32,

  #[serde(default = "default_retry_delay_seconds")]
  pub retry_delay_seconds: u64,

  /// Per-attempt limit. Falls back to the engine default when absent.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timeout_seconds: Option<u64>,

  #[serde(default = "default_stop_on_error")]
  pub stop_on_error: bool,
}

fn default_retry_delay_seconds() -> u64 {
  5
}

fn default_stop_on_error() -> bool {
  true
}

impl StepDef {
  /// Create a step with default policy for the given handler.
  pub fn new(step_number: u32, handler_name: impl Into<String>) -> Self {
    Self {
      step_number,
      name: None,
      handler_name: handler_name.into(),
      parameters: serde_json::Map::new(),
      output_mapping: BTreeMap::new(),
      condition_expression: None,
      depends_on: Vec::new(),
      retry_count: 0,
      retry_delay_seconds: default_retry_delay_seconds(),
      timeout_seconds: None,
      stop_on_error: default_stop_on_error(),
    }
  }

  /// The name shown in reports.
  pub fn display_name(&self) -> &str {
    self.name.as_deref().unwrap_or(&self.handler_name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_defaults_applied() {
    let step: StepDef = serde_json::from_value(json!({
      "step_number": 1,
      "handler_name": "echo"
    }))
    .unwrap();

    assert_eq!(step.retry_count, 0);
    assert_eq!(step.retry_delay_seconds, 5);
    assert_eq!(step.timeout_seconds, None);
    assert!(step.stop_on_error);
    assert!(step.depends_on.is_empty());
    assert!(step.parameters.is_empty());
    assert_eq!(step.display_name(), "echo");
  }

  #[test]
  fn test_full_step() {
    let step: StepDef = serde_json::from_value(json!({
      "step_number": 2,
      "name": "Summarize",
      "handler_name": "analyze_text",
      "parameters": { "text": "{{context.body}}" },
      "output_mapping": { "sentiment": "mood" },
      "condition_expression": "context.body",
      "depends_on": [1],
      "retry_count": 3,
      "retry_delay_seconds": 1,
      "timeout_seconds": 30,
      "stop_on_error": false
    }))
    .unwrap();

    assert_eq!(step.display_name(), "Summarize");
    assert_eq!(step.parameters["text"], "{{context.body}}");
    assert_eq!(step.output_mapping["sentiment"], "mood");
    assert_eq!(step.depends_on, vec![1]);
    assert_eq!(step.timeout_seconds, Some(30));
    assert!(!step.stop_on_error);
  }

  #[test]
  fn test_new_matches_serde_defaults() {
    let parsed: StepDef = serde_json::from_value(json!({
      "step_number": 4,
      "handler_name": "echo"
    }))
    .unwrap();

    assert_eq!(StepDef::new(4, "echo"), parsed);
  }
}

//! Step conditions.
//!
//! A condition is a boolean predicate over the execution context, written
//! as a minijinja expression. Context keys are available both as top-level
//! variables and under `context`, so `approved and total > 100` and
//! `context.approved` read the same map.
//!
//! The `context` namespace takes precedence over a context key that is
//! itself named `context`; such a key is read as `context.context`.

use minijinja::Environment;
use weft_handler::Params;

/// A condition that could not be compiled or evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid condition '{expression}': {message}")]
pub struct ConditionError {
  pub expression: String,
  pub message: String,
}

/// Evaluate a condition against a context snapshot.
pub fn evaluate_condition(expression: &str, context: &Params) -> Result<bool, ConditionError> {
  let env = Environment::new();
  let err = |e: minijinja::Error| ConditionError {
    expression: expression.to_string(),
    message: e.to_string(),
  };

  let compiled = env.compile_expression(expression).map_err(err)?;

  let mut vars = context.clone();
  // Overrides a top-level `context` key; see the module docs.
  vars.insert(
    "context".to_string(),
    serde_json::Value::Object(context.clone()),
  );

  let value = compiled.eval(&vars).map_err(err)?;
  Ok(value.is_true())
}

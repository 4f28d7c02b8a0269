use thiserror::Error;

/// Configuration errors found while resolving a workflow definition.
///
/// These are fatal: a definition that fails to resolve never runs a step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
  /// Step numbers start at 1.
  #[error("step numbers must be positive, found 0")]
  InvalidStepNumber,

  /// Two steps share a number.
  #[error("duplicate step number: {step_number}")]
  DuplicateStepNumber { step_number: u32 },

  /// Handler not found in the registry.
  #[error("step {step_number}: unknown handler '{handler_name}'")]
  UnknownHandler {
    step_number: u32,
    handler_name: String,
  },

  /// `depends_on` names a step that does not exist.
  #[error("step {step_number} depends on unknown step {depends_on}")]
  UnknownDependency { step_number: u32, depends_on: u32 },

  /// Cycle detected in the dependency graph.
  #[error("cycle detected in workflow graph: {}", format_cycle(.steps))]
  CycleDetected { steps: Vec<u32> },
}

fn format_cycle(steps: &[u32]) -> String {
  steps
    .iter()
    .map(|s| s.to_string())
    .collect::<Vec<_>>()
    .join(" -> ")
}

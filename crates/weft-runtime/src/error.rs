//! Runtime error types.

use weft_resolver::ResolveError;

/// Errors returned from a run itself.
///
/// Per-step failures never show up here; they are recorded in the
/// [`RunReport`](crate::RunReport).
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// The workflow is not runnable (cycle, unknown handler, ...).
  #[error("configuration error: {0}")]
  Configuration(#[from] ResolveError),

  /// `invoke_step` was asked for a step the workflow does not have.
  #[error("step {step_number} not found in workflow")]
  StepNotFound { step_number: u32 },

  /// Execution was cancelled before it started.
  #[error("execution cancelled")]
  Cancelled,

  /// The runner's trigger channel has been closed.
  #[error("workflow runner channel closed")]
  ChannelClosed,
}

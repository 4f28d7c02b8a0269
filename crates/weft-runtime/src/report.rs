//! Run report types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use weft_handler::Params;

/// Terminal state of one step in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
  Succeeded,
  Failed,
  Skipped,
  /// Never scheduled: the run stopped or was cancelled first.
  NotRun,
}

/// Why a step or an attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
  /// Required parameters missing after templating. No attempt was made.
  Validation,
  /// The handler reported failure or panicked.
  Handler,
  /// The attempt exceeded the step's timeout.
  Timeout,
  /// The condition expression could not be evaluated.
  Condition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
  ConditionFalse,
  /// An explicit dependency failed or was skipped.
  DependencyUnsatisfied,
}

/// One handler invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
  /// 1-based.
  pub attempt: u32,
  pub success: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub failure: Option<FailureKind>,
  pub execution_time_ms: u64,
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
  pub step_number: u32,
  pub name: String,
  pub handler_name: String,
  pub status: StepStatus,
  pub success: bool,
  /// Full handler output, including keys not mapped into the context.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<Params>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub failure: Option<FailureKind>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub skip_reason: Option<SkipReason>,
  pub execution_time_ms: u64,
  /// Parameters after placeholder substitution.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub resolved_parameters: Option<Params>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub attempts: Vec<AttemptRecord>,
}

impl StepReport {
  /// A report with no outcome fields filled in yet.
  pub(crate) fn new(
    step_number: u32,
    name: impl Into<String>,
    handler_name: impl Into<String>,
    status: StepStatus,
  ) -> Self {
    Self {
      step_number,
      name: name.into(),
      handler_name: handler_name.into(),
      status,
      success: status == StepStatus::Succeeded,
      data: None,
      error: None,
      failure: None,
      skip_reason: None,
      execution_time_ms: 0,
      resolved_parameters: None,
      attempts: Vec::new(),
    }
  }

  pub(crate) fn skipped(mut self, reason: SkipReason) -> Self {
    self.status = StepStatus::Skipped;
    self.success = false;
    self.skip_reason = Some(reason);
    self
  }

  pub(crate) fn failed(mut self, kind: FailureKind, error: impl Into<String>) -> Self {
    self.status = StepStatus::Failed;
    self.success = false;
    self.failure = Some(kind);
    self.error = Some(error.into());
    self
  }
}

/// Final state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  Completed,
  /// A step with `stop_on_error` failed.
  Failed,
  Cancelled,
}

impl RunStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      RunStatus::Completed => "completed",
      RunStatus::Failed => "failed",
      RunStatus::Cancelled => "cancelled",
    }
  }
}

/// Result of a complete workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
  pub execution_id: String,
  pub workflow_id: String,
  pub status: RunStatus,
  /// True iff the run completed and no step with `stop_on_error` failed.
  pub success: bool,
  /// One entry per step, ordered by step number.
  pub steps: Vec<StepReport>,
  /// Context as it stood when the run finished.
  pub context: Params,
  pub total_steps: usize,
  /// Steps that succeeded.
  pub completed_steps: usize,
  /// Message of the failure that stopped the run, if any.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

impl RunReport {
  pub fn step(&self, step_number: u32) -> Option<&StepReport> {
    self.steps.iter().find(|s| s.step_number == step_number)
  }

  /// Wall-clock time from start to finish.
  pub fn duration_ms(&self) -> i64 {
    (self.finished_at - self.started_at).num_milliseconds()
  }
}

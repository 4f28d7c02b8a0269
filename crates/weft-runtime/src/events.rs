//! Execution events and notifiers for observability.
//!
//! Events are emitted while a run progresses so consumers can print
//! progress, persist state, or stream to a UI.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use weft_handler::Params;

use crate::report::{FailureKind, RunStatus, SkipReason};

/// Events emitted during workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  /// The run has started.
  RunStarted {
    execution_id: String,
    workflow_id: String,
  },

  /// A step passed its condition and validation and is about to run.
  StepStarted {
    execution_id: String,
    step_number: u32,
    handler_name: String,
  },

  /// An attempt failed. More attempts may follow.
  AttemptFailed {
    execution_id: String,
    step_number: u32,
    attempt: u32,
    failure: FailureKind,
    error: String,
  },

  /// A step has completed successfully.
  StepCompleted {
    execution_id: String,
    step_number: u32,
    data: Params,
  },

  /// A step was skipped.
  StepSkipped {
    execution_id: String,
    step_number: u32,
    reason: SkipReason,
  },

  /// A step has failed for good.
  StepFailed {
    execution_id: String,
    step_number: u32,
    failure: FailureKind,
    error: String,
  },

  /// The run has finished.
  RunCompleted {
    execution_id: String,
    status: RunStatus,
    success: bool,
  },
}

/// Trait for receiving execution events.
///
/// The runtime calls `notify` for each event; implementations decide what
/// to do with them.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls the scheduler. Volume is a
  // handful of events per step.
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped.
    let _ = self.sender.send(event);
  }
}

//! Workflow runner with channel-based triggering.
//!
//! The `WorkflowRunner` owns an mpsc channel for receiving context payloads
//! and executes its workflow once per payload. Finished reports go to an
//! optional report channel.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use weft_handler::Params;

use crate::error::RuntimeError;
use crate::report::{RunReport, RunStatus};
use crate::runtime::Runtime;

/// A runner that executes a workflow in response to context payloads.
///
/// # Usage
///
/// ```ignore
/// let runner = WorkflowRunner::new(Arc::new(runtime));
///
/// let (report_tx, mut reports) = mpsc::unbounded_channel();
/// let runner = runner.with_report_sender(report_tx);
///
/// // Hand out senders to whatever triggers runs
/// let sender = runner.sender();
///
/// let cancel = CancellationToken::new();
/// runner.start(cancel).await?;
/// ```
pub struct WorkflowRunner {
  sender: mpsc::Sender<Params>,
  receiver: mpsc::Receiver<Params>,
  runtime: Arc<Runtime>,
  reports: Option<mpsc::UnboundedSender<RunReport>>,
}

impl WorkflowRunner {
  pub fn new(runtime: Arc<Runtime>) -> Self {
    Self::with_buffer_size(runtime, 100)
  }

  pub fn with_buffer_size(runtime: Arc<Runtime>, buffer_size: usize) -> Self {
    let (sender, receiver) = mpsc::channel(buffer_size);
    Self {
      sender,
      receiver,
      runtime,
      reports: None,
    }
  }

  /// Send the report of every run started by [`Self::start`] to `reports`.
  pub fn with_report_sender(mut self, reports: mpsc::UnboundedSender<RunReport>) -> Self {
    self.reports = Some(reports);
    self
  }

  /// Get a sender handle for triggering runs.
  pub fn sender(&self) -> mpsc::Sender<Params> {
    self.sender.clone()
  }

  /// Queue a run with the given initial context.
  pub async fn run(&self, context: Params) -> Result<(), RuntimeError> {
    self
      .sender
      .send(context)
      .await
      .map_err(|_| RuntimeError::ChannelClosed)
  }

  /// Start the execution loop.
  ///
  /// Runs are executed one at a time in arrival order. Returns when the
  /// cancellation token fires or every sender is gone.
  pub async fn start(mut self, cancel: CancellationToken) -> Result<(), RuntimeError> {
    let workflow_id = self.runtime.workflow().workflow_id.clone();
    info!(
      workflow_id = %workflow_id,
      workflow_name = %self.runtime.workflow().name,
      "starting workflow runner"
    );

    // Keep only external senders alive so the loop ends when they drop.
    drop(self.sender);

    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          info!(workflow_id = %workflow_id, "workflow runner cancelled");
          break;
        }
        context = self.receiver.recv() => {
          let Some(context) = context else {
            info!(workflow_id = %workflow_id, "workflow runner channel closed");
            break;
          };

          match self.runtime.invoke(context, cancel.child_token()).await {
            Ok(report) => {
              if report.status == RunStatus::Cancelled {
                info!(
                  workflow_id = %workflow_id,
                  execution_id = %report.execution_id,
                  "workflow execution cancelled"
                );
              } else {
                info!(
                  workflow_id = %workflow_id,
                  execution_id = %report.execution_id,
                  success = report.success,
                  completed_steps = report.completed_steps,
                  "workflow execution finished"
                );
              }

              if let Some(reports) = &self.reports
                && reports.send(report).is_err()
              {
                warn!(workflow_id = %workflow_id, "run report receiver dropped");
              }
            }
            Err(e) => {
              error!(workflow_id = %workflow_id, error = %e, "workflow execution failed");
            }
          }
        }
      }
    }

    Ok(())
  }

  /// Execute a single run directly, bypassing the channel.
  pub async fn execute_once(
    &self,
    context: Params,
    cancel: CancellationToken,
  ) -> Result<RunReport, RuntimeError> {
    self.runtime.invoke(context, cancel).await
  }

  pub fn runtime(&self) -> &Runtime {
    &self.runtime
  }
}

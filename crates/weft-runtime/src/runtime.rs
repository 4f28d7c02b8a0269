//! Workflow runtime.
//!
//! The [`Runtime`] owns a locked workflow and a handler registry and
//! provides `invoke(context, cancel)` to execute the full step graph.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use weft_config::Settings;
use weft_handler::Params;
use weft_handler_registry::HandlerRegistry;
use weft_resolver::ResolveError;
use weft_workflow::{DependencyKind, Graph, Step, Workflow};

use crate::context::SharedContext;
use crate::error::RuntimeError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::report::{FailureKind, RunReport, RunStatus, SkipReason, StepReport, StepStatus};
use crate::step::StepRunner;

/// Configuration for the runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
  /// Upper bound on steps running at the same time within one run.
  pub max_concurrent_steps: usize,
  /// Attempt timeout for steps that do not set their own.
  pub default_step_timeout_seconds: u64,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      max_concurrent_steps: 4,
      default_step_timeout_seconds: 300,
    }
  }
}

impl From<&Settings> for RuntimeConfig {
  fn from(settings: &Settings) -> Self {
    Self {
      max_concurrent_steps: settings.max_concurrent_steps,
      default_step_timeout_seconds: settings.default_step_timeout_seconds,
    }
  }
}

/// Readiness of a pending step.
enum Readiness {
  Waiting,
  Ready,
  /// An explicit dependency ended without succeeding.
  Blocked(u32),
}

/// The workflow runtime.
///
/// Handles graph traversal, scheduling, and run-level policy. Per-step
/// policy lives in the step runner.
pub struct Runtime {
  workflow: Arc<Workflow>,
  registry: Arc<HandlerRegistry>,
  config: RuntimeConfig,
  notifier: Arc<dyn ExecutionNotifier>,
}

impl Runtime {
  /// Create a new runtime for the given workflow.
  pub fn new(workflow: Workflow, registry: Arc<HandlerRegistry>, config: RuntimeConfig) -> Self {
    Self {
      workflow: Arc::new(workflow),
      registry,
      config,
      notifier: Arc::new(NoopNotifier),
    }
  }

  /// Replace the no-op notifier.
  pub fn with_notifier(mut self, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  /// Get a reference to the workflow.
  pub fn workflow(&self) -> &Workflow {
    &self.workflow
  }

  /// Execute the workflow with the given initial context.
  ///
  /// Only configuration problems are returned as errors, before any step
  /// runs. Everything that happens to steps is in the report.
  #[instrument(
    name = "runtime_invoke",
    skip(self, context, cancel),
    fields(workflow_id = %self.workflow.workflow_id)
  )]
  pub async fn invoke(
    &self,
    context: Params,
    cancel: CancellationToken,
  ) -> Result<RunReport, RuntimeError> {
    let graph = self.validate_workflow()?;

    let execution_id = uuid::Uuid::new_v4().to_string();
    let started_at = Utc::now();

    info!(
      execution_id = %execution_id,
      workflow_id = %self.workflow.workflow_id,
      steps = self.workflow.steps.len(),
      "workflow_started"
    );
    self.notifier.notify(ExecutionEvent::RunStarted {
      execution_id: execution_id.clone(),
      workflow_id: self.workflow.workflow_id.clone(),
    });

    let shared = SharedContext::new(context);
    let runner = StepRunner::new(
      execution_id.clone(),
      self.registry.clone(),
      shared.clone(),
      self.notifier.clone(),
    );

    let (reports, status, error) = self
      .run_execution_loop(&graph, &runner, &execution_id, &cancel)
      .await;

    let steps: Vec<StepReport> = reports.into_values().collect();
    let completed_steps = steps
      .iter()
      .filter(|s| s.status == StepStatus::Succeeded)
      .count();
    let success = status == RunStatus::Completed;

    let report = RunReport {
      execution_id: execution_id.clone(),
      workflow_id: self.workflow.workflow_id.clone(),
      status,
      success,
      total_steps: steps.len(),
      completed_steps,
      steps,
      context: shared.snapshot().await,
      error,
      started_at,
      finished_at: Utc::now(),
    };

    match status {
      RunStatus::Completed => info!(
        execution_id = %execution_id,
        completed_steps,
        total_steps = report.total_steps,
        "workflow_completed"
      ),
      RunStatus::Failed => error!(
        execution_id = %execution_id,
        error = report.error.as_deref().unwrap_or_default(),
        "workflow_failed"
      ),
      RunStatus::Cancelled => warn!(execution_id = %execution_id, "workflow_cancelled"),
    }
    self.notifier.notify(ExecutionEvent::RunCompleted {
      execution_id,
      status,
      success,
    });

    Ok(report)
  }

  /// Execute a single step in isolation.
  ///
  /// This is for debugging: dependencies are ignored and the given context
  /// is used for the condition and placeholders.
  #[instrument(
    name = "runtime_invoke_step",
    skip(self, context, cancel),
    fields(workflow_id = %self.workflow.workflow_id)
  )]
  pub async fn invoke_step(
    &self,
    step_number: u32,
    context: Params,
    cancel: CancellationToken,
  ) -> Result<StepReport, RuntimeError> {
    let step = self
      .workflow
      .get_step(step_number)
      .ok_or(RuntimeError::StepNotFound { step_number })?;

    if self.registry.lookup_by_name(&step.handler_name).is_none() {
      return Err(
        ResolveError::UnknownHandler {
          step_number,
          handler_name: step.handler_name.clone(),
        }
        .into(),
      );
    }

    if cancel.is_cancelled() {
      return Err(RuntimeError::Cancelled);
    }

    let execution_id = uuid::Uuid::new_v4().to_string();
    info!(execution_id = %execution_id, step_number, "invoke_step_started");

    let runner = StepRunner::new(
      execution_id,
      self.registry.clone(),
      SharedContext::new(context),
      self.notifier.clone(),
    );
    let report = runner.run(step).await;

    info!(
      step_number,
      status = ?report.status,
      "invoke_step_completed"
    );
    Ok(report)
  }

  /// Check that every dependency names a step in the workflow, every
  /// handler is registered and the graph is acyclic.
  ///
  /// Workflows from the resolver already satisfy this; a hand-built
  /// workflow might not.
  fn validate_workflow(&self) -> Result<Graph, RuntimeError> {
    for step in self.workflow.steps.values() {
      if let Some(dep) = step
        .depends_on
        .iter()
        .find(|dep| !self.workflow.steps.contains_key(dep))
      {
        return Err(
          ResolveError::UnknownDependency {
            step_number: step.step_number,
            depends_on: *dep,
          }
          .into(),
        );
      }

      if self.registry.lookup_by_name(&step.handler_name).is_none() {
        return Err(
          ResolveError::UnknownHandler {
            step_number: step.step_number,
            handler_name: step.handler_name.clone(),
          }
          .into(),
        );
      }
    }

    let graph = self.workflow.graph();
    if let Some(steps) = graph.find_cycle() {
      return Err(ResolveError::CycleDetected { steps }.into());
    }
    Ok(graph)
  }

  /// Run the main scheduling loop until nothing is running and nothing more
  /// can start.
  async fn run_execution_loop(
    &self,
    graph: &Graph,
    runner: &StepRunner,
    execution_id: &str,
    cancel: &CancellationToken,
  ) -> (BTreeMap<u32, StepReport>, RunStatus, Option<String>) {
    let limit = self.config.max_concurrent_steps.max(1);
    let mut pending: BTreeSet<u32> = self.workflow.steps.keys().copied().collect();
    let mut reports: BTreeMap<u32, StepReport> = BTreeMap::new();
    let mut running: HashMap<tokio::task::Id, u32> = HashMap::new();
    let mut join_set: JoinSet<StepReport> = JoinSet::new();
    let mut halted: Option<String> = None;
    let mut cancelled = false;

    loop {
      if !cancelled && cancel.is_cancelled() {
        warn!(execution_id = %execution_id, "workflow cancelled, no new steps will start");
        cancelled = true;
      }

      if halted.is_none() && !cancelled {
        self.skip_blocked_steps(graph, &mut pending, &mut reports, execution_id);

        let ready: Vec<u32> = pending
          .iter()
          .copied()
          .filter(|n| matches!(readiness(graph, &reports, *n), Readiness::Ready))
          .take(limit.saturating_sub(running.len()))
          .collect();

        for step_number in ready {
          let Some(step) = self.workflow.get_step(step_number) else {
            continue;
          };
          pending.remove(&step_number);
          let step: Step = step.clone();
          let runner = runner.clone();
          let handle = join_set.spawn(async move { runner.run(&step).await });
          running.insert(handle.id(), step_number);
        }
      }

      if join_set.is_empty() {
        break;
      }

      tokio::select! {
        Some(joined) = join_set.join_next_with_id() => {
          let report = match joined {
            Ok((id, report)) => {
              running.remove(&id);
              report
            }
            Err(e) => {
              let step_number = running.remove(&e.id()).unwrap_or_default();
              self.lost_step_report(step_number, e.to_string())
            }
          };

          let stops_run = report.status == StepStatus::Failed
            && self
              .workflow
              .get_step(report.step_number)
              .is_some_and(|s| s.stop_on_error);

          self.record(execution_id, &report);
          if stops_run && halted.is_none() {
            let message = format!(
              "step {} failed: {}",
              report.step_number,
              report.error.as_deref().unwrap_or_default()
            );
            error!(
              execution_id = %execution_id,
              step_number = report.step_number,
              running = running.len(),
              "stopping run after step failure"
            );
            halted = Some(message);
          }
          reports.insert(report.step_number, report);
        }
        _ = cancel.cancelled(), if !cancelled => {
          warn!(execution_id = %execution_id, "workflow cancelled during step execution");
          cancelled = true;
        }
      }
    }

    for step_number in pending {
      if let Some(step) = self.workflow.get_step(step_number) {
        reports.insert(
          step_number,
          StepReport::new(step_number, &step.name, &step.handler_name, StepStatus::NotRun),
        );
      }
    }

    let status = if halted.is_some() {
      RunStatus::Failed
    } else if cancelled {
      RunStatus::Cancelled
    } else {
      RunStatus::Completed
    };

    (reports, status, halted)
  }

  /// Mark every pending step whose explicit dependency cannot succeed any
  /// more as skipped. Repeats until nothing changes, since a skip can block
  /// further steps.
  fn skip_blocked_steps(
    &self,
    graph: &Graph,
    pending: &mut BTreeSet<u32>,
    reports: &mut BTreeMap<u32, StepReport>,
    execution_id: &str,
  ) {
    loop {
      let blocked: Vec<(u32, u32)> = pending
        .iter()
        .filter_map(|n| match readiness(graph, reports, *n) {
          Readiness::Blocked(dep) => Some((*n, dep)),
          _ => None,
        })
        .collect();

      if blocked.is_empty() {
        return;
      }

      for (step_number, dep) in blocked {
        let Some(step) = self.workflow.get_step(step_number) else {
          continue;
        };
        pending.remove(&step_number);
        let mut report = StepReport::new(
          step_number,
          &step.name,
          &step.handler_name,
          StepStatus::NotRun,
        )
        .skipped(SkipReason::DependencyUnsatisfied);
        report.error = Some(format!("dependency step {} did not succeed", dep));
        self.record(execution_id, &report);
        reports.insert(step_number, report);
      }
    }
  }

  /// Report for a step whose task died outside the step runner.
  fn lost_step_report(&self, step_number: u32, message: String) -> StepReport {
    let (name, handler_name) = self
      .workflow
      .get_step(step_number)
      .map(|s| (s.name.clone(), s.handler_name.clone()))
      .unwrap_or_default();
    StepReport::new(step_number, name, handler_name, StepStatus::NotRun)
      .failed(FailureKind::Handler, format!("step task failed: {}", message))
  }

  /// Log and emit the terminal event for a step.
  fn record(&self, execution_id: &str, report: &StepReport) {
    let execution_id_owned = execution_id.to_string();
    match report.status {
      StepStatus::Succeeded => {
        info!(
          execution_id = %execution_id,
          step_number = report.step_number,
          attempts = report.attempts.len(),
          execution_time_ms = report.execution_time_ms,
          "step_completed"
        );
        self.notifier.notify(ExecutionEvent::StepCompleted {
          execution_id: execution_id_owned,
          step_number: report.step_number,
          data: report.data.clone().unwrap_or_default(),
        });
      }
      StepStatus::Skipped => {
        let reason = report.skip_reason.unwrap_or(SkipReason::ConditionFalse);
        info!(
          execution_id = %execution_id,
          step_number = report.step_number,
          reason = ?reason,
          "step_skipped"
        );
        self.notifier.notify(ExecutionEvent::StepSkipped {
          execution_id: execution_id_owned,
          step_number: report.step_number,
          reason,
        });
      }
      StepStatus::Failed => {
        let failure = report.failure.unwrap_or(FailureKind::Handler);
        let error = report.error.clone().unwrap_or_default();
        error!(
          execution_id = %execution_id,
          step_number = report.step_number,
          failure = ?failure,
          error = %error,
          "step_failed"
        );
        self.notifier.notify(ExecutionEvent::StepFailed {
          execution_id: execution_id_owned,
          step_number: report.step_number,
          failure,
          error,
        });
      }
      StepStatus::NotRun => {}
    }
  }
}

/// Whether a pending step can start given the outcomes recorded so far.
///
/// Explicit dependencies must have succeeded. Implicit sequential edges only
/// wait for each earlier step to reach any terminal outcome.
fn readiness(graph: &Graph, reports: &BTreeMap<u32, StepReport>, step_number: u32) -> Readiness {
  let mut waiting = false;
  for dep in graph.upstream(step_number) {
    match reports.get(&dep.step_number) {
      None => waiting = true,
      Some(report) => {
        if dep.kind == DependencyKind::Explicit && report.status != StepStatus::Succeeded {
          return Readiness::Blocked(dep.step_number);
        }
      }
    }
  }
  if waiting {
    Readiness::Waiting
  } else {
    Readiness::Ready
  }
}

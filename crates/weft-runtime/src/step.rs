//! Per-step execution: condition, templating, validation, attempts, and
//! output mapping.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;
use tracing::{info, instrument, warn};
use weft_handler::Params;
use weft_handler_registry::{HandlerRegistry, RegisteredHandler};
use weft_workflow::Step;

use crate::condition::evaluate_condition;
use crate::context::SharedContext;
use crate::events::{ExecutionEvent, ExecutionNotifier};
use crate::report::{AttemptRecord, FailureKind, SkipReason, StepReport, StepStatus};
use crate::template::substitute_params;

enum AttemptOutcome {
  Succeeded(Params),
  Failed(FailureKind, String),
}

/// Runs single steps of one execution against its shared context.
#[derive(Clone)]
pub(crate) struct StepRunner {
  execution_id: String,
  registry: Arc<HandlerRegistry>,
  context: SharedContext,
  notifier: Arc<dyn ExecutionNotifier>,
}

impl StepRunner {
  pub(crate) fn new(
    execution_id: String,
    registry: Arc<HandlerRegistry>,
    context: SharedContext,
    notifier: Arc<dyn ExecutionNotifier>,
  ) -> Self {
    Self {
      execution_id,
      registry,
      context,
      notifier,
    }
  }

  /// Run a step to a terminal outcome. Never returns an error: every
  /// failure is captured in the report.
  #[instrument(
    name = "step",
    skip(self, step),
    fields(
      execution_id = %self.execution_id,
      step_number = step.step_number,
      handler = %step.handler_name,
    )
  )]
  pub(crate) async fn run(&self, step: &Step) -> StepReport {
    let started = Instant::now();
    let mut report = self.execute(step).await;
    report.execution_time_ms = elapsed_ms(started);
    report
  }

  async fn execute(&self, step: &Step) -> StepReport {
    let mut report = StepReport::new(
      step.step_number,
      &step.name,
      &step.handler_name,
      StepStatus::NotRun,
    );
    let snapshot = self.context.snapshot().await;

    if let Some(expression) = &step.condition {
      match evaluate_condition(expression, &snapshot) {
        Ok(true) => {}
        Ok(false) => return report.skipped(SkipReason::ConditionFalse),
        Err(e) => return report.failed(FailureKind::Condition, e.to_string()),
      }
    }

    let params = substitute_params(&step.parameters, &snapshot);
    report.resolved_parameters = Some(params.clone());

    let Some(registered) = self.registry.lookup_by_name(&step.handler_name) else {
      return report.failed(
        FailureKind::Handler,
        format!("unknown handler '{}'", step.handler_name),
      );
    };

    let missing = registered.schema().missing_parameters(&params);
    if !missing.is_empty() {
      return report.failed(
        FailureKind::Validation,
        format!("missing required parameters: {}", missing.join(", ")),
      );
    }

    info!(
      execution_id = %self.execution_id,
      step_number = step.step_number,
      handler = %step.handler_name,
      "step_started"
    );
    self.notifier.notify(ExecutionEvent::StepStarted {
      execution_id: self.execution_id.clone(),
      step_number: step.step_number,
      handler_name: step.handler_name.clone(),
    });

    let max_attempts = step.max_attempts();
    let mut attempt = 0;
    loop {
      attempt += 1;
      let attempt_started = Instant::now();
      let outcome = self
        .attempt(registered, params.clone(), step.timeout())
        .await;
      let execution_time_ms = elapsed_ms(attempt_started);

      match outcome {
        AttemptOutcome::Succeeded(data) => {
          report.attempts.push(AttemptRecord {
            attempt,
            success: true,
            error: None,
            failure: None,
            execution_time_ms,
          });
          self.context.apply_mapping(&step.output_mapping, &data).await;
          report.status = StepStatus::Succeeded;
          report.success = true;
          report.data = Some(data);
          return report;
        }
        AttemptOutcome::Failed(failure, error) => {
          warn!(
            execution_id = %self.execution_id,
            step_number = step.step_number,
            attempt,
            max_attempts,
            error = %error,
            "attempt_failed"
          );
          self.notifier.notify(ExecutionEvent::AttemptFailed {
            execution_id: self.execution_id.clone(),
            step_number: step.step_number,
            attempt,
            failure,
            error: error.clone(),
          });
          report.attempts.push(AttemptRecord {
            attempt,
            success: false,
            error: Some(error.clone()),
            failure: Some(failure),
            execution_time_ms,
          });

          if attempt >= max_attempts {
            return report.failed(failure, error);
          }
          tokio::time::sleep(step.retry_delay()).await;
        }
      }
    }
  }

  /// One bounded handler invocation on a fresh instance.
  async fn attempt(
    &self,
    registered: &RegisteredHandler,
    params: Params,
    timeout: Duration,
  ) -> AttemptOutcome {
    let handler = match catch_unwind(AssertUnwindSafe(|| registered.instantiate())) {
      Ok(handler) => handler,
      Err(panic) => {
        return AttemptOutcome::Failed(
          FailureKind::Handler,
          format!("handler constructor panicked: {}", panic_message(panic.as_ref())),
        );
      }
    };

    let invocation = AssertUnwindSafe(handler.execute(params)).catch_unwind();
    match tokio::time::timeout(timeout, invocation).await {
      Ok(Ok(result)) if result.success => AttemptOutcome::Succeeded(result.data.unwrap_or_default()),
      Ok(Ok(result)) => AttemptOutcome::Failed(
        FailureKind::Handler,
        result
          .error
          .unwrap_or_else(|| "handler reported failure".to_string()),
      ),
      Ok(Err(panic)) => AttemptOutcome::Failed(
        FailureKind::Handler,
        format!("handler panicked: {}", panic_message(panic.as_ref())),
      ),
      Err(_) => AttemptOutcome::Failed(
        FailureKind::Timeout,
        format!("timeout after {}ms", timeout.as_millis()),
      ),
    }
  }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  if let Some(s) = panic.downcast_ref::<&str>() {
    s.to_string()
  } else if let Some(s) = panic.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic".to_string()
  }
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
  u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

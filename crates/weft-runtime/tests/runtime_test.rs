//! End-to-end runs through the engine with in-test handlers.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use weft_config::WorkflowDef;
use weft_handler::{
  ActionResult, Handler, HandlerSchema, ParameterSchema, ParameterType, Params, optional_i64,
};
use weft_handler_registry::HandlerRegistry;
use weft_resolver::ResolveError;
use weft_runtime::{
  ChannelNotifier, Engine, ExecutionEvent, FailureKind, RunStatus, Runtime, RuntimeConfig,
  RuntimeError, SkipReason, StepStatus, WorkflowRunner,
};
use weft_workflow::{Step, Workflow};

struct Echo;

#[async_trait]
impl Handler for Echo {
  fn schema(&self) -> HandlerSchema {
    HandlerSchema::new("echo").input(ParameterSchema::new("text", ParameterType::String))
  }

  async fn execute(&self, params: Params) -> ActionResult {
    ActionResult::ok(params)
  }
}

/// Always fails, recording when it was called.
struct Fail {
  calls: Arc<Mutex<Vec<Instant>>>,
}

#[async_trait]
impl Handler for Fail {
  fn schema(&self) -> HandlerSchema {
    HandlerSchema::new("fail")
  }

  async fn execute(&self, _params: Params) -> ActionResult {
    self.calls.lock().unwrap().push(Instant::now());
    ActionResult::failure("always fails")
  }
}

/// Sleeps for `seconds` (default 60) then succeeds.
struct Sleep;

#[async_trait]
impl Handler for Sleep {
  fn schema(&self) -> HandlerSchema {
    HandlerSchema::new("sleep")
  }

  async fn execute(&self, params: Params) -> ActionResult {
    let seconds = optional_i64(&params, "seconds").ok().flatten().unwrap_or(60);
    tokio::time::sleep(Duration::from_secs(seconds as u64)).await;
    ActionResult::ok(Params::new())
  }
}

/// Echoes its parameters after five seconds.
struct SlowEcho;

#[async_trait]
impl Handler for SlowEcho {
  fn schema(&self) -> HandlerSchema {
    HandlerSchema::new("slow_echo")
  }

  async fn execute(&self, params: Params) -> ActionResult {
    tokio::time::sleep(Duration::from_secs(5)).await;
    ActionResult::ok(params)
  }
}

/// Tracks how many invocations overlap.
struct Track {
  current: Arc<AtomicUsize>,
  peak: Arc<AtomicUsize>,
}

#[async_trait]
impl Handler for Track {
  fn schema(&self) -> HandlerSchema {
    HandlerSchema::new("track")
  }

  async fn execute(&self, _params: Params) -> ActionResult {
    let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
    self.peak.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    self.current.fetch_sub(1, Ordering::SeqCst);
    ActionResult::ok(Params::new())
  }
}

struct Boom;

#[async_trait]
impl Handler for Boom {
  fn schema(&self) -> HandlerSchema {
    HandlerSchema::new("boom")
  }

  async fn execute(&self, _params: Params) -> ActionResult {
    panic!("kaboom");
  }
}

struct Fixture {
  registry: Arc<HandlerRegistry>,
  calls: Arc<Mutex<Vec<Instant>>>,
  peak: Arc<AtomicUsize>,
}

fn fixture() -> Fixture {
  let calls = Arc::new(Mutex::new(Vec::new()));
  let current = Arc::new(AtomicUsize::new(0));
  let peak = Arc::new(AtomicUsize::new(0));

  let mut registry = HandlerRegistry::new();
  registry.register(|| Echo).unwrap();
  registry.register(|| Sleep).unwrap();
  registry.register(|| SlowEcho).unwrap();
  registry.register(|| Boom).unwrap();
  {
    let calls = calls.clone();
    registry
      .register(move || Fail {
        calls: calls.clone(),
      })
      .unwrap();
  }
  {
    let current = current.clone();
    let peak = peak.clone();
    registry
      .register(move || Track {
        current: current.clone(),
        peak: peak.clone(),
      })
      .unwrap();
  }

  Fixture {
    registry: Arc::new(registry),
    calls,
    peak,
  }
}

fn def(steps: Value) -> WorkflowDef {
  serde_json::from_value(json!({
    "workflow_id": "wf-test",
    "name": "Test Workflow",
    "steps": steps,
  }))
  .unwrap()
}

fn ctx(value: Value) -> Params {
  value.as_object().cloned().unwrap()
}

fn engine(fixture: &Fixture) -> Engine {
  Engine::new(fixture.registry.clone(), RuntimeConfig::default())
}

#[tokio::test]
async fn test_missing_placeholder_passes_through() {
  let fixture = fixture();
  let report = engine(&fixture)
    .run(
      def(json!([
        { "step_number": 1, "handler_name": "echo", "parameters": { "text": "a" } },
        { "step_number": 2, "handler_name": "echo", "parameters": { "text": "{{context.missing}}" } }
      ])),
      Params::new(),
    )
    .await
    .unwrap();

  assert!(report.success);
  assert_eq!(report.status, RunStatus::Completed);
  assert_eq!(report.completed_steps, 2);
  assert_eq!(report.total_steps, 2);

  let second = report.step(2).unwrap();
  assert_eq!(second.status, StepStatus::Succeeded);
  assert_eq!(
    second.resolved_parameters.as_ref().unwrap()["text"],
    json!("{{context.missing}}")
  );
  assert_eq!(second.data.as_ref().unwrap()["text"], json!("{{context.missing}}"));
}

#[tokio::test]
async fn test_validation_failure_stops_run() {
  let fixture = fixture();
  let report = engine(&fixture)
    .run(
      def(json!([
        { "step_number": 1, "handler_name": "echo", "stop_on_error": true },
        { "step_number": 2, "handler_name": "echo", "parameters": { "text": "b" } }
      ])),
      Params::new(),
    )
    .await
    .unwrap();

  assert!(!report.success);
  assert_eq!(report.status, RunStatus::Failed);
  assert_eq!(report.completed_steps, 0);

  let first = report.step(1).unwrap();
  assert_eq!(first.status, StepStatus::Failed);
  assert_eq!(first.failure, Some(FailureKind::Validation));
  assert!(first.attempts.is_empty());
  assert!(first.error.as_ref().unwrap().contains("text"));

  assert_eq!(report.step(2).unwrap().status, StepStatus::NotRun);
}

#[tokio::test(start_paused = true)]
async fn test_retries_with_delay() {
  let fixture = fixture();
  let report = engine(&fixture)
    .run(
      def(json!([
        { "step_number": 1, "handler_name": "fail", "retry_count": 2, "retry_delay_seconds": 3 }
      ])),
      Params::new(),
    )
    .await
    .unwrap();

  let calls = fixture.calls.lock().unwrap().clone();
  assert_eq!(calls.len(), 3);
  for pair in calls.windows(2) {
    let gap = pair[1] - pair[0];
    assert!(gap >= Duration::from_secs(3), "gap {:?}", gap);
    assert!(gap < Duration::from_millis(3100), "gap {:?}", gap);
  }

  let step = report.step(1).unwrap();
  assert_eq!(step.status, StepStatus::Failed);
  assert_eq!(step.failure, Some(FailureKind::Handler));
  assert_eq!(step.error.as_deref(), Some("always fails"));
  assert_eq!(step.attempts.len(), 3);
  assert!(step.attempts.iter().all(|a| !a.success));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_recorded() {
  let fixture = fixture();
  let report = engine(&fixture)
    .run(
      def(json!([
        { "step_number": 1, "handler_name": "sleep", "parameters": { "seconds": 60 }, "timeout_seconds": 1, "retry_count": 1, "retry_delay_seconds": 0 }
      ])),
      Params::new(),
    )
    .await
    .unwrap();

  let step = report.step(1).unwrap();
  assert_eq!(step.status, StepStatus::Failed);
  assert_eq!(step.failure, Some(FailureKind::Timeout));
  assert_eq!(step.attempts.len(), 2);
  assert!(
    step
      .attempts
      .iter()
      .all(|a| a.failure == Some(FailureKind::Timeout))
  );
  assert!(step.execution_time_ms < 60_000);
  assert_eq!(report.status, RunStatus::Failed);
}

#[tokio::test]
async fn test_false_condition_skips_without_touching_context() {
  let fixture = fixture();
  let report = engine(&fixture)
    .run(
      def(json!([
        {
          "step_number": 1,
          "handler_name": "echo",
          "parameters": { "text": "x" },
          "condition_expression": "approved",
          "output_mapping": { "text": "written" }
        },
        { "step_number": 2, "handler_name": "echo", "parameters": { "text": "y" } }
      ])),
      ctx(json!({ "approved": false })),
    )
    .await
    .unwrap();

  let first = report.step(1).unwrap();
  assert_eq!(first.status, StepStatus::Skipped);
  assert_eq!(first.skip_reason, Some(SkipReason::ConditionFalse));
  assert!(first.attempts.is_empty());
  assert!(!report.context.contains_key("written"));

  assert_eq!(report.step(2).unwrap().status, StepStatus::Succeeded);
  assert!(report.success);
  assert_eq!(report.completed_steps, 1);
}

#[tokio::test]
async fn test_condition_error_fails_step() {
  let fixture = fixture();
  let report = engine(&fixture)
    .run(
      def(json!([
        { "step_number": 1, "handler_name": "echo", "parameters": { "text": "x" }, "condition_expression": "total >" }
      ])),
      Params::new(),
    )
    .await
    .unwrap();

  let step = report.step(1).unwrap();
  assert_eq!(step.status, StepStatus::Failed);
  assert_eq!(step.failure, Some(FailureKind::Condition));
  assert!(!report.success);
}

#[tokio::test]
async fn test_output_mapping_feeds_later_steps() {
  let fixture = fixture();
  let report = engine(&fixture)
    .run(
      def(json!([
        {
          "step_number": 1,
          "handler_name": "echo",
          "parameters": { "text": "hello", "extra": 1 },
          "output_mapping": { "text": "greeting" }
        },
        {
          "step_number": 2,
          "handler_name": "echo",
          "parameters": { "text": "{{context.greeting}}" },
          "output_mapping": { "text": "echoed" }
        }
      ])),
      ctx(json!({ "seed": true })),
    )
    .await
    .unwrap();

  assert!(report.success);
  assert_eq!(
    report.step(2).unwrap().resolved_parameters.as_ref().unwrap()["text"],
    json!("hello")
  );
  assert_eq!(
    report.context,
    ctx(json!({ "seed": true, "greeting": "hello", "echoed": "hello" }))
  );
  assert_eq!(report.step(1).unwrap().data.as_ref().unwrap()["extra"], json!(1));
}

#[tokio::test(start_paused = true)]
async fn test_step_without_dependencies_waits_for_every_earlier_step() {
  let fixture = fixture();
  let report = engine(&fixture)
    .run(
      def(json!([
        { "step_number": 1, "handler_name": "echo", "parameters": { "text": "start" } },
        {
          "step_number": 2,
          "handler_name": "slow_echo",
          "parameters": { "v": "from-two" },
          "output_mapping": { "v": "two" },
          "depends_on": [1]
        },
        { "step_number": 3, "handler_name": "echo", "parameters": { "text": "fast" }, "depends_on": [1] },
        { "step_number": 4, "handler_name": "echo", "parameters": { "text": "{{context.two}}" } }
      ])),
      Params::new(),
    )
    .await
    .unwrap();

  assert!(report.success);
  let last = report.step(4).unwrap();
  assert_eq!(last.status, StepStatus::Succeeded);
  assert_eq!(
    last.resolved_parameters.as_ref().unwrap()["text"],
    json!("from-two")
  );
}

#[tokio::test]
async fn test_failed_dependency_skips_dependents() {
  let fixture = fixture();
  let report = engine(&fixture)
    .run(
      def(json!([
        { "step_number": 1, "handler_name": "fail", "stop_on_error": false, "retry_delay_seconds": 0 },
        { "step_number": 2, "handler_name": "echo", "parameters": { "text": "a" }, "depends_on": [1] },
        { "step_number": 3, "handler_name": "echo", "parameters": { "text": "b" }, "depends_on": [2] },
        { "step_number": 4, "handler_name": "echo", "parameters": { "text": "c" } }
      ])),
      Params::new(),
    )
    .await
    .unwrap();

  assert_eq!(report.step(1).unwrap().status, StepStatus::Failed);
  for n in [2, 3] {
    let step = report.step(n).unwrap();
    assert_eq!(step.status, StepStatus::Skipped, "step {n}");
    assert_eq!(step.skip_reason, Some(SkipReason::DependencyUnsatisfied));
  }
  assert_eq!(report.step(4).unwrap().status, StepStatus::Succeeded);

  assert!(report.success);
  assert_eq!(report.status, RunStatus::Completed);
  assert_eq!(report.completed_steps, 1);
}

#[tokio::test]
async fn test_tolerated_failure_continues_sequence() {
  let fixture = fixture();
  let report = engine(&fixture)
    .run(
      def(json!([
        { "step_number": 1, "handler_name": "fail", "stop_on_error": false },
        { "step_number": 2, "handler_name": "echo", "parameters": { "text": "after" } }
      ])),
      Params::new(),
    )
    .await
    .unwrap();

  assert!(report.success);
  assert_eq!(report.step(2).unwrap().status, StepStatus::Succeeded);
}

#[tokio::test]
async fn test_cycle_rejected_before_any_step() {
  let fixture = fixture();
  let err = engine(&fixture)
    .run(
      def(json!([
        { "step_number": 1, "handler_name": "fail", "depends_on": [3] },
        { "step_number": 2, "handler_name": "fail", "depends_on": [1] },
        { "step_number": 3, "handler_name": "fail", "depends_on": [2] }
      ])),
      Params::new(),
    )
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    RuntimeError::Configuration(ResolveError::CycleDetected { .. })
  ));
  assert!(fixture.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_handler_rejected() {
  let fixture = fixture();
  let err = engine(&fixture)
    .run(
      def(json!([{ "step_number": 1, "handler_name": "nope" }])),
      Params::new(),
    )
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    RuntimeError::Configuration(ResolveError::UnknownHandler { step_number: 1, .. })
  ));
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_is_bounded() {
  let fixture = fixture();
  let engine = Engine::new(
    fixture.registry.clone(),
    RuntimeConfig {
      max_concurrent_steps: 2,
      ..RuntimeConfig::default()
    },
  );

  let mut steps = vec![json!({ "step_number": 1, "handler_name": "track" })];
  for n in 2..=7 {
    steps.push(json!({ "step_number": n, "handler_name": "track", "depends_on": [1] }));
  }

  let report = engine.run(def(Value::Array(steps)), Params::new()).await.unwrap();

  assert!(report.success);
  assert_eq!(report.completed_steps, 7);
  assert_eq!(fixture.peak.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_lets_running_step_finish() {
  let fixture = fixture();
  let cancel = CancellationToken::new();
  {
    let cancel = cancel.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_secs(1)).await;
      cancel.cancel();
    });
  }

  let report = engine(&fixture)
    .run_with_cancel(
      def(json!([
        { "step_number": 1, "handler_name": "sleep", "parameters": { "seconds": 5 } },
        { "step_number": 2, "handler_name": "echo", "parameters": { "text": "late" } }
      ])),
      Params::new(),
      cancel,
    )
    .await
    .unwrap();

  assert_eq!(report.status, RunStatus::Cancelled);
  assert!(!report.success);
  assert_eq!(report.step(1).unwrap().status, StepStatus::Succeeded);
  assert_eq!(report.step(2).unwrap().status, StepStatus::NotRun);
}

#[tokio::test]
async fn test_handler_panic_is_a_failed_attempt() {
  let fixture = fixture();
  let report = engine(&fixture)
    .run(
      def(json!([{ "step_number": 1, "handler_name": "boom" }])),
      Params::new(),
    )
    .await
    .unwrap();

  let step = report.step(1).unwrap();
  assert_eq!(step.status, StepStatus::Failed);
  assert_eq!(step.failure, Some(FailureKind::Handler));
  assert!(step.error.as_ref().unwrap().contains("kaboom"));
}

#[tokio::test]
async fn test_events_follow_run() {
  let fixture = fixture();
  let (tx, mut rx) = mpsc::unbounded_channel();
  let engine = engine(&fixture).with_notifier(Arc::new(ChannelNotifier::new(tx)));

  let report = engine
    .run(
      def(json!([{ "step_number": 1, "handler_name": "echo", "parameters": { "text": "a" } }])),
      Params::new(),
    )
    .await
    .unwrap();

  let mut events = Vec::new();
  while let Ok(event) = rx.try_recv() {
    events.push(event);
  }

  assert_eq!(events.len(), 4);
  assert!(matches!(&events[0], ExecutionEvent::RunStarted { workflow_id, .. } if workflow_id == "wf-test"));
  assert!(matches!(
    &events[1],
    ExecutionEvent::StepStarted { step_number: 1, .. }
  ));
  assert!(matches!(
    &events[2],
    ExecutionEvent::StepCompleted { step_number: 1, .. }
  ));
  assert!(matches!(
    &events[3],
    ExecutionEvent::RunCompleted { execution_id, status: RunStatus::Completed, success: true }
      if *execution_id == report.execution_id
  ));
}

fn hand_built_step(step_number: u32, handler_name: &str) -> Step {
  Step {
    step_number,
    name: handler_name.to_string(),
    handler_name: handler_name.to_string(),
    parameters: ctx(json!({ "text": "{{context.word}}" })),
    output_mapping: Default::default(),
    condition: None,
    depends_on: Vec::new(),
    retry_count: 0,
    retry_delay_ms: 0,
    timeout_ms: 1_000,
    stop_on_error: true,
  }
}

fn hand_built(steps: Vec<Step>) -> Workflow {
  Workflow {
    workflow_id: "hand-built".to_string(),
    name: "Hand Built".to_string(),
    version: "1.0.0".to_string(),
    steps: steps.into_iter().map(|s| (s.step_number, s)).collect(),
  }
}

#[tokio::test]
async fn test_runtime_rejects_unregistered_handler() {
  let fixture = fixture();
  let runtime = Runtime::new(
    hand_built(vec![hand_built_step(1, "echo"), hand_built_step(2, "missing")]),
    fixture.registry.clone(),
    RuntimeConfig::default(),
  );

  let err = runtime
    .invoke(Params::new(), CancellationToken::new())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    RuntimeError::Configuration(ResolveError::UnknownHandler { step_number: 2, .. })
  ));
}

#[tokio::test]
async fn test_runtime_rejects_unknown_dependency() {
  let fixture = fixture();
  let mut step = hand_built_step(1, "echo");
  step.depends_on = vec![99];
  let runtime = Runtime::new(
    hand_built(vec![step]),
    fixture.registry.clone(),
    RuntimeConfig::default(),
  );

  let err = runtime
    .invoke(Params::new(), CancellationToken::new())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    RuntimeError::Configuration(ResolveError::UnknownDependency {
      step_number: 1,
      depends_on: 99
    })
  ));
}

#[tokio::test]
async fn test_invoke_step_in_isolation() {
  let fixture = fixture();
  let runtime = Runtime::new(
    hand_built(vec![hand_built_step(1, "fail"), hand_built_step(2, "echo")]),
    fixture.registry.clone(),
    RuntimeConfig::default(),
  );

  let report = runtime
    .invoke_step(2, ctx(json!({ "word": "solo" })), CancellationToken::new())
    .await
    .unwrap();
  assert_eq!(report.status, StepStatus::Succeeded);
  assert_eq!(report.data.unwrap()["text"], json!("solo"));
  assert!(fixture.calls.lock().unwrap().is_empty());

  let err = runtime
    .invoke_step(9, Params::new(), CancellationToken::new())
    .await
    .unwrap_err();
  assert!(matches!(err, RuntimeError::StepNotFound { step_number: 9 }));
}

#[tokio::test]
async fn test_runner_executes_and_stops() {
  let fixture = fixture();
  let runtime = Arc::new(Runtime::new(
    hand_built(vec![hand_built_step(1, "echo")]),
    fixture.registry.clone(),
    RuntimeConfig::default(),
  ));
  let runner = WorkflowRunner::new(runtime);

  let report = runner
    .execute_once(ctx(json!({ "word": "once" })), CancellationToken::new())
    .await
    .unwrap();
  assert!(report.success);

  let cancel = CancellationToken::new();
  let handle = tokio::spawn(runner.start(cancel.clone()));
  tokio::time::sleep(Duration::from_millis(10)).await;
  cancel.cancel();

  assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_runner_delivers_reports() {
  let fixture = fixture();
  let runtime = Arc::new(Runtime::new(
    hand_built(vec![hand_built_step(1, "echo")]),
    fixture.registry.clone(),
    RuntimeConfig::default(),
  ));
  let (report_tx, mut reports) = mpsc::unbounded_channel();
  let runner = WorkflowRunner::new(runtime).with_report_sender(report_tx);
  let sender = runner.sender();

  let handle = tokio::spawn(runner.start(CancellationToken::new()));
  sender.send(ctx(json!({ "word": "first" }))).await.unwrap();
  sender.send(ctx(json!({ "word": "second" }))).await.unwrap();
  drop(sender);

  let first = reports.recv().await.unwrap();
  let second = reports.recv().await.unwrap();
  assert!(first.success);
  assert_eq!(first.step(1).unwrap().data.as_ref().unwrap()["text"], json!("first"));
  assert_eq!(second.step(1).unwrap().data.as_ref().unwrap()["text"], json!("second"));
  assert_ne!(first.execution_id, second.execution_id);

  assert!(handle.await.unwrap().is_ok());
  assert!(reports.recv().await.is_none());
}

//! Trigger entry point: definition plus context in, run report out.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;
use weft_config::WorkflowDef;
use weft_handler::Params;
use weft_handler_registry::HandlerRegistry;
use weft_resolver::{Resolver, StandardResolver};

use crate::error::RuntimeError;
use crate::events::{ExecutionNotifier, NoopNotifier};
use crate::report::RunReport;
use crate::runtime::{Runtime, RuntimeConfig};

/// Resolves workflow definitions and runs them.
pub struct Engine {
  registry: Arc<HandlerRegistry>,
  config: RuntimeConfig,
  notifier: Arc<dyn ExecutionNotifier>,
}

impl Engine {
  pub fn new(registry: Arc<HandlerRegistry>, config: RuntimeConfig) -> Self {
    Self {
      registry,
      config,
      notifier: Arc::new(NoopNotifier),
    }
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn registry(&self) -> &HandlerRegistry {
    &self.registry
  }

  /// Resolve a definition into a runtime ready to invoke.
  pub async fn prepare(&self, def: WorkflowDef) -> Result<Runtime, RuntimeError> {
    let resolver = StandardResolver::new(self.registry.clone())
      .with_default_timeout(self.config.default_step_timeout_seconds);
    let workflow = resolver.resolve(def).await?;

    info!(
      workflow_id = %workflow.workflow_id,
      version = %workflow.version,
      steps = workflow.steps.len(),
      "workflow resolved"
    );

    Ok(
      Runtime::new(workflow, self.registry.clone(), self.config.clone())
        .with_notifier(self.notifier.clone()),
    )
  }

  /// Run a definition to completion with the given initial context.
  pub async fn run(&self, def: WorkflowDef, context: Params) -> Result<RunReport, RuntimeError> {
    self.run_with_cancel(def, context, CancellationToken::new()).await
  }

  pub async fn run_with_cancel(
    &self,
    def: WorkflowDef,
    context: Params,
    cancel: CancellationToken,
  ) -> Result<RunReport, RuntimeError> {
    let runtime = self.prepare(def).await?;
    runtime.invoke(context, cancel).await
  }
}

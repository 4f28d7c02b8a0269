use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use weft_config::{StepDef, WorkflowDef};
use weft_handler_registry::HandlerRegistry;
use weft_workflow::{Step, Workflow};

use crate::error::ResolveError;

const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// Resolver transforms a WorkflowDef into a locked Workflow.
#[async_trait]
pub trait Resolver: Send + Sync {
  /// Resolve a workflow definition into a locked workflow.
  ///
  /// This process:
  /// 1. Validates step numbers (positive, unique)
  /// 2. Validates dependencies (known steps, no cycles)
  /// 3. Resolves handler names against the registry
  /// 4. Fills in per-step defaults
  async fn resolve(&self, def: WorkflowDef) -> Result<Workflow, ResolveError>;
}

/// Standard resolver implementation backed by a handler registry.
pub struct StandardResolver {
  registry: Arc<HandlerRegistry>,
  default_timeout_seconds: u64,
}

impl StandardResolver {
  /// Create a new resolver with the given handler registry.
  pub fn new(registry: Arc<HandlerRegistry>) -> Self {
    Self {
      registry,
      default_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
    }
  }

  /// Timeout applied to steps that do not set `timeout_seconds`.
  pub fn with_default_timeout(mut self, seconds: u64) -> Self {
    self.default_timeout_seconds = seconds;
    self
  }

  /// Check that step numbers are positive and unique.
  fn validate_step_numbers(&self, steps: &[StepDef]) -> Result<HashSet<u32>, ResolveError> {
    let mut numbers = HashSet::new();
    for step in steps {
      if step.step_number == 0 {
        return Err(ResolveError::InvalidStepNumber);
      }
      if !numbers.insert(step.step_number) {
        return Err(ResolveError::DuplicateStepNumber {
          step_number: step.step_number,
        });
      }
    }
    Ok(numbers)
  }

  /// Check that every dependency references an existing step.
  fn validate_dependencies(
    &self,
    numbers: &HashSet<u32>,
    steps: &[StepDef],
  ) -> Result<(), ResolveError> {
    for step in steps {
      for dep in &step.depends_on {
        if !numbers.contains(dep) {
          return Err(ResolveError::UnknownDependency {
            step_number: step.step_number,
            depends_on: *dep,
          });
        }
      }
    }
    Ok(())
  }

  /// Resolve a single step definition into a locked step.
  fn resolve_step(&self, def: StepDef) -> Result<Step, ResolveError> {
    if self.registry.lookup_by_name(&def.handler_name).is_none() {
      return Err(ResolveError::UnknownHandler {
        step_number: def.step_number,
        handler_name: def.handler_name,
      });
    }

    let mut depends_on = def.depends_on.clone();
    depends_on.sort_unstable();
    depends_on.dedup();

    let timeout_seconds = def.timeout_seconds.unwrap_or(self.default_timeout_seconds);

    Ok(Step {
      step_number: def.step_number,
      name: def.display_name().to_string(),
      handler_name: def.handler_name,
      parameters: def.parameters,
      output_mapping: def.output_mapping,
      condition: def
        .condition_expression
        .filter(|expr| !expr.trim().is_empty()),
      depends_on,
      retry_count: def.retry_count,
      retry_delay_ms: def.retry_delay_seconds.saturating_mul(1000),
      timeout_ms: timeout_seconds.saturating_mul(1000),
      stop_on_error: def.stop_on_error,
    })
  }
}

#[async_trait]
impl Resolver for StandardResolver {
  async fn resolve(&self, def: WorkflowDef) -> Result<Workflow, ResolveError> {
    let numbers = self.validate_step_numbers(&def.steps)?;
    self.validate_dependencies(&numbers, &def.steps)?;

    let mut steps = BTreeMap::new();
    for step_def in def.steps {
      let step = self.resolve_step(step_def)?;
      steps.insert(step.step_number, step);
    }

    let workflow = Workflow {
      workflow_id: def.workflow_id,
      name: def.name,
      version: def.version,
      steps,
    };

    // Sequential edges count too: they are real waits at run time.
    if let Some(steps) = workflow.graph().find_cycle() {
      return Err(ResolveError::CycleDetected { steps });
    }

    Ok(workflow)
  }
}

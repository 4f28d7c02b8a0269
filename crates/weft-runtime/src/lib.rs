//! Weft Runtime
//!
//! This crate executes locked workflows. It handles dependency-aware
//! scheduling, parameter templating, conditions, per-step retry and timeout
//! policy, and produces a [`RunReport`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                             │
//! │  - run(definition, context) → RunReport                     │
//! │  - resolves definitions against the handler registry        │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Runtime                             │
//! │  - invoke(context, cancel) → RunReport                      │
//! │  - graph traversal, bounded concurrency, stop_on_error      │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       StepRunner                            │
//! │  - condition, templating, validation, attempts, mapping     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`WorkflowRunner`] wraps a [`Runtime`] with an mpsc channel so callers
//! can trigger runs by sending context payloads.

mod condition;
mod context;
mod engine;
mod error;
mod events;
mod report;
mod runner;
mod runtime;
mod step;
mod template;

pub use condition::{ConditionError, evaluate_condition};
pub use context::SharedContext;
pub use engine::Engine;
pub use error::RuntimeError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use report::{
  AttemptRecord, FailureKind, RunReport, RunStatus, SkipReason, StepReport, StepStatus,
};
pub use runner::WorkflowRunner;
pub use runtime::{Runtime, RuntimeConfig};
pub use template::{is_placeholder, substitute, substitute_params};

//! Weft Resolver
//!
//! Turns a [`WorkflowDef`](weft_config::WorkflowDef) into a locked
//! [`Workflow`](weft_workflow::Workflow): step numbers are checked,
//! handlers are looked up in the registry, dependencies are validated and
//! checked for cycles, and per-step defaults are filled in.
//!
//! Every error here is a configuration error. A definition that fails to
//! resolve never runs a step.

mod error;
mod resolver;

pub use error::ResolveError;
pub use resolver::{Resolver, StandardResolver};

//! Weft Workflow
//!
//! This crate provides the "locked" workflow representation for weft.
//! A locked workflow is the validated, resolved form of a definition that
//! is ready for execution.
//!
//! Key differences from `weft-config`:
//! - Step numbers are unique and positive
//! - Every handler name resolved against the registry
//! - Timeouts filled in from engine defaults
//! - The dependency graph, including implicit sequential edges, is acyclic

mod graph;
mod step;
mod workflow;

pub use graph::{Dependency, DependencyKind, Graph};
pub use step::Step;
pub use workflow::Workflow;

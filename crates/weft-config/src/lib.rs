//! Weft Config
//!
//! This crate contains the serializable configuration types for weft.
//! These types represent workflow definitions before they are resolved
//! against the handler registry, plus the engine [`Settings`] file.
//!
//! Workflow definitions can be loaded from:
//! - JSON or YAML files (via the CLI)
//! - Database storage (as JSON blobs)
//!
//! The resolver takes a [`WorkflowDef`], checks it against the registered
//! handlers and the dependency graph, and produces a locked workflow.

mod error;
mod settings;
mod step;
mod workflow;

pub use error::ConfigError;
pub use settings::Settings;
pub use step::StepDef;
pub use workflow::{DefinitionFormat, WorkflowDef, WorkflowStatus};

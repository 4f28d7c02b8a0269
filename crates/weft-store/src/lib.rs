//! Weft Store
//!
//! This crate provides the storage trait and a SQLite implementation for
//! workflow definitions and execution records.
//!
//! The [`Store`] trait defines operations for:
//! - Saving and loading workflow definitions
//! - Recording finished runs
//! - Querying execution history

mod sqlite;
mod types;

pub use sqlite::SqliteStore;
pub use sqlx::types::Json;
pub use types::{ExecutionRecord, ExecutionStatus, WorkflowSummary};

use async_trait::async_trait;
use weft_config::WorkflowDef;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested record was not found.
  #[error("not found: {0}")]
  NotFound(String),

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}

/// Storage trait for workflow definitions and executions.
#[async_trait]
pub trait Store: Send + Sync {
  /// Insert or replace a workflow definition.
  async fn save_workflow(&self, workflow: &WorkflowDef) -> Result<(), Error>;

  /// Load a workflow definition by ID.
  async fn load_workflow(&self, workflow_id: &str) -> Result<WorkflowDef, Error>;

  /// List stored workflows, most recently updated first.
  async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>, Error>;

  /// Insert or replace an execution record.
  async fn save_execution(&self, record: &ExecutionRecord) -> Result<(), Error>;

  /// Get an execution record by ID.
  async fn get_execution(&self, execution_id: &str) -> Result<ExecutionRecord, Error>;

  /// List executions for a workflow, newest first.
  async fn list_executions(&self, workflow_id: &str) -> Result<Vec<ExecutionRecord>, Error>;
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// Final status of a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ExecutionStatus {
  Completed,
  Failed,
  Cancelled,
}

/// A finished run as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ExecutionRecord {
  pub execution_id: String,
  pub workflow_id: String,
  pub status: ExecutionStatus,
  /// Context the run was started with.
  pub context: Json<serde_json::Value>,
  pub final_context: Json<serde_json::Value>,
  /// The full run report.
  pub results: Json<serde_json::Value>,
  pub error_message: Option<String>,
  pub triggered_by: Option<String>,
  pub started_at: DateTime<Utc>,
  pub completed_at: Option<DateTime<Utc>>,
}

/// A stored workflow without its steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WorkflowSummary {
  pub workflow_id: String,
  pub name: String,
  pub version: String,
  pub status: String,
  pub step_count: i64,
  pub updated_at: DateTime<Utc>,
}

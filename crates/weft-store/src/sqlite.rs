use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::types::Json;
use weft_config::WorkflowDef;

use crate::{Error, ExecutionRecord, Store, WorkflowSummary};

/// SQLite-based store implementation.
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Connect to a database URL such as `sqlite://weft.db?mode=rwc`.
  pub async fn connect(url: &str) -> Result<Self, Error> {
    let pool = SqlitePool::connect(url).await?;
    Ok(Self::new(pool))
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(&self.pool).await
  }
}

#[async_trait]
impl Store for SqliteStore {
  async fn save_workflow(&self, workflow: &WorkflowDef) -> Result<(), Error> {
    let now = Utc::now();
    let step_count = i64::try_from(workflow.steps.len()).unwrap_or(i64::MAX);

    sqlx::query(
      r#"
            INSERT INTO workflows (workflow_id, name, description, version, status, step_count, definition, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (workflow_id) DO UPDATE SET
              name = excluded.name,
              description = excluded.description,
              version = excluded.version,
              status = excluded.status,
              step_count = excluded.step_count,
              definition = excluded.definition,
              updated_at = excluded.updated_at
            "#,
    )
    .bind(&workflow.workflow_id)
    .bind(&workflow.name)
    .bind(&workflow.description)
    .bind(&workflow.version)
    .bind(workflow.status.as_str())
    .bind(step_count)
    .bind(Json(workflow))
    .bind(now)
    .bind(now)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn load_workflow(&self, workflow_id: &str) -> Result<WorkflowDef, Error> {
    let row: Option<(Json<WorkflowDef>,)> = sqlx::query_as(
      r#"
            SELECT definition
            FROM workflows
            WHERE workflow_id = ?
            "#,
    )
    .bind(workflow_id)
    .fetch_optional(&self.pool)
    .await?;

    row
      .map(|(Json(def),)| def)
      .ok_or_else(|| Error::NotFound(format!("workflow '{}'", workflow_id)))
  }

  async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>, Error> {
    let rows = sqlx::query_as(
      r#"
            SELECT workflow_id, name, version, status, step_count, updated_at
            FROM workflows
            ORDER BY updated_at DESC, workflow_id ASC
            "#,
    )
    .fetch_all(&self.pool)
    .await?;

    Ok(rows)
  }

  async fn save_execution(&self, record: &ExecutionRecord) -> Result<(), Error> {
    sqlx::query(
      r#"
            INSERT INTO workflow_executions (execution_id, workflow_id, status, context, final_context, results, error_message, triggered_by, started_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (execution_id) DO UPDATE SET
              status = excluded.status,
              final_context = excluded.final_context,
              results = excluded.results,
              error_message = excluded.error_message,
              completed_at = excluded.completed_at
            "#,
    )
    .bind(&record.execution_id)
    .bind(&record.workflow_id)
    .bind(record.status)
    .bind(&record.context)
    .bind(&record.final_context)
    .bind(&record.results)
    .bind(&record.error_message)
    .bind(&record.triggered_by)
    .bind(record.started_at)
    .bind(record.completed_at)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn get_execution(&self, execution_id: &str) -> Result<ExecutionRecord, Error> {
    sqlx::query_as(
      r#"
            SELECT execution_id, workflow_id, status, context, final_context, results, error_message, triggered_by, started_at, completed_at
            FROM workflow_executions
            WHERE execution_id = ?
            "#,
    )
    .bind(execution_id)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("execution '{}'", execution_id)))
  }

  async fn list_executions(&self, workflow_id: &str) -> Result<Vec<ExecutionRecord>, Error> {
    let rows = sqlx::query_as(
      r#"
            SELECT execution_id, workflow_id, status, context, final_context, results, error_message, triggered_by, started_at, completed_at
            FROM workflow_executions
            WHERE workflow_id = ?
            ORDER BY started_at DESC
            "#,
    )
    .bind(workflow_id)
    .fetch_all(&self.pool)
    .await?;

    Ok(rows)
  }
}

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use weft_handler::{
  ActionResult, Handler, HandlerError, HandlerSchema, ParameterSchema, ParameterType, Params,
  optional_bool, optional_str, require_str,
};

use crate::into_params;

const SIMULATED_WORK: Duration = Duration::from_millis(500);
const WRITE_KEYWORDS: [&str; 4] = ["INSERT", "UPDATE", "DELETE", "DROP"];

/// Runs SQL against a named connection (simulated).
pub struct DatabaseQueryHandler;

impl DatabaseQueryHandler {
  async fn run(&self, params: Params) -> Result<Params, HandlerError> {
    let query = require_str(&params, "query")?;
    let database = optional_str(&params, "database")?.unwrap_or("primary");
    let read_only = optional_bool(&params, "read_only")?.unwrap_or(true);

    let upper = query.to_uppercase();
    if read_only && WRITE_KEYWORDS.iter().any(|k| upper.contains(k)) {
      return Err(HandlerError::failed(
        "write operations are not allowed in read-only mode",
      ));
    }

    tokio::time::sleep(SIMULATED_WORK).await;

    Ok(into_params(json!({
      "rows": [
        { "id": 1, "name": "Ada Lovelace", "email": "ada@example.com" },
        { "id": 2, "name": "Alan Turing", "email": "alan@example.com" },
      ],
      "row_count": 2,
      "execution_time": 0.125,
      "database": database,
    })))
  }
}

#[async_trait]
impl Handler for DatabaseQueryHandler {
  fn schema(&self) -> HandlerSchema {
    HandlerSchema::new("database_query")
      .display_name("Database Query")
      .description("Execute SQL queries on connected databases")
      .category("data")
      .tag("sql")
      .tag("database")
      .input(ParameterSchema::new("query", ParameterType::String).description("SQL query"))
      .input(
        ParameterSchema::new("database", ParameterType::String)
          .description("Connection name")
          .choices(["primary", "analytics", "reporting"])
          .default_value("primary"),
      )
      .input(
        ParameterSchema::new("timeout", ParameterType::Integer)
          .description("Query timeout in seconds")
          .default_value(30)
          .range(Some(1.0), Some(300.0)),
      )
      .input(
        ParameterSchema::new("read_only", ParameterType::Boolean)
          .description("Reject write statements")
          .default_value(true),
      )
      .output(ParameterSchema::new("rows", ParameterType::Array))
      .output(ParameterSchema::new("row_count", ParameterType::Integer))
      .output(ParameterSchema::new("execution_time", ParameterType::Float))
  }

  async fn execute(&self, params: Params) -> ActionResult {
    self.run(params).await.into()
  }
}

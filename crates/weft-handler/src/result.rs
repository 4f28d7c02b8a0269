use serde::{Deserialize, Serialize};

use crate::Params;
use crate::error::HandlerError;

/// Outcome of one handler invocation.
///
/// `data` is present iff `success`; `error` is present iff not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
  pub success: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<Params>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(default)]
  pub execution_time_ms: u64,
}

impl ActionResult {
  pub fn ok(data: Params) -> Self {
    Self {
      success: true,
      data: Some(data),
      error: None,
      execution_time_ms: 0,
    }
  }

  pub fn failure(error: impl Into<String>) -> Self {
    Self {
      success: false,
      data: None,
      error: Some(error.into()),
      execution_time_ms: 0,
    }
  }

  pub fn with_execution_time(mut self, execution_time_ms: u64) -> Self {
    self.execution_time_ms = execution_time_ms;
    self
  }
}

impl From<Result<Params, HandlerError>> for ActionResult {
  fn from(result: Result<Params, HandlerError>) -> Self {
    match result {
      Ok(data) => ActionResult::ok(data),
      Err(e) => ActionResult::failure(e.to_string()),
    }
  }
}

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A locked step ready for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
  pub step_number: u32,
  pub name: String,
  pub handler_name: String,
  pub parameters: serde_json::Map<String, serde_json::Value>,
  pub output_mapping: BTreeMap<String, String>,
  pub condition: Option<String>,
  /// Explicit dependencies, sorted and deduplicated.
  pub depends_on: Vec<u32>,
  pub retry_count: u32,
  pub retry_delay_ms: u64,
  pub timeout_ms: u64,
  pub stop_on_error: bool,
}

impl Step {
  /// Attempts allowed: the first try plus retries.
  pub fn max_attempts(&self) -> u32 {
    self.retry_count.saturating_add(1)
  }

  pub fn retry_delay(&self) -> Duration {
    Duration::from_millis(self.retry_delay_ms)
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }
}

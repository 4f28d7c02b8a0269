use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::step::Step;

/// A locked workflow ready for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
  pub workflow_id: String,
  pub name: String,
  pub version: String,
  /// Steps keyed and ordered by step number.
  pub steps: BTreeMap<u32, Step>,
}

impl Workflow {
  /// Build the graph structure for scheduling.
  pub fn graph(&self) -> Graph {
    Graph::new(&self.steps)
  }

  /// Get a step by number.
  pub fn get_step(&self, step_number: u32) -> Option<&Step> {
    self.steps.get(&step_number)
  }
}

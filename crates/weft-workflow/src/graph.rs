use std::collections::{BTreeMap, HashMap};

use crate::step::Step;

/// Why one step waits for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
  /// Listed in `depends_on`; the upstream step must succeed.
  Explicit,
  /// Implied by step order for a step with no `depends_on`: it waits for
  /// every lower-numbered step, each of which only has to finish.
  Sequential,
}

/// An incoming edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
  pub step_number: u32,
  pub kind: DependencyKind,
}

/// Dependency graph over step numbers.
#[derive(Debug, Clone)]
pub struct Graph {
  /// step -> steps it waits for.
  upstream: BTreeMap<u32, Vec<Dependency>>,
  /// step -> steps waiting for it.
  downstream: BTreeMap<u32, Vec<u32>>,
}

impl Graph {
  /// Build the graph from steps keyed by number.
  ///
  /// Explicit dependencies on unknown steps are dropped; the resolver and
  /// the runtime reject them before anything runs.
  pub fn new(steps: &BTreeMap<u32, Step>) -> Self {
    let mut upstream: BTreeMap<u32, Vec<Dependency>> = BTreeMap::new();
    let mut downstream: BTreeMap<u32, Vec<u32>> = BTreeMap::new();

    for step_number in steps.keys() {
      upstream.entry(*step_number).or_default();
      downstream.entry(*step_number).or_default();
    }

    let mut earlier: Vec<u32> = Vec::new();
    for (step_number, step) in steps {
      let edges: Vec<Dependency> = if step.depends_on.is_empty() {
        earlier
          .iter()
          .map(|prev| Dependency {
            step_number: *prev,
            kind: DependencyKind::Sequential,
          })
          .collect()
      } else {
        step
          .depends_on
          .iter()
          .filter(|dep| steps.contains_key(dep))
          .map(|dep| Dependency {
            step_number: *dep,
            kind: DependencyKind::Explicit,
          })
          .collect()
      };

      for edge in &edges {
        downstream
          .entry(edge.step_number)
          .or_default()
          .push(*step_number);
      }
      upstream.insert(*step_number, edges);
      earlier.push(*step_number);
    }

    Self {
      upstream,
      downstream,
    }
  }

  /// Steps this step waits for.
  pub fn upstream(&self, step_number: u32) -> &[Dependency] {
    self
      .upstream
      .get(&step_number)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Steps waiting for this step.
  pub fn downstream(&self, step_number: u32) -> &[u32] {
    self
      .downstream
      .get(&step_number)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Find a cycle, if any, returned as the steps along it in edge order
  /// with the first step repeated at the end.
  pub fn find_cycle(&self) -> Option<Vec<u32>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
      White,
      Gray,
      Black,
    }

    fn dfs(
      node: u32,
      graph: &Graph,
      color: &mut HashMap<u32, Color>,
      path: &mut Vec<u32>,
    ) -> Option<Vec<u32>> {
      color.insert(node, Color::Gray);
      path.push(node);

      for &next in graph.downstream(node) {
        match color.get(&next).copied().unwrap_or(Color::White) {
          Color::Gray => {
            // Back edge: the cycle is the path suffix starting at `next`.
            let start = path.iter().position(|&n| n == next).unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(next);
            return Some(cycle);
          }
          Color::White => {
            if let Some(cycle) = dfs(next, graph, color, path) {
              return Some(cycle);
            }
          }
          Color::Black => {}
        }
      }

      path.pop();
      color.insert(node, Color::Black);
      None
    }

    let mut color: HashMap<u32, Color> =
      self.upstream.keys().map(|n| (*n, Color::White)).collect();
    let mut path = Vec::new();

    for &node in self.upstream.keys() {
      if color.get(&node) == Some(&Color::White)
        && let Some(cycle) = dfs(node, self, &mut color, &mut path)
      {
        return Some(cycle);
      }
    }

    None
  }
}

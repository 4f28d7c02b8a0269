use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use weft_handler::Params;

/// The execution context shared by every step of one run.
///
/// Steps read a snapshot before running and write their mapped outputs in a
/// single write-locked section, so a mapping is never observed half applied.
#[derive(Debug, Clone, Default)]
pub struct SharedContext {
  inner: Arc<RwLock<Params>>,
}

impl SharedContext {
  pub fn new(initial: Params) -> Self {
    Self {
      inner: Arc::new(RwLock::new(initial)),
    }
  }

  /// Copy of the current context.
  pub async fn snapshot(&self) -> Params {
    self.inner.read().await.clone()
  }

  /// Write `data[output_key]` to `context[context_key]` for every mapping
  /// whose output key is present. Returns the context keys written.
  pub async fn apply_mapping(
    &self,
    mapping: &BTreeMap<String, String>,
    data: &Params,
  ) -> Vec<String> {
    if mapping.is_empty() {
      return Vec::new();
    }

    let mut context = self.inner.write().await;
    let mut written = Vec::new();
    for (output_key, context_key) in mapping {
      if let Some(value) = data.get(output_key) {
        context.insert(context_key.clone(), value.clone());
        written.push(context_key.clone());
      }
    }
    written
  }
}

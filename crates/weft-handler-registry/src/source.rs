use std::sync::Arc;

use weft_handler::Handler;

use crate::error::SourceError;
use crate::registry::Constructor;

/// Supplies handler constructors to [`crate::HandlerRegistry::discover`].
pub trait HandlerSource: Send + Sync {
  /// Name used in logs and discovery reports.
  fn name(&self) -> &str;

  /// The handlers this source provides.
  fn handlers(&self) -> Result<Vec<Constructor>, SourceError>;
}

/// A fixed list of handler constructors.
pub struct StaticSource {
  name: String,
  constructors: Vec<Constructor>,
}

impl StaticSource {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      constructors: Vec::new(),
    }
  }

  /// Add a handler type.
  pub fn with<F, H>(mut self, constructor: F) -> Self
  where
    F: Fn() -> H + Send + Sync + 'static,
    H: Handler + 'static,
  {
    self
      .constructors
      .push(Arc::new(move || Box::new(constructor()) as Box<dyn Handler>));
    self
  }
}

impl HandlerSource for StaticSource {
  fn name(&self) -> &str {
    &self.name
  }

  fn handlers(&self) -> Result<Vec<Constructor>, SourceError> {
    Ok(self.constructors.clone())
  }
}

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{info, warn};
use weft_handler::{Handler, HandlerSchema, normalize_extension};

use crate::error::RegistryError;
use crate::source::HandlerSource;

/// Builds a fresh handler instance.
pub type Constructor = Arc<dyn Fn() -> Box<dyn Handler> + Send + Sync>;

/// A registered handler: its schema and how to build it.
#[derive(Clone)]
pub struct RegisteredHandler {
  schema: Arc<HandlerSchema>,
  constructor: Constructor,
}

impl RegisteredHandler {
  pub fn schema(&self) -> &HandlerSchema {
    &self.schema
  }

  pub fn name(&self) -> &str {
    &self.schema.name
  }

  /// Build a new instance to invoke.
  pub fn instantiate(&self) -> Box<dyn Handler> {
    (self.constructor)()
  }
}

impl fmt::Debug for RegisteredHandler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RegisteredHandler")
      .field("name", &self.schema.name)
      .field("category", &self.schema.category)
      .finish_non_exhaustive()
  }
}

/// A handler or source that could not be registered during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryFailure {
  pub source: String,
  pub error: String,
}

/// Outcome of [`HandlerRegistry::discover`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
  /// Names registered, in registration order.
  pub registered: Vec<String>,
  pub failed: Vec<DiscoveryFailure>,
}

/// Catalog of handlers indexed by name, category, and file extension.
///
/// Mutation needs `&mut self`; once built, wrap it in an `Arc` to share it
/// for concurrent, lock-free reads.
#[derive(Default)]
pub struct HandlerRegistry {
  handlers: HashMap<String, RegisteredHandler>,
  categories: BTreeMap<String, BTreeSet<String>>,
  file_types: HashMap<String, String>,
}

impl HandlerRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a handler type through its constructor.
  ///
  /// A later registration under the same name replaces the earlier one.
  pub fn register<F, H>(&mut self, constructor: F) -> Result<Arc<HandlerSchema>, RegistryError>
  where
    F: Fn() -> H + Send + Sync + 'static,
    H: Handler + 'static,
  {
    self.register_constructor(Arc::new(move || Box::new(constructor()) as Box<dyn Handler>))
  }

  /// Register a type-erased constructor.
  ///
  /// The schema is computed from a probe instance, with the instance's
  /// supported file types merged in.
  pub fn register_constructor(
    &mut self,
    constructor: Constructor,
  ) -> Result<Arc<HandlerSchema>, RegistryError> {
    let probe = catch_unwind(AssertUnwindSafe(|| constructor()))
      .map_err(|_| RegistryError::ConstructorPanicked)?;
    let schema = probe.schema().file_types(probe.supported_file_types());
    schema.check()?;

    let schema = Arc::new(schema);
    let name = schema.name.clone();

    if let Some(previous) = self.handlers.remove(&name) {
      warn!(handler = %name, "replacing previously registered handler");
      self.unindex(&previous.schema);
    }

    self
      .categories
      .entry(schema.category.clone())
      .or_default()
      .insert(name.clone());
    for extension in &schema.supported_file_types {
      if let Some(other) = self.file_types.insert(extension.clone(), name.clone())
        && other != name
      {
        warn!(extension = %extension, previous = %other, handler = %name, "file type reassigned");
      }
    }

    info!(
      handler = %name,
      category = %schema.category,
      file_types = schema.supported_file_types.len(),
      "handler registered"
    );

    self.handlers.insert(
      name,
      RegisteredHandler {
        schema: schema.clone(),
        constructor,
      },
    );

    Ok(schema)
  }

  /// Drop index entries that point at a replaced handler.
  fn unindex(&mut self, schema: &HandlerSchema) {
    if let Some(names) = self.categories.get_mut(&schema.category) {
      names.remove(&schema.name);
      if names.is_empty() {
        self.categories.remove(&schema.category);
      }
    }
    self.file_types.retain(|_, owner| owner != &schema.name);
  }

  /// Register every handler each source declares.
  ///
  /// A source that fails to enumerate, or a handler that fails to register,
  /// is logged and recorded in the report; discovery carries on with the rest.
  pub fn discover(&mut self, sources: &[Box<dyn HandlerSource>]) -> DiscoveryReport {
    let mut report = DiscoveryReport::default();

    for source in sources {
      let constructors = match source.handlers() {
        Ok(constructors) => constructors,
        Err(e) => {
          warn!(source = %source.name(), error = %e, "handler source failed, skipping");
          report.failed.push(DiscoveryFailure {
            source: source.name().to_string(),
            error: e.to_string(),
          });
          continue;
        }
      };

      for constructor in constructors {
        match self.register_constructor(constructor) {
          Ok(schema) => report.registered.push(schema.name.clone()),
          Err(e) => {
            warn!(source = %source.name(), error = %e, "handler registration failed, skipping");
            report.failed.push(DiscoveryFailure {
              source: source.name().to_string(),
              error: e.to_string(),
            });
          }
        }
      }
    }

    info!(
      registered = report.registered.len(),
      failed = report.failed.len(),
      "handler discovery finished"
    );

    report
  }

  pub fn lookup_by_name(&self, name: &str) -> Option<&RegisteredHandler> {
    self.handlers.get(name)
  }

  /// Find the handler for a file extension, with or without the leading dot.
  pub fn lookup_by_file_extension(&self, extension: &str) -> Option<&RegisteredHandler> {
    self
      .file_types
      .get(&normalize_extension(extension))
      .and_then(|name| self.handlers.get(name))
  }

  pub fn schema(&self, name: &str) -> Option<&HandlerSchema> {
    self.handlers.get(name).map(|h| h.schema())
  }

  /// Schemas ordered by name, optionally restricted to one category.
  pub fn list(&self, category: Option<&str>) -> Vec<&HandlerSchema> {
    let mut schemas: Vec<&HandlerSchema> = match category {
      Some(category) => self
        .categories
        .get(category)
        .into_iter()
        .flatten()
        .filter_map(|name| self.schema(name))
        .collect(),
      None => self.handlers.values().map(|h| h.schema()).collect(),
    };
    schemas.sort_by(|a, b| a.name.cmp(&b.name));
    schemas
  }

  /// Category names, sorted.
  pub fn categories(&self) -> Vec<&str> {
    self.categories.keys().map(String::as_str).collect()
  }

  pub fn len(&self) -> usize {
    self.handlers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.handlers.is_empty()
  }

  /// Number of indexed file extensions.
  pub fn file_type_count(&self) -> usize {
    self.file_types.len()
  }
}

impl fmt::Debug for HandlerRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut names: Vec<&String> = self.handlers.keys().collect();
    names.sort();
    f.debug_struct("HandlerRegistry")
      .field("handlers", &names)
      .field("categories", &self.categories.keys().collect::<Vec<_>>())
      .finish()
  }
}

//! Integration tests for registration, discovery, and lookup.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use weft_handler::{
  ActionResult, Handler, HandlerSchema, ParameterSchema, ParameterType, Params, SchemaError,
};
use weft_handler_registry::{
  Constructor, HandlerRegistry, HandlerSource, RegistryError, SourceError, StaticSource,
};

/// A handler whose schema is fully configurable.
struct Configurable {
  schema: HandlerSchema,
  file_types: Vec<String>,
}

#[async_trait]
impl Handler for Configurable {
  fn schema(&self) -> HandlerSchema {
    self.schema.clone()
  }

  async fn execute(&self, params: Params) -> ActionResult {
    ActionResult::ok(params)
  }

  fn supported_file_types(&self) -> Vec<String> {
    self.file_types.clone()
  }
}

fn handler(name: &str, category: &str) -> impl Fn() -> Configurable + Send + Sync + 'static {
  let name = name.to_string();
  let category = category.to_string();
  move || Configurable {
    schema: HandlerSchema::new(name.clone())
      .category(category.clone())
      .input(ParameterSchema::new("text", ParameterType::String)),
    file_types: Vec::new(),
  }
}

fn file_handler(
  name: &str,
  extensions: &[&str],
) -> impl Fn() -> Configurable + Send + Sync + 'static {
  let name = name.to_string();
  let extensions: Vec<String> = extensions.iter().map(|e| e.to_string()).collect();
  move || Configurable {
    schema: HandlerSchema::new(name.clone()).category("file"),
    file_types: extensions.clone(),
  }
}

struct BrokenSource;

impl HandlerSource for BrokenSource {
  fn name(&self) -> &str {
    "broken"
  }

  fn handlers(&self) -> Result<Vec<Constructor>, SourceError> {
    Err(SourceError {
      source_name: "broken".to_string(),
      message: "module failed to load".to_string(),
    })
  }
}

#[test]
fn test_register_and_lookup() {
  let mut registry = HandlerRegistry::new();
  let schema = registry.register(handler("echo", "general")).unwrap();

  assert_eq!(schema.name, "echo");
  assert_eq!(schema.display_name, "Echo");
  assert_eq!(registry.len(), 1);

  let found = registry.lookup_by_name("echo").unwrap();
  assert_eq!(found.schema().category, "general");
  assert!(registry.lookup_by_name("missing").is_none());
}

#[test]
fn test_last_registration_wins() {
  let mut registry = HandlerRegistry::new();
  registry.register(handler("x", "first")).unwrap();
  registry.register(handler("x", "second")).unwrap();

  assert_eq!(registry.len(), 1);
  assert_eq!(registry.lookup_by_name("x").unwrap().schema().category, "second");
  assert_eq!(registry.categories(), vec!["second"]);
  assert!(registry.list(Some("first")).is_empty());
}

#[test]
fn test_replacement_drops_stale_file_types() {
  let mut registry = HandlerRegistry::new();
  registry.register(file_handler("doc", &[".pdf", ".docx"])).unwrap();
  registry.register(file_handler("doc", &[".pdf"])).unwrap();

  assert!(registry.lookup_by_file_extension(".pdf").is_some());
  assert!(registry.lookup_by_file_extension(".docx").is_none());
  assert_eq!(registry.file_type_count(), 1);
}

#[test]
fn test_empty_name_rejected() {
  let mut registry = HandlerRegistry::new();
  let err = registry.register(handler("", "general")).unwrap_err();

  assert!(matches!(err, RegistryError::InvalidSchema(SchemaError::EmptyName)));
  assert!(registry.is_empty());
}

#[test]
fn test_file_extension_lookup_is_case_insensitive() {
  let mut registry = HandlerRegistry::new();
  registry.register(file_handler("process_pdf", &[".PDF"])).unwrap();
  registry.register(file_handler("process_image", &["jpg", ".png"])).unwrap();

  assert_eq!(registry.lookup_by_file_extension(".pdf").unwrap().name(), "process_pdf");
  assert_eq!(registry.lookup_by_file_extension("PDF").unwrap().name(), "process_pdf");
  assert_eq!(registry.lookup_by_file_extension(".JPG").unwrap().name(), "process_image");
  assert!(registry.lookup_by_file_extension(".gif").is_none());

  let schema = registry.schema("process_image").unwrap();
  assert!(schema.supports_file_type(".png"));
}

#[test]
fn test_list_ordered_and_filtered() {
  let mut registry = HandlerRegistry::new();
  registry.register(handler("send_email", "integration")).unwrap();
  registry.register(handler("analyze_text", "ai")).unwrap();
  registry.register(handler("echo", "general")).unwrap();
  registry.register(handler("database_query", "data")).unwrap();

  let all: Vec<&str> = registry.list(None).iter().map(|s| s.name.as_str()).collect();
  assert_eq!(all, vec!["analyze_text", "database_query", "echo", "send_email"]);

  let ai: Vec<&str> = registry.list(Some("ai")).iter().map(|s| s.name.as_str()).collect();
  assert_eq!(ai, vec!["analyze_text"]);

  assert!(registry.list(Some("unknown")).is_empty());
  assert_eq!(registry.categories(), vec!["ai", "data", "general", "integration"]);
}

#[test]
fn test_discover_skips_failed_sources() {
  let sources: Vec<Box<dyn HandlerSource>> = vec![
    Box::new(StaticSource::new("core").with(handler("echo", "general"))),
    Box::new(BrokenSource),
    Box::new(
      StaticSource::new("extra")
        .with(handler("", "general"))
        .with(handler("analyze_text", "ai")),
    ),
  ];

  let mut registry = HandlerRegistry::new();
  let report = registry.discover(&sources);

  assert_eq!(report.registered, vec!["echo", "analyze_text"]);
  assert_eq!(report.failed.len(), 2);
  assert_eq!(report.failed[0].source, "broken");
  assert!(report.failed[0].error.contains("module failed to load"));
  assert_eq!(report.failed[1].source, "extra");
  assert_eq!(registry.len(), 2);
}

#[test]
fn test_discover_panicking_constructor() {
  let source = StaticSource::new("flaky")
    .with(|| -> Configurable { panic!("boom") })
    .with(handler("echo", "general"));
  let sources: Vec<Box<dyn HandlerSource>> = vec![Box::new(source)];

  let mut registry = HandlerRegistry::new();
  let report = registry.discover(&sources);

  assert_eq!(report.registered, vec!["echo"]);
  assert_eq!(report.failed.len(), 1);
}

#[tokio::test]
async fn test_instantiate_and_execute() {
  let mut registry = HandlerRegistry::new();
  registry.register(handler("echo", "general")).unwrap();
  let registry = Arc::new(registry);

  let handler = registry.lookup_by_name("echo").unwrap().instantiate();
  let params = json!({ "text": "hi" }).as_object().cloned().unwrap();
  let result = handler.execute(params).await;

  assert!(result.success);
  assert_eq!(result.data.unwrap()["text"], "hi");
}

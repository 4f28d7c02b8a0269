use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use weft_handler::{
  ActionResult, Handler, HandlerError, HandlerSchema, ParameterSchema, ParameterType, Params,
  optional_str, require_str,
};

use crate::into_params;

const SIMULATED_WORK: Duration = Duration::from_millis(200);
const PAGE_COUNT: u32 = 10;

/// Extracts text from, splits, or inspects PDF files (simulated).
pub struct ProcessPdfHandler;

impl ProcessPdfHandler {
  async fn run(&self, params: Params) -> Result<Params, HandlerError> {
    let file_path = require_str(&params, "file_path")?;
    let operation = optional_str(&params, "operation")?.unwrap_or("extract_text");

    tokio::time::sleep(SIMULATED_WORK).await;

    let data = match operation {
      "extract_text" => json!({
        "extracted_text": format!("Sample text extracted from {}", file_path),
        "page_count": PAGE_COUNT,
        "metadata": { "title": "Sample Document", "author": "Unknown" },
      }),
      "split_pages" => json!({
        "split_files": (1..=PAGE_COUNT)
          .map(|i| format!("/splits/page_{}.pdf", i))
          .collect::<Vec<_>>(),
        "page_count": PAGE_COUNT,
      }),
      "get_info" => json!({
        "page_count": PAGE_COUNT,
        "metadata": {
          "title": "Sample Document",
          "author": "Unknown",
          "file_size": "2.5 MB",
        },
      }),
      other => {
        return Err(HandlerError::invalid(
          "operation",
          format!("unsupported operation '{}'", other),
        ));
      }
    };

    Ok(into_params(data))
  }
}

#[async_trait]
impl Handler for ProcessPdfHandler {
  fn schema(&self) -> HandlerSchema {
    HandlerSchema::new("process_pdf")
      .display_name("PDF Processor")
      .description("Extract text, split pages, or read metadata from PDF files")
      .category("file")
      .tag("pdf")
      .tag("text")
      .tag("extraction")
      .input(
        ParameterSchema::new("file_path", ParameterType::FilePath)
          .description("Path to the PDF file")
          .example("/uploads/report.pdf"),
      )
      .input(
        ParameterSchema::new("operation", ParameterType::String)
          .description("Operation to perform")
          .choices(["extract_text", "split_pages", "get_info"])
          .default_value("extract_text"),
      )
      .input(
        ParameterSchema::new("page_range", ParameterType::String)
          .description("Page range, e.g. '1-5' or 'all'")
          .default_value("all"),
      )
      .input(
        ParameterSchema::new("output_format", ParameterType::String)
          .description("Output format for extracted text")
          .choices(["plain", "html", "json"])
          .default_value("plain"),
      )
      .output(ParameterSchema::new("extracted_text", ParameterType::String))
      .output(ParameterSchema::new("page_count", ParameterType::Integer))
      .output(ParameterSchema::new("split_files", ParameterType::Array))
      .output(ParameterSchema::new("metadata", ParameterType::Object))
  }

  async fn execute(&self, params: Params) -> ActionResult {
    self.run(params).await.into()
  }

  fn supported_file_types(&self) -> Vec<String> {
    vec![".pdf".to_string()]
  }
}

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use weft_handler::{
  ActionResult, Handler, HandlerError, HandlerSchema, ParameterSchema, ParameterType, Params,
  optional_i64, optional_str, require_str,
};

use crate::into_params;

const SIMULATED_WORK: Duration = Duration::from_millis(100);

/// Resizes, converts, compresses, or rotates images (simulated).
pub struct ProcessImageHandler;

impl ProcessImageHandler {
  async fn run(&self, params: Params) -> Result<Params, HandlerError> {
    let file_path = require_str(&params, "file_path")?;
    let operation = optional_str(&params, "operation")?.unwrap_or("resize");
    let width = optional_i64(&params, "width")?.unwrap_or(800);
    let height = optional_i64(&params, "height")?.unwrap_or(600);
    let format = optional_str(&params, "format")?.unwrap_or("JPEG");

    tokio::time::sleep(SIMULATED_WORK).await;

    let file_name = file_path.rsplit('/').next().unwrap_or(file_path);
    let data = match operation {
      "resize" => json!({
        "processed_file": format!("/processed/{}", file_name),
        "original_size": { "width": 1920, "height": 1080 },
        "new_size": { "width": width, "height": height },
        "file_size_bytes": 256_000,
      }),
      "convert" => {
        let stem = file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem);
        json!({
          "processed_file": format!("/processed/{}.{}", stem, format.to_lowercase()),
          "original_size": { "width": 1920, "height": 1080 },
          "new_size": { "width": 1920, "height": 1080 },
          "file_size_bytes": 512_000,
        })
      }
      "compress" | "rotate" => json!({
        "processed_file": file_path,
        "message": format!("applied {} operation", operation),
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
impl Handler for ProcessImageHandler {
  fn schema(&self) -> HandlerSchema {
    HandlerSchema::new("process_image")
      .display_name("Image Processor")
      .description("Resize, convert, compress, or rotate images")
      .category("file")
      .tag("image")
      .tag("resize")
      .tag("convert")
      .input(
        ParameterSchema::new("file_path", ParameterType::FilePath)
          .description("Path to the image file")
          .example("/uploads/image.jpg"),
      )
      .input(
        ParameterSchema::new("operation", ParameterType::String)
          .choices(["resize", "convert", "compress", "rotate"])
          .default_value("resize"),
      )
      .input(
        ParameterSchema::new("width", ParameterType::Integer)
          .description("Target width in pixels")
          .default_value(800)
          .range(Some(1.0), Some(5000.0)),
      )
      .input(
        ParameterSchema::new("height", ParameterType::Integer)
          .description("Target height in pixels")
          .default_value(600)
          .range(Some(1.0), Some(5000.0)),
      )
      .input(
        ParameterSchema::new("quality", ParameterType::Integer)
          .description("JPEG quality")
          .default_value(85)
          .range(Some(1.0), Some(100.0)),
      )
      .input(
        ParameterSchema::new("format", ParameterType::String)
          .choices(["JPEG", "PNG", "WEBP"])
          .default_value("JPEG"),
      )
      .output(ParameterSchema::new("processed_file", ParameterType::FilePath))
      .output(ParameterSchema::new("original_size", ParameterType::Object))
      .output(ParameterSchema::new("new_size", ParameterType::Object))
      .output(ParameterSchema::new("file_size_bytes", ParameterType::Integer))
  }

  async fn execute(&self, params: Params) -> ActionResult {
    self.run(params).await.into()
  }

  fn supported_file_types(&self) -> Vec<String> {
    [".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp"]
      .into_iter()
      .map(String::from)
      .collect()
  }
}

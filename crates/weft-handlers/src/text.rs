use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use weft_handler::{
  ActionResult, Handler, HandlerError, HandlerSchema, ParameterSchema, ParameterType, Params,
  optional_f64, optional_str, require_str,
};

use crate::into_params;

const SIMULATED_WORK: Duration = Duration::from_millis(800);

/// Sentiment, keyword, and entity analysis (simulated).
pub struct AnalyzeTextHandler;

impl AnalyzeTextHandler {
  async fn run(&self, params: Params) -> Result<Params, HandlerError> {
    let text = require_str(&params, "text")?;
    let analysis_type = optional_str(&params, "analysis_type")?.unwrap_or("all");
    let language = optional_str(&params, "language")?.unwrap_or("en");
    let threshold = optional_f64(&params, "confidence_threshold")?.unwrap_or(0.7);

    if !(0.0..=1.0).contains(&threshold) {
      return Err(HandlerError::invalid(
        "confidence_threshold",
        "must be between 0 and 1",
      ));
    }

    tokio::time::sleep(SIMULATED_WORK).await;

    let mut data = into_params(json!({
      "language_detected": language,
      "confidence_score": 0.89,
      "word_count": text.split_whitespace().count(),
      "character_count": text.chars().count(),
    }));

    let wants = |kind: &str| analysis_type == "all" || analysis_type == kind;
    if wants("sentiment") {
      data.insert(
        "sentiment".to_string(),
        json!({ "label": "positive", "score": 0.85, "confidence": 0.92 }),
      );
    }
    if wants("keywords") {
      let keywords: Vec<String> = text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| w.chars().count() > 4)
        .take(5)
        .collect();
      data.insert("keywords".to_string(), json!(keywords));
    }
    if wants("entities") {
      let entities: Vec<serde_json::Value> = text
        .split_whitespace()
        .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
        .map(|w| json!({ "text": w, "type": "UNKNOWN", "confidence": threshold }))
        .collect();
      data.insert("entities".to_string(), json!(entities));
    }

    Ok(data)
  }
}

#[async_trait]
impl Handler for AnalyzeTextHandler {
  fn schema(&self) -> HandlerSchema {
    HandlerSchema::new("analyze_text")
      .display_name("Text Analyzer")
      .description("Analyze text for sentiment, keywords, and entities")
      .category("ai")
      .tag("nlp")
      .tag("sentiment")
      .input(ParameterSchema::new("text", ParameterType::String).description("Text to analyze"))
      .input(
        ParameterSchema::new("analysis_type", ParameterType::String)
          .choices(["sentiment", "keywords", "entities", "all"])
          .default_value("all"),
      )
      .input(
        ParameterSchema::new("language", ParameterType::String)
          .choices(["en", "vi", "fr", "es"])
          .default_value("en"),
      )
      .input(
        ParameterSchema::new("confidence_threshold", ParameterType::Float)
          .description("Minimum confidence score")
          .default_value(0.7)
          .range(Some(0.0), Some(1.0)),
      )
      .output(ParameterSchema::new("sentiment", ParameterType::Object))
      .output(ParameterSchema::new("keywords", ParameterType::Array))
      .output(ParameterSchema::new("entities", ParameterType::Array))
      .output(ParameterSchema::new("language_detected", ParameterType::String))
      .output(ParameterSchema::new("confidence_score", ParameterType::Float))
  }

  async fn execute(&self, params: Params) -> ActionResult {
    self.run(params).await.into()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test(start_paused = true)]
  async fn test_keywords_only() {
    let result = AnalyzeTextHandler
      .execute(into_params(json!({
        "text": "Rust makes concurrent programming approachable",
        "analysis_type": "keywords"
      })))
      .await;

    let data = result.data.unwrap();
    assert_eq!(data["word_count"], 5);
    assert_eq!(
      data["keywords"],
      json!(["makes", "concurrent", "programming", "approachable"])
    );
    assert!(!data.contains_key("sentiment"));
    assert!(!data.contains_key("entities"));
  }

  #[tokio::test(start_paused = true)]
  async fn test_threshold_out_of_range() {
    let result = AnalyzeTextHandler
      .execute(into_params(json!({ "text": "x", "confidence_threshold": 1.5 })))
      .await;

    assert!(!result.success);
  }
}

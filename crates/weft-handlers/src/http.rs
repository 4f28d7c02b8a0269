use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::json;
use tracing::debug;
use weft_handler::{
  ActionResult, Handler, HandlerError, HandlerSchema, ParameterSchema, ParameterType, Params,
  optional_i64, optional_str, require_str,
};

use crate::into_params;

/// Performs an HTTP request and returns status, headers, and body.
pub struct HttpRequestHandler;

impl HttpRequestHandler {
  async fn run(&self, params: Params) -> Result<Params, HandlerError> {
    let url = require_str(&params, "url")?;
    let method = parse_method(optional_str(&params, "method")?.unwrap_or("GET"))?;
    let timeout = optional_i64(&params, "timeout_seconds")?.unwrap_or(30).max(1) as u64;

    let client = Client::builder()
      .timeout(Duration::from_secs(timeout))
      .build()
      .map_err(|e| HandlerError::failed(format!("failed to build HTTP client: {}", e)))?;

    let mut request = client.request(method, url);

    if let Some(headers) = params.get("headers").and_then(|h| h.as_object()) {
      for (key, value) in headers {
        let value = match value {
          serde_json::Value::String(s) => s.clone(),
          other => other.to_string(),
        };
        request = request.header(key, value);
      }
    }

    if let Some(body) = params.get("body").filter(|b| !b.is_null()) {
      request = request.json(body);
    }

    debug!(url = %url, "sending http request");

    let response = request
      .send()
      .await
      .map_err(|e| HandlerError::failed(format!("request failed: {}", e)))?;

    let status = response.status().as_u16();
    let headers: HashMap<String, String> = response
      .headers()
      .iter()
      .filter_map(|(k, v)| {
        v.to_str()
          .ok()
          .map(|val| (k.as_str().to_string(), val.to_string()))
      })
      .collect();

    let body = response
      .text()
      .await
      .map_err(|e| HandlerError::failed(format!("failed to read response body: {}", e)))?;

    // JSON bodies are returned structured, anything else as a string.
    let body = serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body));

    Ok(into_params(json!({
      "status": status,
      "headers": headers,
      "body": body,
    })))
  }
}

fn parse_method(method: &str) -> Result<Method, HandlerError> {
  match method.to_uppercase().as_str() {
    "GET" => Ok(Method::GET),
    "POST" => Ok(Method::POST),
    "PUT" => Ok(Method::PUT),
    "DELETE" => Ok(Method::DELETE),
    "PATCH" => Ok(Method::PATCH),
    "HEAD" => Ok(Method::HEAD),
    "OPTIONS" => Ok(Method::OPTIONS),
    _ => Err(HandlerError::invalid(
      "method",
      format!("unsupported HTTP method: {}", method),
    )),
  }
}

#[async_trait]
impl Handler for HttpRequestHandler {
  fn schema(&self) -> HandlerSchema {
    HandlerSchema::new("http_request")
      .display_name("HTTP Request")
      .description("Call an HTTP endpoint")
      .category("data")
      .tag("http")
      .tag("api")
      .input(
        ParameterSchema::new("url", ParameterType::Url)
          .description("Request URL")
          .example("https://api.example.com/items"),
      )
      .input(
        ParameterSchema::new("method", ParameterType::String)
          .choices(["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"])
          .default_value("GET"),
      )
      .input(ParameterSchema::new("headers", ParameterType::Object).optional())
      .input(ParameterSchema::new("body", ParameterType::Object).optional())
      .input(
        ParameterSchema::new("timeout_seconds", ParameterType::Integer)
          .default_value(30)
          .range(Some(1.0), Some(300.0)),
      )
      .output(ParameterSchema::new("status", ParameterType::Integer))
      .output(ParameterSchema::new("headers", ParameterType::Object))
      .output(ParameterSchema::new("body", ParameterType::Object))
  }

  async fn execute(&self, params: Params) -> ActionResult {
    self.run(params).await.into()
  }
}

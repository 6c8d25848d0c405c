//! Model provider client: the trait the core dispatches against, plus the
//! Anthropic HTTP adapter.
//!
//! The adapter is deliberately thin. Retries, cancellation, and parsing live
//! in the dispatcher; this layer only speaks HTTP and maps failures onto
//! `LlmError`.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::models::*;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_API_BASE: &str = "https://api.anthropic.com";

/// Client interface for the model provider.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single synchronous message request.
    async fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse, LlmError>;

    /// Submit a message batch; returns the provider batch id.
    async fn create_batch(&self, items: &[BatchItemRequest]) -> Result<String, LlmError>;

    /// Fetch the current status of a batch.
    async fn poll_batch(&self, batch_id: &str) -> Result<BatchStatus, LlmError>;

    /// Fetch all results for a terminal batch.
    async fn get_batch_results(&self, batch_id: &str) -> Result<Vec<BatchResultItem>, LlmError>;
}

// ============================================================================
// Anthropic adapter
// ============================================================================

pub struct AnthropicClient {
    http_client: Client,
    api_base: String,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base(api_key, DEFAULT_API_BASE)
    }

    pub fn with_base(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.api_base, path))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(LlmError::RateLimited(retry_after));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::ApiError(format!("API error {}: {}", status, error_text)));
        }
        Ok(response)
    }

    fn map_transport_error(e: reqwest::Error) -> LlmError {
        if e.is_timeout() { LlmError::Timeout(120) } else { LlmError::ApiError(e.to_string()) }
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse, LlmError> {
        tracing::debug!(model = %request.model, "calling messages API");

        let response = self
            .request(reqwest::Method::POST, "/v1/messages")
            .json(request)
            .send()
            .await
            .map_err(Self::map_transport_error)?;
        let response = Self::check_status(response).await?;

        response
            .json::<MessageResponse>()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))
    }

    async fn create_batch(&self, items: &[BatchItemRequest]) -> Result<String, LlmError> {
        #[derive(serde::Serialize)]
        struct BatchCreateRequest<'a> {
            requests: &'a [BatchItemRequest],
        }

        #[derive(serde::Deserialize)]
        struct BatchCreateResponse {
            id: String,
        }

        tracing::debug!(items = items.len(), "submitting message batch");

        let response = self
            .request(reqwest::Method::POST, "/v1/messages/batches")
            .json(&BatchCreateRequest { requests: items })
            .send()
            .await
            .map_err(Self::map_transport_error)?;
        let response = Self::check_status(response).await?;

        let created: BatchCreateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;
        Ok(created.id)
    }

    async fn poll_batch(&self, batch_id: &str) -> Result<BatchStatus, LlmError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/v1/messages/batches/{}", batch_id))
            .send()
            .await
            .map_err(Self::map_transport_error)?;
        let response = Self::check_status(response).await?;

        response
            .json::<BatchStatus>()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))
    }

    async fn get_batch_results(&self, batch_id: &str) -> Result<Vec<BatchResultItem>, LlmError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/v1/messages/batches/{}/results", batch_id))
            .send()
            .await
            .map_err(Self::map_transport_error)?;
        let response = Self::check_status(response).await?;

        let body = response
            .text()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        Ok(body.lines().filter(|l| !l.trim().is_empty()).filter_map(parse_result_line).collect())
    }
}

/// Parse one JSONL result row: `{"custom_id": ..., "result": {"type":
/// "succeeded", "message": {...}}}` or an errored/expired variant.
fn parse_result_line(line: &str) -> Option<BatchResultItem> {
    let row: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("unparseable batch result line: {}", e);
            return None;
        },
    };

    let custom_id = row.get("custom_id")?.as_str()?.to_string();
    let result = row.get("result")?;
    let result_type = result.get("type").and_then(|t| t.as_str()).unwrap_or("errored");

    if result_type == "succeeded" {
        let message = result.get("message").cloned()?;
        match serde_json::from_value::<MessageResponse>(message) {
            Ok(response) => {
                Some(BatchResultItem { custom_id, response: Some(response), error: None })
            },
            Err(e) => Some(BatchResultItem {
                custom_id,
                response: None,
                error: Some(format!("malformed message payload: {}", e)),
            }),
        }
    } else {
        let detail = result
            .get("error")
            .map(|e| e.to_string())
            .unwrap_or_else(|| result_type.to_string());
        Some(BatchResultItem { custom_id, response: None, error: Some(detail) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_succeeded_result_line() {
        let line = r#"{"custom_id": "t1-0-current_aum", "result": {"type": "succeeded", "message": {"content": [{"type": "text", "text": "{\"value\": 5}"}], "usage": {"input_tokens": 100, "output_tokens": 10}, "model": "claude-3-5-haiku-latest"}}}"#;
        let item = parse_result_line(line).expect("should parse");
        assert_eq!(item.custom_id, "t1-0-current_aum");
        let response = item.response.expect("succeeded");
        assert_eq!(response.text(), "{\"value\": 5}");
        assert_eq!(response.usage.input_tokens, 100);
    }

    #[test]
    fn test_parse_errored_result_line() {
        let line = r#"{"custom_id": "t2-3-fee_schedule", "result": {"type": "errored", "error": {"type": "invalid_request_error"}}}"#;
        let item = parse_result_line(line).expect("should parse");
        assert!(item.response.is_none());
        assert!(item.error.unwrap().contains("invalid_request_error"));
    }

    #[test]
    fn test_garbage_line_dropped() {
        assert!(parse_result_line("not json at all").is_none());
    }
}

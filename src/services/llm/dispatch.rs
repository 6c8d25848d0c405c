//! Batch dispatcher: turns a set of questions into provider requests and
//! collects parsed answers.
//!
//! Two execution paths share one parse pipeline: small sets run
//! direct-concurrent against the messages API; large sets go through the
//! provider's batch API and are polled to completion. A primer request warms
//! the provider prompt cache before either path fires.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::client::LlmClient;
use super::models::*;
use crate::models::{AdvisorDocs, Answer, AnswerValue};
use crate::questions::Question;
use crate::services::documents;

/// Direct path worker cap.
const DIRECT_CONCURRENCY: usize = 10;
/// Direct path retry budget per item.
const MAX_ATTEMPTS: u32 = 3;
/// First retry backoff; doubles per attempt.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);
/// Batch polling starts here and doubles up to the cap.
const POLL_INTERVAL: Duration = Duration::from_secs(2);
const POLL_INTERVAL_CAP: Duration = Duration::from_secs(15);
/// A batch that has not ended after this long is abandoned.
const BATCH_DEADLINE: Duration = Duration::from_secs(30 * 60);

// ============================================================================
// Tier configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct TierConfig {
    pub tier: u8,
    pub model: String,
    pub max_tokens: u32,
    /// At or below this many items the tier runs direct-concurrent.
    pub direct_threshold: usize,
}

impl TierConfig {
    /// Default token limits and batch thresholds per tier.
    pub fn new(tier: u8, model: impl Into<String>) -> Self {
        let (max_tokens, direct_threshold) = match tier {
            1 => (512, 15),
            2 => (1024, 8),
            _ => (2048, 4),
        };
        Self { tier, model: model.into(), max_tokens, direct_threshold }
    }
}

// ============================================================================
// Batch items
// ============================================================================

/// One prepared request, bound to its question.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub custom_id: String,
    pub question: &'static Question,
    pub request: MessageRequest,
}

/// Build the dispatchable items for a tier. Questions whose document context
/// comes back empty are skipped: there is nothing to ask against.
pub fn build_items(
    questions: &[&'static Question],
    docs: &AdvisorDocs,
    system_prompt: &str,
    config: &TierConfig,
) -> Vec<BatchItem> {
    questions
        .iter()
        .copied()
        .enumerate()
        .filter_map(|(index, question)| {
            let context = documents::document_for_question(docs, question);
            if context.trim().is_empty() {
                tracing::debug!(key = question.key, "skipping question with empty context");
                return None;
            }
            let user_message = format!(
                "Question: {}\n\nExpected output format: {}\n\nFiling excerpts:\n\n{}",
                question.text,
                question.output_format.as_str(),
                context
            );
            Some(BatchItem {
                custom_id: format!("t{}-{}-{}", config.tier, index, question.key),
                question,
                request: MessageRequest {
                    model: config.model.clone(),
                    max_tokens: config.max_tokens,
                    system: vec![SystemBlock::cached(system_prompt)],
                    messages: vec![ChatMessage {
                        role: "user".to_string(),
                        content: user_message,
                    }],
                },
            })
        })
        .collect()
}

// ============================================================================
// Dispatch
// ============================================================================

/// Answers plus the aggregate token usage for one tier dispatch (primer
/// included).
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub answers: Vec<Answer>,
    pub usage: Usage,
}

/// Run one tier's items to completion.
///
/// Direct-concurrent when the set is small, batch API otherwise. Individual
/// item failures are logged and dropped; only transport-level failures of the
/// whole path surface as an error.
pub async fn dispatch_tier(
    client: Arc<dyn LlmClient>,
    cancel: &CancellationToken,
    items: Vec<BatchItem>,
    config: &TierConfig,
) -> Result<DispatchOutcome, LlmError> {
    if items.is_empty() {
        return Ok(DispatchOutcome::default());
    }

    let mut outcome = DispatchOutcome::default();

    // Prime the provider prompt cache off the first request. Tier 3 sets are
    // often tiny; priming only pays for itself from three items up.
    if config.tier != 3 || items.len() >= 3 {
        outcome.usage.add(&run_primer(client.as_ref(), cancel, &items[0]).await);
    }

    if items.len() <= config.direct_threshold {
        dispatch_direct(client, cancel, items, config, &mut outcome).await?;
    } else {
        dispatch_batch(client.as_ref(), cancel, items, config, &mut outcome).await?;
    }

    Ok(outcome)
}

/// Fire-and-await the cache primer. Failure is an optimization miss, not an
/// error; its token usage counts toward the run total.
async fn run_primer(
    client: &dyn LlmClient,
    cancel: &CancellationToken,
    first: &BatchItem,
) -> Usage {
    let result = tokio::select! {
        _ = cancel.cancelled() => return Usage::default(),
        r = client.create_message(&first.request) => r,
    };
    match result {
        Ok(response) => {
            tracing::debug!(
                tier_item = %first.custom_id,
                cache_write = response.usage.cache_creation_input_tokens,
                "cache primer complete"
            );
            response.usage
        },
        Err(e) => {
            tracing::warn!("cache primer failed: {}", e);
            Usage::default()
        },
    }
}

async fn dispatch_direct(
    client: Arc<dyn LlmClient>,
    cancel: &CancellationToken,
    items: Vec<BatchItem>,
    config: &TierConfig,
    outcome: &mut DispatchOutcome,
) -> Result<(), LlmError> {
    let semaphore = Arc::new(Semaphore::new(DIRECT_CONCURRENCY));
    let mut join_set: JoinSet<Option<(BatchItem, MessageResponse)>> = JoinSet::new();

    for item in items {
        let client = Arc::clone(&client);
        let cancel = cancel.clone();
        let semaphore = Arc::clone(&semaphore);
        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok()?;
            match call_with_retries(client.as_ref(), &cancel, &item.request).await {
                Ok(response) => Some((item, response)),
                Err(LlmError::Cancelled) => None,
                Err(e) => {
                    tracing::warn!(item = %item.custom_id, "request failed after retries: {}", e);
                    None
                },
            }
        });
    }

    while let Some(joined) = join_set.join_next().await {
        let Ok(Some((item, response))) = joined else { continue };
        outcome.usage.add(&response.usage);
        if let Some(answer) = answer_from_response(&item, &response, config) {
            outcome.answers.push(answer);
        }
    }

    if cancel.is_cancelled() { Err(LlmError::Cancelled) } else { Ok(()) }
}

/// One item with retries: up to `MAX_ATTEMPTS`, exponential backoff,
/// immediate abort on cancellation.
async fn call_with_retries(
    client: &dyn LlmClient,
    cancel: &CancellationToken,
    request: &MessageRequest,
) -> Result<MessageResponse, LlmError> {
    let mut backoff = RETRY_BACKOFF;
    let mut last_error = LlmError::ApiError("no attempts made".to_string());

    for attempt in 1..=MAX_ATTEMPTS {
        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(LlmError::Cancelled),
            r = client.create_message(request) => r,
        };
        match result {
            Ok(response) => return Ok(response),
            Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                tracing::debug!(attempt, "retryable request failure: {}", e);
                last_error = e;
                tokio::select! {
                    _ = cancel.cancelled() => return Err(LlmError::Cancelled),
                    _ = tokio::time::sleep(backoff) => {},
                }
                backoff *= 2;
            },
            Err(e) => return Err(e),
        }
    }
    Err(last_error)
}

async fn dispatch_batch(
    client: &dyn LlmClient,
    cancel: &CancellationToken,
    items: Vec<BatchItem>,
    config: &TierConfig,
    outcome: &mut DispatchOutcome,
) -> Result<(), LlmError> {
    let requests: Vec<BatchItemRequest> = items
        .iter()
        .map(|item| BatchItemRequest {
            custom_id: item.custom_id.clone(),
            params: item.request.clone(),
        })
        .collect();

    let batch_id = client.create_batch(&requests).await?;
    tracing::info!(batch_id = %batch_id, items = items.len(), tier = config.tier, "batch submitted");

    let deadline = Instant::now() + BATCH_DEADLINE;
    let mut interval = POLL_INTERVAL;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Err(LlmError::Cancelled),
            _ = tokio::time::sleep(interval) => {},
        }
        if Instant::now() >= deadline {
            return Err(LlmError::BatchTimeout(batch_id));
        }

        let status = client.poll_batch(&batch_id).await?;
        if status.is_terminal() {
            tracing::info!(
                batch_id = %batch_id,
                succeeded = status.request_counts.succeeded,
                errored = status.request_counts.errored,
                "batch ended"
            );
            break;
        }
        interval = (interval * 2).min(POLL_INTERVAL_CAP);
    }

    let by_id: HashMap<&str, &BatchItem> =
        items.iter().map(|item| (item.custom_id.as_str(), item)).collect();

    for result in client.get_batch_results(&batch_id).await? {
        let Some(item) = by_id.get(result.custom_id.as_str()) else {
            tracing::warn!(custom_id = %result.custom_id, "unknown custom id in batch results");
            continue;
        };
        match (result.response, result.error) {
            (Some(response), _) => {
                outcome.usage.add(&response.usage);
                if let Some(answer) = answer_from_response(item, &response, config) {
                    outcome.answers.push(answer);
                }
            },
            (None, error) => {
                tracing::warn!(
                    custom_id = %result.custom_id,
                    "batch item failed: {}",
                    error.unwrap_or_default()
                );
            },
        }
    }

    Ok(())
}

// ============================================================================
// Response parsing
// ============================================================================

/// Parse a model response body: strip code fences, take the outermost JSON
/// object, read `{value, confidence, reasoning}`.
pub fn parse_model_json(raw: &str) -> Result<(AnswerValue, f64, String), LlmError> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let start = cleaned
        .find('{')
        .ok_or_else(|| LlmError::ParseError("no JSON object in response".to_string()))?;
    let end = cleaned
        .rfind('}')
        .ok_or_else(|| LlmError::ParseError("unterminated JSON object".to_string()))?;
    if end < start {
        return Err(LlmError::ParseError("malformed JSON object".to_string()));
    }

    let parsed: serde_json::Value = serde_json::from_str(&cleaned[start..=end])
        .map_err(|e| LlmError::ParseError(e.to_string()))?;

    let value = AnswerValue::from_json(parsed.get("value").cloned().unwrap_or_default());
    let confidence = parsed
        .get("confidence")
        .and_then(|c| c.as_f64())
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);
    let reasoning = parsed
        .get("reasoning")
        .and_then(|r| r.as_str())
        .unwrap_or_default()
        .to_string();

    Ok((value, confidence, reasoning))
}

/// Turn a parsed response into an answer. CRD and run id are assigned by the
/// orchestrator, not here.
fn answer_from_response(
    item: &BatchItem,
    response: &MessageResponse,
    config: &TierConfig,
) -> Option<Answer> {
    match parse_model_json(&response.text()) {
        Ok((value, confidence, reasoning)) => Some(Answer {
            confidence,
            tier: config.tier,
            reasoning,
            source_doc: item.question.primary_source_doc().to_string(),
            source_section: item.question.primary_source_section().to_string(),
            model: if response.model.is_empty() {
                config.model.clone()
            } else {
                response.model.clone()
            },
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
            ..Answer::new(item.question.key, value)
        }),
        Err(e) => {
            tracing::warn!(item = %item.custom_id, "dropping unparseable answer: {}", e);
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AdvisorRecord;
    use crate::questions::question_map;
    use crate::services::documents::assemble;

    fn docs_fixture() -> AdvisorDocs {
        let advisor = AdvisorRecord {
            crd_number: 9,
            firm_name: "Test Advisors".into(),
            total_aum: Some(100),
            ..Default::default()
        };
        let brochure = crate::models::Brochure {
            id: 1,
            crd_number: 9,
            title: None,
            filing_date: None,
            text: "Item 5 - Fees and Compensation\nWe charge 1%.".to_string(),
        };
        assemble(advisor, &[brochure], &[], &[], vec![]).0
    }

    #[test]
    fn test_parse_json_with_code_fence() {
        let (value, confidence, _) =
            parse_model_json("```json\n{\"value\":42,\"confidence\":0.9}\n```").unwrap();
        assert_eq!(value, AnswerValue::Integer(42));
        assert_eq!(confidence, 0.9);
    }

    #[test]
    fn test_parse_json_with_surrounding_prose() {
        let raw = "Here is my answer:\n{\"value\": \"quarterly\", \"confidence\": 0.8, \"reasoning\": \"Item 5 states billing is quarterly.\"}\nDone.";
        let (value, confidence, reasoning) = parse_model_json(raw).unwrap();
        assert_eq!(value, AnswerValue::Text("quarterly".into()));
        assert_eq!(confidence, 0.8);
        assert!(reasoning.contains("Item 5"));
    }

    #[test]
    fn test_parse_failure_cases() {
        assert!(parse_model_json("no braces here").is_err());
        assert!(parse_model_json("{not valid json}").is_err());
    }

    #[test]
    fn test_confidence_clamped() {
        let (_, confidence, _) = parse_model_json(r#"{"value": 1, "confidence": 1.7}"#).unwrap();
        assert_eq!(confidence, 1.0);
    }

    #[test]
    fn test_missing_value_defaults_to_null() {
        let (value, confidence, _) = parse_model_json(r#"{"confidence": 0.2}"#).unwrap();
        assert!(value.is_null());
        assert_eq!(confidence, 0.2);
    }

    #[test]
    fn test_build_items_custom_id_and_skip_empty() {
        let docs = docs_fixture();
        let config = TierConfig::new(2, "claude-sonnet-4-5");
        // fee_schedule has item_5 context; fiduciary_language reads only the
        // (absent) CRS and must be skipped.
        let questions =
            vec![question_map()["fee_schedule"], question_map()["fiduciary_language"]];
        let items = build_items(&questions, &docs, "system", &config);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].custom_id, "t2-0-fee_schedule");
        assert_eq!(items[0].request.max_tokens, 1024);
        assert!(items[0].request.system[0].cache_control.is_some());
        assert!(items[0].request.messages[0].content.contains("We charge 1%."));
    }

    #[test]
    fn test_tier_defaults() {
        let t1 = TierConfig::new(1, "m");
        let t2 = TierConfig::new(2, "m");
        let t3 = TierConfig::new(3, "m");
        assert_eq!((t1.max_tokens, t1.direct_threshold), (512, 15));
        assert_eq!((t2.max_tokens, t2.direct_threshold), (1024, 8));
        assert_eq!((t3.max_tokens, t3.direct_threshold), (2048, 4));
    }
}

//! Enrichment oracle client
//!
//! The oracle is an LLM completions API: a batch of names goes out, a JSON
//! array of `{name, meaning, origin}` objects comes back, one per name, in
//! request order — in theory. In practice the array arrives wrapped in
//! prose or markdown fencing, sometimes short, sometimes reordered, so the
//! client extracts the first well-formed JSON array from the response text
//! and aligns entries back to the request by name.

use crate::models::OriginValue;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const RATE_LIMIT_MS: u64 = 300;
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Minimum Jaro-Winkler similarity to accept a near-miss name match
const NAME_MATCH_THRESHOLD: f64 = 0.9;

/// Oracle client errors
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty response")]
    Empty,
}

impl OracleError {
    /// Whether a retry could plausibly succeed. Malformed responses count:
    /// the oracle is nondeterministic and often formats correctly on re-ask.
    pub fn is_retryable(&self) -> bool {
        match self {
            OracleError::Network(_)
            | OracleError::RateLimited
            | OracleError::Parse(_)
            | OracleError::Empty => true,
            OracleError::Api(status, _) => *status >= 500,
        }
    }
}

/// Escalation tier for the quality-gate second pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    Standard,
    Thorough,
}

/// One name submitted for enrichment, with optional context
#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub name: String,
    pub gender_hint: Option<String>,
    pub origin_group: Option<String>,
}

impl OracleRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gender_hint: None,
            origin_group: None,
        }
    }
}

/// Per-name enrichment payload returned by the oracle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleEnrichment {
    pub name: String,
    #[serde(default)]
    pub meaning: Option<String>,
    #[serde(default)]
    pub meanings: Vec<String>,
    #[serde(default)]
    pub origin: Option<OriginValue>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl OracleEnrichment {
    /// A result worth escalating: placeholder origin, or a meaning that is a
    /// single low-information word.
    pub fn is_low_quality(&self) -> bool {
        let origin_missing = self
            .origin
            .as_ref()
            .map(|o| o.is_placeholder())
            .unwrap_or(true);
        if origin_missing {
            return true;
        }
        match self.meaning.as_deref() {
            None => true,
            Some(m) => {
                let m = m.trim();
                crate::models::is_placeholder(m)
                    || (!m.contains(char::is_whitespace) && m.len() < 4)
            }
        }
    }
}

/// The enrichment oracle interface. Implemented by the OpenAI-backed client
/// and by scripted mocks in tests.
#[async_trait]
pub trait EnrichmentOracle: Send + Sync {
    /// Enrich one batch of names. The returned entries are aligned to the
    /// request by the caller; order and length are not trusted.
    async fn enrich_batch(
        &self,
        batch: &[OracleRequest],
        tier: QualityTier,
    ) -> Result<Vec<OracleEnrichment>, OracleError>;

    /// Estimated cost per enriched name, used for the progress report
    fn cost_per_name(&self, tier: QualityTier) -> f64 {
        match tier {
            QualityTier::Standard => 0.00005,
            QualityTier::Thorough => 0.0025,
        }
    }

    /// Provenance label written into `enrichedWith`
    fn label(&self) -> &str {
        "oracle"
    }
}

/// Minimum-interval rate limiter shared across in-flight calls
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with the minimum dispatch interval
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// OpenAI-backed oracle client
pub struct OpenAiOracle {
    http_client: reqwest::Client,
    api_key: String,
    rate_limiter: Arc<RateLimiter>,
    standard_model: String,
    thorough_model: String,
}

impl OpenAiOracle {
    pub fn new(api_key: String) -> Result<Self, OracleError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| OracleError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
            standard_model: "gpt-4o-mini".to_string(),
            thorough_model: "gpt-4o".to_string(),
        })
    }

    fn model_for(&self, tier: QualityTier) -> &str {
        match tier {
            QualityTier::Standard => &self.standard_model,
            QualityTier::Thorough => &self.thorough_model,
        }
    }

    fn build_prompt(batch: &[OracleRequest]) -> String {
        let names = batch
            .iter()
            .map(|r| match (&r.gender_hint, &r.origin_group) {
                (Some(g), _) => format!("{} ({})", r.name, g),
                (None, Some(og)) => format!("{} (currently: {})", r.name, og),
                _ => r.name.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Analyze these baby names and provide their meanings and cultural origins.\n\n\
             For each name, provide:\n\
             1. A concise, accurate meaning (max 10 words)\n\
             2. The cultural origin(s)\n\
             3. If the name has multiple distinct meanings, list up to 3\n\n\
             Format as JSON array:\n\
             [{{\n  \"name\": \"Name\",\n  \"meaning\": \"Primary meaning\",\n  \
             \"meanings\": [\"meaning1\", \"meaning2\"],\n  \"origin\": [\"Origin1\", \"Origin2\"]\n}}]\n\n\
             Names to analyze: {}\n\n\
             Important:\n\
             - Be historically and culturally accurate\n\
             - For modern names, indicate \"Modern\" or \"Contemporary\"\n\
             - For unclear etymology, indicate \"Unknown\"\n\
             - Return ONLY the JSON array, no extra text",
            names
        )
    }
}

#[async_trait]
impl EnrichmentOracle for OpenAiOracle {
    async fn enrich_batch(
        &self,
        batch: &[OracleRequest],
        tier: QualityTier,
    ) -> Result<Vec<OracleEnrichment>, OracleError> {
        self.rate_limiter.wait().await;

        let body = serde_json::json!({
            "model": self.model_for(tier),
            "messages": [
                {
                    "role": "system",
                    "content": "You are an expert in etymology, linguistics, and cultural naming traditions. Provide accurate, concise information about baby names. Return only valid JSON."
                },
                {
                    "role": "user",
                    "content": Self::build_prompt(batch)
                }
            ],
            "temperature": 0.3,
            "max_tokens": 1200
        });

        tracing::debug!(
            names = batch.len(),
            model = self.model_for(tier),
            "Dispatching oracle batch"
        );

        let response = self
            .http_client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| OracleError::Network(e.to_string()))?;

        let status = response.status();

        if status == 429 {
            return Err(OracleError::RateLimited);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OracleError::Api(status.as_u16(), error_text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Parse(e.to_string()))?;

        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or(OracleError::Empty)?;

        parse_enrichments(content, batch.len())
    }

    fn label(&self) -> &str {
        &self.standard_model
    }
}

/// Extract and parse the first well-formed JSON array from oracle response
/// text, tolerating surrounding prose and markdown fencing.
pub fn parse_enrichments(
    content: &str,
    expected: usize,
) -> Result<Vec<OracleEnrichment>, OracleError> {
    let array_text = extract_json_array(content)
        .ok_or_else(|| OracleError::Parse("no JSON array found in response".to_string()))?;

    let enrichments: Vec<OracleEnrichment> =
        serde_json::from_str(array_text).map_err(|e| OracleError::Parse(e.to_string()))?;

    if enrichments.len() != expected {
        tracing::warn!(
            expected,
            received = enrichments.len(),
            "Oracle returned a different number of entries than requested"
        );
    }

    Ok(enrichments)
}

/// Locate the first well-formed JSON array substring.
///
/// Markdown fences are stripped first, then bracket positions are tried
/// outermost-first so prose containing stray `]` characters doesn't defeat
/// the scan.
fn extract_json_array(content: &str) -> Option<&str> {
    let trimmed = strip_fences(content);

    let start = trimmed.find('[')?;
    let mut end = trimmed.rfind(']')?;

    while end > start {
        let candidate = &trimmed[start..=end];
        if serde_json::from_str::<serde_json::Value>(candidate).is_ok() {
            return Some(candidate);
        }
        end = trimmed[..end].rfind(']')?;
    }
    None
}

fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        return rest.trim_end_matches("```").trim();
    }
    if let Some(rest) = trimmed.strip_prefix("```") {
        return rest.trim_end_matches("```").trim();
    }
    trimmed
}

/// Align oracle responses to the request batch by name.
///
/// Exact case-insensitive match first, then the most similar remaining
/// entry above the Jaro-Winkler threshold. Returns one slot per request;
/// unmatched requests get `None` and a warning.
pub fn align_responses(
    batch: &[OracleRequest],
    enrichments: Vec<OracleEnrichment>,
) -> Vec<Option<OracleEnrichment>> {
    let mut remaining: Vec<Option<OracleEnrichment>> =
        enrichments.into_iter().map(Some).collect();
    let mut aligned = Vec::with_capacity(batch.len());

    for request in batch {
        let wanted = request.name.trim().to_lowercase();

        // exact match first
        let mut found = remaining.iter().position(|slot| {
            slot.as_ref()
                .map(|e| e.name.trim().to_lowercase() == wanted)
                .unwrap_or(false)
        });

        // then best near-miss
        if found.is_none() {
            let mut best: Option<(usize, f64)> = None;
            for (idx, slot) in remaining.iter().enumerate() {
                if let Some(e) = slot {
                    let score = strsim::jaro_winkler(&wanted, &e.name.trim().to_lowercase());
                    if score >= NAME_MATCH_THRESHOLD
                        && best.map(|(_, s)| score > s).unwrap_or(true)
                    {
                        best = Some((idx, score));
                    }
                }
            }
            if let Some((idx, score)) = best {
                tracing::warn!(
                    requested = %request.name,
                    returned = remaining[idx].as_ref().map(|e| e.name.clone()).unwrap_or_default(),
                    score,
                    "Accepting near-miss name match from oracle"
                );
                found = Some(idx);
            }
        }

        match found {
            Some(idx) => aligned.push(remaining[idx].take()),
            None => {
                tracing::warn!(name = %request.name, "Oracle returned no entry for name");
                aligned.push(None);
            }
        }
    }

    aligned
}

//! Completion client for report sections.
//!
//! The completion service sits behind `CompletionBackend` so tests can use
//! `FakeCompletionBackend` instead of the network. One backend call per
//! request: no retries, no streaming, no caching.

use async_trait::async_trait;
use fleet_common::{ReportConfig, ReportError, Section};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Sampling temperature for report generation
pub const TEMPERATURE: f64 = 0.2;

/// Upper bound on error body text carried into an error message
const MAX_ERROR_BODY: usize = 512;

// ============================================================================
// Backend Trait
// ============================================================================

/// Submit a prompt, get back the raw reply text within the configured timeout
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ReportError>;

    /// Short label used in logs
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAI-compatible Backend (Production)
// ============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Chat-completions client for OpenAI-compatible endpoints
pub struct OpenAiBackend {
    http_client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
    timeout: Duration,
}

impl fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiBackend {
    pub fn from_config(config: &ReportConfig) -> Result<Self, ReportError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                ReportError::Configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, prompt: &str) -> Result<String, ReportError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ReportError::Configuration("OPENAI_API_KEY not set".to_string()))?;

        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReportError::CompletionService(format!(
                        "no reply within {} ms",
                        self.timeout.as_millis()
                    ))
                } else {
                    ReportError::CompletionService(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            ReportError::CompletionService(format!("failed to read reply body: {}", e))
        })?;

        if !status.is_success() {
            let snippet: String = text.chars().take(MAX_ERROR_BODY).collect();
            return Err(ReportError::CompletionService(format!(
                "completion service returned {}: {}",
                status, snippet
            )));
        }

        extract_message_content(&text)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Pull `choices[0].message.content` out of a chat-completions envelope
pub fn extract_message_content(envelope: &str) -> Result<String, ReportError> {
    let json: Value = serde_json::from_str(envelope).map_err(|e| {
        ReportError::ResponseParse(format!("completion envelope is not JSON: {}", e))
    })?;

    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            ReportError::ResponseParse(
                "completion envelope has no choices[0].message.content".to_string(),
            )
        })
}

// ============================================================================
// Fake Backend (Testing)
// ============================================================================

#[derive(Debug, Clone)]
enum FakeReply {
    Text(String),
    Unavailable(String),
}

/// Backend returning a canned reply and recording every prompt it receives
#[derive(Debug)]
pub struct FakeCompletionBackend {
    reply: FakeReply,
    prompts: Mutex<Vec<String>>,
}

impl FakeCompletionBackend {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: FakeReply::Text(text.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails as if the service could not be reached
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            reply: FakeReply::Unavailable(reason.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CompletionBackend for FakeCompletionBackend {
    async fn complete(&self, prompt: &str) -> Result<String, ReportError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        match &self.reply {
            FakeReply::Text(text) => Ok(text.clone()),
            FakeReply::Unavailable(reason) => Err(ReportError::CompletionService(reason.clone())),
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

// ============================================================================
// Completion Client
// ============================================================================

#[derive(Clone)]
pub struct CompletionClient {
    backend: Arc<dyn CompletionBackend>,
}

impl CompletionClient {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// One round trip to the completion service, shaped into sections
    pub async fn generate_sections(&self, prompt: &str) -> Result<Vec<Section>, ReportError> {
        let start = Instant::now();
        let raw = self.backend.complete(prompt).await.map_err(|e| {
            error!("Completion via {} failed: {}", self.backend.name(), e);
            e
        })?;
        debug!("Completion reply ({} chars): {}", raw.len(), raw);

        let sections = parse_sections(&raw)?;
        info!(
            "Completion via {} returned {} sections in {}ms",
            self.backend.name(),
            sections.len(),
            start.elapsed().as_millis()
        );
        Ok(sections)
    }
}

/// Shape a reply like `{"sections":[{"title":..,"markdown":..}]}` into sections.
///
/// A reply without a `sections` key yields no sections.
pub fn parse_sections(raw: &str) -> Result<Vec<Section>, ReportError> {
    let json: Value = serde_json::from_str(raw)
        .map_err(|e| ReportError::ResponseParse(format!("reply is not valid JSON: {}", e)))?;

    let object = json
        .as_object()
        .ok_or_else(|| ReportError::ResponseParse("reply is not a JSON object".to_string()))?;

    let entries = match object.get("sections") {
        None => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(ReportError::ResponseParse(
                "'sections' is not an array".to_string(),
            ))
        }
    };

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let field = |name: &str| {
                entry.get(name).and_then(|v| v.as_str()).ok_or_else(|| {
                    ReportError::ResponseParse(format!(
                        "sections[{}] has no string '{}'",
                        i, name
                    ))
                })
            };
            if !entry.is_object() {
                return Err(ReportError::ResponseParse(format!(
                    "sections[{}] is not an object",
                    i
                )));
            }
            Ok(Section::new(field("title")?, field("markdown")?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_section() {
        let sections = parse_sections(r#"{"sections":[{"title":"A","markdown":"B"}]}"#).unwrap();
        assert_eq!(sections, vec![Section::new("A", "B")]);
    }

    #[test]
    fn test_missing_key_is_empty() {
        assert!(parse_sections("{}").unwrap().is_empty());
    }

    #[test]
    fn test_not_json() {
        let err = parse_sections("Sure! Here is your report:").unwrap_err();
        assert!(matches!(err, ReportError::ResponseParse(_)));
    }

    #[test]
    fn test_order_preserved() {
        let raw = r##"{"sections":[
            {"title":"Overall Fleet Safety Summary","markdown":"- **88** vs goal 90"},
            {"title":"Missed DVIRs","markdown":"# none"}
        ]}"##;
        let titles: Vec<String> = parse_sections(raw)
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, ["Overall Fleet Safety Summary", "Missed DVIRs"]);
    }

    #[test]
    fn test_bad_entry_is_named() {
        let raw = r#"{"sections":[{"title":"A","markdown":"B"},{"title":"C"}]}"#;
        let err = parse_sections(raw).unwrap_err();
        assert!(err.to_string().contains("sections[1]"));
        assert!(err.to_string().contains("markdown"));

        let err = parse_sections(r#"{"sections":["oops"]}"#).unwrap_err();
        assert!(err.to_string().contains("sections[0] is not an object"));
    }

    #[test]
    fn test_non_array_and_non_object() {
        assert!(parse_sections(r#"{"sections":{"title":"A"}}"#).is_err());
        assert!(parse_sections("[1,2]").is_err());
    }

    #[test]
    fn test_extract_message_content() {
        let envelope = r#"{"choices":[{"message":{"role":"assistant","content":"{}"}}]}"#;
        assert_eq!(extract_message_content(envelope).unwrap(), "{}");

        let err = extract_message_content(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, ReportError::ResponseParse(_)));
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_network() {
        let config = ReportConfig {
            api_base: "http://127.0.0.1:9".to_string(),
            ..ReportConfig::default()
        };
        let backend = OpenAiBackend::from_config(&config).unwrap();
        let err = backend.complete("prompt").await.unwrap_err();
        assert!(matches!(err, ReportError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_client_uses_backend_once() {
        let fake = Arc::new(FakeCompletionBackend::replying(
            r#"{"sections":[{"title":"A","markdown":"B"}]}"#,
        ));
        let client = CompletionClient::new(fake.clone());
        assert_eq!(client.backend_name(), "fake");

        let sections = client.generate_sections("the prompt").await.unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(fake.call_count(), 1);
        assert_eq!(fake.prompts(), vec!["the prompt".to_string()]);
    }

    #[tokio::test]
    async fn test_service_error_not_retried() {
        let fake = Arc::new(FakeCompletionBackend::unavailable("connection refused"));
        let client = CompletionClient::new(fake.clone());

        let err = client.generate_sections("p").await.unwrap_err();
        assert!(matches!(err, ReportError::CompletionService(_)));
        assert_eq!(fake.call_count(), 1);
    }

    #[test]
    fn test_debug_hides_key() {
        let config = ReportConfig {
            api_key: Some("sk-live-123".into()),
            ..ReportConfig::default()
        };
        let backend = OpenAiBackend::from_config(&config).unwrap();
        let rendered = format!("{:?}", backend);
        assert!(!rendered.contains("sk-live-123"));
        assert!(rendered.contains("https://api.openai.com/v1/chat/completions"));
    }
}

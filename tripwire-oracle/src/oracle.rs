//! Oracle: an external classifier consulted alongside the rule engine
//!
//! The runtime only sees the [`Oracle`] trait. [`LlmOracle`] implements it
//! on top of any [`LlmBackend`](crate::LlmBackend).

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use tripwire_core::{DetectionResult, HistoryMessage};

use crate::{DetectionPrompt, LlmError, SharedBackend};

/// Errors from oracle calls
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Backend error: {0}")]
    Backend(#[from] LlmError),

    #[error("Malformed oracle response: {0}")]
    Malformed(String),

    #[error("Oracle timed out after {0} ms")]
    Timeout(u64),
}

/// An independent scam classifier
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Classify the latest message given the prior conversation
    async fn classify(&self, message: &str, history: &[HistoryMessage]) -> Result<DetectionResult, OracleError>;

    /// Name used in logs and reports
    fn name(&self) -> &str;
}

/// Thread-safe reference to an oracle
pub type SharedOracle = Arc<dyn Oracle>;

/// Oracle backed by a language model
pub struct LlmOracle {
    backend: SharedBackend,
    prompt: DetectionPrompt,
    name: String,
}

impl LlmOracle {
    pub fn new(backend: SharedBackend) -> Self {
        Self::with_prompt(backend, DetectionPrompt::embedded())
    }

    pub fn with_prompt(backend: SharedBackend, prompt: DetectionPrompt) -> Self {
        let name = format!("llm:{}", backend.model_name());
        Self { backend, prompt, name }
    }

    pub fn prompt(&self) -> &DetectionPrompt {
        &self.prompt
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    async fn classify(&self, message: &str, history: &[HistoryMessage]) -> Result<DetectionResult, OracleError> {
        let user = self.prompt.render_user(message, history);
        let reply = self.backend.generate(self.prompt.system_prompt(), &user).await?;
        debug!("Oracle reply ({} chars) from {}", reply.len(), self.backend.model_name());

        let verdict = parse_verdict(&reply);
        if let Err(e) = &verdict {
            warn!("Oracle {} returned an unusable reply: {}", self.name, e);
        }
        verdict
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Shape of the JSON object the model is asked to produce
#[derive(Debug, Deserialize)]
struct OracleVerdict {
    #[serde(default)]
    is_scam: bool,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    indicators: Vec<String>,
    #[serde(default)]
    scam_type: Option<String>,
}

/// Parse a model reply into a verdict.
///
/// Accepts a bare JSON object, or one wrapped in a ```json or plain ``` fence.
/// Missing fields default to a negative verdict; confidence is clamped.
pub fn parse_verdict(reply: &str) -> Result<DetectionResult, OracleError> {
    let body = reply.trim();

    let parsed: OracleVerdict = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(direct) => {
            let fenced = fenced_block(body).ok_or_else(|| OracleError::Malformed(direct.to_string()))?;
            serde_json::from_str(fenced).map_err(|e| OracleError::Malformed(e.to_string()))?
        }
    };

    Ok(DetectionResult::new(
        parsed.is_scam,
        parsed.confidence,
        parsed.indicators,
        parsed.scam_type,
    ))
}

/// Contents of the first ```json block, or of the first bare ``` block
fn fenced_block(text: &str) -> Option<&str> {
    let after = match text.split_once("```json") {
        Some((_, rest)) => rest,
        None => text.split_once("```")?.1,
    };
    let inner = after.split_once("```").map(|(inner, _)| inner).unwrap_or(after);
    Some(inner.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LlmBackend;
    use std::sync::Mutex;

    struct MockBackend {
        reply: Result<String, ()>,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl MockBackend {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmBackend for MockBackend {
        async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push((system.to_string(), user.to_string()));
            self.reply.clone().map_err(|_| LlmError::RateLimited)
        }

        fn model_name(&self) -> &str {
            "mock"
        }
    }

    #[test]
    fn test_parse_plain_json() {
        let verdict = parse_verdict(
            r#"{"is_scam": true, "confidence": 0.87, "indicators": ["urgency", "payment request"], "scam_type": "lottery"}"#,
        )
        .unwrap();
        assert!(verdict.is_scam());
        assert_eq!(verdict.confidence(), 0.87);
        assert_eq!(verdict.indicators(), ["urgency", "payment request"]);
        assert_eq!(verdict.scam_type(), Some("lottery"));
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply = "Here is my analysis:\n```json\n{\"is_scam\": true, \"confidence\": 0.9}\n```\nStay safe.";
        let verdict = parse_verdict(reply).unwrap();
        assert!(verdict.is_scam());
        assert_eq!(verdict.confidence(), 0.9);
        assert!(verdict.indicators().is_empty());

        let reply = "```\n{\"is_scam\": false, \"confidence\": 0.1}\n```";
        assert_eq!(parse_verdict(reply).unwrap().confidence(), 0.1);
    }

    #[test]
    fn test_parse_defaults_and_clamps() {
        let verdict = parse_verdict(r#"{"confidence": 1.8, "scam_type": "phishing"}"#).unwrap();
        assert!(!verdict.is_scam());
        assert_eq!(verdict.confidence(), 1.0);
        assert!(verdict.scam_type().is_none());
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(matches!(
            parse_verdict("I think this is probably a scam."),
            Err(OracleError::Malformed(_))
        ));
        assert!(matches!(parse_verdict("```json\nnot json\n```"), Err(OracleError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_llm_oracle_classify() {
        let backend = Arc::new(MockBackend::replying(
            r#"{"is_scam": true, "confidence": 0.8, "indicators": ["impersonation"], "scam_type": "digital_arrest"}"#,
        ));
        let oracle = LlmOracle::new(backend.clone());
        assert_eq!(oracle.name(), "llm:mock");

        let history = vec![HistoryMessage::new("scammer", "This is CBI calling")];
        let verdict = oracle.classify("Stay on the call", &history).await.unwrap();
        assert!(verdict.is_scam());
        assert_eq!(verdict.scam_type(), Some("digital_arrest"));

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.contains("is_scam"));
        assert!(seen[0].1.contains("scammer: This is CBI calling\n"));
        assert!(seen[0].1.contains("Stay on the call"));
    }

    #[tokio::test]
    async fn test_llm_oracle_backend_failure() {
        let oracle = LlmOracle::new(Arc::new(MockBackend::failing()));
        let err = oracle.classify("hello", &[]).await.unwrap_err();
        assert!(matches!(err, OracleError::Backend(LlmError::RateLimited)));
    }
}

//! Detector
//!
//! Runs one detection end to end:
//! - Fast path for unambiguous phishing (oracle skipped)
//! - Local rule engine (whitelist and scored paths)
//! - At most one oracle call, bounded by a timeout
//! - Hybrid reconciliation of the two verdicts

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tripwire_core::{
    combine, fast_path, Agreement, ConversationContext, DetectionPath, DetectionResult, HistoryMessage,
    RuleEngine, SenderInfo,
};
use tripwire_oracle::{OracleError, SharedOracle};

/// Default bound on a single oracle call
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Used in place of a zero timeout, which would fail every oracle call
pub const MIN_ORACLE_TIMEOUT: Duration = Duration::from_secs(1);

/// One message to classify
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionRequest {
    #[serde(default)]
    pub id: Option<String>,
    /// Absent, null or non-text messages are treated as empty
    #[serde(default, deserialize_with = "text_or_none")]
    pub message: Option<String>,
    #[serde(default, alias = "conversationHistory")]
    pub conversation_history: Vec<HistoryMessage>,
    #[serde(default, alias = "senderInfo")]
    pub sender_info: Option<SenderInfo>,
    /// Caller-tracked conversation state; overrides the history length
    #[serde(default)]
    pub context: Option<ConversationContext>,
}

fn text_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(text) => Some(text),
        _ => None,
    })
}

impl DetectionRequest {
    pub fn new(message: &str) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_sender(mut self, sender_id: &str) -> Self {
        self.sender_info = Some(SenderInfo::with_id(sender_id));
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryMessage>) -> Self {
        self.conversation_history = history;
        self
    }
}

/// Which stage produced the final verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPath {
    FastPath,
    Whitelisted,
    Scored,
    Hybrid,
}

/// What happened with the oracle for this request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleStatus {
    NotConfigured,
    /// Fast path decided; the oracle was not called
    Skipped,
    Consulted,
    /// Call failed or timed out; the null verdict was used
    Unavailable,
}

/// Final outcome for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub id: String,
    pub result: DetectionResult,
    pub path: ReportPath,
    pub oracle: OracleStatus,
    /// Reconciliation rule applied on the hybrid path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement: Option<Agreement>,
    pub analyzed_at: DateTime<Utc>,
}

/// Detector configuration
pub struct DetectorConfig {
    pub engine: RuleEngine,
    /// Oracle consulted after the local engine (none = local only)
    pub oracle: Option<SharedOracle>,
    pub oracle_timeout: Duration,
}

impl DetectorConfig {
    pub fn local(engine: RuleEngine) -> Self {
        Self {
            engine,
            oracle: None,
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }

    pub fn with_oracle(mut self, oracle: SharedOracle) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_timeout(mut self, oracle_timeout: Duration) -> Self {
        self.oracle_timeout = if oracle_timeout.is_zero() {
            MIN_ORACLE_TIMEOUT
        } else {
            oracle_timeout
        };
        self
    }
}

/// Detection orchestrator
pub struct Detector {
    engine: RuleEngine,
    oracle: Option<SharedOracle>,
    oracle_timeout: Duration,
}

impl Detector {
    pub fn new(config: DetectorConfig) -> Self {
        if let Some(oracle) = &config.oracle {
            info!(
                "Detector using oracle {} (timeout {} ms)",
                oracle.name(),
                config.oracle_timeout.as_millis()
            );
        }

        Self {
            engine: config.engine,
            oracle: config.oracle,
            oracle_timeout: config.oracle_timeout,
        }
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    pub fn has_oracle(&self) -> bool {
        self.oracle.is_some()
    }

    /// Classify one request; never fails
    pub async fn detect(&self, request: DetectionRequest) -> DetectionReport {
        let id = request.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let message = request.message.as_deref().unwrap_or("");

        if let Some(result) = fast_path(message) {
            debug!("Request {} decided by fast path", id);
            let oracle = if self.oracle.is_some() {
                OracleStatus::Skipped
            } else {
                OracleStatus::NotConfigured
            };
            return report(id, result, ReportPath::FastPath, oracle, None);
        }

        let sender = request.sender_info.as_ref();
        let analysis = match &request.context {
            Some(context) => self.engine.analyze_in_context(message, context, sender),
            None => self.engine.analyze(message, &request.conversation_history, sender),
        };
        let local_path = match analysis.path {
            DetectionPath::Whitelisted => ReportPath::Whitelisted,
            DetectionPath::Scored => ReportPath::Scored,
        };

        let Some(oracle) = &self.oracle else {
            return report(id, analysis.result, local_path, OracleStatus::NotConfigured, None);
        };

        let (verdict, status) = match timeout(
            self.oracle_timeout,
            oracle.classify(message, &request.conversation_history),
        )
        .await
        {
            Ok(Ok(verdict)) => (verdict, OracleStatus::Consulted),
            Ok(Err(e)) => {
                warn!("Oracle {} failed for request {}: {}", oracle.name(), id, e);
                (DetectionResult::null(), OracleStatus::Unavailable)
            }
            Err(_) => {
                let e = OracleError::Timeout(self.oracle_timeout.as_millis() as u64);
                warn!("Oracle {} failed for request {}: {}", oracle.name(), id, e);
                (DetectionResult::null(), OracleStatus::Unavailable)
            }
        };

        let (result, agreement) = combine(&analysis.result, &verdict, &self.engine.config().hybrid);
        debug!(
            "Request {} local={:.3} oracle={:.3} final={:.3} ({:?})",
            id,
            analysis.result.confidence(),
            verdict.confidence(),
            result.confidence(),
            agreement
        );

        report(id, result, ReportPath::Hybrid, status, Some(agreement))
    }

    /// Classify many requests with bounded concurrency; output keeps input order
    pub async fn detect_batch(&self, requests: Vec<DetectionRequest>, concurrency: usize) -> Vec<DetectionReport> {
        let total = requests.len();
        let reports: Vec<DetectionReport> = stream::iter(requests)
            .map(|request| self.detect(request))
            .buffered(concurrency.max(1))
            .collect()
            .await;

        let flagged = reports.iter().filter(|r| r.result.is_scam()).count();
        let unavailable = reports
            .iter()
            .filter(|r| r.oracle == OracleStatus::Unavailable)
            .count();
        info!(
            "Batch complete: {} messages, {} flagged, {} oracle failures",
            total, flagged, unavailable
        );

        reports
    }
}

fn report(
    id: String,
    result: DetectionResult,
    path: ReportPath,
    oracle: OracleStatus,
    agreement: Option<Agreement>,
) -> DetectionReport {
    DetectionReport {
        id,
        result,
        path,
        oracle,
        agreement,
        analyzed_at: Utc::now(),
    }
}

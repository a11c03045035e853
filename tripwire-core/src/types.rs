//! Detection data model
//!
//! Value types shared by every stage of the pipeline:
//! - Risk levels and scam-type definitions loaded from the library
//! - Evidence signals produced by the extractors
//! - The final detection verdict
//! - Caller-supplied conversation inputs (history, sender, context)

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Coarse risk category attached to a scam type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskLevel {
    /// Parse a library risk label, case-insensitively
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// One catalogued scam category, compiled and ready for matching.
///
/// Built once when the library loads and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ScamTypeDefinition {
    /// Identifier (e.g. `LOTTERY_PRIZE_SCAM`)
    pub id: String,
    /// Category label
    pub category: String,
    /// Risk level; `None` when the library declared an unrecognised label
    pub risk_level: Option<RiskLevel>,
    /// Declared confidence weight, clamped to [0, 1]
    pub confidence_weight: Option<f64>,
    /// Lower-cased keyword phrases
    pub keywords: Vec<String>,
    /// Patterns that compiled, in declaration order
    pub patterns: Vec<Regex>,
    /// Number of patterns declared in the source (compiled or not)
    pub declared_patterns: usize,
    /// Intent labels
    pub intent_signals: Vec<String>,
    /// Documentation-only sample messages
    pub example_messages: Vec<String>,
}

/// Kind of evidence a signal represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Keyword,
    Regex,
    Psychological,
    Entity,
    Intent,
}

/// A named unit of evidence produced by one extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSignal {
    pub kind: SignalKind,
    /// Raw score contribution of this piece of evidence
    pub score: f64,
    /// Human-readable label (also used as the verdict indicator)
    pub label: String,
}

impl DetectionSignal {
    pub fn new(kind: SignalKind, score: f64, label: impl Into<String>) -> Self {
        Self {
            kind,
            score,
            label: label.into(),
        }
    }
}

/// The engine's verdict for one message.
///
/// Construction normalizes the fields: confidence is clamped to [0, 1],
/// indicators are unique and non-empty (first occurrence wins), and
/// `scam_type` is only kept when `is_scam` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDetectionResult")]
pub struct DetectionResult {
    is_scam: bool,
    confidence: f64,
    indicators: Vec<String>,
    scam_type: Option<String>,
}

impl DetectionResult {
    pub fn new<I, S>(is_scam: bool, confidence: f64, indicators: I, scam_type: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            is_scam,
            confidence,
            indicators: dedup_indicators(indicators),
            scam_type: if is_scam {
                scam_type.filter(|t| !t.trim().is_empty())
            } else {
                None
            },
        }
    }

    /// Deterministic verdict used when the oracle is unavailable
    pub fn null() -> Self {
        Self::new(false, 0.0, Vec::<String>::new(), None)
    }

    pub fn is_scam(&self) -> bool {
        self.is_scam
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn indicators(&self) -> &[String] {
        &self.indicators
    }

    pub fn scam_type(&self) -> Option<&str> {
        self.scam_type.as_deref()
    }
}

#[derive(Deserialize)]
struct RawDetectionResult {
    #[serde(default)]
    is_scam: bool,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    indicators: Vec<String>,
    #[serde(default)]
    scam_type: Option<String>,
}

impl From<RawDetectionResult> for DetectionResult {
    fn from(raw: RawDetectionResult) -> Self {
        Self::new(raw.is_scam, raw.confidence, raw.indicators, raw.scam_type)
    }
}

/// Order-preserving dedup that drops empty labels
pub fn dedup_indicators<I, S>(indicators: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for indicator in indicators {
        let indicator: String = indicator.into();
        let trimmed = indicator.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            out.push(trimmed.to_string());
        }
    }
    out
}

/// One prior message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    #[serde(alias = "message", alias = "content")]
    pub text: String,
}

impl HistoryMessage {
    pub fn new(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            text: text.to_string(),
        }
    }
}

/// Sender metadata supplied alongside a message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SenderInfo {
    #[serde(default)]
    pub sender_id: String,
    /// Any additional metadata (phone, email, ...); not read by the engine
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl SenderInfo {
    pub fn with_id(sender_id: &str) -> Self {
        Self {
            sender_id: sender_id.to_string(),
            extra: HashMap::new(),
        }
    }
}

/// Externally owned conversation state, read-only to the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    /// Number of prior turns in this conversation
    #[serde(default)]
    pub turn_count: usize,
    /// Elapsed engagement time in seconds
    #[serde(default)]
    pub engagement_secs: f64,
    /// Scam type established on an earlier turn, if any
    #[serde(default)]
    pub scam_type: Option<String>,
}

impl ConversationContext {
    pub fn from_history(history: &[HistoryMessage]) -> Self {
        Self {
            turn_count: history.len(),
            ..Default::default()
        }
    }
}

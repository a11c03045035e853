//! Engine configuration
//!
//! Every weight, cap, threshold and multiplier used by the scoring
//! pipeline lives here. Defaults reproduce the tuned production values;
//! a TOML document may override any subset of keys.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::RiskLevel;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Weights applied to each signal score during fusion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    pub keyword: f64,
    pub regex: f64,
    pub psychological: f64,
    pub entity: f64,
    pub type_confidence: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            keyword: 0.12,
            regex: 0.35,
            psychological: 0.18,
            entity: 0.15,
            type_confidence: 0.20,
        }
    }
}

/// Per-hit increments and caps for the extractors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub keyword_per_hit: f64,
    pub keyword_cap: f64,
    pub keyword_max_indicators: usize,
    pub regex_per_match: f64,
    pub regex_cap: f64,
    pub regex_max_indicators: usize,
    /// Pattern matches a scam type needs before it becomes a candidate
    pub candidate_min_matches: usize,
    pub trigger_per_category: f64,
    pub trigger_cap: f64,
    pub entity_upi: f64,
    pub entity_phone: f64,
    pub entity_url: f64,
    pub entity_short_url: f64,
    pub entity_suspicious_domain: f64,
    pub entity_account_number: f64,
    pub entity_cap: f64,
    /// Type confidence used when a candidate declares no weight
    pub default_type_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            keyword_per_hit: 0.08,
            keyword_cap: 0.9,
            keyword_max_indicators: 10,
            regex_per_match: 0.30,
            regex_cap: 0.95,
            regex_max_indicators: 10,
            candidate_min_matches: 2,
            trigger_per_category: 0.18,
            trigger_cap: 0.95,
            entity_upi: 0.35,
            entity_phone: 0.25,
            entity_url: 0.35,
            entity_short_url: 0.50,
            entity_suspicious_domain: 0.35,
            entity_account_number: 0.25,
            entity_cap: 0.95,
            default_type_weight: 0.8,
        }
    }
}

/// Multi-indicator bonuses and the critical-type boost.
///
/// Bonuses are additive and applied before the multiplicative boost.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub multi_indicator_min: usize,
    pub multi_indicator_bonus: f64,
    pub extended_indicator_min: usize,
    pub extended_indicator_bonus: f64,
    pub critical_boost_factor: f64,
    /// Scam types with known low recall that receive the boost
    pub critical_boost_types: Vec<String>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            multi_indicator_min: 3,
            multi_indicator_bonus: 0.10,
            extended_indicator_min: 5,
            extended_indicator_bonus: 0.08,
            critical_boost_factor: 1.20,
            critical_boost_types: vec![
                "CRYPTO_INVESTMENT_FRAUD".to_string(),
                "QR_CODE_PAYMENT_TRAP".to_string(),
                "PHISHING_LINKS".to_string(),
                "TECH_SUPPORT_SCAM".to_string(),
                "FAKE_REFUND_CHARGEBACK".to_string(),
            ],
        }
    }
}

/// Acceptance threshold per risk level
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
    /// Used when no scam type was resolved or its risk level is unknown
    pub default: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            critical: 0.40,
            high: 0.48,
            medium: 0.55,
            low: 0.60,
            default: 0.50,
        }
    }
}

impl ThresholdConfig {
    pub fn for_risk(&self, risk: RiskLevel) -> f64 {
        match risk {
            RiskLevel::Critical => self.critical,
            RiskLevel::High => self.high,
            RiskLevel::Medium => self.medium,
            RiskLevel::Low => self.low,
        }
    }
}

/// Message-shape and sender adjustments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub long_conversation_turns: usize,
    pub long_conversation_factor: f64,
    pub short_message_len: usize,
    pub short_message_factor: f64,
    pub all_caps_min_len: usize,
    pub all_caps_factor: f64,
    pub exclamation_min: usize,
    pub exclamation_factor: f64,
    pub trusted_sender_factor: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            long_conversation_turns: 5,
            long_conversation_factor: 0.95,
            short_message_len: 20,
            short_message_factor: 0.85,
            all_caps_min_len: 20,
            all_caps_factor: 1.10,
            exclamation_min: 3,
            exclamation_factor: 1.15,
            trusted_sender_factor: 0.5,
        }
    }
}

/// Local/oracle reconciliation cut-offs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    /// Confidence at which a single side is trusted outright
    pub trust_threshold: f64,
    /// Averaged confidence needed when only one side flags a scam
    pub weak_average_threshold: f64,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            trust_threshold: 0.75,
            weak_average_threshold: 0.50,
        }
    }
}

/// Complete, immutable engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: SignalWeights,
    pub scoring: ScoringConfig,
    pub fusion: FusionConfig,
    pub thresholds: ThresholdConfig,
    pub context: ContextConfig,
    pub hybrid: HybridConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        for (name, value) in [
            ("weights.keyword", w.keyword),
            ("weights.regex", w.regex),
            ("weights.psychological", w.psychological),
            ("weights.entity", w.entity),
            ("weights.type_confidence", w.type_confidence),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!("{} must be >= 0, got {}", name, value)));
            }
        }

        let s = &self.scoring;
        for (name, value) in [
            ("scoring.keyword_per_hit", s.keyword_per_hit),
            ("scoring.keyword_cap", s.keyword_cap),
            ("scoring.regex_per_match", s.regex_per_match),
            ("scoring.regex_cap", s.regex_cap),
            ("scoring.trigger_per_category", s.trigger_per_category),
            ("scoring.trigger_cap", s.trigger_cap),
            ("scoring.entity_upi", s.entity_upi),
            ("scoring.entity_phone", s.entity_phone),
            ("scoring.entity_url", s.entity_url),
            ("scoring.entity_short_url", s.entity_short_url),
            ("scoring.entity_suspicious_domain", s.entity_suspicious_domain),
            ("scoring.entity_account_number", s.entity_account_number),
            ("scoring.entity_cap", s.entity_cap),
            ("fusion.multi_indicator_bonus", self.fusion.multi_indicator_bonus),
            ("fusion.extended_indicator_bonus", self.fusion.extended_indicator_bonus),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!("{} must be >= 0, got {}", name, value)));
            }
        }

        let t = &self.thresholds;
        let h = &self.hybrid;
        for (name, value) in [
            ("thresholds.critical", t.critical),
            ("thresholds.high", t.high),
            ("thresholds.medium", t.medium),
            ("thresholds.low", t.low),
            ("thresholds.default", t.default),
            ("hybrid.trust_threshold", h.trust_threshold),
            ("hybrid.weak_average_threshold", h.weak_average_threshold),
            ("scoring.default_type_weight", self.scoring.default_type_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{} must be in [0, 1], got {}", name, value)));
            }
        }

        let c = &self.context;
        for (name, value) in [
            ("context.long_conversation_factor", c.long_conversation_factor),
            ("context.short_message_factor", c.short_message_factor),
            ("context.all_caps_factor", c.all_caps_factor),
            ("context.exclamation_factor", c.exclamation_factor),
            ("context.trusted_sender_factor", c.trusted_sender_factor),
            ("fusion.critical_boost_factor", self.fusion.critical_boost_factor),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!("{} must be > 0, got {}", name, value)));
            }
        }

        if self.scoring.candidate_min_matches == 0 {
            return Err(ConfigError::Invalid(
                "scoring.candidate_min_matches must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn is_critical_boost_type(&self, scam_type: &str) -> bool {
        self.fusion.critical_boost_types.iter().any(|t| t == scam_type)
    }
}

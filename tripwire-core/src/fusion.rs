//! Confidence fusion and threshold resolution
//!
//! Fusion is a weighted sum of the extractor scores, followed by
//! additive multi-indicator bonuses and then the multiplicative
//! critical-type boost. The order matters: the boost scales the bonuses.

use serde::{Deserialize, Serialize};

use crate::{EngineConfig, RiskLevel};

/// Extractor scores feeding fusion
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalScores {
    pub keyword: f64,
    pub regex: f64,
    pub psychological: f64,
    pub entity: f64,
    pub type_confidence: f64,
}

/// Fuse extractor scores into one composite confidence in [0, 1].
///
/// `indicator_count` is the number of distinct regex, psychological and
/// entity indicators.
pub fn fuse(
    scores: &SignalScores,
    indicator_count: usize,
    scam_type: Option<&str>,
    config: &EngineConfig,
) -> f64 {
    let w = &config.weights;
    let f = &config.fusion;

    let mut composite = scores.keyword * w.keyword
        + scores.regex * w.regex
        + scores.psychological * w.psychological
        + scores.entity * w.entity
        + scores.type_confidence * w.type_confidence;

    if indicator_count >= f.multi_indicator_min {
        composite += f.multi_indicator_bonus;
    }
    if indicator_count >= f.extended_indicator_min {
        composite += f.extended_indicator_bonus;
    }

    if scam_type.is_some_and(|t| config.is_critical_boost_type(t)) {
        composite *= f.critical_boost_factor;
    }

    composite.clamp(0.0, 1.0)
}

/// Acceptance threshold for a classified scam type
pub fn resolve_threshold(scam_type: Option<&str>, risk: Option<RiskLevel>, config: &EngineConfig) -> f64 {
    match (scam_type, risk) {
        (Some(_), Some(risk)) => config.thresholds.for_risk(risk),
        _ => config.thresholds.default,
    }
}

/// Inclusive threshold comparison
pub fn meets_threshold(confidence: f64, threshold: f64) -> bool {
    confidence >= threshold
}

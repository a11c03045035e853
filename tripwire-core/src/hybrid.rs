//! Local/oracle verdict reconciliation
//!
//! Trust order: mutual agreement, then either side confident on its own,
//! then a weak average when only one side flags a scam, and finally a
//! negative default taking the lower confidence.

use serde::{Deserialize, Serialize};

use crate::{dedup_indicators, DetectionResult, HybridConfig};

/// Which rule of the reconciliation policy decided the outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Agreement {
    BothScam,
    LocalConfident,
    OracleConfident,
    WeakAverage,
    BothClean,
}

/// Merge the local engine's verdict with the oracle's
pub fn combine(local: &DetectionResult, oracle: &DetectionResult, config: &HybridConfig) -> (DetectionResult, Agreement) {
    let (confidence, is_scam, agreement) = if local.is_scam() && oracle.is_scam() {
        (local.confidence().max(oracle.confidence()), true, Agreement::BothScam)
    } else if local.confidence() >= config.trust_threshold {
        (local.confidence(), true, Agreement::LocalConfident)
    } else if oracle.confidence() >= config.trust_threshold {
        (oracle.confidence(), true, Agreement::OracleConfident)
    } else if local.is_scam() || oracle.is_scam() {
        let average = (local.confidence() + oracle.confidence()) / 2.0;
        (average, average >= config.weak_average_threshold, Agreement::WeakAverage)
    } else {
        (local.confidence().min(oracle.confidence()), false, Agreement::BothClean)
    };

    let indicators = dedup_indicators(local.indicators().iter().chain(oracle.indicators()).cloned());
    let scam_type = local
        .scam_type()
        .or(oracle.scam_type())
        .map(|t| t.to_string());

    (DetectionResult::new(is_scam, confidence, indicators, scam_type), agreement)
}

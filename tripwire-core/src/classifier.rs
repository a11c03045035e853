//! Scam type classification
//!
//! Picks the best regex candidate and reports its configured weight.

use serde::Serialize;

use crate::{Candidate, PatternLibrary, RiskLevel, ScoringConfig};

/// The scam type a message was classified as
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub scam_type: Option<String>,
    /// Confidence weight of the chosen type (0.0 when none)
    pub type_confidence: f64,
    /// Risk level of the chosen type, if known
    pub risk_level: Option<RiskLevel>,
}

impl Classification {
    pub fn none() -> Self {
        Self {
            scam_type: None,
            type_confidence: 0.0,
            risk_level: None,
        }
    }
}

/// Classify from ranked candidates (most matches first)
pub fn classify(candidates: &[Candidate], library: &PatternLibrary, config: &ScoringConfig) -> Classification {
    let Some(top) = candidates.first() else {
        return Classification::none();
    };

    let definition = library.get(&top.scam_type);
    Classification {
        scam_type: Some(top.scam_type.clone()),
        type_confidence: definition
            .and_then(|d| d.confidence_weight)
            .unwrap_or(config.default_type_weight),
        risk_level: definition.and_then(|d| d.risk_level),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StrSource;

    fn library() -> PatternLibrary {
        PatternLibrary::load(&StrSource::new(
            "test",
            r#"{"scam_types": [
                {"scam_type": "WEIGHTED", "risk_level": "critical", "confidence_weight": 0.95},
                {"scam_type": "UNWEIGHTED", "risk_level": "low"}
            ]}"#,
        ))
        .library
    }

    fn candidate(id: &str, matches: usize) -> Candidate {
        Candidate {
            scam_type: id.to_string(),
            matches,
        }
    }

    #[test]
    fn test_no_candidates() {
        let result = classify(&[], &library(), &ScoringConfig::default());
        assert_eq!(result, Classification::none());
    }

    #[test]
    fn test_top_candidate_weight() {
        let candidates = [candidate("WEIGHTED", 4), candidate("UNWEIGHTED", 2)];
        let result = classify(&candidates, &library(), &ScoringConfig::default());
        assert_eq!(result.scam_type.as_deref(), Some("WEIGHTED"));
        assert_eq!(result.type_confidence, 0.95);
        assert_eq!(result.risk_level, Some(RiskLevel::Critical));
    }

    #[test]
    fn test_missing_weight_uses_default() {
        let candidates = [candidate("UNWEIGHTED", 3)];
        let result = classify(&candidates, &library(), &ScoringConfig::default());
        assert_eq!(result.type_confidence, 0.8);
        assert_eq!(result.risk_level, Some(RiskLevel::Low));
    }
}

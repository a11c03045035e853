//! Rule Engine
//!
//! The local scoring pipeline:
//! whitelist → extractors → classifier → fusion → context → threshold.
//!
//! The engine is a pure function of its inputs and the immutable library
//! and config it was built with. Clones share both via `Arc`, so one
//! engine can serve any number of concurrent callers.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::{
    adjust, classify, fuse, meets_threshold, resolve_threshold, score_entities, score_keywords,
    score_patterns, score_triggers, Classification, ConversationContext, DetectionResult,
    DetectionSignal, EngineConfig, HistoryMessage, MessageShape, PatternLibrary, SenderInfo,
    SignalScores, Whitelist,
};

/// Which branch of the pipeline produced a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionPath {
    Whitelisted,
    Scored,
}

/// Full breakdown of one local detection
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub result: DetectionResult,
    pub path: DetectionPath,
    /// Every signal produced, in extractor order
    pub signals: Vec<DetectionSignal>,
    pub scores: SignalScores,
    pub classification: Classification,
    /// Confidence after fusion, before contextual adjustment
    pub fused: f64,
    /// Acceptance threshold applied (absent on the whitelist path)
    pub threshold: Option<f64>,
}

/// Local rule-based scam detector
#[derive(Debug, Clone)]
pub struct RuleEngine {
    library: Arc<PatternLibrary>,
    config: Arc<EngineConfig>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(PatternLibrary::embedded(), EngineConfig::default())
    }
}

impl RuleEngine {
    pub fn new(library: PatternLibrary, config: EngineConfig) -> Self {
        Self {
            library: Arc::new(library),
            config: Arc::new(config),
        }
    }

    /// Engine with the embedded library and default tuning
    pub fn embedded() -> Self {
        Self::default()
    }

    pub fn library(&self) -> &PatternLibrary {
        &self.library
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Verdict only
    pub fn detect(&self, message: &str, history: &[HistoryMessage], sender: Option<&SenderInfo>) -> DetectionResult {
        self.analyze(message, history, sender).result
    }

    /// Score a message; prior history only contributes its length
    pub fn analyze(&self, message: &str, history: &[HistoryMessage], sender: Option<&SenderInfo>) -> Analysis {
        self.analyze_in_context(message, &ConversationContext::from_history(history), sender)
    }

    /// Score a message against externally tracked conversation state
    pub fn analyze_in_context(
        &self,
        message: &str,
        context: &ConversationContext,
        sender: Option<&SenderInfo>,
    ) -> Analysis {
        let whitelist = self.library.whitelist();
        if whitelist.is_whitelisted(message, sender) {
            debug!("Message whitelisted, skipping scoring");
            return Analysis {
                result: Whitelist::verdict(),
                path: DetectionPath::Whitelisted,
                signals: Vec::new(),
                scores: SignalScores::default(),
                classification: Classification::none(),
                fused: 0.0,
                threshold: None,
            };
        }

        let scoring = &self.config.scoring;
        let keywords = score_keywords(message, &self.library, scoring);
        let patterns = score_patterns(message, &self.library, scoring);
        let triggers = score_triggers(message, scoring);
        let entities = score_entities(message, scoring);

        let classification = classify(&patterns.candidates, &self.library, scoring);

        let scores = SignalScores {
            keyword: keywords.score,
            regex: patterns.score.score,
            psychological: triggers.score,
            entity: entities.score,
            type_confidence: classification.type_confidence,
        };

        // Keyword hits do not count towards the indicator bonuses
        let mut counted: Vec<&str> = patterns
            .score
            .labels()
            .chain(triggers.labels())
            .chain(entities.labels())
            .collect();
        counted.sort_unstable();
        counted.dedup();

        let fused = fuse(&scores, counted.len(), classification.scam_type.as_deref(), &self.config);

        let shape = MessageShape {
            message,
            prior_turns: context.turn_count,
            sender,
        };
        let confidence = adjust(fused, &shape, whitelist, &self.config.context);

        let threshold = resolve_threshold(
            classification.scam_type.as_deref(),
            classification.risk_level,
            &self.config,
        );
        let is_scam = meets_threshold(confidence, threshold);

        let signals: Vec<DetectionSignal> = keywords
            .signals
            .into_iter()
            .chain(patterns.score.signals)
            .chain(triggers.signals)
            .chain(entities.signals)
            .collect();

        debug!(
            "Scores kw={:.2} re={:.2} psy={:.2} ent={:.2} type={:.2} ({:?}) fused={:.3} adjusted={:.3} threshold={:.2}",
            scores.keyword,
            scores.regex,
            scores.psychological,
            scores.entity,
            scores.type_confidence,
            classification.scam_type,
            fused,
            confidence,
            threshold
        );

        let result = DetectionResult::new(
            is_scam,
            confidence,
            signals.iter().map(|s| s.label.clone()),
            classification.scam_type.clone(),
        );

        Analysis {
            result,
            path: DetectionPath::Scored,
            signals,
            scores,
            classification,
            fused,
            threshold: Some(threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StrSource;

    const TEST_LIBRARY: &str = r#"{
        "scam_types": [
            {
                "scam_type": "PRIZE",
                "risk_level": "high",
                "confidence_weight": 0.9,
                "keywords": ["prize money", "processing fee"],
                "regex_patterns": ["\\bwon\\b", "\\bprize\\b", "lottery", "processing fee"]
            },
            {
                "scam_type": "PHISHING_LINKS",
                "risk_level": "critical",
                "confidence_weight": 0.95,
                "keywords": ["verify"],
                "regex_patterns": ["verify", "click", "link"]
            }
        ]
    }"#;

    fn test_engine() -> RuleEngine {
        let load = PatternLibrary::load(&StrSource::new("test", TEST_LIBRARY));
        assert!(load.issues.is_empty());
        RuleEngine::new(load.library, EngineConfig::default())
    }

    const PRIZE_MESSAGE: &str = "Congratulations! You have won Rs. 50,000 prize money... send processing fee of Rs. 500 to 9876543210@paytm. Hurry, offer valid for 24 hours only!";

    #[test]
    fn test_prize_scenario() {
        let engine = RuleEngine::embedded();
        let analysis = engine.analyze(PRIZE_MESSAGE, &[], None);
        let result = &analysis.result;

        assert_eq!(analysis.path, DetectionPath::Scored);
        assert!(result.is_scam());
        assert!(result.confidence() >= 0.75, "confidence {}", result.confidence());
        assert!(result.indicators().iter().any(|i| i == "entity: UPI_ID"));
        assert!(result.indicators().iter().any(|i| i == "trigger: greed"));
        assert!(result.indicators().iter().any(|i| i == "trigger: urgency"));
        assert_eq!(result.scam_type(), Some("LOTTERY_PRIZE_SCAM"));
    }

    #[test]
    fn test_benign_scenario() {
        let engine = RuleEngine::embedded();
        let analysis = engine.analyze("Hi Mom, I'll be home by 7pm.", &[], None);
        assert!(analysis.signals.is_empty());
        assert!(!analysis.result.is_scam());
        assert!(analysis.result.confidence() < 0.05);
        assert!(analysis.result.indicators().is_empty());
    }

    #[test]
    fn test_whitelisted_sender_scenario() {
        let engine = RuleEngine::embedded();
        let sender = SenderInfo::with_id("HDFCBK");

        for message in ["Your account will be blocked", PRIZE_MESSAGE] {
            let analysis = engine.analyze(message, &[], Some(&sender));
            assert_eq!(analysis.path, DetectionPath::Whitelisted);
            assert!(!analysis.result.is_scam());
            assert_eq!(analysis.result.confidence(), 0.1);
            assert_eq!(analysis.result.indicators(), ["whitelisted"]);
            assert!(analysis.threshold.is_none());
        }
    }

    #[test]
    fn test_lookalike_government_host_is_scored() {
        let engine = RuleEngine::embedded();
        let analysis = engine.analyze(
            "URGENT: your tax refund is pending, verify at incometax.gov.in.refund-claim.xyz and pay fee to 9876543210@paytm within 2 hours",
            &[],
            None,
        );
        assert_eq!(analysis.path, DetectionPath::Scored);
        assert!(analysis.result.is_scam());
    }

    #[test]
    fn test_all_caps_scales_confidence_exactly() {
        let engine = test_engine();
        let mixed = "you have won a prize, claim it today";
        let upper = mixed.to_uppercase();

        let mixed = engine.detect(mixed, &[], None).confidence();
        let upper = engine.detect(&upper, &[], None).confidence();

        assert!(mixed > 0.0);
        assert!((upper - mixed * 1.10).abs() < 1e-12);
    }

    #[test]
    fn test_breakdown() {
        let engine = test_engine();
        let analysis = engine.analyze("you have won a prize, claim it today", &[], None);

        assert_eq!(analysis.classification.scam_type.as_deref(), Some("PRIZE"));
        assert_eq!(analysis.scores.type_confidence, 0.9);
        assert!((analysis.scores.regex - 0.6).abs() < 1e-12);
        assert!((analysis.scores.psychological - 0.18).abs() < 1e-12);
        assert_eq!(analysis.threshold, Some(0.48));

        let expected = 0.6 * 0.35 + 0.18 * 0.18 + 0.9 * 0.20;
        assert!((analysis.fused - expected).abs() < 1e-12);
        assert!((analysis.result.confidence() - expected).abs() < 1e-12);
        assert!(!analysis.result.is_scam());
        assert!(analysis.result.scam_type().is_none());
    }

    #[test]
    fn test_adding_dominant_match_never_lowers_confidence() {
        let engine = test_engine();
        let base = engine.detect("you have won a prize", &[], None);
        let more = engine.detect("you have won a prize in the lottery", &[], None);

        assert!(more.confidence() >= base.confidence());
        assert!(more.is_scam());
        assert_eq!(more.scam_type(), Some("PRIZE"));
    }

    #[test]
    fn test_long_conversation_context() {
        let engine = test_engine();
        let message = "you have won a prize, claim it today";
        let fresh = engine.detect(message, &[], None).confidence();

        let context = ConversationContext {
            turn_count: 6,
            ..Default::default()
        };
        let late = engine.analyze_in_context(message, &context, None).result.confidence();
        assert!((late - fresh * 0.95).abs() < 1e-12);

        let history: Vec<HistoryMessage> = (0..6).map(|i| HistoryMessage::new("user", &format!("turn {}", i))).collect();
        assert_eq!(engine.detect(message, &history, None).confidence(), late);
    }

    #[test]
    fn test_deterministic() {
        let engine = RuleEngine::embedded();
        let sender = SenderInfo::with_id("VK-PRIZES");
        let first = engine.detect(PRIZE_MESSAGE, &[], Some(&sender));
        for _ in 0..5 {
            assert_eq!(engine.detect(PRIZE_MESSAGE, &[], Some(&sender)), first);
        }
    }

    #[test]
    fn test_empty_message() {
        let engine = RuleEngine::embedded();
        let result = engine.detect("", &[], None);
        assert!(!result.is_scam());
        assert_eq!(result.confidence(), 0.0);
        assert!(result.indicators().is_empty());
    }

    #[test]
    fn test_empty_library_degrades_to_trigger_and_entity_scoring() {
        let engine = RuleEngine::new(PatternLibrary::empty(), EngineConfig::default());
        let analysis = engine.analyze(PRIZE_MESSAGE, &[], None);
        assert_eq!(analysis.scores.keyword, 0.0);
        assert_eq!(analysis.scores.regex, 0.0);
        assert!(analysis.classification.scam_type.is_none());
        assert!(analysis.scores.entity > 0.0);
        assert_eq!(analysis.threshold, Some(0.5));
    }

    #[test]
    fn test_confidence_bounds_over_library_examples() {
        let engine = RuleEngine::embedded();
        let mut messages: Vec<String> = engine
            .library()
            .scam_types()
            .iter()
            .flat_map(|t| t.example_messages.iter().cloned())
            .collect();
        messages.push("URGENT!!! VERIFY NOW!!! CLICK https://bit.ly/x1 AND PAY 9876543210@ybl!!!".to_string());
        messages.push("!!!!!!!!".to_string());

        for message in &messages {
            let confidence = engine.detect(message, &[], None).confidence();
            assert!((0.0..=1.0).contains(&confidence), "{} -> {}", message, confidence);
        }
    }

    #[test]
    fn test_clones_share_library() {
        let engine = test_engine();
        let clone = engine.clone();
        assert!(std::ptr::eq(engine.library(), clone.library()));
    }
}

//! Signal extractors
//!
//! Four independent scorers over the raw message text:
//! - Keyword matcher (library keywords)
//! - Regex matcher (library patterns, also yields scam-type candidates)
//! - Psychological trigger matcher (six fixed manipulation categories)
//! - Entity extractor (UPI IDs, phone/account numbers, URLs, domains)

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::{DetectionSignal, PatternLibrary, ScoringConfig, SignalKind};

/// Score and evidence produced by one extractor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalScore {
    /// Capped extractor score in [0, 1]
    pub score: f64,
    pub signals: Vec<DetectionSignal>,
}

impl SignalScore {
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.signals.iter().map(|s| s.label.as_str())
    }
}

/// A scam type that accrued enough pattern matches to be classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub scam_type: String,
    pub matches: usize,
}

/// Regex extractor output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegexScore {
    pub score: SignalScore,
    /// Qualifying scam types, most matches first (ties keep library order)
    pub candidates: Vec<Candidate>,
    /// Total pattern matches across all scam types
    pub total_matches: usize,
}

/// Count distinct library keywords present in the message
pub fn score_keywords(message: &str, library: &PatternLibrary, config: &ScoringConfig) -> SignalScore {
    let message_lower = message.to_lowercase();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut hits = 0usize;
    let mut signals = Vec::new();

    for scam_type in library.scam_types() {
        for keyword in &scam_type.keywords {
            if !message_lower.contains(keyword.as_str()) || !seen.insert(keyword.as_str()) {
                continue;
            }
            hits += 1;
            if signals.len() < config.keyword_max_indicators {
                signals.push(DetectionSignal::new(
                    SignalKind::Keyword,
                    config.keyword_per_hit,
                    format!("keyword: {}", keyword),
                ));
            }
        }
    }

    SignalScore {
        score: (hits as f64 * config.keyword_per_hit).min(config.keyword_cap),
        signals,
    }
}

/// Run every compiled library pattern against the message
pub fn score_patterns(message: &str, library: &PatternLibrary, config: &ScoringConfig) -> RegexScore {
    let mut total_matches = 0usize;
    let mut signals = Vec::new();
    let mut candidates = Vec::new();

    for scam_type in library.scam_types() {
        let matches = scam_type.patterns.iter().filter(|re| re.is_match(message)).count();
        if matches == 0 {
            continue;
        }
        total_matches += matches;

        if signals.len() < config.regex_max_indicators {
            signals.push(DetectionSignal::new(
                SignalKind::Regex,
                matches as f64 * config.regex_per_match,
                format!("pattern: {}", scam_type.id),
            ));
        }

        if matches >= config.candidate_min_matches {
            candidates.push(Candidate {
                scam_type: scam_type.id.clone(),
                matches,
            });
        }
    }

    // Stable sort keeps library order between equal counts
    candidates.sort_by(|a, b| b.matches.cmp(&a.matches));

    RegexScore {
        score: SignalScore {
            score: (total_matches as f64 * config.regex_per_match).min(config.regex_cap),
            signals,
        },
        candidates,
        total_matches,
    }
}

/// Manipulation categories and their patterns (matched on lower-cased text)
static TRIGGER_CATEGORIES: LazyLock<Vec<(&'static str, Vec<Regex>)>> = LazyLock::new(|| {
    let categories: [(&str, &[&str]); 6] = [
        ("urgency", &[
            r"\b(urgent|immediately|right now|within \d+ hours?|hurry|quick|asap|today only|expires today|last chance)\b",
            r"\b(before|deadline|limited time|act now|don't wait|time running out)\b",
        ]),
        ("fear", &[
            r"\b(blocked|suspended|arrested|seized|frozen|terminated|cancelled|deactivate)\b",
            r"\b(lose|lost|theft|hack|fraud|scam|stolen|illegal|crime|police|court)\b",
        ]),
        ("authority", &[
            r"\b(bank|rbi|government|police|court|officer|official|department|ministry)\b",
            r"\b(compliance|mandatory|required|regulation|law|legal|authorized)\b",
        ]),
        ("greed", &[
            r"\b(won|winner|prize|reward|free|cashback|bonus|profit|earn|income)\b",
            r"(\b\d+%|\b(guaranteed|risk-free|passive income|double|triple|jackpot)\b)",
        ]),
        ("secrecy", &[
            r"\b(don't tell|keep secret|confidential|private|between us|don't inform)\b",
            r"\b(don't call|don't contact|don't share|only you)\b",
        ]),
        ("social_proof", &[
            r"\b(i made|i earned|my friend|everyone|thousands of people|success story)\b",
            r"\b(testimonial|proven|verified|trusted|recommended|join us)\b",
        ]),
    ];

    categories
        .iter()
        .map(|(name, patterns)| {
            let compiled = patterns.iter().map(|p| Regex::new(p).unwrap()).collect();
            (*name, compiled)
        })
        .collect()
});

/// Names of the psychological trigger categories, in evaluation order
pub fn trigger_categories() -> Vec<&'static str> {
    TRIGGER_CATEGORIES.iter().map(|(name, _)| *name).collect()
}

/// Score manipulation tactics; each category counts once
pub fn score_triggers(message: &str, config: &ScoringConfig) -> SignalScore {
    let message_lower = message.to_lowercase();
    let mut signals = Vec::new();

    for (category, patterns) in TRIGGER_CATEGORIES.iter() {
        if patterns.iter().any(|re| re.is_match(&message_lower)) {
            signals.push(DetectionSignal::new(
                SignalKind::Psychological,
                config.trigger_per_category,
                format!("trigger: {}", category),
            ));
        }
    }

    SignalScore {
        score: (signals.len() as f64 * config.trigger_per_category).min(config.trigger_cap),
        signals,
    }
}

static UPI_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._-]+@(paytm|phonepe|okaxis|okicici|okhdfc|oksbi|ybl|axl|ibl|apl)\b").unwrap()
});

static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[0-9]{10,15}\b").unwrap()
});

static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://[a-z0-9.-]+\.[a-z]{2,}").unwrap()
});

static SHORT_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(bit\.ly|tinyurl\.com|goo\.gl|t\.co|ow\.ly)/[a-z0-9]+").unwrap()
});

static SUSPICIOUS_DOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(xyz|online|club|top|site|co\.in)\b").unwrap()
});

static ACCOUNT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[0-9]{9,18}\b").unwrap()
});

/// Detect suspicious entities; each entity kind counts once
pub fn score_entities(message: &str, config: &ScoringConfig) -> SignalScore {
    let checks: [(&LazyLock<Regex>, &str, f64); 6] = [
        (&UPI_REGEX, "UPI_ID", config.entity_upi),
        (&PHONE_REGEX, "PHONE_NUMBER", config.entity_phone),
        (&URL_REGEX, "URL", config.entity_url),
        (&SHORT_URL_REGEX, "SHORT_URL", config.entity_short_url),
        (&SUSPICIOUS_DOMAIN_REGEX, "SUSPICIOUS_DOMAIN", config.entity_suspicious_domain),
        (&ACCOUNT_REGEX, "ACCOUNT_NUMBER", config.entity_account_number),
    ];

    let mut score = 0.0;
    let mut signals = Vec::new();

    for (regex, name, weight) in checks {
        if regex.is_match(message) {
            score += weight;
            signals.push(DetectionSignal::new(SignalKind::Entity, weight, format!("entity: {}", name)));
        }
    }

    SignalScore {
        score: score.min(config.entity_cap),
        signals,
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
                {"scam_type": "A", "keywords": ["prize", "claim now"], "regex_patterns": ["prize", "claim", "fee"]},
                {"scam_type": "B", "keywords": ["prize", "bank"], "regex_patterns": ["bank", "kyc", "claim"]},
                {"scam_type": "C", "keywords": [], "regex_patterns": ["fee", "prize"]}
            ]}"#,
        ))
        .library
    }

    #[test]
    fn test_keywords_counted_once_across_types() {
        let config = ScoringConfig::default();
        let score = score_keywords("Claim now: your PRIZE is waiting at the bank", &library(), &config);
        // prize, claim now, bank
        assert_eq!(score.signals.len(), 3);
        assert!((score.score - 0.24).abs() < 1e-9);
    }

    #[test]
    fn test_keyword_score_capped_and_indicators_limited() {
        let keywords: Vec<String> = (0..15).map(|i| format!("\"kw{:02}\"", i)).collect();
        let json = format!(r#"{{"scam_types": [{{"scam_type": "K", "keywords": [{}]}}]}}"#, keywords.join(","));
        let library = PatternLibrary::load(&StrSource::new("kw", &json)).library;
        let message: String = (0..15).map(|i| format!("kw{:02} ", i)).collect();

        let score = score_keywords(&message, &library, &ScoringConfig::default());
        assert_eq!(score.score, 0.9);
        assert_eq!(score.signals.len(), 10);
    }

    #[test]
    fn test_candidates_need_two_matches_and_rank_by_count() {
        let config = ScoringConfig::default();
        let result = score_patterns("claim your prize, pay the fee", &library(), &config);

        // A: prize, claim, fee (3); B: claim (1); C: fee, prize (2)
        assert_eq!(result.total_matches, 6);
        assert_eq!(result.score.score, 0.95);
        assert_eq!(
            result.candidates,
            vec![
                Candidate { scam_type: "A".to_string(), matches: 3 },
                Candidate { scam_type: "C".to_string(), matches: 2 },
            ]
        );
        let labels: Vec<_> = result.score.labels().collect();
        assert_eq!(labels, vec!["pattern: A", "pattern: B", "pattern: C"]);
    }

    #[test]
    fn test_candidate_ties_keep_library_order() {
        let result = score_patterns("bank kyc fee prize", &library(), &ScoringConfig::default());
        // A: prize, fee (2); B: bank, kyc (2); C: fee, prize (2)
        let order: Vec<_> = result.candidates.iter().map(|c| c.scam_type.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_single_match_scores_but_does_not_qualify() {
        let result = score_patterns("open a bank account", &library(), &ScoringConfig::default());
        assert_eq!(result.total_matches, 1);
        assert!((result.score.score - 0.30).abs() < 1e-9);
        assert!(result.candidates.is_empty());
    }

    #[test]
    fn test_triggers_count_once_per_category() {
        let config = ScoringConfig::default();
        let score = score_triggers("URGENT! Act now, hurry, immediately! You won a prize", &config);
        let labels: Vec<_> = score.labels().collect();
        assert_eq!(labels, vec!["trigger: urgency", "trigger: greed"]);
        assert!((score.score - 0.36).abs() < 1e-9);
    }

    #[test]
    fn test_all_trigger_categories_capped() {
        let message = "urgent: your account is blocked by the bank, you won a prize, \
                       keep secret, thousands of people joined";
        let score = score_triggers(message, &ScoringConfig::default());
        assert_eq!(score.signals.len(), 6);
        assert_eq!(score.score, 0.95);
    }

    #[test]
    fn test_entities() {
        let config = ScoringConfig::default();
        let score = score_entities("send fee to 9876543210@paytm now", &config);
        let labels: Vec<_> = score.labels().collect();
        assert_eq!(labels, vec!["entity: UPI_ID", "entity: PHONE_NUMBER", "entity: ACCOUNT_NUMBER"]);
        assert!((score.score - 0.85).abs() < 1e-9);

        let score = score_entities("verify at https://bit.ly/abc123 or kyc-update.xyz", &config);
        let labels: Vec<_> = score.labels().collect();
        assert_eq!(labels, vec!["entity: URL", "entity: SHORT_URL", "entity: SUSPICIOUS_DOMAIN"]);
        assert_eq!(score.score, 0.95);
    }

    #[test]
    fn test_clean_message_has_no_signals() {
        let config = ScoringConfig::default();
        let message = "Hi Mom, I'll be home by 7pm.";
        assert!(score_keywords(message, &library(), &config).signals.is_empty());
        assert!(score_patterns(message, &library(), &config).score.signals.is_empty());
        assert!(score_triggers(message, &config).signals.is_empty());
        assert!(score_entities(message, &config).signals.is_empty());
    }
}

//! Known-legitimate senders, domains and phrases
//!
//! A whitelisted message skips scoring entirely and receives a fixed
//! low-confidence negative verdict.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

use crate::{compile_pattern, DetectionResult, LibraryError, SenderInfo};

/// Confidence reported for whitelisted messages
pub const WHITELISTED_CONFIDENCE: f64 = 0.1;

/// Indicator reported for whitelisted messages
pub const WHITELISTED_INDICATOR: &str = "whitelisted";

/// Raw whitelist entries as they appear in the library source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhitelistRules {
    /// Regex patterns matched against the lower-cased message
    #[serde(default)]
    pub domains: Vec<String>,
    /// Exact sender identifiers
    #[serde(default)]
    pub sender_ids: Vec<String>,
    /// Fixed phrases, matched case-insensitively as substrings
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Default for WhitelistRules {
    fn default() -> Self {
        Self {
            domains: vec![
                r"\b[a-z0-9.-]+\.gov\.in(?:[/\s]|$)".to_string(),
                r"(?:^|[\s/])(?:www\.)?(?:hdfc|icici|sbi|axis)bank\.com(?:[/\s]|$)".to_string(),
                r"(?:^|[\s/])(?:www\.)?(?:amazon|flipkart)\.in(?:[/\s]|$)".to_string(),
                r"(?:^|[\s/])(?:www\.)?(?:paytm|phonepe|googlepay)\.com(?:[/\s]|$)".to_string(),
            ],
            sender_ids: [
                "HDFCBK", "ICICIB", "SBINB", "AXIBNK", "AMZNIN", "FLIPKT", "PAYTM", "PHONEPE",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            keywords: [
                "order confirmed",
                "booking confirmed",
                "payment successful",
                "transaction alert",
                "otp for login",
                "your appointment",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Compiled whitelist
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    domains: Vec<Regex>,
    sender_ids: HashSet<String>,
    keywords: Vec<String>,
}

impl Whitelist {
    /// Compile rules; invalid domain patterns are dropped and reported
    pub fn compile(rules: &WhitelistRules, issues: &mut Vec<LibraryError>) -> Self {
        let mut domains = Vec::with_capacity(rules.domains.len());
        for pattern in &rules.domains {
            match compile_pattern(pattern) {
                Ok(re) => domains.push(re),
                Err(e) => {
                    let err = LibraryError::PatternCompile {
                        scam_type: "whitelist".to_string(),
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    };
                    warn!("{}", err);
                    issues.push(err);
                }
            }
        }

        Self {
            domains,
            sender_ids: rules.sender_ids.iter().map(|s| s.trim().to_string()).collect(),
            keywords: rules
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Exact sender-ID membership
    pub fn has_sender(&self, sender_id: &str) -> bool {
        self.sender_ids.contains(sender_id)
    }

    /// True when the sender, a fixed phrase or a legitimate domain matches
    pub fn is_whitelisted(&self, message: &str, sender: Option<&SenderInfo>) -> bool {
        let message_lower = message.to_lowercase();

        if self.keywords.iter().any(|k| message_lower.contains(k.as_str())) {
            return true;
        }

        if sender.is_some_and(|s| self.has_sender(&s.sender_id)) {
            return true;
        }

        self.domains.iter().any(|re| re.is_match(&message_lower))
    }

    /// The fixed verdict returned for whitelisted messages
    pub fn verdict() -> DetectionResult {
        DetectionResult::new(false, WHITELISTED_CONFIDENCE, [WHITELISTED_INDICATOR], None)
    }
}

//! Contextual confidence adjustments
//!
//! Multiplicative corrections for conversation length, message shape
//! and sender reputation, applied in a fixed order.

use crate::{ContextConfig, SenderInfo, Whitelist};

/// Message and conversation facts the adjuster reads
#[derive(Debug, Clone, Copy)]
pub struct MessageShape<'a> {
    pub message: &'a str,
    pub prior_turns: usize,
    pub sender: Option<&'a SenderInfo>,
}

/// True when the text has cased letters and none of them are lower-case
pub fn is_all_caps(message: &str) -> bool {
    let mut has_upper = false;
    for c in message.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            has_upper = true;
        }
    }
    has_upper
}

/// Apply every adjustment in order and clamp to [0, 1]
pub fn adjust(confidence: f64, shape: &MessageShape<'_>, whitelist: &Whitelist, config: &ContextConfig) -> f64 {
    let mut adjusted = confidence;
    let length = shape.message.chars().count();

    if shape.prior_turns > config.long_conversation_turns {
        adjusted *= config.long_conversation_factor;
    }

    if length < config.short_message_len {
        adjusted *= config.short_message_factor;
    }

    if length > config.all_caps_min_len && is_all_caps(shape.message) {
        adjusted *= config.all_caps_factor;
    }

    if shape.message.matches('!').count() >= config.exclamation_min {
        adjusted *= config.exclamation_factor;
    }

    if shape.sender.is_some_and(|s| whitelist.has_sender(&s.sender_id)) {
        adjusted *= config.trusted_sender_factor;
    }

    adjusted.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WhitelistRules;

    fn whitelist() -> Whitelist {
        Whitelist::compile(&WhitelistRules::default(), &mut Vec::new())
    }

    fn shape(message: &str) -> MessageShape<'_> {
        MessageShape {
            message,
            prior_turns: 0,
            sender: None,
        }
    }

    #[test]
    fn test_all_caps_detection() {
        assert!(is_all_caps("YOUR ACCOUNT IS BLOCKED 123!"));
        assert!(!is_all_caps("Your account is blocked"));
        assert!(!is_all_caps("12345 !!!"));
    }

    #[test]
    fn test_neutral_message_unchanged() {
        let config = ContextConfig::default();
        let result = adjust(0.5, &shape("a perfectly ordinary sentence here"), &whitelist(), &config);
        assert_eq!(result, 0.5);
    }

    #[test]
    fn test_long_conversation_dampens() {
        let config = ContextConfig::default();
        let message = "a perfectly ordinary sentence here";
        let mut s = shape(message);
        s.prior_turns = 5;
        assert_eq!(adjust(0.5, &s, &whitelist(), &config), 0.5);
        s.prior_turns = 6;
        assert!((adjust(0.5, &s, &whitelist(), &config) - 0.475).abs() < 1e-12);
    }

    #[test]
    fn test_short_message_dampens() {
        let config = ContextConfig::default();
        assert!((adjust(0.5, &shape("send otp now"), &whitelist(), &config) - 0.425).abs() < 1e-12);
    }

    #[test]
    fn test_caps_and_exclamations_compose() {
        let config = ContextConfig::default();
        let result = adjust(0.5, &shape("CLAIM YOUR REWARD TODAY!!!"), &whitelist(), &config);
        assert!((result - 0.5 * 1.10 * 1.15).abs() < 1e-12);
    }

    #[test]
    fn test_caps_requires_length_over_cutoff() {
        let config = ContextConfig::default();
        // exactly 20 chars: neither short nor long enough for the caps boost
        let message = "ABCDEFGHIJ KLMNOPQRS";
        assert_eq!(message.chars().count(), 20);
        assert_eq!(adjust(0.5, &shape(message), &whitelist(), &config), 0.5);
    }

    #[test]
    fn test_trusted_sender_halves() {
        let config = ContextConfig::default();
        let sender = SenderInfo::with_id("SBINB");
        let s = MessageShape {
            message: "a perfectly ordinary sentence here",
            prior_turns: 0,
            sender: Some(&sender),
        };
        assert_eq!(adjust(0.5, &s, &whitelist(), &config), 0.25);
    }

    #[test]
    fn test_clamped_to_one() {
        let config = ContextConfig::default();
        assert_eq!(adjust(0.95, &shape("SEND MONEY RIGHT NOW!!! HURRY!!!"), &whitelist(), &config), 1.0);
    }
}

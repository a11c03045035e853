//! Fast-path detection for unambiguous scams
//!
//! Cheap vocabulary checks run before the full pipeline. A hit returns a
//! fixed high-confidence verdict and bypasses the whitelist, the rule
//! engine and the oracle.

use crate::DetectionResult;

const BANKING_TERMS: &[&str] = &[
    "bank", "account", "sbi", "hdfc", "icici", "axis", "debit card", "credit card", "atm",
];

const OTP_TERMS: &[&str] = &[
    "otp", "one time password", "one-time password", "verification code", "security code", "pin", "cvv",
];

const URGENCY_TERMS: &[&str] = &[
    "urgent", "immediately", "blocked", "suspended", "locked", "compromised", "expire", "within",
    "hours", "minutes",
];

const SHARING_VERBS: &[&str] = &["share", "send", "provide"];

const CREDENTIAL_TERMS: &[&str] = &["account number", "card number"];

/// Confidence of the banking-phishing shortcut
pub const BANKING_PHISHING_CONFIDENCE: f64 = 0.95;

/// Confidence of the credential-request shortcut
pub const CREDENTIAL_REQUEST_CONFIDENCE: f64 = 0.92;

fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| text.contains(t))
}

/// Return a verdict immediately for obvious banking/OTP phishing
pub fn fast_path(message: &str) -> Option<DetectionResult> {
    let message_lower = message.to_lowercase();

    let has_banking = contains_any(&message_lower, BANKING_TERMS);
    let has_otp = contains_any(&message_lower, OTP_TERMS);
    let has_urgency = contains_any(&message_lower, URGENCY_TERMS);

    if has_banking && (has_otp || (has_urgency && message_lower.contains("account"))) {
        return Some(DetectionResult::new(
            true,
            BANKING_PHISHING_CONFIDENCE,
            ["banking_keywords", "otp_request", "urgency", "account_verification"],
            Some("banking_phishing".to_string()),
        ));
    }

    if contains_any(&message_lower, SHARING_VERBS) && (has_otp || contains_any(&message_lower, CREDENTIAL_TERMS)) {
        return Some(DetectionResult::new(
            true,
            CREDENTIAL_REQUEST_CONFIDENCE,
            ["credential_request", "otp_phishing", "urgent_action"],
            Some("phishing".to_string()),
        ));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_with_otp() {
        let result = fast_path("Dear SBI customer, share the OTP sent to your phone").unwrap();
        assert!(result.is_scam());
        assert_eq!(result.confidence(), 0.95);
        assert_eq!(result.scam_type(), Some("banking_phishing"));
        assert_eq!(result.indicators().len(), 4);
    }

    #[test]
    fn test_urgent_account_issue() {
        let result = fast_path("Your account will be blocked within 24 hours").unwrap();
        assert_eq!(result.confidence(), 0.95);
    }

    #[test]
    fn test_credential_request() {
        let result = fast_path("Please send me the verification code you just got").unwrap();
        assert!(result.is_scam());
        assert_eq!(result.confidence(), 0.92);
        assert_eq!(result.scam_type(), Some("phishing"));

        let result = fast_path("Kindly provide your card number to continue").unwrap();
        assert_eq!(result.confidence(), 0.92);
    }

    #[test]
    fn test_no_hit() {
        assert!(fast_path("Hi Mom, I'll be home by 7pm.").is_none());
        assert!(fast_path("Congratulations! You have won a prize").is_none());
        assert!(fast_path("").is_none());
    }
}

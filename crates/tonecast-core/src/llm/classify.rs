//! Classification of provider failures.
//!
//! Both kinds advance the chain. The split exists so attempt logs and
//! operators can tell a flaky or unconfigured backend from one that answered
//! but answered wrongly.

use crate::error::AnalysisError;

/// How a failed attempt is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transient or environmental: timeouts, rate limits (429), server
    /// errors (5xx), connection failures, missing credentials.
    Soft,
    /// The provider answered but the answer was unusable, or the request
    /// itself was rejected (auth failures, bad requests).
    Hard,
}

/// Classify a provider error.
pub fn classify(error: &AnalysisError) -> FailureKind {
    match error {
        AnalysisError::Timeout { .. } | AnalysisError::ProviderUnavailable { .. } => {
            FailureKind::Soft
        }
        AnalysisError::ProviderRequestFailed {
            status_code,
            message,
            ..
        } => {
            // Classify by HTTP status code when available (structured)
            if let Some(code) = status_code {
                return if *code == 429 || (500..=599).contains(code) {
                    FailureKind::Soft
                } else {
                    FailureKind::Hard
                };
            }
            // Fallback for non-HTTP errors (e.g., connection refused, DNS failure)
            if message.contains("timed out") || message.contains("connect") {
                FailureKind::Soft
            } else {
                FailureKind::Hard
            }
        }
        _ => FailureKind::Hard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_failed(status_code: Option<u16>, message: &str) -> AnalysisError {
        AnalysisError::ProviderRequestFailed {
            provider: "gemini".to_string(),
            message: message.to_string(),
            status_code,
        }
    }

    #[test]
    fn test_timeout_is_soft() {
        let err = AnalysisError::Timeout {
            provider: "openai".to_string(),
            timeout_ms: 20_000,
        };
        assert_eq!(classify(&err), FailureKind::Soft);
    }

    #[test]
    fn test_missing_key_is_soft() {
        let err = AnalysisError::ProviderUnavailable {
            provider: "anthropic".to_string(),
        };
        assert_eq!(classify(&err), FailureKind::Soft);
    }

    #[test]
    fn test_rate_limit_and_server_errors_are_soft() {
        assert_eq!(classify(&request_failed(Some(429), "HTTP 429")), FailureKind::Soft);
        assert_eq!(classify(&request_failed(Some(503), "HTTP 503")), FailureKind::Soft);
    }

    #[test]
    fn test_auth_error_is_hard() {
        assert_eq!(classify(&request_failed(Some(401), "HTTP 401")), FailureKind::Hard);
        assert_eq!(classify(&request_failed(Some(400), "HTTP 400")), FailureKind::Hard);
    }

    #[test]
    fn test_message_with_500_in_body_is_hard_without_status() {
        let err = request_failed(None, "Processed 500 tokens successfully");
        assert_eq!(classify(&err), FailureKind::Hard);
    }

    #[test]
    fn test_connection_error_is_soft_without_status() {
        let err = request_failed(None, "request failed: error trying to connect");
        assert_eq!(classify(&err), FailureKind::Soft);
    }

    #[test]
    fn test_unusable_reply_is_hard() {
        let parse = AnalysisError::ResponseParseError {
            provider: "gemini".to_string(),
            message: "no JSON object found in response".to_string(),
        };
        let invalid = AnalysisError::ValidationError {
            provider: "gemini".to_string(),
            message: "expected at least 2 adjustment groups, found 1".to_string(),
        };
        assert_eq!(classify(&parse), FailureKind::Hard);
        assert_eq!(classify(&invalid), FailureKind::Hard);
    }
}

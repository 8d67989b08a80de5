//! Provider error classification
//!
//! The YouTube API embeds its errors in the JSON body, sometimes in an
//! otherwise successful reply. Some of them are benign: polling slightly
//! faster than the provider likes yields a "too soon" error that just means
//! "nothing new yet".

use serde::Deserialize;

/// Error text the provider sends when polled faster than it wants
pub const TOO_SOON_SIGNATURE: &str = "The request was sent too soon after the previous one.";

/// Outcome of inspecting a response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorStatus {
    NoError,
    /// Benign provider error, treat as "no new data"
    IgnorableError,
    /// Real provider error with its message
    HardError { message: String },
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ProviderErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    message: Option<String>,
}

/// Sorts provider errors into ignorable and hard ones
///
/// Ignorable errors are matched by substring against a configurable list.
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    ignorable: Vec<String>,
}

impl Default for ResponseClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseClassifier {
    pub fn new() -> Self {
        Self::with_ignorable([TOO_SOON_SIGNATURE])
    }

    /// Classifier with a custom list of ignorable signatures
    pub fn with_ignorable<I, S>(signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignorable: signatures.into_iter().map(Into::into).collect(),
        }
    }

    pub fn classify(&self, body: &str) -> ErrorStatus {
        let cause = match Self::error_message(body) {
            Some(cause) => cause,
            None => return ErrorStatus::NoError,
        };

        if self.ignorable.iter().any(|sig| cause.contains(sig.as_str())) {
            log::debug!("[chat:classify] Ignoring provider error: {}", cause);
            return ErrorStatus::IgnorableError;
        }

        ErrorStatus::HardError { message: cause }
    }

    /// `error.errors[0].message`, falling back to `error.message`
    fn error_message(body: &str) -> Option<String> {
        let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
        let error = envelope.error?;

        error
            .errors
            .into_iter()
            .next()
            .and_then(|detail| detail.message)
            .or(error.message)
            .filter(|m| !m.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_body(message: &str) -> String {
        serde_json::json!({
            "error": {
                "code": 403,
                "message": message,
                "errors": [{ "message": message, "domain": "youtube.liveChat" }]
            }
        })
        .to_string()
    }

    #[test]
    fn test_no_error() {
        let classifier = ResponseClassifier::new();
        let body = r#"{"items": [], "nextPageToken": "tok"}"#;
        assert_eq!(classifier.classify(body), ErrorStatus::NoError);
    }

    #[test]
    fn test_too_soon_is_ignorable() {
        let classifier = ResponseClassifier::new();
        let body = error_body("The request was sent too soon after the previous one.");
        assert_eq!(classifier.classify(&body), ErrorStatus::IgnorableError);
    }

    #[test]
    fn test_quota_exceeded_is_hard() {
        let classifier = ResponseClassifier::new();
        let message = "The request cannot be completed because you have exceeded your quota.";
        assert_eq!(
            classifier.classify(&error_body(message)),
            ErrorStatus::HardError {
                message: message.to_string()
            }
        );
    }

    #[test]
    fn test_falls_back_to_top_level_message() {
        let classifier = ResponseClassifier::new();
        let body = r#"{"error": {"code": 400, "message": "API key not valid."}}"#;
        assert_eq!(
            classifier.classify(body),
            ErrorStatus::HardError {
                message: "API key not valid.".to_string()
            }
        );
    }

    #[test]
    fn test_non_json_body_is_not_an_error() {
        let classifier = ResponseClassifier::new();
        assert_eq!(classifier.classify("<html>"), ErrorStatus::NoError);
        assert_eq!(classifier.classify(""), ErrorStatus::NoError);
    }

    #[test]
    fn test_custom_signatures() {
        let classifier = ResponseClassifier::with_ignorable(["slow down"]);
        assert_eq!(
            classifier.classify(&error_body("please slow down")),
            ErrorStatus::IgnorableError
        );
        assert!(matches!(
            classifier.classify(&error_body(TOO_SOON_SIGNATURE)),
            ErrorStatus::HardError { .. }
        ));
    }
}

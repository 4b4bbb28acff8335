//! Error types and classification for the provider core.
//!
//! Every failure in this crate is returned as a [`ProviderError`]; nothing
//! panics. Resource handlers use [`is_not_found`] and [`is_terminal`] to
//! decide between dropping a resource from tracked state and surfacing the
//! error to the user.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::types::ServiceId;

/// Result alias used throughout the crate.
pub type Result<T, E = ProviderError> = std::result::Result<T, E>;

/// Errors that can occur while configuring the provider or waiting on resources.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The configuration failed validation. Carries every problem found.
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    /// A configuration value could not be interpreted.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A stored profile could not be loaded.
    #[error("failed to load profile[{name}]: {reason}")]
    Profile {
        /// The profile name that was requested.
        name: String,
        /// Why loading failed.
        reason: String,
    },

    /// A per-service client failed to construct.
    #[error("failed to build {service} client: {source}")]
    ClientConstruction {
        /// The service whose client failed.
        service: ServiceId,
        /// The underlying constructor error.
        #[source]
        source: Box<ProviderError>,
    },

    /// The API answered with an error status.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code returned by the API.
        status: u16,
        /// Message returned by the API.
        message: String,
    },

    /// Service temporarily unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Quota or rate limit exceeded.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// A readiness check failed more often than allowed in a row.
    #[error("exceeds {limit} retry limit during {resource} ready check: {source}")]
    RetryLimitExceeded {
        /// The resource being waited on.
        resource: String,
        /// The consecutive error threshold.
        limit: u32,
        /// The last error returned by the read.
        #[source]
        source: Box<ProviderError>,
    },

    /// A readiness check did not finish within its budget.
    #[error("timeout exceeded after {budget:?} for {resource} ready check{}", LastError(.last_error))]
    Timeout {
        /// The resource being waited on.
        resource: String,
        /// The polling budget that elapsed.
        budget: Duration,
        /// The last underlying error observed, if any.
        last_error: Option<Box<ProviderError>>,
    },

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

struct LastError<'a>(&'a Option<Box<ProviderError>>);

impl fmt::Display for LastError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(err) => write!(f, " (last error: {})", err),
            None => Ok(()),
        }
    }
}

impl ProviderError {
    /// Wrap a constructor failure with the identity of the failing service.
    pub fn construction(service: ServiceId, source: ProviderError) -> Self {
        Self::ClientConstruction {
            service,
            source: Box::new(source),
        }
    }

    /// Build an API error from a status code and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Returns the collected validation problems, if this is a validation error.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// A single configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// The configuration field at fault.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl FieldError {
    /// A required field that has no value.
    pub fn missing(field: &'static str) -> Self {
        Self {
            field,
            message: format!("{} is required", field),
        }
    }

    /// A field whose value is not acceptable.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// All problems found while validating a configuration.
///
/// Validation never stops at the first problem, so callers see everything
/// that needs fixing at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem.
    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Returns `true` when no problems were recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of recorded problems.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterate over the recorded problems.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Returns `true` if a problem was recorded for `field`.
    pub fn mentions(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when empty, otherwise a [`ProviderError::Validation`].
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s) occurred:", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n\t* {}", error)?;
        }
        Ok(())
    }
}

/// Broad classes of API failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The resource does not exist, or is not yet visible.
    NotFound,
    /// The API is busy or throttling; the same call may succeed later.
    Transient,
    /// Anything else. Must be surfaced to the caller.
    Unexpected,
}

/// Classify an error for retry and state-tracking decisions.
pub fn classify(err: &ProviderError) -> ErrorClass {
    match err {
        ProviderError::NotFound(_) => ErrorClass::NotFound,
        ProviderError::Api { status: 404, .. } => ErrorClass::NotFound,
        ProviderError::Api {
            status: 423 | 429 | 503,
            ..
        } => ErrorClass::Transient,
        ProviderError::Unavailable(_) | ProviderError::ResourceExhausted(_) => {
            ErrorClass::Transient
        }
        _ => ErrorClass::Unexpected,
    }
}

/// Returns `true` if the error means the resource is absent.
///
/// On a read path this means "drop it from tracked state"; right after a
/// create it means "the backend has not indexed it yet".
pub fn is_not_found(err: &ProviderError) -> bool {
    classify(err) == ErrorClass::NotFound
}

/// Returns `true` if the error should be surfaced rather than retried.
pub fn is_terminal(err: &ProviderError) -> bool {
    classify(err) == ErrorClass::Unexpected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("resource-123".to_string());
        assert_eq!(format!("{}", err), "Resource not found: resource-123");

        let err = ProviderError::Profile {
            name: "test".to_string(),
            reason: "no such profile".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "failed to load profile[test]: no such profile"
        );

        let err = ProviderError::api(500, "boom");
        assert_eq!(format!("{}", err), "API error (status 500): boom");
    }

    #[test]
    fn test_validation_display_lists_every_problem() {
        let mut errors = ValidationErrors::new();
        errors.push(FieldError::missing("access_token"));
        errors.push(FieldError::missing("access_token_secret"));

        let display = ProviderError::Validation(errors).to_string();
        assert!(display.contains("2 error(s) occurred"));
        assert!(display.contains("access_token is required"));
        assert!(display.contains("access_token_secret is required"));
    }

    #[test]
    fn test_empty_validation_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_construction_error_names_service() {
        let err = ProviderError::construction(
            ServiceId::Kms,
            ProviderError::Configuration("bad endpoint".to_string()),
        );
        let display = err.to_string();
        assert!(display.contains("kms"));
        assert!(display.contains("bad endpoint"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_timeout_display_includes_last_error() {
        let err = ProviderError::Timeout {
            resource: "Addon CDN[123]".to_string(),
            budget: Duration::from_secs(600),
            last_error: Some(Box::new(ProviderError::api(500, "still broken"))),
        };
        let display = err.to_string();
        assert!(display.contains("600s"));
        assert!(display.contains("Addon CDN[123]"));
        assert!(display.contains("still broken"));

        let err = ProviderError::Timeout {
            resource: "NoSQL[1]".to_string(),
            budget: Duration::from_secs(60),
            last_error: None,
        };
        assert!(!err.to_string().contains("last error"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(&ProviderError::NotFound("x".to_string())),
            ErrorClass::NotFound
        );
        assert_eq!(classify(&ProviderError::api(404, "gone")), ErrorClass::NotFound);
        assert_eq!(classify(&ProviderError::api(423, "locked")), ErrorClass::Transient);
        assert_eq!(classify(&ProviderError::api(503, "busy")), ErrorClass::Transient);
        assert_eq!(
            classify(&ProviderError::Unavailable("down".to_string())),
            ErrorClass::Transient
        );
        assert_eq!(classify(&ProviderError::api(500, "boom")), ErrorClass::Unexpected);
        assert_eq!(
            classify(&ProviderError::Configuration("bad".to_string())),
            ErrorClass::Unexpected
        );
    }

    #[test]
    fn test_predicates() {
        let not_found = ProviderError::api(404, "gone");
        assert!(is_not_found(&not_found));
        assert!(!is_terminal(&not_found));

        let busy = ProviderError::api(503, "busy");
        assert!(!is_not_found(&busy));
        assert!(!is_terminal(&busy));

        let broken = ProviderError::api(400, "bad request");
        assert!(!is_not_found(&broken));
        assert!(is_terminal(&broken));
    }
}

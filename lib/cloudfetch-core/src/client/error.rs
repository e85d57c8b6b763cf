use std::fmt;

use serde::Serialize;

use super::transport::TransportError;

/// Placeholder message of a [`FetchError::Status`] whose response had no body.
pub const NO_CONTENT_MESSAGE: &str = "No content returned from server";

/// A single field-level schema violation.
///
/// `path` is a JSON pointer into the response body (`""` is the body itself).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON pointer of the offending value.
    pub path: String,
    /// What was expected there.
    pub message: String,
}

impl Violation {
    /// Creates a violation.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{path}: {message}", message = self.message)
    }
}

fn list_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// The failure arm of every call made through [`CloudClient`](crate::CloudClient).
///
/// Exactly one of these is returned for a failed call. Nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
pub enum FetchError {
    /// The request never produced a response (DNS, connection, TLS, broken body...).
    #[display("Transport error: {message}")]
    Transport {
        /// The transport message.
        message: String,
    },

    /// The server answered with a status outside of `2xx`.
    #[display("Unexpected status code {status_code}: {message}")]
    Status {
        /// The HTTP status code.
        status_code: u16,
        /// The response body, or [`NO_CONTENT_MESSAGE`] when it was empty.
        message: String,
    },

    /// The response body does not match the expected schema.
    ///
    /// Built with [`FetchError::validation`] only.
    #[display("Validation errors: {}", list_violations(violations))]
    #[non_exhaustive]
    Validation {
        /// Every violation found, never empty.
        violations: Vec<Violation>,
    },

    /// The server kept returning a continuation token past the configured page ceiling.
    #[display("Pagination stopped after {max_pages} pages while a continuation token was still returned")]
    PageLimitExceeded {
        /// The configured ceiling.
        max_pages: u32,
    },
}

impl FetchError {
    /// Builds a [`FetchError::Validation`], guaranteeing at least one violation.
    ///
    /// This is the only way to build that variant outside of this crate:
    ///
    /// ```compile_fail
    /// use cloudfetch_core::FetchError;
    ///
    /// let error = FetchError::Validation { violations: vec![] };
    /// ```
    pub fn validation(violations: Vec<Violation>) -> Self {
        let violations = if violations.is_empty() {
            vec![Violation::new("", "Validation failed")]
        } else {
            violations
        };
        Self::Validation { violations }
    }

    /// The HTTP status code, for [`FetchError::Status`].
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// The violations, for [`FetchError::Validation`].
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Validation { violations } => violations,
            _ => &[],
        }
    }
}

impl From<TransportError> for FetchError {
    fn from(err: TransportError) -> Self {
        Self::Transport {
            message: err.message().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<FetchError>();
        assert_sync::<FetchError>();
    }

    #[test]
    fn should_never_build_an_empty_validation_error() {
        let error = FetchError::validation(vec![]);

        assert_eq!(error.violations().len(), 1);
    }

    #[test]
    fn should_display_every_violation() {
        let error = FetchError::validation(vec![
            Violation::new("/items/0/size", "Expected number to be greater or equal to 0"),
            Violation::new("", "Expected required property 'total'"),
        ]);

        insta::assert_snapshot!(error, @"Validation errors: /items/0/size: Expected number to be greater or equal to 0, /: Expected required property 'total'");
    }

    #[test]
    fn should_display_status_error() {
        let error = FetchError::Status {
            status_code: 400,
            message: "Bad Request".to_string(),
        };

        insta::assert_snapshot!(error, @"Unexpected status code 400: Bad Request");
        assert_eq!(error.status_code(), Some(400));
        assert!(error.violations().is_empty());
    }
}

//! Error types
//!
//! Every failure the provider core can surface. Not-found is its own
//! variant so that existence checks can branch on it without parsing
//! messages.

use std::fmt;

use thiserror::Error;

/// Result alias used across the library
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Provider error
#[derive(Debug, Error)]
pub enum Error {
    /// The request never produced a response (DNS, TLS, timeout, ...)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API request failed: {status} {message}")]
    Api { status: u16, message: String },

    /// The resource does not exist, either a real 404 or a tombstone status
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The response could not be read as the expected shape
    #[error("failed to parse {context}: {message}")]
    Parse { context: String, message: String },

    /// One or more record fields had an unexpected type
    #[error("invalid fields: {}", FieldErrors(.0))]
    Fields(Vec<FieldError>),

    /// Pagination ran past the configured page bound
    #[error("pagination exceeded {max_pages} pages for {path}")]
    PageLimit { path: String, max_pages: usize },

    /// The resource reached a failed state or never settled
    #[error("unexpected resource state: {0}")]
    State(String),

    /// Missing or invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn parse(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// True for tombstoned resources and for HTTP 404 alike
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::Api { status: 404, .. })
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::NotFound(_) => Some(404),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// A single field that could not be extracted from a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Position of the record in the response
    pub record: usize,
    /// Output attribute name
    pub attribute: String,
    pub expected: &'static str,
    pub found: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}].{}: expected {}, found {}",
            self.record, self.attribute, self.expected, self.found
        )
    }
}

struct FieldErrors<'a>(&'a [FieldError]);

impl fmt::Display for FieldErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}

/// Format an error for display to a user
/// Security: raw API bodies are never shown, only a generic message per status
pub fn format_api_error(error: &Error) -> String {
    match error {
        Error::NotFound(_) => return "Resource not found.".to_string(),
        Error::PageLimit { .. }
        | Error::Config(_)
        | Error::State(_)
        | Error::Fields(_)
        | Error::Parse { .. } => {
            return error.to_string()
        }
        _ => {}
    }

    match error.status() {
        Some(401) => "Authentication failed. Check HCSO_AUTH_TOKEN or the configured token.".to_string(),
        Some(403) => "Permission denied. Check your IAM permissions.".to_string(),
        Some(404) => "Resource not found.".to_string(),
        Some(409) => "Resource conflict. The resource may already exist or be in use.".to_string(),
        Some(429) => "Rate limit exceeded. Please try again later.".to_string(),
        Some(400) => "Invalid request. Check your parameters.".to_string(),
        Some(500) | Some(502) | Some(503) => {
            "Cloud service temporarily unavailable. Please try again.".to_string()
        }
        _ => "Request failed. Check your network connection and try again.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(Error::NotFound("workspace".into()).is_not_found());
        assert!(Error::Api { status: 404, message: String::new() }.is_not_found());
        assert!(!Error::Api { status: 500, message: String::new() }.is_not_found());
        assert!(!Error::parse("routes", "not an array").is_not_found());
    }

    #[test]
    fn test_field_errors_are_all_listed() {
        let err = Error::Fields(vec![
            FieldError {
                record: 0,
                attribute: "id".into(),
                expected: "string",
                found: "number".into(),
            },
            FieldError {
                record: 2,
                attribute: "nexthop".into(),
                expected: "string",
                found: "object".into(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("[0].id"));
        assert!(msg.contains("[2].nexthop"));
    }

    #[test]
    fn test_format_api_error_hides_body() {
        let err = Error::Api {
            status: 403,
            message: "secret internal detail".into(),
        };
        let msg = format_api_error(&err);
        assert!(!msg.contains("secret"));
        assert!(msg.contains("Permission denied"));
    }
}

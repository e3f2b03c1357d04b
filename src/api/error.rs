use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by the executor, the catalog and the client
#[derive(Debug, Error)]
pub enum GraphError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Status(#[from] ApiStatusError),

    #[error("Failed to decode response of {operation}: {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("{operation} does not return a collection and cannot be paged")]
    NotACollection { operation: String },

    #[error("Refusing to follow next link outside of {base_url}: {link}")]
    InvalidNextLink { link: String, base_url: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Local validation failures, raised before any request is sent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("{operation}: missing required path parameter `{name}`")]
    MissingPath { operation: String, name: String },

    #[error("{operation}: unknown query parameter `{name}`")]
    UnknownQuery { operation: String, name: String },

    #[error("{operation}: operation does not take a request body")]
    UnexpectedBody { operation: String },

    #[error("{operation}: expected a {expected} body, got {actual}")]
    BodyKindMismatch {
        operation: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Network-level failures surfaced by a [`Transport`](super::Transport)
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Not authenticated. Run 'teams-graph auth set-token' or configure client credentials.")]
    Unauthenticated,

    #[error("Failed to acquire token: {0}")]
    Auth(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

/// A non-2xx response, kept with its raw body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ApiStatusError {
    pub operation: String,
    pub status: u16,
    pub body: String,
    /// `error.code` of an OData error envelope, when the body is one
    pub code: Option<String>,
    /// `error.message` of an OData error envelope, when the body is one
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct ODataErrorEnvelope {
    error: ODataErrorBody,
}

#[derive(Deserialize)]
struct ODataErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl ApiStatusError {
    pub fn new(operation: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let (code, message) = match serde_json::from_str::<ODataErrorEnvelope>(&body) {
            Ok(envelope) => (envelope.error.code, envelope.error.message),
            Err(_) => (None, None),
        };

        Self {
            operation: operation.into(),
            status,
            body,
            code,
            message,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

impl fmt::Display for ApiStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => write!(
                f,
                "{} failed: {} - {}: {}",
                self.operation, self.status, code, message
            ),
            _ => write!(
                f,
                "{} failed: {} - {}",
                self.operation, self.status, self.body
            ),
        }
    }
}

/// Problems loading or validating an endpoint catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid path template `{template}`: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("Duplicate operation name: {0}")]
    DuplicateOperation(String),

    #[error("Failed to parse catalog: {0}")]
    Parse(String),

    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_parses_odata_envelope() {
        let body = r#"{"error":{"code":"NotFound","message":"No team found with Group Id g1"}}"#;
        let err = ApiStatusError::new("groups.get_team", 404, body);

        assert_eq!(err.status, 404);
        assert_eq!(err.body, body);
        assert_eq!(err.code.as_deref(), Some("NotFound"));
        assert!(err.is_client_error());
        assert!(err.to_string().contains("NotFound"));
    }

    #[test]
    fn test_status_error_keeps_non_json_body() {
        let err = ApiStatusError::new("teams.get", 503, "Service Unavailable");

        assert_eq!(err.code, None);
        assert!(err.is_server_error());
        assert_eq!(err.to_string(), "teams.get failed: 503 - Service Unavailable");
    }
}

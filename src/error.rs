//! Some common error types.

use std::fmt::{self, Display, Formatter};

use http::{header, Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};

use crate::response::{Response, JSON_CONTENT_TYPE};

/// A possible error value when declaring resources.
///
/// Returned synchronously by the builder. The node the call was made on and
/// every resource registered so far are left untouched.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// A path segment, template or validator is malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The parameter name is already declared in this scope.
    #[error("parameter `{0}` is already declared")]
    DuplicateParam(String),

    /// A template references a parameter that has no validator.
    #[error("parameter `{0}` is not declared")]
    UnknownParam(String),
}

/// A possible error value when dispatching a request.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// More than one resource matches the request.
    #[error("ambiguous route for `{method} {path}`: {}", .patterns.join(", "))]
    AmbiguousRoute {
        /// Request method.
        method: Method,
        /// Request pathname.
        path: String,
        /// Patterns of the matching resources, in registration order.
        patterns: Vec<String>,
    },

    /// The request method has no verb counterpart.
    #[error("unsupported HTTP method {0}")]
    UnsupportedMethod(Method),

    /// The handler dropped its completion callback without calling it.
    #[error("the handler finished without an answer")]
    Unanswered,
}

impl DispatchError {
    /// Returns the status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::AmbiguousRoute { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::UnsupportedMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::Unanswered => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Creates full response for this error.
    pub fn as_response(&self) -> Response {
        Response::builder()
            .status(self.status())
            .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(json!({ "error": self.to_string() }).to_string())
    }
}

/// A possible error value when loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Io error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid TOML for a [`Config`](crate::Config).
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// An error reported by a handler through its completion callback.
///
/// The payload is serialized as the response body. The status is optional;
/// when absent the dispatcher falls back to the status set on the response
/// sink, and anything below `400` is raised to `400 Bad Request`.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerError {
    status: Option<StatusCode>,
    payload: Value,
}

impl HandlerError {
    /// Create an error carrying `payload` as its body.
    ///
    /// A payload that fails to serialize is replaced by its error message.
    pub fn new(payload: impl Serialize) -> Self {
        let payload = serde_json::to_value(payload)
            .unwrap_or_else(|err| json!({ "error": err.to_string() }));
        Self {
            status: None,
            payload,
        }
    }

    /// Sets the status code for this error.
    #[must_use]
    pub fn with_status(self, status: StatusCode) -> Self {
        Self {
            status: Some(status),
            ..self
        }
    }

    /// Returns the status code chosen by the handler, if any.
    #[inline]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns the payload of this error.
    #[inline]
    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

impl Display for HandlerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{}: {}", status.as_u16(), self.payload),
            None => write!(f, "{}", self.payload),
        }
    }
}

impl From<Value> for HandlerError {
    fn from(payload: Value) -> Self {
        Self {
            status: None,
            payload,
        }
    }
}

impl From<&str> for HandlerError {
    fn from(msg: &str) -> Self {
        json!({ "error": msg }).into()
    }
}

impl From<String> for HandlerError {
    fn from(msg: String) -> Self {
        json!({ "error": msg }).into()
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        HandlerError::from(err.to_string()).with_status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// A specialized Result type for builder calls.
pub type Result<T, E = BuildError> = ::std::result::Result<T, E>;

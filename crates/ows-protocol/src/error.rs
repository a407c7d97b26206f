//! Error taxonomy of the client core.
//!
//! Every failure reaches the caller as a distinct [`OwsError`] variant. Nothing
//! is retried inside the core.

use thiserror::Error;

use crate::exceptions::ExceptionReport;
use crate::transport::TransportError;

/// Result type alias using OwsError.
pub type OwsResult<T> = Result<T, OwsError>;

/// Primary error type for client operations.
#[derive(Debug, Error)]
pub enum OwsError {
    /// Connection refused, timeout, unexpected HTTP status.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The capabilities document could not be understood.
    #[error("Malformed capabilities document: {0}")]
    MalformedCapabilities(String),

    /// A response payload did not have the expected structure.
    #[error("Failed to decode response: {0}")]
    Decoding(#[from] DecodeError),

    /// The request could not be encoded for the resolved binding.
    #[error("Failed to encode request: {0}")]
    Encoding(#[from] EncodeError),

    /// The capabilities document does not advertise the operation.
    #[error("Operation {operation} is not supported by the service")]
    UnsupportedOperation { operation: String },

    /// The protocol defines the operation but this client does not implement it.
    #[error("Operation {operation} is not implemented by this client")]
    NotImplemented { operation: &'static str },

    /// The service answered with an exception report.
    #[error("Service exception: {0}")]
    ServiceException(ExceptionReport),
}

impl OwsError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            OwsError::Transport(TransportError::Timeout { .. }) => "timeout",
            OwsError::Transport(_) => "transport",
            OwsError::MalformedCapabilities(_) => "malformed_capabilities",
            OwsError::Decoding(_) => "decoding",
            OwsError::Encoding(_) => "encoding",
            OwsError::UnsupportedOperation { .. } => "unsupported_operation",
            OwsError::NotImplemented { .. } => "not_implemented",
            OwsError::ServiceException(_) => "service_exception",
        }
    }

    /// The service's exception report, if this error carries one.
    pub fn exception_report(&self) -> Option<&ExceptionReport> {
        match self {
            OwsError::ServiceException(report) => Some(report),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, OwsError::Transport(TransportError::Timeout { .. }))
    }
}

/// Errors produced while decoding a response document.
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("XML error at byte {position}: {message}")]
    Xml { position: usize, message: String },

    #[error("Empty response body")]
    Empty,

    #[error("Unexpected root element: expected {expected}, found {found}")]
    UnexpectedRoot { expected: &'static str, found: String },

    #[error("Missing element: {0}")]
    MissingElement(&'static str),

    #[error("Missing attribute '{attribute}' on element {element}")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("Invalid value for {field}: '{value}'")]
    InvalidValue { field: &'static str, value: String },

    #[error("Missing KVP parameter: {0}")]
    MissingParameter(&'static str),
}

/// Errors produced while encoding a request.
#[derive(Debug, Error, PartialEq)]
pub enum EncodeError {
    #[error("XML writer error: {0}")]
    Xml(String),

    /// The codec has no encoding for the resolved HTTP method.
    #[error("{operation} cannot be encoded for HTTP {method}")]
    UnsupportedMethod {
        operation: &'static str,
        method: &'static str,
    },

    /// The codec has no encoding for the negotiated protocol version.
    #[error("{operation} has no {binding} encoding for version {version}")]
    UnsupportedVersion {
        operation: &'static str,
        binding: &'static str,
        version: String,
    },

    /// The request content cannot be represented in the chosen binding.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

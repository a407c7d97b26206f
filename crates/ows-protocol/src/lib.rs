//! Generic OGC web service (OWS) client core.
//!
//! The client is driven by the service's capabilities document:
//!
//! 1. [`OwsClient`] fetches and parses the capabilities at construction
//!    ([`CapabilitiesDocument`]).
//! 2. Each call resolves the endpoint and HTTP method for its operation.
//! 3. A profile-specific [`WireCodec`] encodes the typed request (KVP for GET,
//!    XML for POST).
//! 4. An [`HttpTransport`] sends it.
//! 5. The response is sniffed for an exception report before the codec decodes
//!    the typed success document.
//!
//! Profiles (CSW, WFS) live in their own crates and plug in through
//! [`ServiceProfile`] and [`WireCodec`].

pub mod capabilities;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod exceptions;
pub mod fes;
pub mod transport;
pub mod version;
pub mod xml;

pub use capabilities::{CapabilitiesDocument, Method, OperationBinding};
pub use client::OwsClient;
pub use codec::{Decoded, EncodeContext, OwsRequest, Payload, ServiceProfile, WireCodec};
pub use config::{ClientConfig, ConfigError};
pub use error::{DecodeError, EncodeError, OwsError, OwsResult};
pub use exceptions::{ExceptionReport, OwsException};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};
pub use version::ProtocolVersion;

/// Re-exported so profile crates and callers share one URL type.
pub use reqwest::Url;

/// Content type used for XML request bodies.
pub const XML_CONTENT_TYPE: &str = "text/xml";

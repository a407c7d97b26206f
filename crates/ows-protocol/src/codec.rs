//! Wire codec contract between the client core and service profiles.

use crate::capabilities::Method;
use crate::error::{DecodeError, EncodeError};
use crate::exceptions::ExceptionReport;
use crate::version::ProtocolVersion;

/// A typed request for one service operation.
pub trait OwsRequest {
    /// Typed success document.
    type Response;

    /// Operation name as advertised in capabilities (e.g. `GetRecords`).
    const OPERATION: &'static str;

    /// Method used when the capabilities bind both GET and POST.
    const PREFERRED_METHOD: Method;

    /// State-changing operations must be advertised before anything is sent.
    ///
    /// Read-only requests leave this `false`; when their operation is missing
    /// from the capabilities the client still sends them to the service base
    /// URL and lets the service answer.
    const REQUIRES_ADVERTISED: bool = false;
}

/// Identity of a service profile (CSW, WFS, ...).
pub trait ServiceProfile: Send + Sync {
    /// Value of the `service` parameter / attribute.
    const SERVICE: &'static str;

    /// Protocol versions this codec can speak, any order.
    fn supported_versions(&self) -> Vec<ProtocolVersion>;
}

/// Encoded request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Key-value pairs appended to the endpoint query (GET).
    Kvp(Vec<(String, String)>),
    /// XML document sent as `text/xml` (POST).
    Xml(Vec<u8>),
}

impl Payload {
    /// Binding name used in errors and logs.
    pub fn binding(&self) -> &'static str {
        match self {
            Payload::Kvp(_) => "KVP",
            Payload::Xml(_) => "XML",
        }
    }

    /// Value of a KVP key, compared case-insensitively.
    pub fn kvp_value(&self, key: &str) -> Option<&str> {
        match self {
            Payload::Kvp(pairs) => pairs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str()),
            Payload::Xml(_) => None,
        }
    }
}

/// What the codec needs to know about the resolved call.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeContext {
    pub method: Method,
    pub version: ProtocolVersion,
}

impl EncodeContext {
    pub fn new(method: Method, version: ProtocolVersion) -> Self {
        Self { method, version }
    }

    /// Error for a method the codec has no encoding for.
    pub fn unsupported_method(&self, operation: &'static str) -> EncodeError {
        EncodeError::UnsupportedMethod {
            operation,
            method: self.method.as_str(),
        }
    }
}

/// Outcome of decoding a response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    Response(T),
    Exception(ExceptionReport),
}

/// Encoder/decoder for one (profile, request type) pair.
pub trait WireCodec<R: OwsRequest>: ServiceProfile {
    /// Encode `request` for the resolved method and negotiated version.
    fn encode(&self, request: &R, ctx: &EncodeContext) -> Result<Payload, EncodeError>;

    /// Decode a body that is known not to be an exception report.
    fn decode_success(&self, body: &[u8]) -> Result<R::Response, DecodeError>;

    /// Decode a response body.
    ///
    /// The root element is checked for an exception report first; the
    /// success decoder only runs when it is something else.
    fn decode(&self, body: &[u8]) -> Result<Decoded<R::Response>, DecodeError> {
        if let Some(report) = ExceptionReport::sniff(body)? {
            return Ok(Decoded::Exception(report));
        }
        self.decode_success(body).map(Decoded::Response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl OwsRequest for Echo {
        type Response = String;
        const OPERATION: &'static str = "Echo";
        const PREFERRED_METHOD: Method = Method::Get;
    }

    struct EchoCodec;

    impl ServiceProfile for EchoCodec {
        const SERVICE: &'static str = "TEST";

        fn supported_versions(&self) -> Vec<ProtocolVersion> {
            vec![ProtocolVersion::new(1, 0, 0)]
        }
    }

    impl WireCodec<Echo> for EchoCodec {
        fn encode(&self, _: &Echo, _: &EncodeContext) -> Result<Payload, EncodeError> {
            Ok(Payload::Kvp(vec![("REQUEST".to_string(), "Echo".to_string())]))
        }

        fn decode_success(&self, body: &[u8]) -> Result<String, DecodeError> {
            Ok(String::from_utf8_lossy(body).into_owned())
        }
    }

    #[test]
    fn test_exception_root_wins_over_success_children() {
        let body = br#"<ows:ExceptionReport xmlns:ows="http://www.opengis.net/ows" version="1.2.0">
  <ows:Exception exceptionCode="NoApplicableCode">
    <ows:ExceptionText>boom</ows:ExceptionText>
  </ows:Exception>
  <csw:SearchResults xmlns:csw="http://www.opengis.net/cat/csw/2.0.2" numberOfRecordsMatched="1"/>
</ows:ExceptionReport>"#;
        match WireCodec::<Echo>::decode(&EchoCodec, body).unwrap() {
            Decoded::Exception(report) => assert_eq!(report.first_code(), Some("NoApplicableCode")),
            Decoded::Response(_) => panic!("expected exception"),
        }
    }

    #[test]
    fn test_success_body_goes_to_decoder() {
        let decoded = WireCodec::<Echo>::decode(&EchoCodec, b"<Echo/>").unwrap();
        assert_eq!(decoded, Decoded::Response("<Echo/>".to_string()));
    }

    #[test]
    fn test_kvp_lookup_ignores_case() {
        let payload = WireCodec::<Echo>::encode(
            &EchoCodec,
            &Echo,
            &EncodeContext::new(Method::Get, ProtocolVersion::new(1, 0, 0)),
        )
        .unwrap();
        assert_eq!(payload.kvp_value("request"), Some("Echo"));
        assert_eq!(payload.binding(), "KVP");
    }
}

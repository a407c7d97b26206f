//! Capabilities-driven client core shared by all service profiles.

use std::collections::HashSet;
use std::time::Instant;

use metrics::{counter, histogram};
use reqwest::Url;
use tracing::{debug, info, instrument, warn};

use crate::capabilities::{CapabilitiesDocument, Method};
use crate::codec::{Decoded, EncodeContext, OwsRequest, Payload, ServiceProfile, WireCodec};
use crate::config::ClientConfig;
use crate::error::{EncodeError, OwsError, OwsResult};
use crate::exceptions::ExceptionReport;
use crate::transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};
use crate::version::ProtocolVersion;
use crate::XML_CONTENT_TYPE;

const GET_CAPABILITIES: &str = "GetCapabilities";

/// A client bound to one remote service.
///
/// Construction fetches and parses the capabilities document; a value of this
/// type therefore always holds valid capabilities. Calls never mutate the
/// client, so it can be shared between tasks when `C` and `T` allow it.
pub struct OwsClient<C, T = ReqwestTransport> {
    capabilities_url: Url,
    base_url: Url,
    capabilities: CapabilitiesDocument,
    version: ProtocolVersion,
    codec: C,
    transport: T,
}

impl<C: ServiceProfile> OwsClient<C, ReqwestTransport> {
    /// Connect using the reqwest transport built from `config`.
    pub async fn connect(capabilities_url: Url, codec: C, config: &ClientConfig) -> OwsResult<Self> {
        let transport = ReqwestTransport::new(config)?;
        Self::with_transport(capabilities_url, codec, transport).await
    }
}

impl<C, T> OwsClient<C, T>
where
    C: ServiceProfile,
    T: HttpTransport,
{
    /// Connect through an explicit transport.
    #[instrument(skip(codec, transport), fields(service = C::SERVICE, url = %capabilities_url))]
    pub async fn with_transport(capabilities_url: Url, codec: C, transport: T) -> OwsResult<Self> {
        let started = Instant::now();
        let result = Self::fetch_capabilities(&capabilities_url, &transport).await;
        record(C::SERVICE, GET_CAPABILITIES, &result, started);
        let capabilities = result?;

        let offered = capabilities.version().clone();
        let version = match ProtocolVersion::negotiate(&offered, &codec.supported_versions()) {
            Some(version) => version,
            None => {
                warn!(
                    offered = %offered,
                    "Service version is older than every version this client speaks, using it as is"
                );
                offered.clone()
            }
        };

        info!(
            offered = %offered,
            negotiated = %version,
            operations = capabilities.operations().len(),
            "Capabilities loaded"
        );

        let mut base_url = capabilities_url.clone();
        base_url.set_query(None);
        base_url.set_fragment(None);

        Ok(Self {
            capabilities_url,
            base_url,
            capabilities,
            version,
            codec,
            transport,
        })
    }

    async fn fetch_capabilities(url: &Url, transport: &T) -> OwsResult<CapabilitiesDocument> {
        let response = transport.get(url).await?;
        if let Some(report) = ExceptionReport::sniff(&response.body)? {
            return Err(OwsError::ServiceException(report));
        }
        if !response.is_success() {
            return Err(TransportError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            }
            .into());
        }
        CapabilitiesDocument::parse_with_base(&response.body, Some(url))
    }

    pub fn capabilities(&self) -> &CapabilitiesDocument {
        &self.capabilities
    }

    /// Version used for requests, negotiated against the capabilities.
    pub fn version(&self) -> &ProtocolVersion {
        &self.version
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn capabilities_url(&self) -> &Url {
        &self.capabilities_url
    }

    /// Capabilities URL without query; target of unadvertised read-only calls.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fail with `UnsupportedOperation` unless the capabilities advertise `operation`.
    pub fn check_operation_supported(&self, operation: &str) -> OwsResult<()> {
        if self.capabilities.supports(operation) {
            Ok(())
        } else {
            Err(OwsError::UnsupportedOperation {
                operation: operation.to_string(),
            })
        }
    }

    /// Encode, send and decode one request.
    #[instrument(skip(self, request), fields(service = C::SERVICE, operation = R::OPERATION))]
    pub async fn execute<R>(&self, request: &R) -> OwsResult<R::Response>
    where
        R: OwsRequest,
        C: WireCodec<R>,
    {
        let started = Instant::now();
        let result = self.dispatch(request).await;
        record(C::SERVICE, R::OPERATION, &result, started);
        result
    }

    async fn dispatch<R>(&self, request: &R) -> OwsResult<R::Response>
    where
        R: OwsRequest,
        C: WireCodec<R>,
    {
        if R::REQUIRES_ADVERTISED {
            self.check_operation_supported(R::OPERATION)?;
        }

        let (endpoint, method) = match self
            .capabilities
            .resolve_endpoint(R::OPERATION, R::PREFERRED_METHOD)
        {
            Ok(resolved) => resolved,
            Err(OwsError::UnsupportedOperation { .. }) if !R::REQUIRES_ADVERTISED => {
                warn!(
                    operation = R::OPERATION,
                    url = %self.base_url,
                    "Operation not advertised, sending to the service base URL"
                );
                (self.base_url.clone(), R::PREFERRED_METHOD)
            }
            Err(e) => return Err(e),
        };

        let ctx = EncodeContext::new(method, self.version.clone());
        let payload = self.codec.encode(request, &ctx)?;

        let (url, response) = match (method, payload) {
            (Method::Get, Payload::Kvp(pairs)) => {
                let url = append_query(endpoint, &pairs);
                debug!(url = %url, "Sending GET");
                let response = self.transport.get(&url).await?;
                (url, response)
            }
            (Method::Post, Payload::Xml(body)) => {
                debug!(url = %endpoint, bytes = body.len(), "Sending POST");
                let response = self
                    .transport
                    .post(&endpoint, XML_CONTENT_TYPE, body)
                    .await?;
                (endpoint, response)
            }
            (method, payload) => {
                return Err(EncodeError::InvalidRequest(format!(
                    "{} payload cannot be sent with HTTP {}",
                    payload.binding(),
                    method
                ))
                .into())
            }
        };

        self.classify::<R>(&url, response)
    }

    fn classify<R>(&self, url: &Url, response: HttpResponse) -> OwsResult<R::Response>
    where
        R: OwsRequest,
        C: WireCodec<R>,
    {
        if !response.is_success() {
            return match ExceptionReport::sniff(&response.body) {
                Ok(Some(report)) => Err(OwsError::ServiceException(report)),
                _ => Err(TransportError::HttpStatus {
                    url: url.to_string(),
                    status: response.status,
                }
                .into()),
            };
        }

        match self.codec.decode(&response.body)? {
            Decoded::Response(response) => Ok(response),
            Decoded::Exception(report) => {
                debug!(report = %report, "Service returned an exception report");
                Err(OwsError::ServiceException(report))
            }
        }
    }
}

/// Append KVP pairs to an endpoint, skipping keys the endpoint already carries.
fn append_query(mut url: Url, pairs: &[(String, String)]) -> Url {
    let existing: HashSet<String> = url
        .query_pairs()
        .map(|(k, _)| k.to_ascii_lowercase())
        .collect();
    let added: Vec<&(String, String)> = pairs
        .iter()
        .filter(|(key, _)| !existing.contains(&key.to_ascii_lowercase()))
        .collect();
    // query_pairs_mut() leaves an empty query behind even when nothing is added.
    if added.is_empty() {
        return url;
    }
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in added {
            query.append_pair(key, value);
        }
    }
    url
}

fn record<V>(service: &'static str, operation: &'static str, result: &OwsResult<V>, started: Instant) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };
    counter!(
        "ows_client_requests_total",
        "service" => service,
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
    histogram!(
        "ows_client_request_duration_seconds",
        "service" => service,
        "operation" => operation
    )
    .record(started.elapsed().as_secs_f64());
}

//! WFS client built on the generic OWS client core.

use ows_protocol::{
    CapabilitiesDocument, ClientConfig, HttpTransport, OwsClient, OwsResult, ProtocolVersion,
    ReqwestTransport, Url,
};
use ows_query::AdHocQuery;

use crate::codec::WfsCodec;
use crate::feature_collection::FeatureCollection;
use crate::get_feature::GetFeature;

/// A connected feature service.
///
/// `GetFeature` goes out as KVP when the service binds GET, otherwise as a
/// WFS 1.1.0 XML body.
pub struct WfsClient<T = ReqwestTransport> {
    inner: OwsClient<WfsCodec, T>,
}

impl WfsClient<ReqwestTransport> {
    pub async fn connect(url: Url, config: &ClientConfig) -> OwsResult<Self> {
        let inner = OwsClient::connect(url, WfsCodec, config).await?;
        Ok(Self { inner })
    }
}

impl<T: HttpTransport> WfsClient<T> {
    pub async fn with_transport(url: Url, transport: T) -> OwsResult<Self> {
        let inner = OwsClient::with_transport(url, WfsCodec, transport).await?;
        Ok(Self { inner })
    }

    pub fn inner(&self) -> &OwsClient<WfsCodec, T> {
        &self.inner
    }

    pub fn capabilities(&self) -> &CapabilitiesDocument {
        self.inner.capabilities()
    }

    /// Negotiated protocol version; decides the KVP parameter names.
    pub fn version(&self) -> &ProtocolVersion {
        self.inner.version()
    }

    pub async fn get_feature(&self, request: &GetFeature) -> OwsResult<FeatureCollection> {
        self.inner.execute(request).await
    }

    /// Run `query` with an optional feature limit.
    pub async fn query(
        &self,
        query: AdHocQuery,
        max_features: Option<u32>,
    ) -> OwsResult<FeatureCollection> {
        let mut request = GetFeature::new(query);
        request.max_features = max_features;
        self.get_feature(&request).await
    }
}

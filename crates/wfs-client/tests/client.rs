use std::sync::Arc;

use ows_common::{Envelope, QName};
use ows_protocol::{Method, Url};
use ows_query::{ProjectionClause, QueryBuilder, TypeName};
use test_utils::{
    assert_error_kind, feature_collection, CapabilitiesFixture, FeatureFixture, MockTransport,
    APP_NS, WFS_URL,
};
use wfs_client::{GetFeature, WfsClient};

fn capabilities_url() -> Url {
    Url::parse("http://host/wfs?service=WFS&request=GetCapabilities").unwrap()
}

fn roads() -> String {
    feature_collection(&[
        FeatureFixture {
            type_name: "Road",
            id: "Road.1",
            properties: &[("name", "Main Street"), ("lanes", "2")],
        },
        FeatureFixture {
            type_name: "Road",
            id: "Road.2",
            properties: &[("name", "High Street")],
        },
    ])
}

fn road_request() -> GetFeature {
    let query = QueryBuilder::new()
        .type_name(TypeName::new(QName::new(APP_NS, "Road", "app")))
        .projection_clauses(vec![vec![ProjectionClause::new("app:name")]])
        .bbox(Envelope::new(0.0, 0.0, 10.0, 10.0))
        .build()
        .unwrap();
    GetFeature::new(query).with_max_features(10)
}

async fn connect(
    capabilities: CapabilitiesFixture,
    responses: &[String],
) -> (WfsClient<Arc<MockTransport>>, Arc<MockTransport>) {
    let mut transport = MockTransport::new().with_xml(capabilities.build());
    for response in responses {
        transport = transport.with_xml(response.clone());
    }
    let transport = Arc::new(transport);
    let client = WfsClient::with_transport(capabilities_url(), transport.clone())
        .await
        .unwrap();
    (client, transport)
}

#[tokio::test]
async fn test_get_feature_wfs2_kvp() {
    let caps = CapabilitiesFixture::wfs("2.0.0").get("GetFeature", WFS_URL);
    let (client, transport) = connect(caps, &[roads()]).await;
    assert_eq!(client.version().to_string(), "2.0.0");

    let collection = client.get_feature(&road_request()).await.unwrap();
    assert_eq!(collection.features.len(), 2);
    assert_eq!(collection.features[0].property("name"), Some("Main Street"));
    assert_eq!(
        collection.features[0].type_name,
        QName::new(APP_NS, "Road", "app")
    );

    let call = transport.last_call().unwrap();
    assert_eq!(call.method, Method::Get);
    assert_eq!(call.query_value("typeNames").as_deref(), Some("app:Road"));
    assert_eq!(
        call.query_value("namespaces").as_deref(),
        Some("xmlns(app,http://example.com/app)")
    );
    assert_eq!(call.query_value("count").as_deref(), Some("10"));
    assert_eq!(call.query_value("BBOX").as_deref(), Some("0,0,10,10"));

    // The service would see the same request we built.
    let pairs: Vec<(String, String)> = call.url.query_pairs().into_owned().collect();
    assert_eq!(GetFeature::from_kvp(&pairs).unwrap(), road_request());
}

#[tokio::test]
async fn test_get_feature_wfs11_post() {
    let caps = CapabilitiesFixture::wfs("1.1.0").post("GetFeature", WFS_URL);
    let (client, transport) = connect(caps, &[roads()]).await;

    client.get_feature(&road_request()).await.unwrap();

    let call = transport.last_call().unwrap();
    assert_eq!(call.method, Method::Post);
    assert_eq!(call.content_type.as_deref(), Some("text/xml"));
    let xml = call.body_str();
    assert!(xml.contains("<wfs:GetFeature "));
    assert!(xml.contains("maxFeatures=\"10\""));
    assert!(xml.contains("<wfs:PropertyName>app:name</wfs:PropertyName>"));
}

#[tokio::test]
async fn test_post_only_wfs2_cannot_encode() {
    let caps = CapabilitiesFixture::wfs("2.0.0").post("GetFeature", WFS_URL);
    let (client, transport) = connect(caps, &[]).await;

    assert_error_kind!(client.get_feature(&road_request()).await, "encoding");
    assert_eq!(transport.call_count(), 1);
}

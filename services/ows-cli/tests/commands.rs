//! Subcommands against a scripted transport.

use std::collections::BTreeMap;
use std::sync::Arc;

use csw_client::constants::OUTPUT_SCHEMA_CSW;
use csw_client::CswClient;
use ows_cli::commands::{self, CapabilitiesSummary};
use ows_cli::{FeaturesArgs, RecordsArgs};
use ows_protocol::{Method, Url};
use test_utils::{
    dublin_core_record, feature_collection, get_records_response, transaction_response,
    CapabilitiesFixture, FeatureFixture, MockTransport, CSW_URL, WFS_URL,
};
use wfs_client::WfsClient;

async fn csw(
    capabilities: CapabilitiesFixture,
    response: String,
) -> (CswClient<Arc<MockTransport>>, Arc<MockTransport>) {
    let transport = Arc::new(
        MockTransport::new()
            .with_xml(capabilities.build())
            .with_xml(response),
    );
    let url = Url::parse("http://host/csw?service=CSW&request=GetCapabilities").unwrap();
    let client = CswClient::with_transport(url, transport.clone()).await.unwrap();
    (client, transport)
}

#[tokio::test]
async fn test_capabilities_summary() {
    let caps = CapabilitiesFixture::csw()
        .operation(
            "GetRecords",
            &[(Method::Get, CSW_URL), (Method::Post, CSW_URL)],
        )
        .post("Transaction", "http://host/csw/transaction");
    let (client, _) = csw(caps, String::new()).await;

    let summary = CapabilitiesSummary::new(client.capabilities(), client.inner().version());
    assert_eq!(summary.version, "2.0.2");
    let json = serde_json::to_value(&summary).unwrap();
    assert!(json["operations"]["GetRecords"].is_object());
    assert!(json["operations"]["Transaction"].is_object());
}

#[tokio::test]
async fn test_records_summary() {
    let caps = CapabilitiesFixture::csw().post("GetRecords", CSW_URL);
    let body = get_records_response(7, 3, &[("rec-1", "Roads"), ("rec-2", "Rivers")]);
    let (client, transport) = csw(caps, body).await;

    let args = RecordsArgs {
        url: CSW_URL.to_string(),
        start: 1,
        max: 2,
        schema: OUTPUT_SCHEMA_CSW.to_string(),
        type_names: vec!["csw:Record".to_string()],
        result_type: "results".to_string(),
        element_set: "brief".to_string(),
        bbox: Some("0,0,10,10".to_string()),
        namespaces: Vec::new(),
    };
    let summary = commands::records(&client, &args, &BTreeMap::new())
        .await
        .unwrap();

    assert_eq!(summary.matched, 7);
    assert_eq!(summary.records.len(), 2);
    assert_eq!(summary.records[1].title.as_deref(), Some("Rivers"));

    let xml = transport.last_call().unwrap().body_str().to_string();
    assert!(xml.contains("maxRecords=\"2\""));
    assert!(xml.contains("<csw:ElementSetName>brief</csw:ElementSetName>"));
    assert!(xml.contains("<ogc:PropertyName>ows:BoundingBox</ogc:PropertyName>"));
}

#[tokio::test]
async fn test_insert_reads_record_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut files = Vec::new();
    for (id, title) in [("rec-1", "Roads"), ("rec-2", "Rivers")] {
        let path = dir.path().join(format!("{}.xml", id));
        std::fs::write(&path, dublin_core_record(id, title)).unwrap();
        files.push(path);
    }

    let caps = CapabilitiesFixture::csw().post("Transaction", CSW_URL);
    let (client, transport) = csw(caps, transaction_response(&["rec-1", "rec-2"])).await;

    let response = commands::insert(&client, &files).await.unwrap();
    assert_eq!(response.total_inserted, 2);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_insert_missing_file_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let caps = CapabilitiesFixture::csw().post("Transaction", CSW_URL);
    let (client, transport) = csw(caps, String::new()).await;

    let err = commands::insert(&client, &[dir.path().join("nope.xml")])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Failed to read record file"));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_features_summary() {
    let caps = CapabilitiesFixture::wfs("2.0.0").get("GetFeature", WFS_URL);
    let body = feature_collection(&[FeatureFixture {
        type_name: "Road",
        id: "Road.1",
        properties: &[("name", "Main Street")],
    }]);
    let transport = Arc::new(
        MockTransport::new()
            .with_xml(caps.build())
            .with_xml(body),
    );
    let url = Url::parse("http://host/wfs?service=WFS&request=GetCapabilities").unwrap();
    let client = WfsClient::with_transport(url, transport.clone()).await.unwrap();

    let mut namespaces = BTreeMap::new();
    namespaces.insert("app".to_string(), test_utils::APP_NS.to_string());
    let args = FeaturesArgs {
        url: WFS_URL.to_string(),
        type_names: vec!["app:Road".to_string()],
        properties: vec!["app:name".to_string()],
        bbox: None,
        max: Some(1),
        namespaces: Vec::new(),
    };
    let summary = commands::features(&client, &args, &namespaces).await.unwrap();

    assert_eq!(summary.features.len(), 1);
    assert_eq!(summary.features[0].type_name, "app:Road");
    assert_eq!(summary.features[0].id.as_deref(), Some("Road.1"));
    assert_eq!(
        summary.features[0].properties.get("app:name").map(String::as_str),
        Some("Main Street")
    );

    let call = transport.last_call().unwrap();
    assert_eq!(call.query_value("count").as_deref(), Some("1"));
    assert_eq!(call.query_value("propertyName").as_deref(), Some("app:name"));
}

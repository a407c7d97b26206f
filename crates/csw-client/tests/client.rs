use std::sync::Arc;

use csw_client::{CswClient, ElementSetName, GetRecords, ResultType};
use ows_common::namespaces::CSW_202;
use ows_common::{Envelope, QName};
use ows_protocol::{Method, OwsError, Url};
use ows_query::Filter;
use test_utils::{
    assert_error_kind, dublin_core_record, exception_report, get_records_response,
    transaction_response, CapabilitiesFixture, MockTransport, CSW_URL,
};

fn capabilities_url() -> Url {
    Url::parse("http://host/csw?service=CSW&request=GetCapabilities").unwrap()
}

async fn connect(
    capabilities: CapabilitiesFixture,
    responses: &[String],
) -> (CswClient<Arc<MockTransport>>, Arc<MockTransport>) {
    let mut transport = MockTransport::new().with_xml(capabilities.build());
    for response in responses {
        transport = transport.with_xml(response.clone());
    }
    let transport = Arc::new(transport);
    let client = CswClient::with_transport(capabilities_url(), transport.clone())
        .await
        .unwrap();
    (client, transport)
}

fn summary_search() -> GetRecords {
    GetRecords::new(
        1,
        10,
        "application/xml",
        CSW_202,
        vec![QName::new(CSW_202, "Record", "csw")],
        ResultType::Results,
        ElementSetName::Summary,
        Some(Filter::bbox(Envelope::new(0.0, 0.0, 10.0, 10.0))),
    )
}

#[tokio::test]
async fn test_get_records_post_only() {
    let caps = CapabilitiesFixture::csw().post("GetRecords", CSW_URL);
    let body = get_records_response(42, 3, &[("rec-1", "Roads"), ("rec-2", "Rivers")]);
    let (client, transport) = connect(caps, &[body]).await;

    let response = client.get_records(&summary_search()).await.unwrap();

    // Capabilities GET plus exactly one POST.
    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    let call = &calls[1];
    assert_eq!(call.method, Method::Post);
    assert_eq!(call.url.as_str(), CSW_URL);
    assert_eq!(call.content_type.as_deref(), Some("text/xml"));

    let xml = call.body_str();
    let order = [
        "service=\"CSW\"",
        "version=\"2.0.2\"",
        "startPosition=\"1\"",
        "maxRecords=\"10\"",
        "outputFormat=\"application/xml\"",
        "outputSchema=\"http://www.opengis.net/cat/csw/2.0.2\"",
        "resultType=\"results\"",
        "typeNames=\"csw:Record\"",
        "<csw:ElementSetName>summary</csw:ElementSetName>",
        "<csw:Constraint",
        "<ogc:BBOX>",
    ];
    let positions: Vec<usize> = order
        .iter()
        .map(|needle| xml.find(needle).unwrap_or_else(|| panic!("missing {needle} in {xml}")))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{xml}");

    assert_eq!(response.matched, 42);
    assert_eq!(response.returned, 2);
    assert_eq!(response.next_record, 3);
    assert!(response.has_more());
    let ids: Vec<_> = response
        .records
        .iter()
        .filter_map(|r| r.identifier.as_deref())
        .collect();
    assert_eq!(ids, vec!["rec-1", "rec-2"]);
}

#[tokio::test]
async fn test_get_records_get_only_uses_kvp() {
    let caps = CapabilitiesFixture::csw().get("GetRecords", CSW_URL);
    let (client, transport) = connect(caps, &[get_records_response(0, 0, &[])]).await;

    let response = client.get_records(&summary_search()).await.unwrap();
    assert!(response.records.is_empty());

    let call = transport.last_call().unwrap();
    assert_eq!(call.method, Method::Get);
    assert_eq!(call.query_value("request").as_deref(), Some("GetRecords"));
    assert_eq!(call.query_value("typeNames").as_deref(), Some("csw:Record"));
    assert_eq!(call.query_value("ElementSetName").as_deref(), Some("summary"));
    assert_eq!(call.query_value("constraintLanguage").as_deref(), Some("FILTER"));
    assert!(call.query_value("constraint").unwrap().contains("ogc:BBOX"));
}

#[tokio::test]
async fn test_iso_search_uses_standard_window() {
    let caps = CapabilitiesFixture::csw().post("GetRecords", CSW_URL);
    let body = get_records_response(40, 25, &[("iso-1", "Roads"), ("iso-2", "Rivers")]);
    let (client, transport) = connect(caps, &[body]).await;

    let response = client
        .get_iso_records(ResultType::Hits, ElementSetName::Brief, None)
        .await
        .unwrap();

    // Capabilities GET plus exactly one GetRecords POST.
    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].method, Method::Post);
    assert_eq!(calls[1].url.as_str(), CSW_URL);

    assert_eq!(response.matched, 40);
    assert_eq!(response.returned, 2);
    assert_eq!(response.next_record, 25);
    let summary = QName::new(CSW_202, "SummaryRecord", "csw");
    assert!(response.records.iter().all(|r| r.name.same_name(&summary)));
    let ids: Vec<_> = response
        .records
        .iter()
        .map(|r| (r.identifier.as_deref(), r.title.as_deref()))
        .collect();
    assert_eq!(
        ids,
        vec![(Some("iso-1"), Some("Roads")), (Some("iso-2"), Some("Rivers"))]
    );

    let xml = calls[1].body_str().to_string();
    assert!(xml.contains("startPosition=\"10\" maxRecords=\"15\""));
    assert!(xml.contains("outputSchema=\"http://www.isotc211.org/2005/gmd\""));
    assert!(xml.contains("resultType=\"hits\""));
    assert!(xml.contains("typeNames=\"gmd:MD_Metadata\""));
    assert!(!xml.contains("csw:Constraint"));
}

#[tokio::test]
async fn test_search_without_advertised_get_records_still_goes_out() {
    let caps = CapabilitiesFixture::csw().post("Transaction", CSW_URL);
    let (client, transport) = connect(caps, &[get_records_response(0, 0, &[])]).await;

    client.get_records(&summary_search()).await.unwrap();
    let call = transport.last_call().unwrap();
    assert_eq!(call.url.as_str(), "http://host/csw");
    assert_eq!(call.method, Method::Post);
}

#[tokio::test]
async fn test_insert_requires_advertised_transaction() {
    let caps = CapabilitiesFixture::csw().post("GetRecords", CSW_URL);
    let (client, transport) = connect(caps, &[]).await;

    let result = client.insert(dublin_core_record("rec-1", "Roads")).await;
    match result {
        Err(OwsError::UnsupportedOperation { operation }) => assert_eq!(operation, "Transaction"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_insert_posts_transaction() {
    let caps = CapabilitiesFixture::csw()
        .post("GetRecords", CSW_URL)
        .post("Transaction", "http://host/csw/transaction");
    let (client, transport) = connect(caps, &[transaction_response(&["rec-1", "rec-2"])]).await;

    let response = client
        .insert_all([
            dublin_core_record("rec-1", "Roads"),
            dublin_core_record("rec-2", "Rivers"),
        ])
        .await
        .unwrap();
    assert_eq!(response.total_inserted, 2);
    assert_eq!(response.inserted_ids, vec!["rec-1", "rec-2"]);

    let call = transport.last_call().unwrap();
    assert_eq!(call.url.as_str(), "http://host/csw/transaction");
    let xml = call.body_str();
    assert!(xml.starts_with("<?xml"));
    assert_eq!(xml.matches("<?xml").count(), 1);
    assert_eq!(xml.matches("<csw:Record ").count(), 2);
}

#[tokio::test]
async fn test_malformed_record_is_rejected_before_sending() {
    let caps = CapabilitiesFixture::csw().post("Transaction", CSW_URL);
    let (client, transport) = connect(caps, &[]).await;

    assert_error_kind!(client.insert("<csw:Record>").await, "encoding");
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_service_exception_is_not_a_response() {
    let caps = CapabilitiesFixture::csw().post("GetRecords", CSW_URL);
    let report = exception_report("InvalidParameterValue", Some("typeNames"), "unknown type");
    let (client, _) = connect(caps, &[report]).await;

    let err = client.get_records(&summary_search()).await.unwrap_err();
    let report = err.exception_report().expect("exception report");
    assert_eq!(report.exceptions[0].locator.as_deref(), Some("typeNames"));
}

#[tokio::test]
async fn test_unimplemented_operations_fail_without_network() {
    let caps = CapabilitiesFixture::csw()
        .post("GetRecords", CSW_URL)
        .post("Transaction", CSW_URL)
        .post("GetRecordById", CSW_URL);
    let (client, transport) = connect(caps, &[]).await;

    assert_error_kind!(client.update("<a/>").await, "not_implemented");
    assert_error_kind!(client.delete("rec-1").await, "not_implemented");
    assert_error_kind!(
        client.delete_matching(&Filter::resource_ids(["rec-1"])).await,
        "not_implemented"
    );
    assert_error_kind!(client.delete_all().await, "not_implemented");
    assert_error_kind!(client.get_record_by_id("rec-1").await, "not_implemented");
    assert_eq!(transport.call_count(), 1);
}

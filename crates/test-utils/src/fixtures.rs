//! XML documents for client tests.
//!
//! Capabilities are built with [`CapabilitiesFixture`] so each test states
//! exactly which operations and bindings the service advertises.

use ows_protocol::Method;

pub const CSW_URL: &str = "http://host/csw";
pub const WFS_URL: &str = "http://host/wfs";

/// Namespace of the application schema used by the feature fixtures.
pub const APP_NS: &str = "http://example.com/app";

/// Builder for an OWS capabilities document.
#[derive(Debug, Clone)]
pub struct CapabilitiesFixture {
    root: &'static str,
    namespace: &'static str,
    version: String,
    ows: &'static str,
    operations: Vec<(String, Vec<(Method, String)>)>,
}

impl CapabilitiesFixture {
    /// `csw:Capabilities` version 2.0.2 with OWS 1.0 metadata.
    pub fn csw() -> Self {
        Self {
            root: "csw:Capabilities",
            namespace: "xmlns:csw=\"http://www.opengis.net/cat/csw/2.0.2\"",
            version: "2.0.2".to_string(),
            ows: "http://www.opengis.net/ows",
            operations: Vec::new(),
        }
    }

    /// `wfs:WFS_Capabilities` of the given version.
    pub fn wfs(version: &str) -> Self {
        let (namespace, ows) = if version.starts_with('2') {
            (
                "xmlns:wfs=\"http://www.opengis.net/wfs/2.0\"",
                "http://www.opengis.net/ows/1.1",
            )
        } else {
            (
                "xmlns:wfs=\"http://www.opengis.net/wfs\"",
                "http://www.opengis.net/ows",
            )
        };
        Self {
            root: "wfs:WFS_Capabilities",
            namespace,
            version: version.to_string(),
            ows,
            operations: Vec::new(),
        }
    }

    pub fn operation(mut self, name: &str, bindings: &[(Method, &str)]) -> Self {
        self.operations.push((
            name.to_string(),
            bindings
                .iter()
                .map(|(method, url)| (*method, url.to_string()))
                .collect(),
        ));
        self
    }

    /// Shortcut for an operation bound to `url` with GET only.
    pub fn get(self, name: &str, url: &str) -> Self {
        self.operation(name, &[(Method::Get, url)])
    }

    /// Shortcut for an operation bound to `url` with POST only.
    pub fn post(self, name: &str, url: &str) -> Self {
        self.operation(name, &[(Method::Post, url)])
    }

    pub fn build(&self) -> String {
        let mut xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<{} {} xmlns:ows=\"{}\" \
             xmlns:xlink=\"http://www.w3.org/1999/xlink\" version=\"{}\">\n",
            self.root, self.namespace, self.ows, self.version
        );
        xml.push_str("  <ows:ServiceIdentification>\n");
        xml.push_str("    <ows:Title>Fixture service</ows:Title>\n");
        xml.push_str("  </ows:ServiceIdentification>\n");
        xml.push_str("  <ows:OperationsMetadata>\n");
        for (name, bindings) in &self.operations {
            xml.push_str(&format!("    <ows:Operation name=\"{}\">\n", name));
            xml.push_str("      <ows:DCP><ows:HTTP>\n");
            for (method, url) in bindings {
                let tag = match method {
                    Method::Get => "ows:Get",
                    Method::Post => "ows:Post",
                };
                xml.push_str(&format!(
                    "        <{} xlink:type=\"simple\" xlink:href=\"{}\"/>\n",
                    tag, url
                ));
            }
            xml.push_str("      </ows:HTTP></ows:DCP>\n");
            xml.push_str("    </ows:Operation>\n");
        }
        xml.push_str("  </ows:OperationsMetadata>\n");
        xml.push_str(&format!("</{}>\n", self.root));
        xml
    }
}

/// An OWS 1.1 exception report with one exception.
pub fn exception_report(code: &str, locator: Option<&str>, text: &str) -> String {
    let locator = locator
        .map(|l| format!(" locator=\"{}\"", l))
        .unwrap_or_default();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <ows:ExceptionReport xmlns:ows=\"http://www.opengis.net/ows/1.1\" version=\"1.1.0\">\n\
         \x20 <ows:Exception exceptionCode=\"{}\"{}>\n\
         \x20   <ows:ExceptionText>{}</ows:ExceptionText>\n\
         \x20 </ows:Exception>\n\
         </ows:ExceptionReport>\n",
        code, locator, text
    )
}

/// A `csw:GetRecordsResponse` holding `csw:SummaryRecord`s for `(identifier, title)` pairs.
pub fn get_records_response(matched: u64, next_record: u64, records: &[(&str, &str)]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <csw:GetRecordsResponse xmlns:csw=\"http://www.opengis.net/cat/csw/2.0.2\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\" version=\"2.0.2\">\n\
         \x20 <csw:SearchStatus timestamp=\"2024-05-01T10:00:00Z\"/>\n",
    );
    xml.push_str(&format!(
        "  <csw:SearchResults numberOfRecordsMatched=\"{}\" numberOfRecordsReturned=\"{}\" \
         nextRecord=\"{}\" elementSet=\"summary\">\n",
        matched,
        records.len(),
        next_record
    ));
    for (identifier, title) in records {
        xml.push_str(&format!(
            "    <csw:SummaryRecord><dc:identifier>{}</dc:identifier>\
             <dc:title>{}</dc:title></csw:SummaryRecord>\n",
            identifier, title
        ));
    }
    xml.push_str("  </csw:SearchResults>\n</csw:GetRecordsResponse>\n");
    xml
}

/// A `csw:TransactionResponse` reporting the given inserted identifiers.
pub fn transaction_response(inserted: &[&str]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <csw:TransactionResponse xmlns:csw=\"http://www.opengis.net/cat/csw/2.0.2\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\" version=\"2.0.2\">\n\
         \x20 <csw:TransactionSummary>\n\
         \x20   <csw:totalInserted>{}</csw:totalInserted>\n\
         \x20   <csw:totalUpdated>0</csw:totalUpdated>\n\
         \x20   <csw:totalDeleted>0</csw:totalDeleted>\n\
         \x20 </csw:TransactionSummary>\n",
        inserted.len()
    );
    if !inserted.is_empty() {
        xml.push_str("  <csw:InsertResult>\n");
        for id in inserted {
            xml.push_str(&format!(
                "    <csw:BriefRecord><dc:identifier>{}</dc:identifier></csw:BriefRecord>\n",
                id
            ));
        }
        xml.push_str("  </csw:InsertResult>\n");
    }
    xml.push_str("</csw:TransactionResponse>\n");
    xml
}

/// A Dublin Core record suitable for insertion.
pub fn dublin_core_record(identifier: &str, title: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <csw:Record xmlns:csw=\"http://www.opengis.net/cat/csw/2.0.2\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n\
         \x20 <dc:identifier>{}</dc:identifier>\n\
         \x20 <dc:title>{}</dc:title>\n\
         </csw:Record>\n",
        identifier, title
    )
}

/// One feature of [`feature_collection`]: `app:<type_name>` with simple properties.
#[derive(Debug, Clone)]
pub struct FeatureFixture<'a> {
    pub type_name: &'a str,
    pub id: &'a str,
    pub properties: &'a [(&'a str, &'a str)],
}

/// A WFS 1.1.0 `wfs:FeatureCollection` with `gml:featureMember`s in the `app` namespace.
pub fn feature_collection(features: &[FeatureFixture<'_>]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <wfs:FeatureCollection xmlns:wfs=\"http://www.opengis.net/wfs\" \
         xmlns:gml=\"http://www.opengis.net/gml\" xmlns:app=\"{}\" \
         numberOfFeatures=\"{}\" timeStamp=\"2024-05-01T10:00:00Z\">\n",
        APP_NS,
        features.len()
    );
    for feature in features {
        xml.push_str("  <gml:featureMember>\n");
        xml.push_str(&format!(
            "    <app:{} gml:id=\"{}\">\n",
            feature.type_name, feature.id
        ));
        for (name, value) in feature.properties {
            xml.push_str(&format!("      <app:{0}>{1}</app:{0}>\n", name, value));
        }
        xml.push_str(&format!("    </app:{}>\n", feature.type_name));
        xml.push_str("  </gml:featureMember>\n");
    }
    xml.push_str("</wfs:FeatureCollection>\n");
    xml
}

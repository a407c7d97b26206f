//! GetRecords response decoding.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use ows_common::QName;
use ows_protocol::xml::{self, capture_subtree, local_name, Element, NamespaceScope};
use ows_protocol::DecodeError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;

use crate::constants::ElementSetName;

/// One record of a result set, kept as a standalone XML fragment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataRecord {
    /// Resolved element name (`csw:Record`, `gmd:MD_Metadata`, ...).
    pub name: QName,
    /// `dc:identifier` or `gmd:fileIdentifier`.
    pub identifier: Option<String>,
    pub title: Option<String>,
    /// The record element with all namespace declarations it needs.
    pub xml: String,
}

impl MetadataRecord {
    fn from_fragment(name: QName, xml: String) -> Result<Self, DecodeError> {
        let root = Element::parse(xml.as_bytes())?;

        let character_string = |e: &Element| {
            e.child_text("CharacterString")
                .unwrap_or_else(|| e.text.trim())
                .to_string()
        };
        let identifier = root
            .find("fileIdentifier")
            .or_else(|| root.find("identifier"))
            .map(character_string)
            .filter(|s| !s.is_empty());
        let title = root
            .find("title")
            .map(character_string)
            .filter(|s| !s.is_empty());

        Ok(Self {
            name,
            identifier,
            title,
            xml,
        })
    }
}

/// Decoded `csw:GetRecordsResponse`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetRecordsResponse {
    pub version: Option<String>,
    pub request_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub matched: u64,
    pub returned: u64,
    /// Position of the next record; 0 when the result set is exhausted.
    pub next_record: u64,
    pub element_set: Option<ElementSetName>,
    pub record_schema: Option<String>,
    pub records: Vec<MetadataRecord>,
}

impl GetRecordsResponse {
    pub fn has_more(&self) -> bool {
        self.next_record > 0 && self.next_record <= self.matched
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(DecodeError::Empty);
        }

        let mut reader = xml::reader(bytes);
        let mut scope = NamespaceScope::new();
        let mut path: Vec<String> = Vec::new();
        let mut response = ResponseBuilder::default();

        loop {
            let position = reader.buffer_position();
            let event = reader
                .read_event()
                .map_err(|e| DecodeError::Xml {
                    position,
                    message: e.to_string(),
                })?;
            match event {
                Event::Start(e) => {
                    scope.push(&e, position)?;
                    if response.open(&mut reader, &e, &path, &scope, position, false)? {
                        scope.pop();
                    } else {
                        path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                    }
                }
                Event::Empty(e) => {
                    scope.push(&e, position)?;
                    response.open(&mut reader, &e, &path, &scope, position, true)?;
                    scope.pop();
                }
                Event::End(_) => {
                    path.pop();
                    scope.pop();
                }
                Event::Text(t) => {
                    if path.last().map(String::as_str) == Some("RequestId") {
                        let text = t.unescape().map_err(|e| DecodeError::Xml {
                            position,
                            message: e.to_string(),
                        })?;
                        response.request_id = Some(text.trim().to_string());
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        response.finish()
    }
}

#[derive(Default)]
struct ResponseBuilder {
    root_seen: bool,
    version: Option<String>,
    request_id: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    results_seen: bool,
    matched: u64,
    returned: u64,
    next_record: u64,
    element_set: Option<ElementSetName>,
    record_schema: Option<String>,
    records: Vec<MetadataRecord>,
}

impl ResponseBuilder {
    /// Handle an opening tag. Returns true when the element was consumed
    /// entirely (a captured record).
    fn open(
        &mut self,
        reader: &mut Reader<&[u8]>,
        e: &BytesStart<'_>,
        path: &[String],
        scope: &NamespaceScope,
        position: usize,
        is_empty: bool,
    ) -> Result<bool, DecodeError> {
        let name = e.name();
        let local = local_name(name.as_ref());
        let attr = |key: &str| xml::attribute(e, key, position);

        if path.is_empty() {
            if local != b"GetRecordsResponse" {
                return Err(DecodeError::UnexpectedRoot {
                    expected: "GetRecordsResponse",
                    found: String::from_utf8_lossy(local).into_owned(),
                });
            }
            self.root_seen = true;
            self.version = attr("version")?;
            return Ok(false);
        }

        let parent = path.last().map(String::as_str);
        match (parent, local) {
            (Some("GetRecordsResponse"), b"SearchStatus") => {
                if let Some(ts) = attr("timestamp")? {
                    self.timestamp = Some(parse_timestamp(&ts)?);
                }
            }
            (Some("GetRecordsResponse"), b"SearchResults") => {
                self.results_seen = true;
                self.matched = required_count(attr("numberOfRecordsMatched")?, "numberOfRecordsMatched")?;
                self.returned =
                    required_count(attr("numberOfRecordsReturned")?, "numberOfRecordsReturned")?;
                self.next_record = match attr("nextRecord")? {
                    Some(v) => parse_count(&v, "nextRecord")?,
                    None => 0,
                };
                self.element_set = attr("elementSet")?.and_then(|v| ElementSetName::parse(&v));
                self.record_schema = attr("recordSchema")?;
            }
            (Some("SearchResults"), _) => {
                let qname = scope.qualify(name.as_ref());
                let fragment = capture_subtree(reader, e, scope, is_empty)?;
                self.records.push(MetadataRecord::from_fragment(qname, fragment)?);
                return Ok(true);
            }
            _ => {}
        }
        Ok(false)
    }

    fn finish(self) -> Result<GetRecordsResponse, DecodeError> {
        if !self.root_seen {
            return Err(DecodeError::MissingElement("GetRecordsResponse"));
        }
        if !self.results_seen {
            return Err(DecodeError::MissingElement("SearchResults"));
        }
        Ok(GetRecordsResponse {
            version: self.version,
            request_id: self.request_id,
            timestamp: self.timestamp,
            matched: self.matched,
            returned: self.returned,
            next_record: self.next_record,
            element_set: self.element_set,
            record_schema: self.record_schema,
            records: self.records,
        })
    }
}

fn parse_count(value: &str, field: &'static str) -> Result<u64, DecodeError> {
    value.trim().parse().map_err(|_| DecodeError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

fn required_count(value: Option<String>, attribute: &'static str) -> Result<u64, DecodeError> {
    let value = value.ok_or(DecodeError::MissingAttribute {
        element: "SearchResults",
        attribute,
    })?;
    parse_count(&value, attribute)
}

/// ISO 8601 timestamp; values without an offset are taken as UTC.
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DecodeError> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| DecodeError::InvalidValue {
            field: "timestamp",
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    const RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<csw:GetRecordsResponse xmlns:csw="http://www.opengis.net/cat/csw/2.0.2"
    xmlns:dc="http://purl.org/dc/elements/1.1/" version="2.0.2">
  <csw:RequestId>urn:uuid:42</csw:RequestId>
  <csw:SearchStatus timestamp="2024-03-01T12:30:00"/>
  <csw:SearchResults numberOfRecordsMatched="27" numberOfRecordsReturned="2"
      nextRecord="3" elementSet="brief" recordSchema="http://www.opengis.net/cat/csw/2.0.2">
    <csw:BriefRecord>
      <dc:identifier>rec-1</dc:identifier>
      <dc:title>Rivers</dc:title>
    </csw:BriefRecord>
    <csw:BriefRecord>
      <dc:identifier>rec-2</dc:identifier>
    </csw:BriefRecord>
  </csw:SearchResults>
</csw:GetRecordsResponse>"#;

    #[test]
    fn test_parse_dublin_core_results() {
        let response = GetRecordsResponse::parse(RESPONSE.as_bytes()).unwrap();
        assert_eq!(response.version.as_deref(), Some("2.0.2"));
        assert_eq!(response.request_id.as_deref(), Some("urn:uuid:42"));
        assert_eq!(response.timestamp.unwrap().year(), 2024);
        assert_eq!(response.matched, 27);
        assert_eq!(response.returned, 2);
        assert_eq!(response.next_record, 3);
        assert!(response.has_more());
        assert_eq!(response.element_set, Some(ElementSetName::Brief));
        assert_eq!(response.records.len(), 2);

        let first = &response.records[0];
        assert_eq!(first.name.local, "BriefRecord");
        assert_eq!(first.name.namespace.as_deref(), Some(ows_common::namespaces::CSW_202));
        assert_eq!(first.identifier.as_deref(), Some("rec-1"));
        assert_eq!(first.title.as_deref(), Some("Rivers"));
        assert!(first.xml.contains(r#"xmlns:dc="http://purl.org/dc/elements/1.1/""#));
        assert_eq!(response.records[1].title, None);
    }

    #[test]
    fn test_parse_iso_record_identifier() {
        let xml = r#"<csw:GetRecordsResponse xmlns:csw="http://www.opengis.net/cat/csw/2.0.2">
  <csw:SearchStatus timestamp="2024-03-01T12:30:00.5+01:00"/>
  <csw:SearchResults numberOfRecordsMatched="1" numberOfRecordsReturned="1" nextRecord="0">
    <gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd" xmlns:gco="http://www.isotc211.org/2005/gco">
      <gmd:fileIdentifier><gco:CharacterString>iso-7</gco:CharacterString></gmd:fileIdentifier>
      <gmd:identificationInfo><gmd:MD_DataIdentification><gmd:citation><gmd:CI_Citation>
        <gmd:title><gco:CharacterString>Land cover</gco:CharacterString></gmd:title>
      </gmd:CI_Citation></gmd:citation></gmd:MD_DataIdentification></gmd:identificationInfo>
    </gmd:MD_Metadata>
  </csw:SearchResults>
</csw:GetRecordsResponse>"#;
        let response = GetRecordsResponse::parse(xml.as_bytes()).unwrap();
        assert!(!response.has_more());
        let record = &response.records[0];
        assert_eq!(record.name.prefixed(), "gmd:MD_Metadata");
        assert_eq!(record.identifier.as_deref(), Some("iso-7"));
        assert_eq!(record.title.as_deref(), Some("Land cover"));
        assert!(record.xml.contains("xmlns:csw="));
    }

    #[test]
    fn test_hits_response_without_records() {
        let xml = r#"<csw:GetRecordsResponse xmlns:csw="http://www.opengis.net/cat/csw/2.0.2">
  <csw:SearchResults numberOfRecordsMatched="120" numberOfRecordsReturned="0"/>
</csw:GetRecordsResponse>"#;
        let response = GetRecordsResponse::parse(xml.as_bytes()).unwrap();
        assert_eq!(response.matched, 120);
        assert!(response.records.is_empty());
        assert_eq!(response.next_record, 0);
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(GetRecordsResponse::parse(b""), Err(DecodeError::Empty));
        assert!(matches!(
            GetRecordsResponse::parse(b"<csw:Capabilities xmlns:csw=\"x\"/>"),
            Err(DecodeError::UnexpectedRoot { .. })
        ));
        assert_eq!(
            GetRecordsResponse::parse(b"<GetRecordsResponse/>"),
            Err(DecodeError::MissingElement("SearchResults"))
        );
        assert_eq!(
            GetRecordsResponse::parse(
                b"<GetRecordsResponse><SearchResults numberOfRecordsReturned=\"0\"/></GetRecordsResponse>"
            ),
            Err(DecodeError::MissingAttribute {
                element: "SearchResults",
                attribute: "numberOfRecordsMatched"
            })
        );
        assert!(matches!(
            GetRecordsResponse::parse(
                b"<GetRecordsResponse><SearchResults numberOfRecordsMatched=\"many\" numberOfRecordsReturned=\"0\"/></GetRecordsResponse>"
            ),
            Err(DecodeError::InvalidValue { field: "numberOfRecordsMatched", .. })
        ));
    }
}

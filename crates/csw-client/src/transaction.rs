//! Transaction/Insert request and TransactionResponse decoding.

use ows_common::namespaces::{CSW_202, OGC};
use ows_protocol::xml::{self, Element, XmlWriter};
use ows_protocol::{
    DecodeError, EncodeContext, EncodeError, Method, OwsRequest, Payload, WireCodec,
};
use quick_xml::events::{BytesStart, Event};
use serde::Serialize;
use uuid::Uuid;

use crate::codec::CswCodec;
use crate::constants::SERVICE;

const OPERATION: &str = "Transaction";

/// Prefixes in scope for every record through the `csw:Transaction` root.
const ENVELOPE_PREFIXES: &[&str] = &["csw", "ogc", "xml"];

/// A well-formed XML record ready to be embedded in a request.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFragment {
    root: String,
    xml: String,
}

impl RecordFragment {
    /// Validate `xml` as a single-rooted document and strip its prolog.
    ///
    /// Every prefix used on an element or attribute must be declared inside
    /// the record or be one the transaction envelope declares.
    pub fn parse(xml: &[u8]) -> Result<Self, EncodeError> {
        let invalid = |message: String| EncodeError::InvalidRequest(format!("record: {}", message));

        let mut reader = xml::reader(xml);
        let mut scopes: Vec<Vec<String>> = Vec::new();
        let mut span: Option<(usize, usize)> = None;
        let mut start = 0usize;
        let mut root = String::new();

        loop {
            let position = reader.buffer_position();
            let event = reader
                .read_event()
                .map_err(|e| invalid(format!("at byte {}: {}", position, e)))?;
            match event {
                Event::Start(e) | Event::Empty(e) if span.is_some() => {
                    return Err(invalid(format!(
                        "more than one root element ({})",
                        String::from_utf8_lossy(e.name().as_ref())
                    )));
                }
                Event::Start(e) => {
                    let declared = check_prefixes(&e, &scopes).map_err(invalid)?;
                    if scopes.is_empty() {
                        start = position;
                        root = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    }
                    scopes.push(declared);
                }
                Event::Empty(e) => {
                    check_prefixes(&e, &scopes).map_err(invalid)?;
                    if scopes.is_empty() {
                        root = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        span = Some((position, reader.buffer_position()));
                    }
                }
                Event::End(_) => {
                    scopes.pop();
                    if scopes.is_empty() {
                        span = Some((start, reader.buffer_position()));
                    }
                }
                Event::Text(_) | Event::CData(_) if scopes.is_empty() => {
                    return Err(invalid("character data outside the root element".to_string()));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let (from, to) = span.ok_or_else(|| invalid("no root element".to_string()))?;
        if !scopes.is_empty() {
            return Err(invalid("unterminated root element".to_string()));
        }
        let fragment = std::str::from_utf8(&xml[from..to])
            .map_err(|e| invalid(e.to_string()))?
            .trim()
            .to_string();

        Ok(Self {
            root,
            xml: fragment,
        })
    }

    /// Qualified name of the root element as written.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn as_str(&self) -> &str {
        &self.xml
    }
}

/// Prefixes declared on `element`, after checking that every prefix it uses is
/// bound by itself, an ancestor or the envelope.
fn check_prefixes(element: &BytesStart, scopes: &[Vec<String>]) -> Result<Vec<String>, String> {
    let mut declared: Vec<String> = Vec::new();
    let mut used: Vec<String> = Vec::new();
    if let Some((prefix, _)) = split_prefix(element.name().into_inner()) {
        used.push(prefix.to_string());
    }
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        match split_prefix(attribute.key.into_inner()) {
            Some(("xmlns", prefix)) => declared.push(prefix.to_string()),
            Some((prefix, _)) => used.push(prefix.to_string()),
            None => {}
        }
    }

    let in_scope = |prefix: &str| {
        ENVELOPE_PREFIXES.contains(&prefix)
            || declared.iter().any(|d| d == prefix)
            || scopes.iter().flatten().any(|d| d == prefix)
    };
    if let Some(prefix) = used.iter().find(|p| !in_scope(p)) {
        return Err(format!(
            "undeclared namespace prefix '{}' on <{}>",
            prefix,
            String::from_utf8_lossy(element.name().as_ref())
        ));
    }
    Ok(declared)
}

fn split_prefix(name: &[u8]) -> Option<(&str, &str)> {
    std::str::from_utf8(name).ok()?.split_once(':')
}

/// `csw:Transaction` with a single `csw:Insert` of one or more records.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionInsert {
    request_id: String,
    records: Vec<RecordFragment>,
}

impl TransactionInsert {
    /// Validate the records; each must be a well-formed XML document.
    pub fn new<I, B>(records: I) -> Result<Self, EncodeError>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let records = records
            .into_iter()
            .map(|r| RecordFragment::parse(r.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        if records.is_empty() {
            return Err(EncodeError::InvalidRequest(
                "insert needs at least one record".to_string(),
            ));
        }
        Ok(Self {
            request_id: format!("urn:uuid:{}", Uuid::new_v4()),
            records,
        })
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn records(&self) -> &[RecordFragment] {
        &self.records
    }

    pub fn to_xml(&self, version: &str) -> Result<Vec<u8>, EncodeError> {
        let mut w = XmlWriter::new();
        w.declaration()?;
        w.start(
            "csw:Transaction",
            &[
                ("xmlns:csw", CSW_202),
                ("xmlns:ogc", OGC),
                ("service", SERVICE),
                ("version", version),
                ("requestId", self.request_id.as_str()),
            ],
        )?;
        w.start("csw:Insert", &[])?;
        for record in &self.records {
            w.raw(record.as_str().as_bytes());
        }
        w.end("csw:Insert")?;
        w.end("csw:Transaction")?;
        Ok(w.into_inner())
    }
}

impl OwsRequest for TransactionInsert {
    type Response = TransactionResponse;
    const OPERATION: &'static str = OPERATION;
    const PREFERRED_METHOD: Method = Method::Post;
    const REQUIRES_ADVERTISED: bool = true;
}

impl WireCodec<TransactionInsert> for CswCodec {
    fn encode(&self, request: &TransactionInsert, ctx: &EncodeContext) -> Result<Payload, EncodeError> {
        match ctx.method {
            Method::Post => request.to_xml(&ctx.version.to_string()).map(Payload::Xml),
            Method::Get => Err(ctx.unsupported_method(OPERATION)),
        }
    }

    fn decode_success(&self, body: &[u8]) -> Result<TransactionResponse, DecodeError> {
        TransactionResponse::parse(body)
    }
}

/// Decoded `csw:TransactionResponse`.
///
/// Partial success shows up in the totals; nothing is inferred beyond what
/// the service reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionResponse {
    pub version: Option<String>,
    pub request_id: Option<String>,
    pub total_inserted: u64,
    pub total_updated: u64,
    pub total_deleted: u64,
    /// Identifiers from the `InsertResult` brief records, in order.
    pub inserted_ids: Vec<String>,
}

impl TransactionResponse {
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        let root = Element::parse(bytes)?;
        if root.local_name() != "TransactionResponse" {
            return Err(DecodeError::UnexpectedRoot {
                expected: "TransactionResponse",
                found: root.local_name().to_string(),
            });
        }

        let summary = root
            .child("TransactionSummary")
            .ok_or(DecodeError::MissingElement("TransactionSummary"))?;
        let total = |name: &'static str| -> Result<u64, DecodeError> {
            match summary.child_text(name) {
                Some(value) => value.parse().map_err(|_| DecodeError::InvalidValue {
                    field: name,
                    value: value.to_string(),
                }),
                None => Ok(0),
            }
        };

        let inserted_ids = root
            .children_named("InsertResult")
            .flat_map(|result| result.children.iter())
            .filter_map(|record| record.child_text("identifier"))
            .map(str::to_string)
            .collect();

        Ok(Self {
            version: root.attribute("version").map(str::to_string),
            request_id: summary.attribute("requestId").map(str::to_string),
            total_inserted: total("totalInserted")?,
            total_updated: total("totalUpdated")?,
            total_deleted: total("totalDeleted")?,
            inserted_ids,
        })
    }
}

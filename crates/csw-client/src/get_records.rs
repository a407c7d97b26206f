//! GetRecords request and its XML (POST) and KVP (GET) encodings.

use ows_common::namespaces::{self, CSW_202, GML, OGC, OWS};
use ows_common::QName;
use ows_protocol::fes;
use ows_protocol::xml::XmlWriter;
use ows_protocol::{
    DecodeError, EncodeContext, EncodeError, Method, OwsRequest, Payload, WireCodec,
};
use ows_query::{AdHocQuery, Filter, SortProperty};
use serde::Serialize;
use tracing::debug;

use crate::codec::CswCodec;
use crate::constants::{ElementSetName, ResultType, BOUNDING_BOX_PROPERTY, SERVICE};
use crate::response::GetRecordsResponse;

const OPERATION: &str = "GetRecords";
const FILTER_VERSION: &str = "1.1.0";

/// Bind property-less BBOX operators to `ows:BoundingBox`.
///
/// Catalogues have no default geometry to fall back on, and many reject a
/// `ogc:BBOX` without a `ogc:PropertyName`.
pub fn catalogue_constraint(filter: Filter) -> Filter {
    match filter {
        Filter::BBox {
            property: None,
            envelope,
        } => Filter::bbox_on(BOUNDING_BOX_PROPERTY, envelope),
        Filter::And { operands } => Filter::And {
            operands: operands.into_iter().map(catalogue_constraint).collect(),
        },
        Filter::Or { operands } => Filter::Or {
            operands: operands.into_iter().map(catalogue_constraint).collect(),
        },
        Filter::Not { operand } => Filter::Not {
            operand: Box::new(catalogue_constraint(*operand)),
        },
        other => other,
    }
}

fn uses_ows_properties(filter: &Filter) -> bool {
    let is_ows = |property: &str| property.starts_with("ows:");
    match filter {
        Filter::ResourceId { .. } => false,
        Filter::BBox { property, .. } => property.as_deref().is_some_and(is_ows),
        Filter::PropertyIsEqualTo { property, .. } | Filter::PropertyIsLike { property, .. } => {
            is_ows(property)
        }
        Filter::And { operands } | Filter::Or { operands } => {
            operands.iter().any(uses_ows_properties)
        }
        Filter::Not { operand } => uses_ows_properties(operand),
    }
}

/// Which parts of each record the service returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementSelection {
    /// A predefined element set.
    SetName(ElementSetName),
    /// An explicit list of (prefixed) element names.
    Names(Vec<String>),
}

impl Default for ElementSelection {
    fn default() -> Self {
        ElementSelection::SetName(ElementSetName::Full)
    }
}

/// A CSW GetRecords search.
///
/// Every field is sent exactly as given; no defaults are filled in on the way
/// to the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetRecords {
    pub start_position: u32,
    pub max_records: u32,
    pub output_format: String,
    pub output_schema: String,
    pub type_names: Vec<QName>,
    pub result_type: ResultType,
    pub elements: ElementSelection,
    pub constraint: Option<Filter>,
    pub sort_by: Vec<SortProperty>,
}

impl GetRecords {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start_position: u32,
        max_records: u32,
        output_format: impl Into<String>,
        output_schema: impl Into<String>,
        type_names: Vec<QName>,
        result_type: ResultType,
        element_set: ElementSetName,
        constraint: Option<Filter>,
    ) -> Self {
        Self {
            start_position,
            max_records,
            output_format: output_format.into(),
            output_schema: output_schema.into(),
            type_names,
            result_type,
            elements: ElementSelection::SetName(element_set),
            constraint,
            sort_by: Vec::new(),
        }
    }

    /// Search built from an ad-hoc query.
    ///
    /// Type names, constraint and sort order carry over; a BBOX constraint
    /// targets `ows:BoundingBox`. A projection becomes
    /// an `ElementName` list (the union over all types, in order).
    pub fn from_query(
        query: &AdHocQuery,
        start_position: u32,
        max_records: u32,
        output_format: impl Into<String>,
        output_schema: impl Into<String>,
        result_type: ResultType,
    ) -> Self {
        let elements = if query.common().has_projection() {
            let mut names: Vec<String> = Vec::new();
            for clause in query.projection_clauses().iter().flatten() {
                if !names.contains(&clause.property) {
                    names.push(clause.property.clone());
                }
            }
            ElementSelection::Names(names)
        } else {
            ElementSelection::default()
        };

        Self {
            start_position,
            max_records,
            output_format: output_format.into(),
            output_schema: output_schema.into(),
            type_names: query.type_names().iter().map(|t| t.name.clone()).collect(),
            result_type,
            elements,
            constraint: query.constraint().map(catalogue_constraint),
            sort_by: query.sort_by().to_vec(),
        }
    }

    pub fn with_sort_by(mut self, sort_by: Vec<SortProperty>) -> Self {
        self.sort_by = sort_by;
        self
    }

    pub fn with_element_names(mut self, names: Vec<String>) -> Self {
        self.elements = ElementSelection::Names(names);
        self
    }

    fn type_names_value(&self) -> Result<String, EncodeError> {
        if self.type_names.is_empty() {
            return Err(EncodeError::InvalidRequest(
                "GetRecords needs at least one type name".to_string(),
            ));
        }
        Ok(self
            .type_names
            .iter()
            .map(QName::prefixed)
            .collect::<Vec<_>>()
            .join(","))
    }

    /// (prefix, namespace) of the type names that need a declaration.
    fn type_name_namespaces(&self) -> Vec<(String, String)> {
        let mut bindings: Vec<(String, String)> = Vec::new();
        for name in &self.type_names {
            let Some(prefix) = name.prefix.as_deref() else {
                continue;
            };
            if matches!(prefix, "csw" | "ogc" | "gml" | "ows") {
                continue;
            }
            let namespace = name
                .namespace
                .as_deref()
                .or_else(|| namespaces::for_prefix(prefix));
            match namespace {
                Some(ns) => {
                    if !bindings.iter().any(|(p, _)| p == prefix) {
                        bindings.push((prefix.to_string(), ns.to_string()));
                    }
                }
                None => debug!(prefix = prefix, "No namespace known for type name prefix"),
            }
        }
        bindings
    }

    /// `csw:GetRecords` document.
    pub fn to_xml(&self, version: &str) -> Result<Vec<u8>, EncodeError> {
        let type_names = self.type_names_value()?;
        let bindings: Vec<(String, String)> = self
            .type_name_namespaces()
            .into_iter()
            .map(|(prefix, ns)| (format!("xmlns:{}", prefix), ns))
            .collect();
        let start_position = self.start_position.to_string();
        let max_records = self.max_records.to_string();

        let mut attributes: Vec<(&str, &str)> = vec![
            ("xmlns:csw", CSW_202),
            ("xmlns:ogc", OGC),
            ("xmlns:gml", GML),
            ("xmlns:ows", OWS),
        ];
        attributes.extend(bindings.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        attributes.extend([
            ("service", SERVICE),
            ("version", version),
            ("startPosition", start_position.as_str()),
            ("maxRecords", max_records.as_str()),
            ("outputFormat", self.output_format.as_str()),
            ("outputSchema", self.output_schema.as_str()),
            ("resultType", self.result_type.as_str()),
        ]);

        let mut w = XmlWriter::new();
        w.declaration()?;
        w.start("csw:GetRecords", &attributes)?;
        w.start("csw:Query", &[("typeNames", type_names.as_str())])?;
        match &self.elements {
            ElementSelection::SetName(set) => {
                w.text_element("csw:ElementSetName", &[], set.as_str())?
            }
            ElementSelection::Names(names) => {
                for name in names {
                    w.text_element("csw:ElementName", &[], name)?;
                }
            }
        }
        if let Some(constraint) = &self.constraint {
            w.start("csw:Constraint", &[("version", FILTER_VERSION)])?;
            fes::write_filter(&mut w, constraint, false)?;
            w.end("csw:Constraint")?;
        }
        fes::write_sort_by(&mut w, &self.sort_by)?;
        w.end("csw:Query")?;
        w.end("csw:GetRecords")?;
        Ok(w.into_inner())
    }

    /// KVP pairs, in the same field order as the XML encoding.
    pub fn to_kvp(&self, version: &str) -> Result<Vec<(String, String)>, EncodeError> {
        let mut pairs: Vec<(String, String)> = vec![
            ("service".into(), SERVICE.into()),
            ("version".into(), version.into()),
            ("request".into(), OPERATION.into()),
            ("startPosition".into(), self.start_position.to_string()),
            ("maxRecords".into(), self.max_records.to_string()),
            ("outputFormat".into(), self.output_format.clone()),
            ("outputSchema".into(), self.output_schema.clone()),
            ("resultType".into(), self.result_type.as_str().into()),
            ("typeNames".into(), self.type_names_value()?),
        ];

        let mut bindings = self.type_name_namespaces();
        if self.constraint.as_ref().is_some_and(uses_ows_properties)
            && !bindings.iter().any(|(p, _)| p == "ows")
        {
            bindings.push(("ows".to_string(), OWS.to_string()));
        }
        if !bindings.is_empty() {
            let value = bindings
                .iter()
                .map(|(prefix, ns)| format!("xmlns({}={})", prefix, ns))
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("namespace".into(), value));
        }

        match &self.elements {
            ElementSelection::SetName(set) => {
                pairs.push(("ElementSetName".into(), set.as_str().into()))
            }
            ElementSelection::Names(names) => pairs.push(("ElementName".into(), names.join(","))),
        }

        if let Some(constraint) = &self.constraint {
            pairs.push(("constraintLanguage".into(), "FILTER".into()));
            pairs.push(("constraint_language_version".into(), FILTER_VERSION.into()));
            pairs.push(("constraint".into(), fes::filter_to_string(constraint)?));
        }

        if !self.sort_by.is_empty() {
            let value = self
                .sort_by
                .iter()
                .map(|s| format!("{}:{}", s.property, s.order.as_kvp_short()))
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("sortBy".into(), value));
        }

        Ok(pairs)
    }
}

impl OwsRequest for GetRecords {
    type Response = GetRecordsResponse;
    const OPERATION: &'static str = OPERATION;
    const PREFERRED_METHOD: Method = Method::Post;
}

impl WireCodec<GetRecords> for CswCodec {
    fn encode(&self, request: &GetRecords, ctx: &EncodeContext) -> Result<Payload, EncodeError> {
        let version = ctx.version.to_string();
        match ctx.method {
            Method::Post => request.to_xml(&version).map(Payload::Xml),
            Method::Get => request.to_kvp(&version).map(Payload::Kvp),
        }
    }

    fn decode_success(&self, body: &[u8]) -> Result<GetRecordsResponse, DecodeError> {
        GetRecordsResponse::parse(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ows_common::Envelope;
    use ows_protocol::ProtocolVersion;
    use ows_query::{QueryBuilder, TypeName};

    fn iso_search() -> GetRecords {
        GetRecords::new(
            10,
            15,
            "application/xml",
            "http://www.isotc211.org/2005/gmd",
            vec![QName::parse_prefixed("gmd:MD_Metadata").unwrap()],
            ResultType::Results,
            ElementSetName::Full,
            None,
        )
    }

    fn position(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("{needle} not found in {haystack}"))
    }

    #[test]
    fn test_xml_field_order() {
        let mut request = iso_search().with_sort_by(vec![SortProperty::descending("dc:date")]);
        request.constraint = Some(Filter::like("dc:title", "river*"));
        let xml = String::from_utf8(request.to_xml("2.0.2").unwrap()).unwrap();

        let order = [
            r#"service="CSW""#,
            r#"version="2.0.2""#,
            r#"startPosition="10""#,
            r#"maxRecords="15""#,
            r#"outputFormat="application/xml""#,
            r#"outputSchema="http://www.isotc211.org/2005/gmd""#,
            r#"resultType="results""#,
            r#"<csw:Query typeNames="gmd:MD_Metadata">"#,
            "<csw:ElementSetName>full</csw:ElementSetName>",
            r#"<csw:Constraint version="1.1.0"><ogc:Filter><ogc:PropertyIsLike"#,
            "<ogc:SortBy>",
            "</csw:GetRecords>",
        ];
        let positions: Vec<usize> = order.iter().map(|n| position(&xml, n)).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{xml}");
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"xmlns:gmd="http://www.isotc211.org/2005/gmd""#));
    }

    #[test]
    fn test_kvp_field_order() {
        let mut request = iso_search();
        request.constraint = Some(Filter::bbox(Envelope::new(0.0, 0.0, 10.0, 10.0)));
        let pairs = request.to_kvp("2.0.2").unwrap();
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "service",
                "version",
                "request",
                "startPosition",
                "maxRecords",
                "outputFormat",
                "outputSchema",
                "resultType",
                "typeNames",
                "namespace",
                "ElementSetName",
                "constraintLanguage",
                "constraint_language_version",
                "constraint",
            ]
        );
        assert_eq!(pairs[9].1, "xmlns(gmd=http://www.isotc211.org/2005/gmd)");
        assert!(pairs[13].1.starts_with("<ogc:Filter xmlns:ogc="));
    }

    #[test]
    fn test_encode_follows_method() {
        let ctx = |method| EncodeContext::new(method, ProtocolVersion::new(2, 0, 2));
        let request = iso_search();
        assert!(matches!(
            CswCodec.encode(&request, &ctx(Method::Post)).unwrap(),
            Payload::Xml(_)
        ));
        let payload = CswCodec.encode(&request, &ctx(Method::Get)).unwrap();
        assert_eq!(payload.kvp_value("REQUEST"), Some("GetRecords"));
    }

    #[test]
    fn test_missing_type_names_is_an_encoding_error() {
        let mut request = iso_search();
        request.type_names.clear();
        assert!(matches!(
            request.to_xml("2.0.2"),
            Err(EncodeError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_from_query() {
        let query = QueryBuilder::new()
            .type_name(TypeName::new(QName::parse_prefixed("csw:Record").unwrap()))
            .projection_clauses(vec![vec![
                ows_query::ProjectionClause::new("dc:identifier"),
                ows_query::ProjectionClause::new("dc:title"),
            ]])
            .bbox(Envelope::new(5.0, 47.0, 15.0, 55.0))
            .sort_by(SortProperty::ascending("dc:title"))
            .build()
            .unwrap();

        let request = GetRecords::from_query(
            &query,
            1,
            20,
            "application/xml",
            crate::constants::OUTPUT_SCHEMA_CSW,
            ResultType::Results,
        );
        assert_eq!(
            request.elements,
            ElementSelection::Names(vec!["dc:identifier".into(), "dc:title".into()])
        );
        assert_eq!(
            request.constraint,
            Some(Filter::bbox_on(
                "ows:BoundingBox",
                Envelope::new(5.0, 47.0, 15.0, 55.0)
            ))
        );
        assert_eq!(request.sort_by.len(), 1);

        let xml = String::from_utf8(request.to_xml("2.0.2").unwrap()).unwrap();
        assert!(xml.contains("<csw:ElementName>dc:identifier</csw:ElementName><csw:ElementName>dc:title</csw:ElementName>"));
        assert_eq!(xml.matches("xmlns:csw=").count(), 1);
        assert!(xml.contains(r#"xmlns:ows="http://www.opengis.net/ows""#));
        assert!(xml.contains(
            "<ogc:BBOX><ogc:PropertyName>ows:BoundingBox</ogc:PropertyName><gml:Envelope"
        ));
    }

    #[test]
    fn test_catalogue_constraint_binds_nested_bbox() {
        let envelope = Envelope::new(0.0, 0.0, 1.0, 1.0);
        let filter = Filter::And {
            operands: vec![
                Filter::equal_to("dc:type", "dataset"),
                Filter::Not {
                    operand: Box::new(Filter::bbox(envelope.clone())),
                },
                Filter::bbox_on("app:extent", envelope.clone()),
            ],
        };
        let expected = Filter::And {
            operands: vec![
                Filter::equal_to("dc:type", "dataset"),
                Filter::Not {
                    operand: Box::new(Filter::bbox_on("ows:BoundingBox", envelope.clone())),
                },
                Filter::bbox_on("app:extent", envelope),
            ],
        };
        assert_eq!(catalogue_constraint(filter), expected);
    }

    #[test]
    fn test_kvp_declares_ows_for_bounding_box_constraint() {
        let mut request = iso_search();
        request.constraint = Some(Filter::bbox_on(
            "ows:BoundingBox",
            Envelope::new(0.0, 0.0, 10.0, 10.0),
        ));
        let pairs = request.to_kvp("2.0.2").unwrap();
        let namespace = pairs
            .iter()
            .find(|(k, _)| k == "namespace")
            .map(|(_, v)| v.as_str());
        assert_eq!(
            namespace,
            Some("xmlns(gmd=http://www.isotc211.org/2005/gmd),xmlns(ows=http://www.opengis.net/ows)")
        );
    }
}

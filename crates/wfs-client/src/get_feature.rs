//! GetFeature request: KVP encoding and decoding for WFS 1.1.0 and 2.0.0,
//! XML encoding for WFS 1.1.0.
//!
//! A request carries a single ad-hoc query. The KVP parameter names follow
//! the negotiated version:
//!
//! | concept        | 1.1.0          | 2.0.0          |
//! |----------------|----------------|----------------|
//! | types          | `typeName`     | `typeNames`    |
//! | namespaces     | `namespace`    | `namespaces`   |
//! | limit          | `maxFeatures`  | `count`        |
//! | identifiers    | `featureId`    | `resourceId`   |

use ows_common::namespaces::{self, GML, OGC, WFS};
use ows_common::{Envelope, QName};
use ows_protocol::fes;
use ows_protocol::xml::XmlWriter;
use ows_protocol::{
    DecodeError, EncodeContext, EncodeError, Method, OwsRequest, Payload, ProtocolVersion,
    WireCodec,
};
use ows_query::{
    AdHocQuery, Filter, ProjectionClause, QueryBuilder, QueryError, SortOrder, SortProperty,
    TypeName,
};
use serde::Serialize;
use tracing::debug;

use crate::codec::WfsCodec;
use crate::constants::{is_wfs2, version_110, ResultType, SERVICE};
use crate::feature_collection::FeatureCollection;

const OPERATION: &str = "GetFeature";

/// A WFS GetFeature request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetFeature {
    pub query: AdHocQuery,
    /// `maxFeatures` (1.1.0) or `count` (2.0.0).
    pub max_features: Option<u32>,
    /// Zero-based paging offset; WFS 2.0 only.
    pub start_index: Option<u32>,
    pub result_type: ResultType,
    pub output_format: Option<String>,
}

impl GetFeature {
    pub fn new(query: impl Into<AdHocQuery>) -> Self {
        Self {
            query: query.into(),
            max_features: None,
            start_index: None,
            result_type: ResultType::default(),
            output_format: None,
        }
    }

    pub fn with_max_features(mut self, max_features: u32) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_start_index(mut self, start_index: u32) -> Self {
        self.start_index = Some(start_index);
        self
    }

    pub fn with_result_type(mut self, result_type: ResultType) -> Self {
        self.result_type = result_type;
        self
    }

    pub fn with_output_format(mut self, output_format: impl Into<String>) -> Self {
        self.output_format = Some(output_format.into());
        self
    }

    /// KVP pairs for `version`.
    pub fn to_kvp(&self, version: &ProtocolVersion) -> Result<Vec<(String, String)>, EncodeError> {
        let wfs2 = is_wfs2(version);
        let query = &self.query;
        let type_names = query.type_names();

        let mut pairs: Vec<(String, String)> = vec![
            ("service".into(), SERVICE.into()),
            ("version".into(), version.to_string()),
            ("request".into(), OPERATION.into()),
            (
                key(wfs2, "typeNames", "typeName"),
                join(type_names.iter().map(|t| t.name.prefixed()), ","),
            ),
        ];

        let bindings = namespace_bindings(type_names);
        if !bindings.is_empty() {
            let value = join(
                bindings.iter().map(|(prefix, ns)| {
                    if wfs2 {
                        format!("xmlns({},{})", prefix, ns)
                    } else {
                        format!("xmlns({}={})", prefix, ns)
                    }
                }),
                ",",
            );
            pairs.push((key(wfs2, "namespaces", "namespace"), value));
        }

        if let Some(aliases) = aliases(type_names)? {
            if !wfs2 {
                return Err(EncodeError::InvalidRequest(
                    "type name aliases require WFS 2.0".to_string(),
                ));
            }
            pairs.push(("aliases".into(), aliases));
        }

        if query.common().has_projection() {
            let rows = query.projection_clauses();
            let value = if rows.len() == 1 {
                join(rows[0].iter().map(|c| c.property.clone()), ",")
            } else {
                rows.iter()
                    .map(|row| format!("({})", join(row.iter().map(|c| c.property.clone()), ",")))
                    .collect()
            };
            pairs.push(("propertyName".into(), value));
        }

        if let Some(srs) = query.srs_name() {
            pairs.push(("srsName".into(), srs.as_str().to_string()));
        }
        if let Some(feature_version) = query.feature_version() {
            if wfs2 {
                return Err(EncodeError::InvalidRequest(
                    "featureVersion has no WFS 2.0 KVP encoding".to_string(),
                ));
            }
            pairs.push(("featureVersion".into(), feature_version.to_string()));
        }

        if let Some(max) = self.max_features {
            pairs.push((key(wfs2, "count", "maxFeatures"), max.to_string()));
        }
        if let Some(start) = self.start_index {
            if !wfs2 {
                return Err(EncodeError::InvalidRequest(
                    "startIndex requires WFS 2.0".to_string(),
                ));
            }
            pairs.push(("startIndex".into(), start.to_string()));
        }
        pairs.push(("resultType".into(), self.result_type.as_str().into()));
        if let Some(format) = &self.output_format {
            pairs.push(("outputFormat".into(), format.clone()));
        }

        if !query.sort_by().is_empty() {
            let value = join(
                query.sort_by().iter().map(|s| {
                    let order = if wfs2 {
                        s.order.as_fes()
                    } else {
                        s.order.as_kvp_short()
                    };
                    format!("{} {}", s.property, order)
                }),
                ",",
            );
            pairs.push(("sortBy".into(), value));
        }

        match query {
            AdHocQuery::Plain(_) => {}
            AdHocQuery::BBox(q) => pairs.push(("BBOX".into(), q.bbox().to_kvp())),
            AdHocQuery::Filter(q) => match q.filter() {
                Filter::ResourceId { ids } => pairs.push((
                    key(wfs2, "resourceId", "featureId"),
                    ids.join(","),
                )),
                filter => pairs.push(("filter".into(), fes::filter_to_string(filter)?)),
            },
        }

        if let Some(handle) = query.handle() {
            debug!(handle = handle, "Query handle has no KVP encoding, dropped");
        }

        Ok(pairs)
    }

    /// Rebuild a request from KVP pairs of either version. Keys are
    /// case-insensitive.
    pub fn from_kvp(pairs: &[(String, String)]) -> Result<Self, DecodeError> {
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str())
        };
        let either = |new: &str, old: &str| get(new).or_else(|| get(old));

        if let Some(request) = get("request") {
            if !request.eq_ignore_ascii_case(OPERATION) {
                return Err(invalid("request", request));
            }
        }

        let types = either("typeNames", "typeName").ok_or(DecodeError::MissingParameter("typeNames"))?;
        let bindings = match either("namespaces", "namespace") {
            Some(value) => parse_namespaces(value)?,
            None => Vec::new(),
        };
        let aliases: Vec<&str> = get("aliases").map(split_list).unwrap_or_default();

        let mut builder = QueryBuilder::new();
        for (i, name) in split_list(types).into_iter().enumerate() {
            let mut qname = QName::parse_prefixed(name).map_err(|_| invalid("typeNames", name))?;
            if let Some(prefix) = qname.prefix.clone() {
                if let Some((_, ns)) = bindings.iter().find(|(p, _)| *p == prefix) {
                    qname = qname.with_namespace(ns.clone());
                }
            }
            builder = builder.type_name(match aliases.get(i) {
                Some(alias) => TypeName::with_alias(qname, *alias),
                None => TypeName::new(qname),
            });
        }

        if let Some(value) = get("propertyName") {
            builder = builder.projection_clauses(parse_projection(value)?);
        }
        if let Some(srs) = get("srsName") {
            builder = builder.srs_name(srs);
        }
        if let Some(feature_version) = get("featureVersion") {
            builder = builder.feature_version(feature_version);
        }
        if let Some(value) = get("sortBy") {
            for sort in parse_sort_by(value)? {
                builder = builder.sort_by(sort);
            }
        }

        let bbox = get("BBOX");
        let filter = get("filter");
        let ids = either("resourceId", "featureId");
        if [bbox.is_some(), filter.is_some(), ids.is_some()]
            .iter()
            .filter(|present| **present)
            .count()
            > 1
        {
            return Err(invalid(
                "constraint",
                "only one of BBOX, FILTER and resource identifiers",
            ));
        }
        if let Some(value) = bbox {
            builder = builder.bbox(Envelope::from_kvp(value).map_err(|_| invalid("BBOX", value))?);
        }
        if let Some(value) = filter {
            builder = builder.filter(fes::parse_filter(value.as_bytes())?);
        }
        if let Some(value) = ids {
            builder = builder.filter(Filter::resource_ids(split_list(value)));
        }

        let query = builder.build().map_err(query_error)?;

        let count = |key: &'static str, value: Option<&str>| -> Result<Option<u32>, DecodeError> {
            value
                .map(|v| v.trim().parse().map_err(|_| invalid(key, v)))
                .transpose()
        };

        Ok(Self {
            query,
            max_features: count("count", either("count", "maxFeatures"))?,
            start_index: count("startIndex", get("startIndex"))?,
            result_type: match get("resultType") {
                Some(value) => ResultType::parse(value).ok_or_else(|| invalid("resultType", value))?,
                None => ResultType::default(),
            },
            output_format: get("outputFormat").map(str::to_string),
        })
    }

    /// `wfs:GetFeature` document. Only WFS 1.1 has an XML encoding here.
    pub fn to_xml(&self, version: &ProtocolVersion) -> Result<Vec<u8>, EncodeError> {
        if is_wfs2(version) || *version < version_110() {
            return Err(EncodeError::UnsupportedVersion {
                operation: OPERATION,
                binding: "XML",
                version: version.to_string(),
            });
        }
        if self.start_index.is_some() {
            return Err(EncodeError::InvalidRequest(
                "startIndex requires WFS 2.0".to_string(),
            ));
        }

        let query = &self.query;
        let type_names = query.type_names();
        if aliases(type_names)?.is_some() {
            return Err(EncodeError::InvalidRequest(
                "type name aliases require WFS 2.0".to_string(),
            ));
        }

        let version = version.to_string();
        let max_features = self.max_features.map(|m| m.to_string());
        let bindings: Vec<(String, String)> = namespace_bindings(type_names)
            .into_iter()
            .map(|(prefix, ns)| (format!("xmlns:{}", prefix), ns))
            .collect();

        let mut attributes: Vec<(&str, &str)> =
            vec![("xmlns:wfs", WFS), ("xmlns:ogc", OGC), ("xmlns:gml", GML)];
        attributes.extend(bindings.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        attributes.extend([
            ("service", SERVICE),
            ("version", version.as_str()),
            ("resultType", self.result_type.as_str()),
        ]);
        if let Some(format) = &self.output_format {
            attributes.push(("outputFormat", format.as_str()));
        }
        if let Some(max) = &max_features {
            attributes.push(("maxFeatures", max.as_str()));
        }

        let type_name = join(type_names.iter().map(|t| t.name.prefixed()), " ");
        let mut query_attributes: Vec<(&str, &str)> = vec![("typeName", type_name.as_str())];
        if let Some(srs) = query.srs_name() {
            query_attributes.push(("srsName", srs.as_str()));
        }
        if let Some(feature_version) = query.feature_version() {
            query_attributes.push(("featureVersion", feature_version));
        }
        if let Some(handle) = query.handle() {
            query_attributes.push(("handle", handle));
        }

        let mut w = XmlWriter::new();
        w.declaration()?;
        w.start("wfs:GetFeature", &attributes)?;
        w.start("wfs:Query", &query_attributes)?;
        let mut written: Vec<&str> = Vec::new();
        for clause in query.projection_clauses().iter().flatten() {
            if !written.contains(&clause.property.as_str()) {
                w.text_element("wfs:PropertyName", &[], &clause.property)?;
                written.push(&clause.property);
            }
        }
        if let Some(constraint) = query.constraint() {
            fes::write_filter(&mut w, &constraint, false)?;
        }
        fes::write_sort_by(&mut w, query.sort_by())?;
        w.end("wfs:Query")?;
        w.end("wfs:GetFeature")?;
        Ok(w.into_inner())
    }
}

impl OwsRequest for GetFeature {
    type Response = FeatureCollection;
    const OPERATION: &'static str = OPERATION;
    const PREFERRED_METHOD: Method = Method::Get;
}

impl WireCodec<GetFeature> for WfsCodec {
    fn encode(&self, request: &GetFeature, ctx: &EncodeContext) -> Result<Payload, EncodeError> {
        match ctx.method {
            Method::Get => request.to_kvp(&ctx.version).map(Payload::Kvp),
            Method::Post => request.to_xml(&ctx.version).map(Payload::Xml),
        }
    }

    fn decode_success(&self, body: &[u8]) -> Result<FeatureCollection, DecodeError> {
        FeatureCollection::parse(body)
    }
}

/// Parameter name for the WFS 2.0 or 1.1 spelling.
fn key(wfs2: bool, new: &str, old: &str) -> String {
    if wfs2 {
        new.to_string()
    } else {
        old.to_string()
    }
}

fn join<I: Iterator<Item = String>>(items: I, separator: &str) -> String {
    items.collect::<Vec<_>>().join(separator)
}

fn invalid(field: &'static str, value: &str) -> DecodeError {
    DecodeError::InvalidValue {
        field,
        value: value.to_string(),
    }
}

fn query_error(err: QueryError) -> DecodeError {
    DecodeError::InvalidValue {
        field: "query",
        value: err.to_string(),
    }
}

fn split_list(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// (prefix, namespace) pairs to declare for the requested types.
fn namespace_bindings(type_names: &[TypeName]) -> Vec<(String, String)> {
    let mut bindings: Vec<(String, String)> = Vec::new();
    for type_name in type_names {
        let Some(prefix) = type_name.name.prefix.as_deref() else {
            continue;
        };
        if matches!(prefix, "wfs" | "ogc" | "gml") {
            continue;
        }
        let namespace = type_name
            .name
            .namespace
            .as_deref()
            .or_else(|| namespaces::for_prefix(prefix));
        if let Some(ns) = namespace {
            if !bindings.iter().any(|(p, _)| p == prefix) {
                bindings.push((prefix.to_string(), ns.to_string()));
            }
        }
    }
    bindings
}

/// Comma-joined aliases, `None` when no type has one.
fn aliases(type_names: &[TypeName]) -> Result<Option<String>, EncodeError> {
    let count = type_names.iter().filter(|t| t.alias.is_some()).count();
    if count == 0 {
        return Ok(None);
    }
    if count != type_names.len() {
        return Err(EncodeError::InvalidRequest(
            "either every type name has an alias or none does".to_string(),
        ));
    }
    Ok(Some(join(
        type_names.iter().filter_map(|t| t.alias.clone()),
        ",",
    )))
}

/// `xmlns(p=uri)` (1.1.0) or `xmlns(p,uri)` (2.0.0) lists.
fn parse_namespaces(value: &str) -> Result<Vec<(String, String)>, DecodeError> {
    let mut bindings = Vec::new();
    for part in value.split("xmlns(").map(str::trim).filter(|p| !p.is_empty()) {
        let inner = part
            .trim_end_matches(',')
            .trim_end()
            .strip_suffix(')')
            .ok_or_else(|| invalid("namespaces", value))?;
        // The prefix ends at the first separator; the URI may contain either.
        let at = inner
            .find(|c| c == '=' || c == ',')
            .ok_or_else(|| invalid("namespaces", value))?;
        let (prefix, ns) = (&inner[..at], &inner[at + 1..]);
        bindings.push((prefix.trim().to_string(), ns.trim().to_string()));
    }
    Ok(bindings)
}

/// `a,b` for one type, `(a,b)(c)` for several.
fn parse_projection(value: &str) -> Result<Vec<Vec<ProjectionClause>>, DecodeError> {
    let value = value.trim();
    let row = |s: &str| -> Vec<ProjectionClause> {
        split_list(s).into_iter().map(ProjectionClause::new).collect()
    };
    if !value.starts_with('(') {
        return Ok(vec![row(value)]);
    }
    let inner = value
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .ok_or_else(|| invalid("propertyName", value))?;
    Ok(inner.split(")(").map(row).collect())
}

/// `prop A,other D` (1.1.0) or `prop ASC,other DESC` (2.0.0).
fn parse_sort_by(value: &str) -> Result<Vec<SortProperty>, DecodeError> {
    split_list(value)
        .into_iter()
        .map(|item| {
            let mut parts = item.split_whitespace();
            let property = parts.next().ok_or_else(|| invalid("sortBy", value))?;
            let order = match parts.next() {
                Some(order) => SortOrder::parse(order).ok_or_else(|| invalid("sortBy", value))?,
                None => SortOrder::Ascending,
            };
            Ok(SortProperty {
                property: property.to_string(),
                order,
            })
        })
        .collect()
}

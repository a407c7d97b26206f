//! Subcommand arguments and the work behind them.
//!
//! Each command runs against an already connected client so it can be driven
//! by any [`HttpTransport`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use csw_client::constants::{BOUNDING_BOX_PROPERTY, OUTPUT_FORMAT_XML, OUTPUT_SCHEMA_CSW};
use csw_client::{CswClient, ElementSetName, GetRecords, ResultType, TransactionResponse};
use ows_common::{namespaces, Envelope, QName};
use ows_protocol::{CapabilitiesDocument, HttpTransport, OperationBinding, ProtocolVersion};
use ows_query::{Filter, ProjectionClause, QueryBuilder, TypeName};
use serde::Serialize;
use tracing::{debug, info};
use wfs_client::{GetFeature, WfsClient};

/// Which client profile to connect with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ServiceKind {
    Csw,
    Wfs,
}

#[derive(Args, Debug, Clone)]
pub struct CapabilitiesArgs {
    /// GetCapabilities URL
    #[arg(long)]
    pub url: String,

    /// Service profile used for version negotiation
    #[arg(long, value_enum, default_value = "csw")]
    pub service: ServiceKind,
}

#[derive(Args, Debug, Clone)]
pub struct RecordsArgs {
    /// GetCapabilities URL of the catalogue
    #[arg(long)]
    pub url: String,

    /// 1-based position of the first record
    #[arg(long, default_value = "1")]
    pub start: u32,

    /// Maximum number of records to return
    #[arg(long, default_value = "10")]
    pub max: u32,

    /// Output schema URI
    #[arg(long, default_value = OUTPUT_SCHEMA_CSW)]
    pub schema: String,

    /// Record type name (prefix:Local), repeatable
    #[arg(long = "type-name", default_value = "csw:Record")]
    pub type_names: Vec<String>,

    /// results, hits or validate
    #[arg(long, default_value = "results")]
    pub result_type: String,

    /// brief, summary or full
    #[arg(long, default_value = "summary")]
    pub element_set: String,

    /// Spatial constraint: minx,miny,maxx,maxy[,crs]
    #[arg(long)]
    pub bbox: Option<String>,

    /// Extra prefix binding (prefix=uri), repeatable
    #[arg(long = "namespace")]
    pub namespaces: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct InsertArgs {
    /// GetCapabilities URL of the catalogue
    #[arg(long)]
    pub url: String,

    /// XML files holding one record each
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct FeaturesArgs {
    /// GetCapabilities URL of the feature service
    #[arg(long)]
    pub url: String,

    /// Feature type name (prefix:Local), repeatable
    #[arg(long = "type-name", required = true)]
    pub type_names: Vec<String>,

    /// Property to return, repeatable; applies to every type
    #[arg(long = "property")]
    pub properties: Vec<String>,

    /// Spatial constraint: minx,miny,maxx,maxy[,crs]
    #[arg(long)]
    pub bbox: Option<String>,

    /// Maximum number of features
    #[arg(long)]
    pub max: Option<u32>,

    /// Extra prefix binding (prefix=uri), repeatable
    #[arg(long = "namespace")]
    pub namespaces: Vec<String>,
}

/// Printed by `capabilities`.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilitiesSummary {
    pub service_type: Option<String>,
    pub title: Option<String>,
    pub offered_version: String,
    pub version: String,
    pub operations: BTreeMap<String, OperationBinding>,
}

impl CapabilitiesSummary {
    pub fn new(document: &CapabilitiesDocument, negotiated: &ProtocolVersion) -> Self {
        Self {
            service_type: document.service_type().map(str::to_string),
            title: document.title().map(str::to_string),
            offered_version: document.version().to_string(),
            version: negotiated.to_string(),
            operations: document.operations().clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    pub name: String,
    pub identifier: Option<String>,
    pub title: Option<String>,
}

/// Printed by `records`.
#[derive(Debug, Clone, Serialize)]
pub struct RecordsSummary {
    pub matched: u64,
    pub returned: u64,
    pub next_record: u64,
    pub records: Vec<RecordSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureSummary {
    pub type_name: String,
    pub id: Option<String>,
    pub properties: BTreeMap<String, String>,
}

/// Printed by `features`.
#[derive(Debug, Clone, Serialize)]
pub struct FeaturesSummary {
    pub number_matched: Option<u64>,
    pub number_returned: Option<u64>,
    pub features: Vec<FeatureSummary>,
}

/// Merge `prefix=uri` flags over the configured bindings.
pub fn namespace_bindings(
    configured: &BTreeMap<String, String>,
    flags: &[String],
) -> Result<BTreeMap<String, String>> {
    let mut bindings = configured.clone();
    for flag in flags {
        let (prefix, uri) = flag
            .split_once('=')
            .filter(|(p, u)| !p.trim().is_empty() && !u.trim().is_empty())
            .ok_or_else(|| anyhow!("Invalid namespace binding '{}', expected prefix=uri", flag))?;
        bindings.insert(prefix.trim().to_string(), uri.trim().to_string());
    }
    Ok(bindings)
}

/// Parse `prefix:Local` and bind the prefix from `bindings` or the
/// well-known OGC prefixes.
pub fn resolve_type_name(value: &str, bindings: &BTreeMap<String, String>) -> Result<QName> {
    let name = QName::parse_prefixed(value)
        .with_context(|| format!("Invalid type name '{}'", value))?;
    let Some(prefix) = name.prefix.clone() else {
        return Ok(name);
    };
    let namespace = bindings
        .get(&prefix)
        .map(String::as_str)
        .or_else(|| namespaces::for_prefix(&prefix))
        .ok_or_else(|| {
            anyhow!(
                "Unknown prefix '{}' in type name '{}'; bind it with --namespace {}=<uri>",
                prefix,
                value,
                prefix
            )
        })?;
    Ok(name.with_namespace(namespace))
}

fn parse_bbox(value: Option<&str>) -> Result<Option<Envelope>> {
    value
        .map(|v| Envelope::from_kvp(v).with_context(|| format!("Invalid bbox '{}'", v)))
        .transpose()
}

pub fn build_get_records(
    args: &RecordsArgs,
    configured: &BTreeMap<String, String>,
) -> Result<GetRecords> {
    let bindings = namespace_bindings(configured, &args.namespaces)?;
    let type_names = args
        .type_names
        .iter()
        .map(|t| resolve_type_name(t, &bindings))
        .collect::<Result<Vec<_>>>()?;
    let result_type = ResultType::parse(&args.result_type)
        .ok_or_else(|| anyhow!("Invalid result type '{}'", args.result_type))?;
    let element_set = ElementSetName::parse(&args.element_set)
        .ok_or_else(|| anyhow!("Invalid element set '{}'", args.element_set))?;
    let constraint = parse_bbox(args.bbox.as_deref())?
        .map(|envelope| Filter::bbox_on(BOUNDING_BOX_PROPERTY, envelope));

    Ok(GetRecords::new(
        args.start,
        args.max,
        OUTPUT_FORMAT_XML,
        args.schema.clone(),
        type_names,
        result_type,
        element_set,
        constraint,
    ))
}

pub fn build_get_feature(
    args: &FeaturesArgs,
    configured: &BTreeMap<String, String>,
) -> Result<GetFeature> {
    let bindings = namespace_bindings(configured, &args.namespaces)?;
    let mut builder = QueryBuilder::new();
    for value in &args.type_names {
        builder = builder.type_name(TypeName::new(resolve_type_name(value, &bindings)?));
    }
    if !args.properties.is_empty() {
        let clause: Vec<ProjectionClause> =
            args.properties.iter().map(ProjectionClause::new).collect();
        builder = builder.projection_clauses(vec![clause; args.type_names.len()]);
    }
    if let Some(bbox) = parse_bbox(args.bbox.as_deref())? {
        builder = builder.bbox(bbox);
    }
    let query = builder.build().context("Invalid feature query")?;

    let mut request = GetFeature::new(query);
    request.max_features = args.max;
    Ok(request)
}

pub async fn records<T: HttpTransport>(
    client: &CswClient<T>,
    args: &RecordsArgs,
    configured: &BTreeMap<String, String>,
) -> Result<RecordsSummary> {
    let request = build_get_records(args, configured)?;
    debug!(?request, "Running GetRecords");
    let response = client
        .get_records(&request)
        .await
        .context("GetRecords failed")?;
    info!(
        matched = response.matched,
        returned = response.returned,
        "Search complete"
    );

    Ok(RecordsSummary {
        matched: response.matched,
        returned: response.returned,
        next_record: response.next_record,
        records: response
            .records
            .into_iter()
            .map(|r| RecordSummary {
                name: r.name.prefixed(),
                identifier: r.identifier,
                title: r.title,
            })
            .collect(),
    })
}

pub async fn insert<T: HttpTransport>(
    client: &CswClient<T>,
    files: &[PathBuf],
) -> Result<TransactionResponse> {
    if files.is_empty() {
        bail!("No record files given");
    }
    let mut records = Vec::with_capacity(files.len());
    for path in files {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read record file: {}", path.display()))?;
        records.push(content);
    }

    let response = client
        .insert_all(records)
        .await
        .context("Transaction/Insert failed")?;
    info!(
        inserted = response.total_inserted,
        files = files.len(),
        "Insert complete"
    );
    Ok(response)
}

pub async fn features<T: HttpTransport>(
    client: &WfsClient<T>,
    args: &FeaturesArgs,
    configured: &BTreeMap<String, String>,
) -> Result<FeaturesSummary> {
    let request = build_get_feature(args, configured)?;
    let collection = client
        .get_feature(&request)
        .await
        .context("GetFeature failed")?;
    info!(features = collection.features.len(), "GetFeature complete");

    Ok(FeaturesSummary {
        number_matched: collection.number_matched,
        number_returned: collection.number_returned,
        features: collection
            .features
            .into_iter()
            .map(|f| FeatureSummary {
                type_name: f.type_name.prefixed(),
                id: f.id,
                properties: f
                    .properties
                    .into_iter()
                    .map(|p| (p.name.prefixed(), p.value))
                    .collect(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records_args() -> RecordsArgs {
        RecordsArgs {
            url: "http://host/csw".to_string(),
            start: 1,
            max: 10,
            schema: OUTPUT_SCHEMA_CSW.to_string(),
            type_names: vec!["csw:Record".to_string()],
            result_type: "results".to_string(),
            element_set: "summary".to_string(),
            bbox: None,
            namespaces: Vec::new(),
        }
    }

    fn features_args() -> FeaturesArgs {
        FeaturesArgs {
            url: "http://host/wfs".to_string(),
            type_names: vec!["app:Road".to_string()],
            properties: Vec::new(),
            bbox: None,
            max: None,
            namespaces: vec!["app=http://example.com/app".to_string()],
        }
    }

    #[test]
    fn test_namespace_bindings() {
        let mut configured = BTreeMap::new();
        configured.insert("app".to_string(), "http://old".to_string());
        let bindings =
            namespace_bindings(&configured, &["app = http://new".to_string()]).unwrap();
        assert_eq!(bindings["app"], "http://new");

        assert!(namespace_bindings(&configured, &["app".to_string()]).is_err());
        assert!(namespace_bindings(&configured, &["=http://x".to_string()]).is_err());
    }

    #[test]
    fn test_resolve_type_name() {
        let bindings = BTreeMap::new();
        let name = resolve_type_name("csw:Record", &bindings).unwrap();
        assert_eq!(name, QName::new(namespaces::CSW_202, "Record", "csw"));

        assert_eq!(
            resolve_type_name("Road", &bindings).unwrap(),
            QName::local("Road")
        );

        let err = resolve_type_name("app:Road", &bindings).unwrap_err();
        assert!(err.to_string().contains("--namespace app=<uri>"));
        assert!(resolve_type_name("a:b:c", &bindings).is_err());
    }

    #[test]
    fn test_build_get_records() {
        let mut args = records_args();
        args.bbox = Some("0,0,10,10".to_string());
        args.result_type = "hits".to_string();
        let request = build_get_records(&args, &BTreeMap::new()).unwrap();
        assert_eq!(request.result_type, ResultType::Hits);
        assert_eq!(
            request.constraint,
            Some(Filter::bbox_on(
                "ows:BoundingBox",
                Envelope::new(0.0, 0.0, 10.0, 10.0)
            ))
        );
        assert_eq!(request.output_format, OUTPUT_FORMAT_XML);
    }

    #[test]
    fn test_build_get_records_rejects_bad_values() {
        let mut args = records_args();
        args.element_set = "everything".to_string();
        assert!(build_get_records(&args, &BTreeMap::new()).is_err());

        let mut args = records_args();
        args.bbox = Some("1,2,3".to_string());
        let err = build_get_records(&args, &BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("Invalid bbox"));
    }

    #[test]
    fn test_build_get_feature_projection_per_type() {
        let mut args = features_args();
        args.type_names.push("app:River".to_string());
        args.properties = vec!["app:name".to_string()];
        args.max = Some(5);

        let request = build_get_feature(&args, &BTreeMap::new()).unwrap();
        assert_eq!(request.max_features, Some(5));
        assert_eq!(request.query.type_names().len(), 2);
        assert_eq!(
            request.query.projection_clauses(),
            &[
                vec![ProjectionClause::new("app:name")],
                vec![ProjectionClause::new("app:name")],
            ]
        );
    }
}

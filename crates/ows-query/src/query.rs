//! Query variants and their shared fields.

use ows_common::{Envelope, EnvelopeParseError, SrsName};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::Filter;
use crate::sort::SortProperty;
use crate::type_name::TypeName;

/// Errors raised while constructing a query.
#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    /// A query must request at least one type.
    #[error("Query must contain at least one type name")]
    NoTypeNames,

    /// A bounding box query was built without an envelope.
    #[error("BBOX query requires an envelope")]
    MissingBBox,

    /// The envelope of a bounding box query is unusable.
    #[error("Invalid BBOX envelope: {0}")]
    InvalidBBox(#[from] EnvelopeParseError),

    /// A filter query was built without a filter.
    #[error("Filter query requires a filter")]
    MissingFilter,

    /// Projection clauses must be absent or aligned 1:1 with the type names.
    #[error("Projection clauses must match type names 1:1 (type names: {type_names}, projection lists: {projections})")]
    ProjectionMismatch { type_names: usize, projections: usize },

    /// Both an envelope and a filter were supplied to the builder.
    #[error("Query cannot carry both a BBOX and a filter constraint")]
    ConflictingConstraints,
}

/// A property selector for one requested type, e.g. `app:Road/app:name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectionClause {
    pub property: String,
}

impl ProjectionClause {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
        }
    }
}

/// Fields shared by every query variant.
///
/// Serializable for diagnostics only; queries are built through the
/// validating constructors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryCommon {
    handle: Option<String>,
    type_names: Vec<TypeName>,
    feature_version: Option<String>,
    srs_name: Option<SrsName>,
    projection_clauses: Vec<Vec<ProjectionClause>>,
    sort_by: Vec<SortProperty>,
}

impl QueryCommon {
    /// Validate and assemble the shared fields.
    ///
    /// An empty inner projection list means "all properties" for that type.
    pub fn new(
        handle: Option<String>,
        type_names: Vec<TypeName>,
        feature_version: Option<String>,
        srs_name: Option<SrsName>,
        projection_clauses: Vec<Vec<ProjectionClause>>,
        sort_by: Vec<SortProperty>,
    ) -> Result<Self, QueryError> {
        if type_names.is_empty() {
            return Err(QueryError::NoTypeNames);
        }
        if !projection_clauses.is_empty() && projection_clauses.len() != type_names.len() {
            return Err(QueryError::ProjectionMismatch {
                type_names: type_names.len(),
                projections: projection_clauses.len(),
            });
        }

        Ok(Self {
            handle,
            type_names,
            feature_version,
            srs_name,
            projection_clauses,
            sort_by,
        })
    }

    /// Client-assigned query identifier.
    pub fn handle(&self) -> Option<&str> {
        self.handle.as_deref()
    }

    /// Requested types, never empty.
    pub fn type_names(&self) -> &[TypeName] {
        &self.type_names
    }

    pub fn feature_version(&self) -> Option<&str> {
        self.feature_version.as_deref()
    }

    pub fn srs_name(&self) -> Option<&SrsName> {
        self.srs_name.as_ref()
    }

    /// Projection matrix; empty when all properties of all types are requested.
    pub fn projection_clauses(&self) -> &[Vec<ProjectionClause>] {
        &self.projection_clauses
    }

    /// Whether any type restricts its returned properties.
    pub fn has_projection(&self) -> bool {
        self.projection_clauses.iter().any(|row| !row.is_empty())
    }

    pub fn sort_by(&self) -> &[SortProperty] {
        &self.sort_by
    }
}

/// A query without any constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlainQuery {
    #[serde(flatten)]
    common: QueryCommon,
}

impl PlainQuery {
    pub fn new(
        handle: Option<String>,
        type_names: Vec<TypeName>,
        feature_version: Option<String>,
        srs_name: Option<SrsName>,
        projection_clauses: Vec<Vec<ProjectionClause>>,
        sort_by: Vec<SortProperty>,
    ) -> Result<Self, QueryError> {
        let common = QueryCommon::new(
            handle,
            type_names,
            feature_version,
            srs_name,
            projection_clauses,
            sort_by,
        )?;
        Ok(Self { common })
    }

    pub fn common(&self) -> &QueryCommon {
        &self.common
    }
}

/// A query that selects by envelope.
///
/// In KVP requests this maps to the `BBOX` parameter; XML encodings express it
/// as a BBOX filter constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BBoxQuery {
    #[serde(flatten)]
    common: QueryCommon,
    bbox: Envelope,
}

impl BBoxQuery {
    /// Create a BBOX query. Fails immediately when `bbox` is `None` or not a
    /// valid envelope, when no type names are given, or when the projection
    /// matrix is misaligned.
    pub fn new(
        handle: Option<String>,
        type_names: Vec<TypeName>,
        feature_version: Option<String>,
        srs_name: Option<SrsName>,
        projection_clauses: Vec<Vec<ProjectionClause>>,
        sort_by: Vec<SortProperty>,
        bbox: Option<Envelope>,
    ) -> Result<Self, QueryError> {
        let bbox = bbox.ok_or(QueryError::MissingBBox)?;
        bbox.validate()?;
        let common = QueryCommon::new(
            handle,
            type_names,
            feature_version,
            srs_name,
            projection_clauses,
            sort_by,
        )?;
        Ok(Self { common, bbox })
    }

    pub fn common(&self) -> &QueryCommon {
        &self.common
    }

    /// The bounding box constraint.
    pub fn bbox(&self) -> &Envelope {
        &self.bbox
    }
}

/// A query constrained by a filter expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterQuery {
    #[serde(flatten)]
    common: QueryCommon,
    filter: Filter,
}

impl FilterQuery {
    pub fn new(
        handle: Option<String>,
        type_names: Vec<TypeName>,
        feature_version: Option<String>,
        srs_name: Option<SrsName>,
        projection_clauses: Vec<Vec<ProjectionClause>>,
        sort_by: Vec<SortProperty>,
        filter: Filter,
    ) -> Result<Self, QueryError> {
        let common = QueryCommon::new(
            handle,
            type_names,
            feature_version,
            srs_name,
            projection_clauses,
            sort_by,
        )?;
        Ok(Self { common, filter })
    }

    pub fn common(&self) -> &QueryCommon {
        &self.common
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }
}

/// Any ad-hoc query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdHocQuery {
    Plain(PlainQuery),
    #[serde(rename = "bbox")]
    BBox(BBoxQuery),
    Filter(FilterQuery),
}

impl AdHocQuery {
    pub fn common(&self) -> &QueryCommon {
        match self {
            AdHocQuery::Plain(q) => q.common(),
            AdHocQuery::BBox(q) => q.common(),
            AdHocQuery::Filter(q) => q.common(),
        }
    }

    pub fn handle(&self) -> Option<&str> {
        self.common().handle()
    }

    pub fn type_names(&self) -> &[TypeName] {
        self.common().type_names()
    }

    pub fn projection_clauses(&self) -> &[Vec<ProjectionClause>] {
        self.common().projection_clauses()
    }

    pub fn sort_by(&self) -> &[SortProperty] {
        self.common().sort_by()
    }

    pub fn srs_name(&self) -> Option<&SrsName> {
        self.common().srs_name()
    }

    pub fn feature_version(&self) -> Option<&str> {
        self.common().feature_version()
    }

    pub fn bbox(&self) -> Option<&Envelope> {
        match self {
            AdHocQuery::BBox(q) => Some(q.bbox()),
            _ => None,
        }
    }

    pub fn filter(&self) -> Option<&Filter> {
        match self {
            AdHocQuery::Filter(q) => Some(q.filter()),
            _ => None,
        }
    }

    /// The query's constraint expressed as a filter, whatever the variant.
    ///
    /// XML encodings have no separate BBOX slot, so a BBOX query becomes a
    /// BBOX filter on the default geometry.
    pub fn constraint(&self) -> Option<Filter> {
        match self {
            AdHocQuery::Plain(_) => None,
            AdHocQuery::BBox(q) => Some(Filter::bbox(q.bbox().clone())),
            AdHocQuery::Filter(q) => Some(q.filter().clone()),
        }
    }
}

impl From<PlainQuery> for AdHocQuery {
    fn from(q: PlainQuery) -> Self {
        AdHocQuery::Plain(q)
    }
}

impl From<BBoxQuery> for AdHocQuery {
    fn from(q: BBoxQuery) -> Self {
        AdHocQuery::BBox(q)
    }
}

impl From<FilterQuery> for AdHocQuery {
    fn from(q: FilterQuery) -> Self {
        AdHocQuery::Filter(q)
    }
}

/// Fluent construction of queries; validation happens in the `build_*` calls.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    handle: Option<String>,
    type_names: Vec<TypeName>,
    feature_version: Option<String>,
    srs_name: Option<SrsName>,
    projection_clauses: Vec<Vec<ProjectionClause>>,
    sort_by: Vec<SortProperty>,
    bbox: Option<Envelope>,
    filter: Option<Filter>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    pub fn type_name(mut self, type_name: impl Into<TypeName>) -> Self {
        self.type_names.push(type_name.into());
        self
    }

    pub fn feature_version(mut self, version: impl Into<String>) -> Self {
        self.feature_version = Some(version.into());
        self
    }

    pub fn srs_name(mut self, srs: impl Into<SrsName>) -> Self {
        self.srs_name = Some(srs.into());
        self
    }

    pub fn projection_clauses(mut self, clauses: Vec<Vec<ProjectionClause>>) -> Self {
        self.projection_clauses = clauses;
        self
    }

    pub fn sort_by(mut self, sort: SortProperty) -> Self {
        self.sort_by.push(sort);
        self
    }

    pub fn bbox(mut self, bbox: Envelope) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Build whichever variant the supplied constraint implies.
    pub fn build(self) -> Result<AdHocQuery, QueryError> {
        match (self.bbox.is_some(), self.filter.is_some()) {
            (true, true) => Err(QueryError::ConflictingConstraints),
            (true, false) => self.build_bbox().map(AdHocQuery::BBox),
            (false, true) => self.build_filter().map(AdHocQuery::Filter),
            (false, false) => self.build_plain().map(AdHocQuery::Plain),
        }
    }

    pub fn build_plain(self) -> Result<PlainQuery, QueryError> {
        PlainQuery::new(
            self.handle,
            self.type_names,
            self.feature_version,
            self.srs_name,
            self.projection_clauses,
            self.sort_by,
        )
    }

    pub fn build_bbox(self) -> Result<BBoxQuery, QueryError> {
        BBoxQuery::new(
            self.handle,
            self.type_names,
            self.feature_version,
            self.srs_name,
            self.projection_clauses,
            self.sort_by,
            self.bbox,
        )
    }

    pub fn build_filter(self) -> Result<FilterQuery, QueryError> {
        let filter = self.filter.ok_or(QueryError::MissingFilter)?;
        FilterQuery::new(
            self.handle,
            self.type_names,
            self.feature_version,
            self.srs_name,
            self.projection_clauses,
            self.sort_by,
            filter,
        )
    }
}

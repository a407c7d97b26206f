//! Constraint expressions.
//!
//! Only the handful of Filter Encoding operators the clients actually send are
//! modelled. Anything richer belongs to a full filter library.

use ows_common::Envelope;
use serde::{Deserialize, Serialize};

/// A query constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    /// Select by feature/record identifier.
    ResourceId { ids: Vec<String> },
    /// Spatial overlap with an envelope. Without a property the server's
    /// default geometry is used.
    #[serde(rename = "bbox")]
    BBox {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        property: Option<String>,
        envelope: Envelope,
    },
    PropertyIsEqualTo {
        property: String,
        literal: String,
        #[serde(default = "default_match_case")]
        match_case: bool,
    },
    /// Pattern match with `*` as wildcard, `?` as single char and `\` as escape.
    PropertyIsLike { property: String, pattern: String },
    And { operands: Vec<Filter> },
    Or { operands: Vec<Filter> },
    Not { operand: Box<Filter> },
}

fn default_match_case() -> bool {
    true
}

impl Filter {
    pub fn resource_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::ResourceId {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn bbox(envelope: Envelope) -> Self {
        Filter::BBox {
            property: None,
            envelope,
        }
    }

    pub fn bbox_on(property: impl Into<String>, envelope: Envelope) -> Self {
        Filter::BBox {
            property: Some(property.into()),
            envelope,
        }
    }

    pub fn equal_to(property: impl Into<String>, literal: impl Into<String>) -> Self {
        Filter::PropertyIsEqualTo {
            property: property.into(),
            literal: literal.into(),
            match_case: true,
        }
    }

    pub fn like(property: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::PropertyIsLike {
            property: property.into(),
            pattern: pattern.into(),
        }
    }

    /// Conjunction; a single operand is returned unwrapped.
    pub fn and(mut operands: Vec<Filter>) -> Self {
        if operands.len() == 1 {
            return operands.remove(0);
        }
        Filter::And { operands }
    }

    /// Disjunction; a single operand is returned unwrapped.
    pub fn or(mut operands: Vec<Filter>) -> Self {
        if operands.len() == 1 {
            return operands.remove(0);
        }
        Filter::Or { operands }
    }

    pub fn negate(self) -> Self {
        Filter::Not {
            operand: Box::new(self),
        }
    }

    /// True when the filter only selects by identifier.
    pub fn is_id_filter(&self) -> bool {
        matches!(self, Filter::ResourceId { .. })
    }
}

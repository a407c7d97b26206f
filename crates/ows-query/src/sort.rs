//! Sort clauses.

use serde::{Deserialize, Serialize};

/// Sort direction of a single property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Filter Encoding 1.1 `SortOrder` value.
    pub fn as_fes(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }

    /// WFS 1.1 KVP suffix ("A" / "D").
    pub fn as_kvp_short(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "A",
            SortOrder::Descending => "D",
        }
    }

    /// Accepts every spelling used by WFS 1.1 and 2.0 (`A`, `D`, `ASC`, `DESC`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "A" | "ASC" => Some(SortOrder::Ascending),
            "D" | "DESC" => Some(SortOrder::Descending),
            _ => None,
        }
    }
}

/// One (property, direction) pair of a sort specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortProperty {
    pub property: String,
    pub order: SortOrder,
}

impl SortProperty {
    pub fn ascending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            order: SortOrder::Descending,
        }
    }
}

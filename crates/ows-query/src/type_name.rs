//! Requested type names with optional aliases.

use ows_common::QName;
use serde::{Deserialize, Serialize};

/// A requested feature/record type, optionally aliased for use in filters and
/// projections (WFS 2.0 `ALIASES`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeName {
    pub name: QName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl TypeName {
    pub fn new(name: QName) -> Self {
        Self { name, alias: None }
    }

    pub fn with_alias(name: QName, alias: impl Into<String>) -> Self {
        Self {
            name,
            alias: Some(alias.into()),
        }
    }
}

impl From<QName> for TypeName {
    fn from(name: QName) -> Self {
        Self::new(name)
    }
}

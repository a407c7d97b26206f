//! Spatial reference system identifiers.
//!
//! The client stack never transforms coordinates; it only carries SRS names
//! through to the wire. [`SrsName`] keeps the identifier exactly as the caller
//! or the service wrote it and offers EPSG code extraction for comparison.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An SRS identifier as it appears in requests and responses.
///
/// Accepts the spellings used across OGC services, e.g.:
/// - "EPSG:4326"
/// - "urn:ogc:def:crs:EPSG::4326"
/// - "http://www.opengis.net/gml/srs/epsg.xml#4326"
/// - "CRS:84"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SrsName(String);

impl SrsName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Parse and reject empty identifiers.
    pub fn parse(s: &str) -> Result<Self, SrsParseError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(SrsParseError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract the EPSG code if the identifier uses one of the EPSG spellings.
    ///
    /// `CRS:84` maps to 4326 (same datum, lon/lat axis order).
    pub fn epsg_code(&self) -> Option<u32> {
        let upper = self.0.to_uppercase();

        if upper == "CRS:84" {
            return Some(4326);
        }
        if let Some(code) = upper.strip_prefix("EPSG:") {
            return code.parse().ok();
        }
        if upper.starts_with("URN:OGC:DEF:CRS:EPSG:") {
            return upper.rsplit(':').next().and_then(|c| c.parse().ok());
        }
        if upper.starts_with("HTTP://WWW.OPENGIS.NET/GML/SRS/EPSG.XML#") {
            return upper.rsplit('#').next().and_then(|c| c.parse().ok());
        }
        if upper.starts_with("HTTP://WWW.OPENGIS.NET/DEF/CRS/EPSG/") {
            return upper.rsplit('/').next().and_then(|c| c.parse().ok());
        }
        None
    }

    /// Two names denote the same SRS if their EPSG codes match, or if they are
    /// textually identical when no code can be extracted.
    pub fn is_equivalent(&self, other: &SrsName) -> bool {
        match (self.epsg_code(), other.epsg_code()) {
            (Some(a), Some(b)) => a == b,
            _ => self.0 == other.0,
        }
    }
}

impl fmt::Display for SrsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SrsName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SrsName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SrsParseError {
    #[error("Empty SRS name")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsg_spellings() {
        assert_eq!(SrsName::new("EPSG:4326").epsg_code(), Some(4326));
        assert_eq!(SrsName::new("epsg:3857").epsg_code(), Some(3857));
        assert_eq!(
            SrsName::new("urn:ogc:def:crs:EPSG::25832").epsg_code(),
            Some(25832)
        );
        assert_eq!(
            SrsName::new("http://www.opengis.net/gml/srs/epsg.xml#31467").epsg_code(),
            Some(31467)
        );
        assert_eq!(
            SrsName::new("http://www.opengis.net/def/crs/EPSG/0/4258").epsg_code(),
            Some(4258)
        );
        assert_eq!(SrsName::new("CRS:84").epsg_code(), Some(4326));
        assert_eq!(SrsName::new("LOCAL:grid").epsg_code(), None);
    }

    #[test]
    fn test_equivalence() {
        let a = SrsName::new("EPSG:4326");
        let b = SrsName::new("urn:ogc:def:crs:EPSG::4326");
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&SrsName::new("EPSG:3857")));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(SrsName::parse("  "), Err(SrsParseError::Empty));
        assert_eq!(SrsName::parse(" EPSG:4326 ").unwrap().as_str(), "EPSG:4326");
    }
}

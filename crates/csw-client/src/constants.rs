//! CSW 2.0.2 protocol constants.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Value of the `service` parameter.
pub const SERVICE: &str = "CSW";

/// The only protocol version spoken by this client.
pub const VERSION_202: &str = "2.0.2";

/// Output schema of the Dublin Core based `csw:Record`.
pub const OUTPUT_SCHEMA_CSW: &str = "http://www.opengis.net/cat/csw/2.0.2";

/// Output schema for ISO 19139 `gmd:MD_Metadata`.
pub const OUTPUT_SCHEMA_ISO: &str = "http://www.isotc211.org/2005/gmd";

pub const OUTPUT_FORMAT_XML: &str = "application/xml";

/// Queryable holding a record's envelope; target of catalogue BBOX filters.
pub const BOUNDING_BOX_PROPERTY: &str = "ows:BoundingBox";

/// Search window of [`crate::CswClient::get_iso_records`].
pub const ISO_START_POSITION: u32 = 10;
pub const ISO_MAX_RECORDS: u32 = 15;

/// `resultType` of a GetRecords request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    /// Only the number of matches.
    Hits,
    #[default]
    Results,
    /// Validate the request without executing it.
    Validate,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::Hits => "hits",
            ResultType::Results => "results",
            ResultType::Validate => "validate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hits" => Some(ResultType::Hits),
            "results" => Some(ResultType::Results),
            "validate" => Some(ResultType::Validate),
            _ => None,
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predefined element sets (`csw:ElementSetName`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementSetName {
    Brief,
    Summary,
    #[default]
    Full,
}

impl ElementSetName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementSetName::Brief => "brief",
            ElementSetName::Summary => "summary",
            ElementSetName::Full => "full",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "brief" => Some(ElementSetName::Brief),
            "summary" => Some(ElementSetName::Summary),
            "full" => Some(ElementSetName::Full),
            _ => None,
        }
    }
}

impl fmt::Display for ElementSetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(ResultType::parse("HITS"), Some(ResultType::Hits));
        assert_eq!(ElementSetName::parse(" Summary "), Some(ElementSetName::Summary));
        assert_eq!(ElementSetName::parse("everything"), None);
    }

    #[test]
    fn test_wire_spelling() {
        assert_eq!(ResultType::Results.to_string(), "results");
        assert_eq!(ElementSetName::Full.as_str(), "full");
        assert_eq!(serde_json::to_string(&ResultType::Hits).unwrap(), "\"hits\"");
    }
}

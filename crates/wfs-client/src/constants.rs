//! WFS protocol constants.

use std::fmt;

use ows_protocol::ProtocolVersion;
use serde::{Deserialize, Serialize};

/// Value of the `service` parameter.
pub const SERVICE: &str = "WFS";

pub fn version_110() -> ProtocolVersion {
    ProtocolVersion::new(1, 1, 0)
}

pub fn version_200() -> ProtocolVersion {
    ProtocolVersion::new(2, 0, 0)
}

/// Whether `version` uses the WFS 2.0 parameter names (`typeNames`, `count`, ...).
pub fn is_wfs2(version: &ProtocolVersion) -> bool {
    version.major() >= 2
}

/// `resultType` of a GetFeature request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    #[default]
    Results,
    /// Only the number of matching features.
    Hits,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::Results => "results",
            ResultType::Hits => "hits",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "results" => Some(ResultType::Results),
            "hits" => Some(ResultType::Hits),
            _ => None,
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

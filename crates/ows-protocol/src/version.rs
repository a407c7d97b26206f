//! Dotted-numeric protocol versions and version negotiation.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::DecodeError;

/// A protocol version such as `2.0.2`.
///
/// Versions compare segment by segment as integers, so `1.10.0 > 1.9.0` and
/// missing trailing segments count as zero (`1.1 == 1.1.0`).
#[derive(Debug, Clone)]
pub struct ProtocolVersion {
    segments: Vec<u32>,
}

impl ProtocolVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            segments: vec![major, minor, patch],
        }
    }

    pub fn parse(s: &str) -> Result<Self, DecodeError> {
        let invalid = || DecodeError::InvalidValue {
            field: "version",
            value: s.to_string(),
        };

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }
        let segments = trimmed
            .split('.')
            .map(|seg| seg.parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    pub fn major(&self) -> u32 {
        self.segment(0)
    }

    fn segment(&self, i: usize) -> u32 {
        self.segments.get(i).copied().unwrap_or(0)
    }

    /// Pick the highest supported version not newer than what the service offers.
    pub fn negotiate(offered: &ProtocolVersion, supported: &[ProtocolVersion]) -> Option<Self> {
        supported
            .iter()
            .filter(|v| *v <= offered)
            .max()
            .cloned()
    }
}

impl PartialEq for ProtocolVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ProtocolVersion {}

impl PartialOrd for ProtocolVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProtocolVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        (0..len)
            .map(|i| self.segment(i).cmp(&other.segment(i)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(u32::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

impl FromStr for ProtocolVersion {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ProtocolVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_numeric_segment_ordering() {
        assert!(v("1.10.0") > v("1.9.0"));
        assert!(v("2.0.0") > v("1.1.0"));
        assert!(v("2.0.2") > v("2.0"));
        assert_eq!(v("1.1"), v("1.1.0"));
    }

    #[test]
    fn test_display_roundtrip() {
        assert_eq!(v("2.0.2").to_string(), "2.0.2");
        assert_eq!(ProtocolVersion::new(1, 1, 0).to_string(), "1.1.0");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ProtocolVersion::parse("").is_err());
        assert!(ProtocolVersion::parse("2.x").is_err());
        assert!(ProtocolVersion::parse("1..0").is_err());
    }

    #[test]
    fn test_negotiate() {
        let supported = [v("1.1.0"), v("2.0.0")];
        assert_eq!(
            ProtocolVersion::negotiate(&v("2.0.2"), &supported),
            Some(v("2.0.0"))
        );
        assert_eq!(
            ProtocolVersion::negotiate(&v("1.1.0"), &supported),
            Some(v("1.1.0"))
        );
        assert_eq!(ProtocolVersion::negotiate(&v("1.0.0"), &supported), None);
    }
}

//! Qualified XML names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A namespace-qualified name such as `gmd:MD_Metadata`.
///
/// The prefix is only a serialization hint. Two names are the same type
/// identifier when namespace and local part match; [`QName::same_name`] compares
/// that way, while the derived `PartialEq` also compares prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub local: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl QName {
    /// A fully bound name.
    pub fn new(
        namespace: impl Into<String>,
        local: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
            prefix: Some(prefix.into()),
        }
    }

    /// A name in no namespace.
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
            prefix: None,
        }
    }

    /// Parse `prefix:local` or `local`. The namespace stays unbound.
    pub fn parse_prefixed(s: &str) -> Result<Self, QNameParseError> {
        let s = s.trim();
        let (prefix, local) = match s.split_once(':') {
            Some((p, l)) => (Some(p), l),
            None => (None, s),
        };
        if local.is_empty() || local.contains(':') || prefix == Some("") {
            return Err(QNameParseError::Invalid(s.to_string()));
        }
        Ok(Self {
            namespace: None,
            local: local.to_string(),
            prefix: prefix.map(str::to_string),
        })
    }

    /// Bind the namespace URI of an already parsed name.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// `prefix:local`, or just `local` when there is no prefix.
    pub fn prefixed(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.local),
            None => self.local.clone(),
        }
    }

    /// Compare namespace and local part, ignoring the prefix.
    pub fn same_name(&self, other: &QName) -> bool {
        self.namespace == other.namespace && self.local == other.local
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.prefix, &self.namespace) {
            (Some(p), _) => write!(f, "{}:{}", p, self.local),
            (None, Some(ns)) => write!(f, "{{{}}}{}", ns, self.local),
            (None, None) => f.write_str(&self.local),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QNameParseError {
    #[error("Invalid qualified name: '{0}'")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefixed() {
        let name = QName::parse_prefixed("gmd:MD_Metadata").unwrap();
        assert_eq!(name.prefix.as_deref(), Some("gmd"));
        assert_eq!(name.local, "MD_Metadata");
        assert!(name.namespace.is_none());
        assert_eq!(name.prefixed(), "gmd:MD_Metadata");
    }

    #[test]
    fn test_parse_unprefixed() {
        let name = QName::parse_prefixed("Record").unwrap();
        assert!(name.prefix.is_none());
        assert_eq!(name.to_string(), "Record");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(QName::parse_prefixed(":x").is_err());
        assert!(QName::parse_prefixed("a:").is_err());
        assert!(QName::parse_prefixed("a:b:c").is_err());
    }

    #[test]
    fn test_same_name_ignores_prefix() {
        let a = QName::new("http://example.org/app", "Road", "app");
        let b = QName::new("http://example.org/app", "Road", "x");
        assert!(a.same_name(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_clark_notation_without_prefix() {
        let name = QName {
            namespace: Some("urn:x".to_string()),
            local: "T".to_string(),
            prefix: None,
        };
        assert_eq!(name.to_string(), "{urn:x}T");
    }
}

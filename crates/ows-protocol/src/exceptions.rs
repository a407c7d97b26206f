//! Service exception reports.
//!
//! Two document shapes are recognised:
//! - OWS 1.x/2.0 `ows:ExceptionReport/ows:Exception@exceptionCode,locator/ows:ExceptionText`
//! - legacy OGC `ServiceExceptionReport/ServiceException@code,locator` (text content)

use std::fmt;

use serde::Serialize;

use crate::error::DecodeError;
use crate::xml::{root_local_name, Element};

/// One exception entry of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwsException {
    pub code: String,
    pub locator: Option<String>,
    pub messages: Vec<String>,
}

impl OwsException {
    pub fn new(code: impl Into<String>, locator: Option<&str>, messages: Vec<String>) -> Self {
        Self {
            code: code.into(),
            locator: locator.map(str::to_string),
            messages,
        }
    }
}

impl fmt::Display for OwsException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        if let Some(locator) = &self.locator {
            write!(f, " [{}]", locator)?;
        }
        if !self.messages.is_empty() {
            write!(f, ": {}", self.messages.join("; "))?;
        }
        Ok(())
    }
}

/// Structured exception report returned by a service instead of a result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExceptionReport {
    pub version: Option<String>,
    pub exceptions: Vec<OwsException>,
}

impl ExceptionReport {
    /// True for the root element names that identify an exception report.
    pub fn is_exception_root(local_name: &str) -> bool {
        matches!(local_name, "ExceptionReport" | "ServiceExceptionReport")
    }

    /// Look at the root element and decode a report if that is what it is.
    ///
    /// Non-XML payloads and documents with any other root yield `Ok(None)`.
    /// Children are irrelevant: an exception root wins even if the body also
    /// contains elements that look like a success response.
    pub fn sniff(bytes: &[u8]) -> Result<Option<ExceptionReport>, DecodeError> {
        match root_local_name(bytes) {
            Some(root) if Self::is_exception_root(&root) => Self::parse(bytes).map(Some),
            _ => Ok(None),
        }
    }

    /// Decode an exception report document.
    pub fn parse(bytes: &[u8]) -> Result<ExceptionReport, DecodeError> {
        let root = Element::parse(bytes)?;
        match root.local_name() {
            "ExceptionReport" => Ok(Self::from_ows(&root)),
            "ServiceExceptionReport" => Ok(Self::from_legacy(&root)),
            other => Err(DecodeError::UnexpectedRoot {
                expected: "ExceptionReport",
                found: other.to_string(),
            }),
        }
    }

    fn from_ows(root: &Element) -> ExceptionReport {
        let exceptions = root
            .children_named("Exception")
            .map(|e| OwsException {
                code: e.attribute("exceptionCode").unwrap_or_default().to_string(),
                locator: e.attribute("locator").map(str::to_string),
                messages: e
                    .children_named("ExceptionText")
                    .map(|t| t.text.trim().to_string())
                    .collect(),
            })
            .collect();
        ExceptionReport {
            version: root.attribute("version").map(str::to_string),
            exceptions,
        }
    }

    fn from_legacy(root: &Element) -> ExceptionReport {
        let exceptions = root
            .children_named("ServiceException")
            .map(|e| {
                let text = e.text.trim();
                OwsException {
                    code: e.attribute("code").unwrap_or_default().to_string(),
                    locator: e.attribute("locator").map(str::to_string),
                    messages: if text.is_empty() {
                        Vec::new()
                    } else {
                        vec![text.to_string()]
                    },
                }
            })
            .collect();
        ExceptionReport {
            version: root.attribute("version").map(str::to_string),
            exceptions,
        }
    }

    /// First exception code, if any.
    pub fn first_code(&self) -> Option<&str> {
        self.exceptions.first().map(|e| e.code.as_str())
    }
}

impl fmt::Display for ExceptionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exceptions.is_empty() {
            return f.write_str("empty exception report");
        }
        let parts: Vec<String> = self.exceptions.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWS_REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ows:ExceptionReport xmlns:ows="http://www.opengis.net/ows" version="1.2.0">
  <ows:Exception exceptionCode="InvalidParameterValue" locator="typeNames">
    <ows:ExceptionText>Unknown type</ows:ExceptionText>
    <ows:ExceptionText>Second line</ows:ExceptionText>
  </ows:Exception>
  <ows:Exception exceptionCode="NoApplicableCode"/>
</ows:ExceptionReport>"#;

    #[test]
    fn test_parse_ows_report() {
        let report = ExceptionReport::parse(OWS_REPORT.as_bytes()).unwrap();
        assert_eq!(report.version.as_deref(), Some("1.2.0"));
        assert_eq!(report.exceptions.len(), 2);
        assert_eq!(report.exceptions[0].locator.as_deref(), Some("typeNames"));
        assert_eq!(
            report.exceptions[0].messages,
            vec!["Unknown type".to_string(), "Second line".to_string()]
        );
        assert_eq!(report.exceptions[1].code, "NoApplicableCode");
        assert!(report.exceptions[1].messages.is_empty());
    }

    #[test]
    fn test_parse_legacy_report() {
        let xml = r#"<ServiceExceptionReport version="1.2.0">
  <ServiceException code="LayerNotDefined">No such layer: foo</ServiceException>
</ServiceExceptionReport>"#;
        let report = ExceptionReport::parse(xml.as_bytes()).unwrap();
        assert_eq!(report.first_code(), Some("LayerNotDefined"));
        assert_eq!(report.exceptions[0].messages, vec!["No such layer: foo"]);
    }

    #[test]
    fn test_sniff() {
        assert!(ExceptionReport::sniff(OWS_REPORT.as_bytes()).unwrap().is_some());
        assert!(ExceptionReport::sniff(b"<csw:GetRecordsResponse/>")
            .unwrap()
            .is_none());
        assert!(ExceptionReport::sniff(b"not xml at all").unwrap().is_none());
        assert!(ExceptionReport::sniff(b"").unwrap().is_none());
    }

    #[test]
    fn test_display() {
        let report = ExceptionReport::parse(OWS_REPORT.as_bytes()).unwrap();
        assert_eq!(
            report.to_string(),
            "InvalidParameterValue [typeNames]: Unknown type; Second line, NoApplicableCode"
        );
    }
}

//! FeatureCollection decoding (WFS 1.1.0 and 2.0.0).

use chrono::{DateTime, Utc};
use ows_common::{Envelope, FeatureType, FeatureTypeRegistry, QName};
use ows_protocol::fes;
use ows_protocol::xml::{self, capture_subtree, local_name, Element, NamespaceScope};
use ows_protocol::DecodeError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use tracing::debug;

/// A simple-valued property of a feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub name: QName,
    pub value: String,
}

/// One member of a collection, kept as a standalone GML fragment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    /// Resolved element name; matches the feature type name.
    pub type_name: QName,
    /// `gml:id` (GML 3) or `fid` (GML 2).
    pub id: Option<String>,
    /// Children with text content only. Geometries and other complex
    /// properties are left in `xml`.
    pub properties: Vec<Property>,
    pub xml: String,
}

impl Feature {
    fn from_fragment(type_name: QName, xml: String) -> Result<Self, DecodeError> {
        let root = Element::parse(xml.as_bytes())?;
        let bindings = declared_namespaces(&root);

        let properties = root
            .children
            .iter()
            .filter(|child| child.children.is_empty() && child.local_name() != "boundedBy")
            .map(|child| Property {
                name: qualify(&child.name, &bindings),
                value: child.text.trim().to_string(),
            })
            .collect();

        Ok(Self {
            type_name,
            id: root
                .attribute("id")
                .or_else(|| root.attribute("fid"))
                .map(str::to_string),
            properties,
            xml,
        })
    }

    pub fn property(&self, local: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.name.local == local)
            .map(|p| p.value.as_str())
    }

    /// Look the feature's type up in an external schema.
    pub fn feature_type<'r>(&self, registry: &'r dyn FeatureTypeRegistry) -> Option<&'r dyn FeatureType> {
        registry.feature_type(&self.type_name)
    }
}

/// Decoded `wfs:FeatureCollection`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureCollection {
    /// `numberMatched` (2.0), `None` when the service reports "unknown".
    pub number_matched: Option<u64>,
    /// `numberReturned` (2.0) or `numberOfFeatures` (1.1).
    pub number_returned: Option<u64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub bounded_by: Option<Envelope>,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Distinct type names in member order.
    pub fn type_names(&self) -> Vec<&QName> {
        let mut names: Vec<&QName> = Vec::new();
        for feature in &self.features {
            if !names.iter().any(|n| n.same_name(&feature.type_name)) {
                names.push(&feature.type_name);
            }
        }
        names
    }

    /// The schema type of every member, aligned with `features`. The client
    /// never checks these itself; unknown types come back as `None`.
    pub fn resolve_types<'r>(
        &self,
        registry: &'r dyn FeatureTypeRegistry,
    ) -> Vec<Option<&'r dyn FeatureType>> {
        self.features
            .iter()
            .map(|feature| feature.feature_type(registry))
            .collect()
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(DecodeError::Empty);
        }

        let mut reader = xml::reader(bytes);
        let mut scope = NamespaceScope::new();
        let mut path: Vec<String> = Vec::new();
        let mut collection = CollectionBuilder::default();

        loop {
            let position = reader.buffer_position();
            let event = reader.read_event().map_err(|e| DecodeError::Xml {
                position,
                message: e.to_string(),
            })?;
            match event {
                Event::Start(e) => {
                    scope.push(&e, position)?;
                    if collection.open(&mut reader, &e, &path, &scope, position, false)? {
                        scope.pop();
                    } else {
                        path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                    }
                }
                Event::Empty(e) => {
                    scope.push(&e, position)?;
                    collection.open(&mut reader, &e, &path, &scope, position, true)?;
                    scope.pop();
                }
                Event::End(_) => {
                    path.pop();
                    scope.pop();
                }
                Event::Eof => break,
                _ => {}
            }
        }

        collection.finish()
    }
}

#[derive(Default)]
struct CollectionBuilder {
    root_seen: bool,
    collection: FeatureCollection,
}

impl CollectionBuilder {
    /// Returns true when the element was consumed entirely.
    fn open(
        &mut self,
        reader: &mut Reader<&[u8]>,
        e: &BytesStart<'_>,
        path: &[String],
        scope: &NamespaceScope,
        position: usize,
        is_empty: bool,
    ) -> Result<bool, DecodeError> {
        let name = e.name();
        let local = local_name(name.as_ref());
        let attr = |key: &str| xml::attribute(e, key, position);

        if path.is_empty() {
            if local != b"FeatureCollection" {
                return Err(DecodeError::UnexpectedRoot {
                    expected: "FeatureCollection",
                    found: String::from_utf8_lossy(local).into_owned(),
                });
            }
            self.root_seen = true;
            let c = &mut self.collection;
            c.number_matched = match attr("numberMatched")? {
                Some(v) if v == "unknown" => None,
                Some(v) => Some(parse_count(&v, "numberMatched")?),
                None => None,
            };
            c.number_returned = match attr("numberReturned")?.or(attr("numberOfFeatures")?) {
                Some(v) => Some(parse_count(&v, "numberReturned")?),
                None => None,
            };
            if let Some(ts) = attr("timeStamp")? {
                c.timestamp = Some(parse_timestamp(&ts)?);
            }
            return Ok(false);
        }

        let parent = path.last().map(String::as_str);
        let at_top = path.len() == 1;
        match (parent, local) {
            (Some("FeatureCollection"), b"boundedBy") if at_top => {
                let fragment = capture_subtree(reader, e, scope, is_empty)?;
                let element = Element::parse(fragment.as_bytes())?;
                self.collection.bounded_by = element
                    .children
                    .iter()
                    .find(|c| matches!(c.local_name(), "Envelope" | "Box"))
                    .map(fes::read_envelope)
                    .transpose()?;
                Ok(true)
            }
            (Some("featureMember" | "featureMembers" | "member"), _) if path.len() == 2 => {
                let type_name = scope.qualify(name.as_ref());
                let fragment = capture_subtree(reader, e, scope, is_empty)?;
                self.collection
                    .features
                    .push(Feature::from_fragment(type_name, fragment)?);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn finish(self) -> Result<FeatureCollection, DecodeError> {
        if !self.root_seen {
            return Err(DecodeError::MissingElement("FeatureCollection"));
        }
        debug!(features = self.collection.features.len(), "Decoded feature collection");
        Ok(self.collection)
    }
}

fn declared_namespaces(element: &Element) -> Vec<(String, String)> {
    element
        .attributes
        .iter()
        .filter_map(|(k, v)| {
            if k == "xmlns" {
                Some((String::new(), v.clone()))
            } else {
                k.strip_prefix("xmlns:").map(|p| (p.to_string(), v.clone()))
            }
        })
        .collect()
}

fn qualify(name: &str, bindings: &[(String, String)]) -> QName {
    let (prefix, local) = match name.split_once(':') {
        Some((p, l)) => (Some(p.to_string()), l.to_string()),
        None => (None, name.to_string()),
    };
    let lookup = prefix.as_deref().unwrap_or("");
    QName {
        namespace: bindings
            .iter()
            .find(|(p, _)| p == lookup)
            .map(|(_, ns)| ns.clone()),
        local,
        prefix,
    }
}

fn parse_count(value: &str, field: &'static str) -> Result<u64, DecodeError> {
    value.trim().parse().map_err(|_| DecodeError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DecodeError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| DecodeError::InvalidValue {
            field: "timeStamp",
            value: value.to_string(),
        })
}

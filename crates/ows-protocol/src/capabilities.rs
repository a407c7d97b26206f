//! Capabilities documents: which operations a service offers and where.
//!
//! Two layouts are understood:
//! - OWS Common 1.0/1.1/2.0 (CSW, WFS, WCS, WMTS):
//!   `OperationsMetadata/Operation@name/DCP/HTTP/{Get,Post}@xlink:href`
//! - WMS 1.1.1/1.3.0: `Capability/Request/<Operation>/DCPType/HTTP/{Get,Post}/OnlineResource@xlink:href`

use std::collections::BTreeMap;
use std::fmt;

use quick_xml::events::{BytesStart, Event};
use reqwest::Url;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, warn};

use crate::error::{OwsError, OwsResult};
use crate::version::ProtocolVersion;
use crate::xml::{self, local_name};

/// HTTP method of a DCP binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Endpoints of one operation, keyed by HTTP method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationBinding {
    endpoints: BTreeMap<Method, Url>,
}

impl OperationBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, method: Method, url: Url) -> Self {
        self.insert(method, url);
        self
    }

    /// Bind a method. The first binding for a method wins.
    pub fn insert(&mut self, method: Method, url: Url) {
        self.endpoints.entry(method).or_insert(url);
    }

    pub fn get(&self, method: Method) -> Option<&Url> {
        self.endpoints.get(&method)
    }

    pub fn methods(&self) -> impl Iterator<Item = Method> + '_ {
        self.endpoints.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Method, &Url)> {
        self.endpoints.iter().map(|(m, u)| (*m, u))
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl Serialize for OperationBinding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.endpoints.len()))?;
        for (method, url) in &self.endpoints {
            map.serialize_entry(method.as_str(), url.as_str())?;
        }
        map.end()
    }
}

/// Parsed capabilities of a remote service. Immutable once built.
#[derive(Debug, Clone)]
pub struct CapabilitiesDocument {
    version: ProtocolVersion,
    operations: BTreeMap<String, OperationBinding>,
    service_type: Option<String>,
    title: Option<String>,
    update_sequence: Option<String>,
}

impl CapabilitiesDocument {
    /// Assemble a document directly, mostly useful in tests.
    pub fn new(version: ProtocolVersion, operations: BTreeMap<String, OperationBinding>) -> Self {
        Self {
            version,
            operations: operations
                .into_iter()
                .filter(|(_, binding)| !binding.is_empty())
                .collect(),
            service_type: None,
            title: None,
            update_sequence: None,
        }
    }

    /// Parse a capabilities document whose hrefs are all absolute.
    pub fn parse(bytes: &[u8]) -> OwsResult<Self> {
        Self::parse_with_base(bytes, None)
    }

    /// Parse a capabilities document, resolving relative hrefs against `base`.
    pub fn parse_with_base(bytes: &[u8], base: Option<&Url>) -> OwsResult<Self> {
        CapabilitiesParser::new(base).run(bytes)
    }

    pub fn version(&self) -> &ProtocolVersion {
        &self.version
    }

    pub fn service_type(&self) -> Option<&str> {
        self.service_type.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn update_sequence(&self) -> Option<&str> {
        self.update_sequence.as_deref()
    }

    pub fn supports(&self, operation: &str) -> bool {
        self.operations.contains_key(operation)
    }

    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    pub fn operation(&self, operation: &str) -> Option<&OperationBinding> {
        self.operations.get(operation)
    }

    pub fn operations(&self) -> &BTreeMap<String, OperationBinding> {
        &self.operations
    }

    /// Endpoint and method to use for `operation`.
    ///
    /// The preferred method is used when bound; otherwise the first bound
    /// method (GET before POST).
    pub fn resolve_endpoint(&self, operation: &str, preferred: Method) -> OwsResult<(Url, Method)> {
        let binding = self
            .operations
            .get(operation)
            .ok_or_else(|| OwsError::UnsupportedOperation {
                operation: operation.to_string(),
            })?;

        if let Some(url) = binding.get(preferred) {
            return Ok((url.clone(), preferred));
        }
        binding
            .iter()
            .next()
            .map(|(method, url)| (url.clone(), method))
            .ok_or_else(|| OwsError::UnsupportedOperation {
                operation: operation.to_string(),
            })
    }
}

/// Streaming state while walking a capabilities document.
struct CapabilitiesParser<'a> {
    base: Option<&'a Url>,
    /// Local names of the open elements.
    path: Vec<String>,
    version: Option<String>,
    update_sequence: Option<String>,
    service_type: Option<String>,
    title: Option<String>,
    found_operations_section: bool,
    advertised: Vec<String>,
    operations: BTreeMap<String, OperationBinding>,
    /// Operation being read and the depth of its element.
    current: Option<(String, usize)>,
    /// WMS layout: method whose OnlineResource child carries the href.
    pending_method: Option<Method>,
}

fn malformed(message: impl Into<String>) -> OwsError {
    OwsError::MalformedCapabilities(message.into())
}

impl<'a> CapabilitiesParser<'a> {
    fn new(base: Option<&'a Url>) -> Self {
        Self {
            base,
            path: Vec::new(),
            version: None,
            update_sequence: None,
            service_type: None,
            title: None,
            found_operations_section: false,
            advertised: Vec::new(),
            operations: BTreeMap::new(),
            current: None,
            pending_method: None,
        }
    }

    fn run(mut self, bytes: &[u8]) -> OwsResult<CapabilitiesDocument> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(malformed("empty document"));
        }

        let mut reader = xml::reader(bytes);
        loop {
            let position = reader.buffer_position();
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    self.open(&e, position)?;
                    self.path
                        .push(String::from_utf8_lossy(local_name(e.name().as_ref())).into_owned());
                }
                Ok(Event::Empty(e)) => {
                    self.open(&e, position)?;
                    self.path
                        .push(String::from_utf8_lossy(local_name(e.name().as_ref())).into_owned());
                    self.close();
                }
                Ok(Event::End(_)) => self.close(),
                Ok(Event::Text(t)) => {
                    let text = t
                        .unescape()
                        .map_err(|e| malformed(format!("at byte {}: {}", position, e)))?;
                    self.text(text.trim());
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(malformed(format!("at byte {}: {}", position, e))),
            }
        }

        self.finish()
    }

    fn parent(&self, depth_from_top: usize) -> Option<&str> {
        self.path
            .len()
            .checked_sub(depth_from_top + 1)
            .and_then(|i| self.path.get(i))
            .map(String::as_str)
    }

    fn open(&mut self, e: &BytesStart<'_>, position: usize) -> OwsResult<()> {
        let name = e.name();
        let local = local_name(name.as_ref());
        let attr = |key: &str| {
            xml::attribute(e, key, position).map_err(|err| malformed(err.to_string()))
        };

        if self.path.is_empty() {
            let root = String::from_utf8_lossy(local);
            if !root.ends_with("Capabilities") {
                return Err(malformed(format!("unexpected root element {}", root)));
            }
            self.version = attr("version")?;
            self.update_sequence = attr("updateSequence")?;
            return Ok(());
        }

        let parent = self.parent(0).map(str::to_string);
        let parent = parent.as_deref();
        let grandparent = self.parent(1).map(str::to_string);
        match local {
            b"OperationsMetadata" => self.found_operations_section = true,
            b"Request" if parent == Some("Capability") => self.found_operations_section = true,
            b"Operation" if parent == Some("OperationsMetadata") => {
                let op = attr("name")?
                    .ok_or_else(|| malformed("Operation element without name attribute"))?;
                self.advertised.push(op.clone());
                self.current = Some((op, self.path.len()));
            }
            _ if parent == Some("Request") && grandparent.as_deref() == Some("Capability") => {
                let op = String::from_utf8_lossy(local).into_owned();
                self.advertised.push(op.clone());
                self.current = Some((op, self.path.len()));
            }
            b"Get" | b"Post" if parent == Some("HTTP") && self.current.is_some() => {
                let method = if local == b"Get" {
                    Method::Get
                } else {
                    Method::Post
                };
                match attr("href")? {
                    Some(href) => self.bind(method, &href)?,
                    None => self.pending_method = Some(method),
                }
            }
            b"OnlineResource" if matches!(parent, Some("Get") | Some("Post")) => {
                if let (Some(method), Some(href)) = (self.pending_method, attr("href")?) {
                    self.bind(method, &href)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self) {
        let depth = self.path.len().saturating_sub(1);
        if let Some(closed) = self.path.pop() {
            if closed == "Get" || closed == "Post" {
                self.pending_method = None;
            }
        }
        if matches!(&self.current, Some((_, d)) if *d == depth) {
            self.current = None;
        }
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let (Some(leaf), Some(section)) = (self.parent(0), self.parent(1)) else {
            return;
        };
        match (section, leaf) {
            ("ServiceIdentification", "ServiceType") | ("Service", "Name") => {
                if self.service_type.is_none() {
                    self.service_type = Some(text.to_string());
                }
            }
            ("ServiceIdentification", "Title") | ("Service", "Title") => {
                if self.title.is_none() {
                    self.title = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    fn bind(&mut self, method: Method, href: &str) -> OwsResult<()> {
        let Some((operation, _)) = &self.current else {
            return Ok(());
        };
        let href = href.trim();
        let parsed = match self.base {
            Some(base) => base.join(href),
            None => Url::parse(href),
        };
        let url = parsed.map_err(|e| {
            malformed(format!(
                "invalid href '{}' for {} {}: {}",
                href, operation, method, e
            ))
        })?;
        debug!(operation = %operation, method = %method, url = %url, "Capabilities binding");
        self.operations
            .entry(operation.clone())
            .or_default()
            .insert(method, url);
        Ok(())
    }

    fn finish(self) -> OwsResult<CapabilitiesDocument> {
        let version = self
            .version
            .ok_or_else(|| malformed("root element has no version attribute"))?;
        let version =
            ProtocolVersion::parse(&version).map_err(|e| malformed(e.to_string()))?;

        if !self.found_operations_section {
            return Err(malformed("no OperationsMetadata section"));
        }

        for op in &self.advertised {
            if !self.operations.contains_key(op) {
                warn!(operation = %op, "Operation advertised without a usable DCP binding, ignoring");
            }
        }

        Ok(CapabilitiesDocument {
            version,
            operations: self.operations,
            service_type: self.service_type,
            title: self.title,
            update_sequence: self.update_sequence,
        })
    }
}

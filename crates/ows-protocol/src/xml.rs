//! Thin helpers over quick-xml shared by the codecs.
//!
//! Writing goes through [`XmlWriter`], which keeps attribute order exactly as
//! given. Services compare request documents field by field, so order is part
//! of the contract. Reading offers two styles: streaming helpers for large
//! documents (capabilities, result sets) and a small owned tree
//! ([`Element`]) for short documents such as exception reports and filters.

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{DecodeError, EncodeError};

/// Ordered-attribute XML writer producing a UTF-8 byte buffer.
pub struct XmlWriter {
    inner: Writer<Vec<u8>>,
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlWriter {
    pub fn new() -> Self {
        Self {
            inner: Writer::new(Vec::new()),
        }
    }

    fn emit(&mut self, event: Event<'_>) -> Result<(), EncodeError> {
        self.inner
            .write_event(event)
            .map_err(|e| EncodeError::Xml(e.to_string()))
    }

    pub fn declaration(&mut self) -> Result<(), EncodeError> {
        self.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
    }

    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), EncodeError> {
        let mut element = BytesStart::new(name);
        for (key, value) in attributes {
            element.push_attribute((*key, *value));
        }
        self.emit(Event::Start(element))
    }

    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), EncodeError> {
        let mut element = BytesStart::new(name);
        for (key, value) in attributes {
            element.push_attribute((*key, *value));
        }
        self.emit(Event::Empty(element))
    }

    pub fn end(&mut self, name: &str) -> Result<(), EncodeError> {
        self.emit(Event::End(BytesEnd::new(name)))
    }

    /// Escaped character data.
    pub fn text(&mut self, text: &str) -> Result<(), EncodeError> {
        self.emit(Event::Text(BytesText::new(text)))
    }

    /// `<name attrs>text</name>`
    pub fn text_element(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> Result<(), EncodeError> {
        self.start(name, attributes)?;
        self.text(text)?;
        self.end(name)
    }

    /// Append pre-serialized, already validated markup verbatim.
    pub fn raw(&mut self, markup: &[u8]) {
        self.inner.get_mut().extend_from_slice(markup);
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

/// Local part of a possibly prefixed name.
pub fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(i) => &name[i + 1..],
        None => name,
    }
}

pub(crate) fn xml_error(reader_position: usize, err: impl std::fmt::Display) -> DecodeError {
    DecodeError::Xml {
        position: reader_position,
        message: err.to_string(),
    }
}

fn attribute_value(attr: &Attribute<'_>, position: usize) -> Result<String, DecodeError> {
    attr.unescape_value()
        .map(|v| v.into_owned())
        .map_err(|e| xml_error(position, e))
}

/// Value of the first attribute whose local name matches (prefix ignored).
///
/// Namespace declarations (`xmlns`, `xmlns:*`) are never matched.
pub fn attribute(
    element: &BytesStart<'_>,
    local: &str,
    position: usize,
) -> Result<Option<String>, DecodeError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| xml_error(position, e))?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        if local_name(key) == local.as_bytes() {
            return attribute_value(&attr, position).map(Some);
        }
    }
    Ok(None)
}

/// All attributes as (qualified name, value) pairs in document order.
pub fn attributes(
    element: &BytesStart<'_>,
    position: usize,
) -> Result<Vec<(String, String)>, DecodeError> {
    element
        .attributes()
        .map(|attr| {
            let attr = attr.map_err(|e| xml_error(position, e))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            Ok((key, attribute_value(&attr, position)?))
        })
        .collect()
}

/// Reader over a byte slice configured the way all decoders expect.
pub fn reader(bytes: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);
    reader
}

/// Local name of the document's root element.
///
/// Returns `None` when the payload is not XML or has no element at all.
/// Prolog content (declaration, comments, processing instructions, doctype)
/// is skipped.
pub fn root_local_name(bytes: &[u8]) -> Option<String> {
    let mut reader = reader(bytes);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(local_name(e.name().as_ref())).into_owned())
            }
            Ok(Event::Decl(_))
            | Ok(Event::Comment(_))
            | Ok(Event::PI(_))
            | Ok(Event::DocType(_)) => continue,
            Ok(Event::Text(t)) if t.iter().all(u8::is_ascii_whitespace) => continue,
            _ => return None,
        }
    }
}

/// Prefix → namespace bindings in scope while streaming a document.
#[derive(Debug, Default)]
pub struct NamespaceScope {
    frames: Vec<Vec<(String, String)>>,
}

impl NamespaceScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter an element, recording the namespaces it declares.
    pub fn push(&mut self, element: &BytesStart<'_>, position: usize) -> Result<(), DecodeError> {
        let mut frame = Vec::new();
        for attr in element.attributes() {
            let attr = attr.map_err(|e| xml_error(position, e))?;
            let key = attr.key.as_ref();
            let prefix = if key == b"xmlns" {
                String::new()
            } else if let Some(p) = key.strip_prefix(b"xmlns:") {
                String::from_utf8_lossy(p).into_owned()
            } else {
                continue;
            };
            frame.push((prefix, attribute_value(&attr, position)?));
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Namespace bound to `prefix` (empty string = default namespace).
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter())
            .find(|(p, _)| p == prefix)
            .map(|(_, ns)| ns.as_str())
    }

    /// Every binding currently visible, innermost declaration winning.
    pub fn in_scope(&self) -> Vec<(&str, &str)> {
        let mut seen: Vec<(&str, &str)> = Vec::new();
        for (prefix, ns) in self.frames.iter().rev().flat_map(|frame| frame.iter()) {
            if !seen.iter().any(|(p, _)| *p == prefix.as_str()) {
                seen.push((prefix.as_str(), ns.as_str()));
            }
        }
        seen
    }

    /// Resolve an element or attribute name (`prefix:local`) to a QName.
    pub fn qualify(&self, name: &[u8]) -> ows_common::QName {
        let name = String::from_utf8_lossy(name);
        let (prefix, local) = match name.split_once(':') {
            Some((p, l)) => (Some(p.to_string()), l.to_string()),
            None => (None, name.to_string()),
        };
        let namespace = self
            .resolve(prefix.as_deref().unwrap_or(""))
            .map(str::to_string);
        ows_common::QName {
            namespace,
            local,
            prefix,
        }
    }
}

/// Copy the subtree whose start tag `start` was just read into a standalone
/// fragment.
///
/// Every namespace binding in `scope` that the root does not declare itself is
/// added to the root, so prefixes declared on ancestors keep resolving. For a
/// `Start` tag the reader is advanced past the matching end tag; the caller
/// still owns popping `start`'s scope frame.
pub fn capture_subtree(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    scope: &NamespaceScope,
    is_empty: bool,
) -> Result<String, DecodeError> {
    let mut writer = Writer::new(Vec::new());
    let declared: Vec<Vec<u8>> = start
        .attributes()
        .flatten()
        .map(|a| a.key.as_ref().to_vec())
        .collect();
    let mut root = start.to_owned();
    for (prefix, ns) in scope.in_scope() {
        let key = if prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{}", prefix)
        };
        if !declared.iter().any(|d| d.as_slice() == key.as_bytes()) {
            root.push_attribute((key.as_str(), ns));
        }
    }

    if is_empty {
        writer.write_event(Event::Empty(root)).map_err(|e| xml_error(0, e))?;
    } else {
        writer.write_event(Event::Start(root)).map_err(|e| xml_error(0, e))?;
        let mut depth = 1usize;
        while depth > 0 {
            let position = reader.buffer_position();
            let event = reader.read_event().map_err(|e| xml_error(position, e))?;
            match &event {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth -= 1,
                Event::Eof => return Err(xml_error(position, "unexpected end of document")),
                _ => {}
            }
            writer.write_event(event).map_err(|e| xml_error(0, e))?;
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| xml_error(0, e))
}

/// A small owned XML element tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Name as written, including any prefix.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    /// Concatenated character data directly inside this element.
    pub text: String,
}

impl Element {
    /// Parse a complete document (or fragment with a single root) into a tree.
    pub fn parse(bytes: &[u8]) -> Result<Element, DecodeError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(DecodeError::Empty);
        }

        let mut reader = reader(bytes);
        let mut stack: Vec<Element> = Vec::new();

        loop {
            let position = reader.buffer_position();
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    stack.push(Element {
                        name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                        attributes: attributes(&e, position)?,
                        ..Default::default()
                    });
                }
                Ok(Event::Empty(e)) => {
                    let element = Element {
                        name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                        attributes: attributes(&e, position)?,
                        ..Default::default()
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(element),
                    }
                }
                Ok(Event::End(_)) => {
                    let element = stack.pop().ok_or_else(|| {
                        xml_error(position, "unbalanced end tag")
                    })?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(element),
                    }
                }
                Ok(Event::Text(t)) => {
                    if let Some(current) = stack.last_mut() {
                        let text = t.unescape().map_err(|e| xml_error(position, e))?;
                        current.text.push_str(&text);
                    }
                }
                Ok(Event::CData(t)) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&t));
                    }
                }
                Ok(Event::Eof) => {
                    return Err(xml_error(position, "unexpected end of document"));
                }
                Ok(_) => {}
                Err(e) => return Err(xml_error(position, e)),
            }
        }
    }

    pub fn local_name(&self) -> &str {
        match self.name.rsplit_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Attribute by local name; namespace declarations are skipped.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .filter(|(k, _)| k != "xmlns" && !k.starts_with("xmlns:"))
            .find(|(k, _)| k.rsplit(':').next() == Some(local))
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, local: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.local_name() == local)
    }

    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.local_name() == local)
    }

    /// Trimmed text of a direct child.
    pub fn child_text(&self, local: &str) -> Option<&str> {
        self.child(local).map(|c| c.text.trim())
    }

    /// Depth-first search for the first descendant with the given local name.
    pub fn find(&self, local: &str) -> Option<&Element> {
        for child in &self.children {
            if child.local_name() == local {
                return Some(child);
            }
            if let Some(found) = child.find(local) {
                return Some(found);
            }
        }
        None
    }
}

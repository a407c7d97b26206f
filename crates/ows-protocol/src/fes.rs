//! OGC Filter Encoding 1.1.0 for the operator subset in [`Filter`].
//!
//! Shared by the CSW and WFS codecs: `ogc:Filter` for XML bodies and the
//! `FILTER`/`CONSTRAINT` KVP parameters, `ogc:SortBy` for XML bodies.

use ows_common::namespaces::{GML, OGC};
use ows_common::{Envelope, SrsName};
use ows_query::{Filter, SortProperty};

use crate::error::{DecodeError, EncodeError};
use crate::xml::{Element, XmlWriter};

/// Write `ogc:Filter`.
///
/// With `standalone` the element declares the `ogc` and `gml` prefixes itself;
/// otherwise the enclosing document is expected to declare them.
pub fn write_filter(w: &mut XmlWriter, filter: &Filter, standalone: bool) -> Result<(), EncodeError> {
    if standalone {
        w.start("ogc:Filter", &[("xmlns:ogc", OGC), ("xmlns:gml", GML)])?;
    } else {
        w.start("ogc:Filter", &[])?;
    }
    write_operator(w, filter)?;
    w.end("ogc:Filter")
}

/// Standalone `ogc:Filter` document as a string (for KVP parameters).
pub fn filter_to_string(filter: &Filter) -> Result<String, EncodeError> {
    let mut w = XmlWriter::new();
    write_filter(&mut w, filter, true)?;
    String::from_utf8(w.into_inner()).map_err(|e| EncodeError::Xml(e.to_string()))
}

fn write_operator(w: &mut XmlWriter, filter: &Filter) -> Result<(), EncodeError> {
    match filter {
        Filter::ResourceId { ids } => {
            if ids.is_empty() {
                return Err(EncodeError::InvalidRequest(
                    "resource id filter without ids".to_string(),
                ));
            }
            for id in ids {
                w.empty("ogc:GmlObjectId", &[("gml:id", id.as_str())])?;
            }
            Ok(())
        }
        Filter::BBox { property, envelope } => {
            w.start("ogc:BBOX", &[])?;
            if let Some(property) = property {
                w.text_element("ogc:PropertyName", &[], property)?;
            }
            write_envelope(w, envelope)?;
            w.end("ogc:BBOX")
        }
        Filter::PropertyIsEqualTo {
            property,
            literal,
            match_case,
        } => {
            let match_case = if *match_case { "true" } else { "false" };
            w.start("ogc:PropertyIsEqualTo", &[("matchCase", match_case)])?;
            w.text_element("ogc:PropertyName", &[], property)?;
            w.text_element("ogc:Literal", &[], literal)?;
            w.end("ogc:PropertyIsEqualTo")
        }
        Filter::PropertyIsLike { property, pattern } => {
            w.start(
                "ogc:PropertyIsLike",
                &[("wildCard", "*"), ("singleChar", "?"), ("escapeChar", "\\")],
            )?;
            w.text_element("ogc:PropertyName", &[], property)?;
            w.text_element("ogc:Literal", &[], pattern)?;
            w.end("ogc:PropertyIsLike")
        }
        Filter::And { operands } => write_logical(w, "ogc:And", operands),
        Filter::Or { operands } => write_logical(w, "ogc:Or", operands),
        Filter::Not { operand } => {
            w.start("ogc:Not", &[])?;
            write_operator(w, operand)?;
            w.end("ogc:Not")
        }
    }
}

fn write_logical(w: &mut XmlWriter, name: &str, operands: &[Filter]) -> Result<(), EncodeError> {
    if operands.len() < 2 {
        return Err(EncodeError::InvalidRequest(format!(
            "{} needs at least two operands, got {}",
            name,
            operands.len()
        )));
    }
    w.start(name, &[])?;
    for operand in operands {
        write_operator(w, operand)?;
    }
    w.end(name)
}

/// `gml:Envelope` with lower/upper corners (GML 3.1).
pub fn write_envelope(w: &mut XmlWriter, envelope: &Envelope) -> Result<(), EncodeError> {
    match &envelope.srs {
        Some(srs) => w.start("gml:Envelope", &[("srsName", srs.as_str())])?,
        None => w.start("gml:Envelope", &[])?,
    }
    w.text_element("gml:lowerCorner", &[], &envelope.lower_corner())?;
    w.text_element("gml:upperCorner", &[], &envelope.upper_corner())?;
    w.end("gml:Envelope")
}

/// `ogc:SortBy`; nothing is written for an empty sort specification.
pub fn write_sort_by(w: &mut XmlWriter, sort_by: &[SortProperty]) -> Result<(), EncodeError> {
    if sort_by.is_empty() {
        return Ok(());
    }
    w.start("ogc:SortBy", &[])?;
    for sort in sort_by {
        w.start("ogc:SortProperty", &[])?;
        w.text_element("ogc:PropertyName", &[], &sort.property)?;
        w.text_element("ogc:SortOrder", &[], sort.order.as_fes())?;
        w.end("ogc:SortProperty")?;
    }
    w.end("ogc:SortBy")
}

/// Parse a standalone `ogc:Filter` document.
pub fn parse_filter(bytes: &[u8]) -> Result<Filter, DecodeError> {
    let root = Element::parse(bytes)?;
    read_filter(&root)
}

/// Read a `Filter` element (its single operator child) into a [`Filter`].
pub fn read_filter(element: &Element) -> Result<Filter, DecodeError> {
    if element.local_name() != "Filter" {
        return Err(DecodeError::UnexpectedRoot {
            expected: "Filter",
            found: element.local_name().to_string(),
        });
    }

    let ids: Vec<String> = element
        .children
        .iter()
        .filter_map(|c| match c.local_name() {
            "GmlObjectId" => c.attribute("id").map(str::to_string),
            "FeatureId" => c.attribute("fid").map(str::to_string),
            "ResourceId" => c.attribute("rid").map(str::to_string),
            _ => None,
        })
        .collect();
    if !ids.is_empty() {
        return Ok(Filter::ResourceId { ids });
    }

    let operator = element
        .children
        .first()
        .ok_or(DecodeError::MissingElement("Filter operator"))?;
    read_operator(operator)
}

fn property_name(element: &Element) -> Result<String, DecodeError> {
    element
        .child("PropertyName")
        .or_else(|| element.child("ValueReference"))
        .map(|p| p.text.trim().to_string())
        .ok_or(DecodeError::MissingElement("PropertyName"))
}

fn literal(element: &Element) -> Result<String, DecodeError> {
    element
        .child("Literal")
        .map(|p| p.text.clone())
        .ok_or(DecodeError::MissingElement("Literal"))
}

fn read_operator(element: &Element) -> Result<Filter, DecodeError> {
    match element.local_name() {
        "BBOX" => {
            let property = element
                .child("PropertyName")
                .or_else(|| element.child("ValueReference"))
                .map(|p| p.text.trim().to_string());
            let envelope = element
                .child("Envelope")
                .ok_or(DecodeError::MissingElement("Envelope"))?;
            Ok(Filter::BBox {
                property,
                envelope: read_envelope(envelope)?,
            })
        }
        "PropertyIsEqualTo" => Ok(Filter::PropertyIsEqualTo {
            property: property_name(element)?,
            literal: literal(element)?,
            match_case: element.attribute("matchCase") != Some("false"),
        }),
        "PropertyIsLike" => {
            let pattern = literal(element)?;
            Ok(Filter::PropertyIsLike {
                property: property_name(element)?,
                pattern: normalize_like_pattern(element, &pattern),
            })
        }
        "And" | "Or" => {
            let operands = element
                .children
                .iter()
                .map(read_operator)
                .collect::<Result<Vec<_>, _>>()?;
            if element.local_name() == "And" {
                Ok(Filter::And { operands })
            } else {
                Ok(Filter::Or { operands })
            }
        }
        "Not" => {
            let operand = element
                .children
                .first()
                .ok_or(DecodeError::MissingElement("Not operand"))?;
            Ok(Filter::Not {
                operand: Box::new(read_operator(operand)?),
            })
        }
        other => Err(DecodeError::InvalidValue {
            field: "filter operator",
            value: other.to_string(),
        }),
    }
}

/// Rewrite a pattern using the element's wildcard characters to `*`, `?` and `\`.
fn normalize_like_pattern(element: &Element, pattern: &str) -> String {
    let wild = element.attribute("wildCard").and_then(|s| s.chars().next()).unwrap_or('*');
    let single = element
        .attribute("singleChar")
        .and_then(|s| s.chars().next())
        .unwrap_or('?');
    let escape = element
        .attribute("escapeChar")
        .or_else(|| element.attribute("escape"))
        .and_then(|s| s.chars().next())
        .unwrap_or('\\');
    if (wild, single, escape) == ('*', '?', '\\') {
        return pattern.to_string();
    }

    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == escape {
            out.push('\\');
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else if c == wild {
            out.push('*');
        } else if c == single {
            out.push('?');
        } else if matches!(c, '*' | '?' | '\\') {
            out.push('\\');
            out.push(c);
        } else {
            out.push(c);
        }
    }
    out
}

/// Read a GML 3 `Envelope` (or GML 2 style `Box` with `coordinates`).
pub fn read_envelope(element: &Element) -> Result<Envelope, DecodeError> {
    let invalid = |value: String| DecodeError::InvalidValue {
        field: "envelope",
        value,
    };

    let mut envelope = match (element.child_text("lowerCorner"), element.child_text("upperCorner")) {
        (Some(lower), Some(upper)) => {
            Envelope::from_corners(lower, upper).map_err(|e| invalid(e.to_string()))?
        }
        _ => {
            let coordinates = element
                .child_text("coordinates")
                .ok_or(DecodeError::MissingElement("lowerCorner"))?;
            let values: Vec<&str> = coordinates.split_whitespace().collect();
            match values.as_slice() {
                [lower, upper] => Envelope::from_corners(
                    &lower.replace(',', " "),
                    &upper.replace(',', " "),
                )
                .map_err(|e| invalid(e.to_string()))?,
                _ => return Err(invalid(coordinates.to_string())),
            }
        }
    };
    if let Some(srs) = element.attribute("srsName") {
        envelope.srs = Some(SrsName::new(srs));
    }
    Ok(envelope)
}

//! Envelope (bounding box) type and KVP/GML coordinate formatting.

use serde::{Deserialize, Serialize};

use crate::crs::SrsName;

/// A rectangular spatial envelope, optionally tagged with its reference system.
///
/// Coordinates are kept in the axis order the caller supplied; no reprojection
/// or axis swapping happens anywhere in the client stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srs: Option<SrsName>,
}

impl Envelope {
    /// Create a new envelope from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            srs: None,
        }
    }

    /// Attach a spatial reference system to the envelope.
    pub fn with_srs(mut self, srs: impl Into<SrsName>) -> Self {
        self.srs = Some(srs.into());
        self
    }

    /// Parse a KVP BBOX value: `minx,miny,maxx,maxy[,crs]`.
    pub fn from_kvp(s: &str) -> Result<Self, EnvelopeParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 && parts.len() != 5 {
            return Err(EnvelopeParseError::InvalidFormat(s.to_string()));
        }

        let number = |p: &str| {
            p.parse::<f64>()
                .map_err(|_| EnvelopeParseError::InvalidNumber(p.to_string()))
        };

        let envelope = Self {
            min_x: number(parts[0])?,
            min_y: number(parts[1])?,
            max_x: number(parts[2])?,
            max_y: number(parts[3])?,
            srs: parts.get(4).map(|s| SrsName::new(*s)),
        };
        envelope.validate()?;
        Ok(envelope)
    }

    /// Format as a KVP BBOX value, appending the CRS when one is attached.
    pub fn to_kvp(&self) -> String {
        let mut value = format!(
            "{},{},{},{}",
            self.min_x, self.min_y, self.max_x, self.max_y
        );
        if let Some(srs) = &self.srs {
            value.push(',');
            value.push_str(srs.as_str());
        }
        value
    }

    /// Lower corner as a GML `pos` string ("x y").
    pub fn lower_corner(&self) -> String {
        format!("{} {}", self.min_x, self.min_y)
    }

    /// Upper corner as a GML `pos` string ("x y").
    pub fn upper_corner(&self) -> String {
        format!("{} {}", self.max_x, self.max_y)
    }

    /// Build an envelope from GML `lowerCorner` / `upperCorner` text.
    pub fn from_corners(lower: &str, upper: &str) -> Result<Self, EnvelopeParseError> {
        let (min_x, min_y) = parse_pos(lower)?;
        let (max_x, max_y) = parse_pos(upper)?;
        let envelope = Self::new(min_x, min_y, max_x, max_y);
        envelope.validate()?;
        Ok(envelope)
    }

    /// Reject non-finite coordinates and envelopes whose minimum corner lies
    /// beyond the maximum corner.
    pub fn validate(&self) -> Result<(), EnvelopeParseError> {
        let coords = [self.min_x, self.min_y, self.max_x, self.max_y];
        if let Some(bad) = coords.iter().find(|c| !c.is_finite()) {
            return Err(EnvelopeParseError::NonFinite(bad.to_string()));
        }
        if self.min_x > self.max_x || self.min_y > self.max_y {
            return Err(EnvelopeParseError::InvertedCorners(format!(
                "{},{},{},{}",
                self.min_x, self.min_y, self.max_x, self.max_y
            )));
        }
        Ok(())
    }

    /// Width of the envelope in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the envelope in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Check if this envelope intersects another.
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Check if a point is contained within this envelope.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

fn parse_pos(pos: &str) -> Result<(f64, f64), EnvelopeParseError> {
    let values: Vec<&str> = pos.split_whitespace().collect();
    if values.len() != 2 {
        return Err(EnvelopeParseError::InvalidFormat(pos.to_string()));
    }
    let x = values[0]
        .parse()
        .map_err(|_| EnvelopeParseError::InvalidNumber(values[0].to_string()))?;
    let y = values[1]
        .parse()
        .map_err(|_| EnvelopeParseError::InvalidNumber(values[1].to_string()))?;
    Ok((x, y))
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EnvelopeParseError {
    #[error("Invalid BBOX format: {0}. Expected 'minx,miny,maxx,maxy[,crs]'")]
    InvalidFormat(String),

    #[error("Invalid number in BBOX: {0}")]
    InvalidNumber(String),

    #[error("BBOX minimum corner exceeds maximum corner: {0}")]
    InvertedCorners(String),

    #[error("Non-finite coordinate in BBOX: {0}")]
    NonFinite(String),
}

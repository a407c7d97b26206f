//! Common types shared across the OWS client crates.
//!
//! Value types used on the wire (envelopes, spatial reference names, qualified
//! names) plus the narrow contracts of the collaborators the protocol core talks
//! to without owning: the feature-type schema registry and tiles.

pub mod bbox;
pub mod crs;
pub mod feature_type;
pub mod qname;
pub mod tile;

pub use bbox::{Envelope, EnvelopeParseError};
pub use crs::{SrsName, SrsParseError};
pub use feature_type::{FeatureType, FeatureTypeRegistry};
pub use qname::{QName, QNameParseError};
pub use tile::{EncodedTile, Tile, TileError};

/// Well-known XML namespaces of the OGC service family.
pub mod namespaces {
    /// OWS Common 1.0.0 (CSW 2.0.2, WFS 1.1.0).
    pub const OWS: &str = "http://www.opengis.net/ows";
    /// OWS Common 1.1.0 (WFS 2.0, WMTS, WPS).
    pub const OWS_11: &str = "http://www.opengis.net/ows/1.1";
    /// OWS Common 2.0.
    pub const OWS_20: &str = "http://www.opengis.net/ows/2.0";
    /// OGC Filter Encoding 1.1.0.
    pub const OGC: &str = "http://www.opengis.net/ogc";
    /// GML 3.1.
    pub const GML: &str = "http://www.opengis.net/gml";
    /// GML 3.2.
    pub const GML_32: &str = "http://www.opengis.net/gml/3.2";
    /// XLink.
    pub const XLINK: &str = "http://www.w3.org/1999/xlink";
    /// Catalogue Services 2.0.2.
    pub const CSW_202: &str = "http://www.opengis.net/cat/csw/2.0.2";
    /// WFS 1.1.0.
    pub const WFS: &str = "http://www.opengis.net/wfs";
    /// WFS 2.0.
    pub const WFS_20: &str = "http://www.opengis.net/wfs/2.0";
    /// ISO 19139 metadata.
    pub const GMD: &str = "http://www.isotc211.org/2005/gmd";
    /// ISO 19139 basic types.
    pub const GCO: &str = "http://www.isotc211.org/2005/gco";
    /// Dublin Core elements.
    pub const DC: &str = "http://purl.org/dc/elements/1.1/";
    /// Dublin Core terms.
    pub const DCT: &str = "http://purl.org/dc/terms/";

    /// Namespace conventionally bound to a well-known prefix.
    pub fn for_prefix(prefix: &str) -> Option<&'static str> {
        match prefix {
            "ows" => Some(OWS),
            "ogc" => Some(OGC),
            "gml" => Some(GML),
            "xlink" => Some(XLINK),
            "csw" => Some(CSW_202),
            "wfs" => Some(WFS),
            "gmd" => Some(GMD),
            "gco" => Some(GCO),
            "dc" => Some(DC),
            "dct" | "dcterms" => Some(DCT),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::namespaces;

    #[test]
    fn test_well_known_prefixes() {
        assert_eq!(namespaces::for_prefix("gmd"), Some(namespaces::GMD));
        assert_eq!(namespaces::for_prefix("app"), None);
    }
}

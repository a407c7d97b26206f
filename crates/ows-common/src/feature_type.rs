//! Feature type schema contract.
//!
//! The protocol core returns features tagged with type identifiers and leaves
//! their interpretation to an external schema registry. These traits are the
//! whole surface the core relies on.

use crate::qname::QName;

/// A class of features sharing a name and property declarations.
pub trait FeatureType: Send + Sync {
    /// Name of the feature type (the feature's element name in GML).
    fn name(&self) -> &QName;

    /// Names of the declared properties, in schema order.
    fn property_names(&self) -> Vec<QName>;

    /// Name of the first geometry property, if any.
    fn default_geometry_property(&self) -> Option<QName>;

    fn is_abstract(&self) -> bool {
        false
    }
}

/// Lookup of feature types by qualified name.
pub trait FeatureTypeRegistry: Send + Sync {
    fn feature_type(&self, name: &QName) -> Option<&dyn FeatureType>;
}

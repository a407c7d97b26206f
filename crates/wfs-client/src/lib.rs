//! OGC Web Feature Service (WFS) client.
//!
//! Only `GetFeature` is implemented. Requests are built from an
//! [`ows_query::AdHocQuery`] and encoded according to the negotiated version
//! (1.1.0 or 2.0.0). Responses decode into a [`FeatureCollection`] whose
//! members carry namespace-resolved type names that callers can look up in
//! their own schema registry.

pub mod client;
pub mod codec;
pub mod constants;
pub mod feature_collection;
pub mod get_feature;

pub use client::WfsClient;
pub use codec::WfsCodec;
pub use constants::ResultType;
pub use feature_collection::{Feature, FeatureCollection, Property};
pub use get_feature::GetFeature;

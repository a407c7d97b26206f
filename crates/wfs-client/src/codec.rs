//! The WFS profile of the client core.

use ows_protocol::{ProtocolVersion, ServiceProfile};

use crate::constants::{version_110, version_200, SERVICE};

/// Encoder/decoder for WFS 1.1.0 and 2.0.0 requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct WfsCodec;

impl ServiceProfile for WfsCodec {
    const SERVICE: &'static str = SERVICE;

    fn supported_versions(&self) -> Vec<ProtocolVersion> {
        vec![version_110(), version_200()]
    }
}

//! The CSW profile of the client core.

use ows_protocol::{ProtocolVersion, ServiceProfile};

use crate::constants::SERVICE;

/// Encoder/decoder for CSW 2.0.2 requests.
///
/// The per-request [`ows_protocol::WireCodec`] implementations live next to
/// their request types.
#[derive(Debug, Clone, Copy, Default)]
pub struct CswCodec;

impl ServiceProfile for CswCodec {
    const SERVICE: &'static str = SERVICE;

    fn supported_versions(&self) -> Vec<ProtocolVersion> {
        vec![ProtocolVersion::new(2, 0, 2)]
    }
}

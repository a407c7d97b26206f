//! Shared test utilities for the OWS client workspace.
//!
//! This crate provides common testing infrastructure including:
//! - [`MockTransport`], a scripted transport that records every call
//! - XML fixtures for capabilities, exception reports and service responses
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then in an integration test:
//!
//! ```ignore
//! use test_utils::{CapabilitiesFixture, MockTransport, CSW_URL};
//!
//! let transport = MockTransport::new()
//!     .with_xml(CapabilitiesFixture::csw().post("GetRecords", CSW_URL).build());
//! ```

pub mod fixtures;
pub mod mock;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use mock::*;

/// Assert that a result failed with the given `OwsError::kind()` label.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_error_kind;
///
/// assert_error_kind!(client.insert(record).await, "unsupported_operation");
/// ```
#[macro_export]
macro_rules! assert_error_kind {
    ($result:expr, $kind:expr) => {{
        match $result {
            Ok(_) => panic!("expected a `{}` error, got Ok", $kind),
            Err(err) => assert_eq!(
                err.kind(),
                $kind,
                "unexpected error: {}",
                err
            ),
        }
    }};
}

#[cfg(test)]
mod tests {
    use ows_protocol::{OwsError, OwsResult};

    #[test]
    fn test_assert_error_kind_passes() {
        let result: OwsResult<()> = Err(OwsError::NotImplemented {
            operation: "GetRecordById",
        });
        assert_error_kind!(result, "not_implemented");
    }

    #[test]
    #[should_panic(expected = "expected a `timeout` error")]
    fn test_assert_error_kind_fails_on_ok() {
        let result: OwsResult<()> = Ok(());
        assert_error_kind!(result, "timeout");
    }
}

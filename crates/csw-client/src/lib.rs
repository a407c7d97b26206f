//! OGC Catalogue Service for the Web (CSW 2.0.2) client.
//!
//! [`CswClient`] wraps the generic [`ows_protocol::OwsClient`] with the CSW
//! codec. Supported operations:
//!
//! - `GetRecords`, POST (XML) or GET (KVP) depending on what the service binds
//! - `Transaction/Insert`, POST only, and only when advertised
//!
//! Update, delete and `GetRecordById` fail with
//! [`ows_protocol::OwsError::NotImplemented`] without touching the network.

pub mod client;
pub mod codec;
pub mod constants;
pub mod get_records;
pub mod response;
pub mod transaction;

pub use client::CswClient;
pub use codec::CswCodec;
pub use constants::{ElementSetName, ResultType};
pub use get_records::{catalogue_constraint, ElementSelection, GetRecords};
pub use response::{GetRecordsResponse, MetadataRecord};
pub use transaction::{RecordFragment, TransactionInsert, TransactionResponse};

//! Command line front end for the CSW and WFS clients.
//!
//! The binary parses arguments and sets up logging; everything that talks to a
//! service lives in [`commands`] so it can run against a scripted transport.

pub mod commands;
pub mod config;

pub use commands::{
    CapabilitiesArgs, CapabilitiesSummary, FeaturesArgs, FeaturesSummary, InsertArgs,
    RecordsArgs, RecordsSummary, ServiceKind,
};
pub use config::CliConfig;

//! Node descriptor pipeline
//!
//! This module provides the refresh-cycle core:
//! - Decoding `ss://`, `vmess://`, `vless://` and `trojan://` descriptors
//! - Loading a descriptor list from disk
//! - Reachability probing through an external aggregator
//! - Persisted round-robin selection over reachable nodes

pub mod decoder;
pub mod loader;
pub mod oracle;
pub mod rotation;

pub use decoder::decode;
pub use loader::{load, parse_descriptors, LoadReport, SourceUnavailable};
pub use oracle::{AggregatorOracle, ProbeReport, ReachabilityOracle};
pub use rotation::{FileStateStore, RotationSelector, RotationStateStore, SelectionOutcome};

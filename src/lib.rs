//! Nodecast - Proxy Node Rotation
//!
//! Picks one reachable proxy node per refresh cycle for live display.
//!
//! ## Features
//!
//! - Decoding of `ss://`, `vmess://`, `vless://` and `trojan://` descriptors
//! - Reachability probing through an external multi-region aggregator
//! - Round-robin selection with a cursor persisted across restarts
//! - Authenticated HTTP ingress for replacing the node list

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod node;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{CastError, Result};

//! Dialing
//!
//! This module handles:
//! * Address normalization per topology
//! * The protocol-client seam ([`Connector`])
//! * The dial flow: cluster discovery, or a standalone dial with fallback

pub mod address;
pub mod connector;
mod dialer;

pub use connector::{ClusterTopology, Connector, RedisClusterTopology, RedisConnector};
pub use dialer::{connect, DialOutcome, DialPath, Dialer};

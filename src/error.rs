//! Error types

use redis::RedisError;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by dialing and command execution
#[derive(Debug, Error)]
pub enum Error {
    /// No connection could be established after exhausting the fallback paths
    #[error("dial {address} failed: {source}")]
    Dial {
        /// Address of the last attempt
        address: String,
        /// Error reported by the protocol client
        #[source]
        source: RedisError,
    },

    /// Cluster topology refresh failed.
    ///
    /// Non-fatal: only ever reported in [`DialOutcome::degraded`](crate::DialOutcome::degraded).
    #[error("cluster topology refresh via {seed} failed: {source}")]
    TopologyRefresh {
        /// Seed node the refresh was attempted through
        seed: String,
        /// Error reported by the protocol client
        #[source]
        source: RedisError,
    },

    /// The retry decorator could not be constructed around a live connection
    #[error("retry wrapper: {0}")]
    RetryWrap(String),

    /// A command failed on an otherwise live connection
    #[error("command {command} failed: {source}")]
    Command {
        /// Command name
        command: String,
        /// Error reported by the server or the connection
        #[source]
        source: RedisError,
    },

    /// Invalid options, TLS material or password map
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error while loading configuration material
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Underlying protocol-client error, if any
    pub fn redis_error(&self) -> Option<&RedisError> {
        match self {
            Self::Dial { source, .. }
            | Self::TopologyRefresh { source, .. }
            | Self::Command { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether this error is fatal for a dial call
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::TopologyRefresh { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::ErrorKind;

    #[test]
    fn test_dial_error_display() {
        let err = Error::Dial {
            address: "redis://badhost:1234".into(),
            source: RedisError::from((ErrorKind::IoError, "connection refused")),
        };
        let msg = err.to_string();
        assert!(msg.contains("redis://badhost:1234"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_topology_refresh_is_not_fatal() {
        let err = Error::TopologyRefresh {
            seed: "node:6379".into(),
            source: RedisError::from((ErrorKind::ResponseError, "cluster support disabled")),
        };
        assert!(!err.is_fatal());
        assert!(err.redis_error().is_some());
    }

    #[test]
    fn test_config_error_has_no_redis_source() {
        let err = Error::Config("bad".into());
        assert!(err.is_fatal());
        assert!(err.redis_error().is_none());
    }
}

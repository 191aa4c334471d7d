//! Dial and command observation
//!
//! The dialer and the command executor report what they do as [`Event`]s to
//! an injected [`DialObserver`]. Observation never changes control flow or
//! results.

use crate::command::CommandArg;
use crate::Error;
use redis::RedisError;
use std::sync::Arc;

/// Something the dialer or the executor did
#[derive(Debug)]
pub enum Event<'a> {
    /// Cluster discovery started from a seed node
    TopologyDiscover {
        /// Normalized seed address
        seed: &'a str,
    },
    /// Cluster topology refreshed
    TopologyRefreshed {
        /// Seed node
        seed: &'a str,
        /// Number of known nodes after the refresh
        nodes: usize,
    },
    /// Cluster topology refresh failed; the dial continues
    TopologyRefreshFailed {
        /// Seed node
        seed: &'a str,
        /// Refresh failure
        error: &'a RedisError,
    },
    /// About to dial
    DialAttempt {
        /// Dial path label
        path: &'a str,
        /// Target as dialed
        target: &'a str,
    },
    /// A dial attempt failed
    DialFailed {
        /// Dial path label
        path: &'a str,
        /// Target as dialed
        target: &'a str,
        /// Dial failure
        error: &'a RedisError,
    },
    /// A dial attempt produced a connection
    Connected {
        /// Dial path label
        path: &'a str,
        /// Target as dialed
        target: &'a str,
    },
    /// The retry decorator could not be constructed
    RetryWrapFailed {
        /// Wrap failure
        error: &'a Error,
    },
    /// About to issue a command
    CommandStarted {
        /// Command name
        command: &'a str,
        /// Command arguments
        args: &'a [CommandArg],
    },
    /// A command failed
    CommandFailed {
        /// Command name
        command: &'a str,
        /// Failure reported by the connection or the server
        error: &'a RedisError,
    },
    /// A command finished, successfully or not
    CommandCompleted {
        /// Command name
        command: &'a str,
    },
}

impl Event<'_> {
    /// Stable event name
    pub fn name(&self) -> &'static str {
        match self {
            Self::TopologyDiscover { .. } => "topology_discover",
            Self::TopologyRefreshed { .. } => "topology_refreshed",
            Self::TopologyRefreshFailed { .. } => "topology_refresh_failed",
            Self::DialAttempt { .. } => "dial_attempt",
            Self::DialFailed { .. } => "dial_failed",
            Self::Connected { .. } => "connected",
            Self::RetryWrapFailed { .. } => "retry_wrap_failed",
            Self::CommandStarted { .. } => "command_started",
            Self::CommandFailed { .. } => "command_failed",
            Self::CommandCompleted { .. } => "command_completed",
        }
    }
}

/// Receives dial and command events.
///
/// Implementations must be cheap and must not block; they run inline on the
/// dial path.
pub trait DialObserver: Send + Sync {
    /// Handle one event
    fn observe(&self, event: &Event<'_>);
}

/// Observer emitting `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl DialObserver for TracingObserver {
    fn observe(&self, event: &Event<'_>) {
        match event {
            Event::TopologyDiscover { seed } => {
                tracing::debug!(seed, "discovering cluster topology");
            }
            Event::TopologyRefreshed { seed, nodes } => {
                tracing::debug!(seed, nodes, "cluster topology refreshed");
            }
            Event::TopologyRefreshFailed { seed, error } => {
                tracing::warn!(seed, error = %error, "cluster topology refresh failed, dialing anyway");
            }
            Event::DialAttempt { path, target } => {
                tracing::debug!(path, target, "dialing");
            }
            Event::DialFailed {
                path,
                target,
                error,
            } => {
                tracing::debug!(path, target, error = %error, "dial failed");
            }
            Event::Connected { path, target } => {
                tracing::debug!(path, target, "connected");
            }
            Event::RetryWrapFailed { error } => {
                tracing::warn!(error = %error, "could not wrap cluster connection");
            }
            Event::CommandStarted { command, args } => {
                tracing::debug!(command, args = %JoinedArgs(*args), "issuing command");
            }
            Event::CommandFailed { command, error } => {
                tracing::debug!(command, error = %error, "command failed");
            }
            Event::CommandCompleted { command } => {
                tracing::debug!(command, "done");
            }
        }
    }
}

/// Space separated arguments; byte payloads show only their length
struct JoinedArgs<'a>(&'a [CommandArg]);

impl std::fmt::Display for JoinedArgs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, arg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", arg)?;
        }
        Ok(())
    }
}

/// Observer discarding every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl DialObserver for NoopObserver {
    fn observe(&self, _event: &Event<'_>) {}
}

/// Default observer shared by dialers and executors
pub fn default_observer() -> Arc<dyn DialObserver> {
    Arc::new(TracingObserver)
}

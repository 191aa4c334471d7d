//! Bounded retry decorator for cluster connections.
//!
//! [`RetryConnection`] re-issues a command when the cluster reports a
//! transient condition (redirection, `TRYAGAIN`, `CLUSTERDOWN`, ...). Attempts
//! are bounded and spaced by a fixed delay. The decorator only affects command
//! execution; establishing the connection is never retried here.

use crate::{Error, Result};
use redis::aio::ConnectionLike;
use redis::{Cmd, ErrorKind, Pipeline, RedisError, RedisFuture, Value};
use std::time::Duration;

/// Attempts per command for cluster connections
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Delay between attempts for cluster connections
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Retry bounds: total attempts (including the first) and the fixed delay between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Total attempts per command, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fixed delay between attempts
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

/// Whether a command failure is worth another attempt on a cluster connection
pub fn is_retryable(err: &RedisError) -> bool {
    matches!(
        err.kind(),
        ErrorKind::Moved
            | ErrorKind::Ask
            | ErrorKind::TryAgain
            | ErrorKind::ClusterDown
            | ErrorKind::MasterDown
    )
}

/// Connection decorator retrying transient cluster failures
pub struct RetryConnection<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C> RetryConnection<C>
where
    C: ConnectionLike + Send,
{
    /// Wrap `inner` with `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RetryWrap`] if the policy allows no attempt at all.
    /// `inner` is dropped in that case.
    pub fn wrap(inner: C, policy: RetryPolicy) -> Result<Self> {
        if policy.max_attempts == 0 {
            return Err(Error::RetryWrap(
                "retry policy must allow at least one attempt".into(),
            ));
        }
        Ok(Self { inner, policy })
    }

    /// Policy applied to every command
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Unwrap the decorated connection
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C> ConnectionLike for RetryConnection<C>
where
    C: ConnectionLike + Send,
{
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        Box::pin(async move {
            let mut attempt = 1;
            loop {
                match self.inner.req_packed_command(cmd).await {
                    Err(err) if attempt < self.policy.max_attempts && is_retryable(&err) => {
                        tracing::debug!(attempt, error = %err, "retrying command");
                        tokio::time::sleep(self.policy.delay).await;
                        attempt += 1;
                    }
                    result => return result,
                }
            }
        })
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        cmd: &'a Pipeline,
        offset: usize,
        count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        Box::pin(async move {
            let mut attempt = 1;
            loop {
                match self.inner.req_packed_commands(cmd, offset, count).await {
                    Err(err) if attempt < self.policy.max_attempts && is_retryable(&err) => {
                        tracing::debug!(attempt, error = %err, "retrying pipeline");
                        tokio::time::sleep(self.policy.delay).await;
                        attempt += 1;
                    }
                    result => return result,
                }
            }
        })
    }

    fn get_db(&self) -> i64 {
        self.inner.get_db()
    }
}

//! Command execution
//!
//! [`CommandExecutor`] issues one command with scalar arguments over any
//! async Redis connection and hands back the raw reply. It never retries;
//! cluster connections retry inside [`RetryConnection`](crate::RetryConnection).

use crate::observe::{default_observer, DialObserver, Event};
use crate::{Error, Result};
use redis::aio::ConnectionLike;
use redis::{RedisResult, RedisWrite, ToRedisArgs, Value};
use std::sync::Arc;
use std::time::Instant;

/// Scalar command argument
#[derive(Debug, Clone, PartialEq)]
pub enum CommandArg {
    /// UTF-8 string
    Str(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Boolean, sent as `1` or `0`
    Bool(bool),
}

impl From<&str> for CommandArg {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for CommandArg {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<u8>> for CommandArg {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for CommandArg {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<i64> for CommandArg {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for CommandArg {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u32> for CommandArg {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for CommandArg {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for CommandArg {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl ToRedisArgs for CommandArg {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        match self {
            Self::Str(s) => s.write_redis_args(out),
            Self::Bytes(b) => b.write_redis_args(out),
            Self::Int(i) => i.write_redis_args(out),
            Self::Float(f) => f.write_redis_args(out),
            Self::Bool(b) => b.write_redis_args(out),
        }
    }
}

impl std::fmt::Display for CommandArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{}", s),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Command, its arguments and the raw reply
#[derive(Debug)]
pub struct CommandResult {
    /// Command name
    pub command: String,
    /// Arguments as sent
    pub args: Vec<CommandArg>,
    /// Reply or failure, exactly as the connection reported it
    pub reply: RedisResult<Value>,
}

impl CommandResult {
    /// Whether the command succeeded
    pub fn is_ok(&self) -> bool {
        self.reply.is_ok()
    }

    /// The reply, unchanged
    pub fn into_result(self) -> RedisResult<Value> {
        self.reply
    }

    /// The reply, with the command name attached to a failure
    pub fn context(self) -> Result<Value> {
        let command = self.command;
        self.reply.map_err(|source| Error::Command { command, source })
    }
}

/// Issues commands and reports them to an observer
#[derive(Clone)]
pub struct CommandExecutor {
    observer: Arc<dyn DialObserver>,
}

impl CommandExecutor {
    /// Executor reporting to `observer`
    pub fn new(observer: Arc<dyn DialObserver>) -> Self {
        Self { observer }
    }

    /// Issue `command` with `args` once on `conn`.
    ///
    /// Failures are returned in [`CommandResult::reply`] unchanged; this
    /// method itself cannot fail.
    pub async fn execute<C>(&self, conn: &mut C, command: &str, args: &[CommandArg]) -> CommandResult
    where
        C: ConnectionLike + Send,
    {
        self.observer.observe(&Event::CommandStarted { command, args });

        let mut cmd = redis::cmd(command);
        for arg in args {
            cmd.arg(arg);
        }

        let start = Instant::now();
        let reply: RedisResult<Value> = cmd.query_async(conn).await;
        crate::metrics::histograms::command_duration(command, start.elapsed().as_millis() as u64);

        match &reply {
            Ok(_) => crate::metrics::counters::command_completed(crate::metrics::labels::OUTCOME_OK),
            Err(error) => {
                crate::metrics::counters::command_completed(crate::metrics::labels::OUTCOME_ERROR);
                self.observer.observe(&Event::CommandFailed { command, error });
            }
        }
        self.observer.observe(&Event::CommandCompleted { command });

        CommandResult {
            command: command.to_string(),
            args: args.to_vec(),
            reply,
        }
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(default_observer())
    }
}

impl std::fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor").finish_non_exhaustive()
    }
}

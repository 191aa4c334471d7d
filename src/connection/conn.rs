//! Core connection type

use crate::command::{CommandArg, CommandExecutor, CommandResult};
use redis::aio::ConnectionLike;
use redis::{Cmd, Pipeline, RedisFuture, Value};

/// Which dial strategy produced a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    /// Single-node connection
    Standalone,
    /// Cluster connection, wrapped in the bounded retry decorator
    Cluster,
}

impl std::fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standalone => write!(f, "standalone"),
            Self::Cluster => write!(f, "cluster"),
        }
    }
}

/// Live Redis connection handle.
///
/// Owned exclusively by the caller; dropping it closes the underlying
/// session. The handle implements [`redis::aio::ConnectionLike`], so it can be
/// passed straight to `redis::cmd(..).query_async(&mut conn)`.
pub struct Connection {
    inner: Box<dyn ConnectionLike + Send>,
    kind: ConnectionKind,
}

impl Connection {
    /// Wrap a protocol-client connection
    pub fn new(inner: impl ConnectionLike + Send + 'static, kind: ConnectionKind) -> Self {
        Self {
            inner: Box::new(inner),
            kind,
        }
    }

    /// Topology this connection talks to
    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    /// Whether this is a cluster connection
    pub fn is_cluster(&self) -> bool {
        self.kind == ConnectionKind::Cluster
    }

    /// Issue one command with the default [`CommandExecutor`]
    pub async fn execute(&mut self, command: &str, args: &[CommandArg]) -> CommandResult {
        CommandExecutor::default().execute(self, command, args).await
    }
}

impl ConnectionLike for Connection {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        self.inner.req_packed_command(cmd)
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        cmd: &'a Pipeline,
        offset: usize,
        count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        self.inner.req_packed_commands(cmd, offset, count)
    }

    fn get_db(&self) -> i64 {
        self.inner.get_db()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("kind", &self.kind)
            .field("db", &self.inner.get_db())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::testing::ScriptedConnection;

    #[tokio::test]
    async fn test_connection_delegates_commands() {
        let fake = ScriptedConnection::replying(vec![Ok(Value::SimpleString("PONG".into()))]);
        let sent = fake.sent();
        let mut conn = Connection::new(fake, ConnectionKind::Standalone);

        let reply: String = redis::cmd("PING").query_async(&mut conn).await.expect("ping");
        assert_eq!(reply, "PONG");
        assert_eq!(sent.lock().unwrap().as_slice(), ["PING"]);
    }

    #[tokio::test]
    async fn test_connection_execute() {
        let fake = ScriptedConnection::replying(vec![Ok(Value::BulkString(b"hello".to_vec()))]);
        let mut conn = Connection::new(fake, ConnectionKind::Standalone);

        let reply = conn
            .execute("ECHO", &[CommandArg::from("hello")])
            .await
            .into_result()
            .expect("echo");
        assert_eq!(reply, Value::BulkString(b"hello".to_vec()));
    }

    #[test]
    fn test_connection_kind() {
        let conn = Connection::new(ScriptedConnection::replying(vec![]), ConnectionKind::Cluster);
        assert!(conn.is_cluster());
        assert_eq!(conn.kind().to_string(), "cluster");
        assert!(format!("{:?}", conn).contains("Cluster"));
    }
}

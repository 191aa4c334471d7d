//! Dialer: cluster discovery or standalone dial with fallback

use super::address::{normalize, split_scheme, Topology, FALLBACK_SCHEME};
use super::connector::{ClusterTopology, Connector, RedisConnector};
use crate::connection::{Connection, ConnectionKind, RetryConnection, RetryPolicy};
use crate::observe::{default_observer, DialObserver, Event};
use crate::options::directive::{build_directives, DialDirectives};
use crate::options::ConnectionOptions;
use crate::{Error, Result};
use redis::RedisResult;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Which dial produced the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialPath {
    /// Cluster discovery and cluster dial
    Cluster,
    /// Standalone dial of the normalized URL
    Url,
    /// Standalone fallback with the scheme split off the raw address
    ExplicitScheme,
    /// Standalone fallback over plain TCP with the raw address
    DefaultTcp,
}

impl DialPath {
    /// Metric and log label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cluster => "cluster",
            Self::Url => "url",
            Self::ExplicitScheme => "explicit_scheme",
            Self::DefaultTcp => "default_tcp",
        }
    }
}

impl std::fmt::Display for DialPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful dial
#[derive(Debug)]
pub struct DialOutcome {
    connection: Connection,
    path: DialPath,
    degraded: Vec<Error>,
}

impl DialOutcome {
    /// The connection
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// The connection, mutably
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    /// Take the connection, discarding the dial details
    pub fn into_connection(self) -> Connection {
        self.connection
    }

    /// Dial that produced the connection
    pub fn path(&self) -> DialPath {
        self.path
    }

    /// Non-fatal failures on the way to the connection, in order
    pub fn degraded(&self) -> &[Error] {
        &self.degraded
    }

    /// Whether anything failed on the way to the connection
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// Establishes connections.
///
/// Stateless apart from its configuration; one dialer can serve any number of
/// concurrent dials.
pub struct Dialer<C = RedisConnector> {
    connector: C,
    observer: Arc<dyn DialObserver>,
    retry: RetryPolicy,
}

impl Dialer {
    /// Dialer backed by the `redis` crate
    pub fn new() -> Self {
        Self::with_connector(RedisConnector)
    }
}

impl Default for Dialer {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> Dialer<C> {
    /// Dialer over a custom connector
    pub fn with_connector(connector: C) -> Self {
        Self {
            connector,
            observer: default_observer(),
            retry: RetryPolicy::default(),
        }
    }

    /// Report events to `observer`
    pub fn observer(mut self, observer: Arc<dyn DialObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Retry policy for cluster connections
    ///
    /// Default: 10 attempts, 100ms apart
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The connector
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Dial `address`.
    ///
    /// In cluster mode the address seeds topology discovery; a failed refresh
    /// is reported in [`DialOutcome::degraded`] and the dial proceeds. In
    /// standalone mode the normalized URL is dialed first, then one fallback:
    /// the raw address split into scheme and remainder if it has exactly one
    /// scheme separator, plain TCP otherwise.
    ///
    /// # Errors
    ///
    /// * [`Error::Dial`] if no connection could be established
    /// * [`Error::RetryWrap`] if the cluster connection could not be wrapped
    pub async fn dial(&self, address: &str, options: &ConnectionOptions) -> Result<DialOutcome> {
        let topology = options.topology();
        let start = Instant::now();

        async {
            let directives = build_directives(options, address);
            let target = normalize(address, topology);

            let result = match topology {
                Topology::Cluster => self.dial_cluster(&target, &directives).await,
                Topology::Standalone => {
                    self.dial_standalone(address, &target, &directives).await
                }
            };

            let outcome = match &result {
                Ok(outcome) if outcome.is_degraded() => crate::metrics::labels::OUTCOME_DEGRADED,
                Ok(_) => crate::metrics::labels::OUTCOME_OK,
                Err(_) => crate::metrics::labels::OUTCOME_ERROR,
            };
            crate::metrics::counters::dial_completed(&topology.to_string(), outcome);
            crate::metrics::histograms::dial_duration(
                &topology.to_string(),
                start.elapsed().as_millis() as u64,
            );
            result
        }
        .instrument(tracing::debug_span!("dial", address, %topology))
        .await
    }

    async fn dial_cluster(&self, seed: &str, directives: &DialDirectives) -> Result<DialOutcome> {
        let mut degraded = Vec::new();

        self.observer.observe(&Event::TopologyDiscover { seed });
        let mut cluster = self.connector.cluster(seed, directives);
        match cluster.refresh().await {
            Ok(nodes) => self.observer.observe(&Event::TopologyRefreshed { seed, nodes }),
            Err(error) => {
                self.observer
                    .observe(&Event::TopologyRefreshFailed { seed, error: &error });
                crate::metrics::counters::topology_refresh_failed();
                degraded.push(Error::TopologyRefresh {
                    seed: seed.to_string(),
                    source: error,
                });
            }
        }

        let raw = self
            .attempt(DialPath::Cluster, seed, cluster.dial())
            .await
            .map_err(|source| Error::Dial {
                address: seed.to_string(),
                source,
            })?;

        let conn = RetryConnection::wrap(raw, self.retry).map_err(|error| {
            self.observer.observe(&Event::RetryWrapFailed { error: &error });
            error
        })?;

        Ok(DialOutcome {
            connection: Connection::new(conn, ConnectionKind::Cluster),
            path: DialPath::Cluster,
            degraded,
        })
    }

    async fn dial_standalone(
        &self,
        raw: &str,
        url: &str,
        directives: &DialDirectives,
    ) -> Result<DialOutcome> {
        let primary = self
            .attempt(DialPath::Url, url, self.connector.dial_url(url, directives))
            .await;
        let primary_error = match primary {
            Ok(connection) => {
                return Ok(DialOutcome {
                    connection,
                    path: DialPath::Url,
                    degraded: Vec::new(),
                })
            }
            Err(source) => Error::Dial {
                address: url.to_string(),
                source,
            },
        };

        let (path, scheme, address) = match split_scheme(raw) {
            Some((scheme, rest)) => (DialPath::ExplicitScheme, scheme, rest),
            None => (DialPath::DefaultTcp, FALLBACK_SCHEME, raw),
        };

        let connection = self
            .attempt(path, raw, self.connector.dial(scheme, address, directives))
            .await
            .map_err(|source| Error::Dial {
                address: raw.to_string(),
                source,
            })?;

        Ok(DialOutcome {
            connection,
            path,
            degraded: vec![primary_error],
        })
    }

    async fn attempt<F>(&self, path: DialPath, target: &str, dial: F) -> RedisResult<Connection>
    where
        F: Future<Output = RedisResult<Connection>>,
    {
        let path = path.as_str();
        self.observer.observe(&Event::DialAttempt { path, target });
        crate::metrics::counters::dial_attempted(path);

        match dial.await {
            Ok(conn) => {
                self.observer.observe(&Event::Connected { path, target });
                Ok(conn)
            }
            Err(error) => {
                self.observer.observe(&Event::DialFailed {
                    path,
                    target,
                    error: &error,
                });
                crate::metrics::counters::dial_failed(path);
                Err(error)
            }
        }
    }
}

impl<C: std::fmt::Debug> std::fmt::Debug for Dialer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dialer")
            .field("connector", &self.connector)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Dial `address` with a default [`Dialer`]
pub async fn connect(address: &str, options: &ConnectionOptions) -> Result<DialOutcome> {
    Dialer::new().dial(address, options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandExecutor;
    use crate::connection::testing::ScriptedConnection;
    use crate::observe::testing::RecordingObserver;
    use redis::{ErrorKind, RedisError, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        DialUrl { url: String, password: Option<String> },
        Dial(String, String),
        ClusterSeed(String),
        Refresh,
        ClusterDial,
    }

    #[derive(Default)]
    struct Script {
        fail_url: bool,
        fail_dial: bool,
        fail_refresh: bool,
        fail_cluster_dial: bool,
        cluster_replies: Vec<RedisResult<Value>>,
    }

    #[derive(Default)]
    struct FakeConnector {
        script: Script,
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl FakeConnector {
        fn scripted(script: Script) -> Self {
            Self {
                script,
                calls: Arc::default(),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    fn refused() -> RedisError {
        RedisError::from((ErrorKind::IoError, "connection refused"))
    }

    fn standalone() -> Connection {
        Connection::new(
            ScriptedConnection::replying(vec![Ok(Value::SimpleString("PONG".into()))]),
            ConnectionKind::Standalone,
        )
    }

    impl Connector for FakeConnector {
        type Topology = FakeTopology;

        async fn dial_url(&self, url: &str, directives: &DialDirectives) -> RedisResult<Connection> {
            self.record(Call::DialUrl {
                url: url.to_string(),
                password: directives.password().map(str::to_string),
            });
            if self.script.fail_url {
                return Err(refused());
            }
            Ok(standalone())
        }

        async fn dial(
            &self,
            scheme: &str,
            address: &str,
            _directives: &DialDirectives,
        ) -> RedisResult<Connection> {
            self.record(Call::Dial(scheme.to_string(), address.to_string()));
            if self.script.fail_dial {
                return Err(refused());
            }
            Ok(standalone())
        }

        fn cluster(&self, seed: &str, _directives: &DialDirectives) -> FakeTopology {
            self.record(Call::ClusterSeed(seed.to_string()));
            FakeTopology {
                fail_refresh: self.script.fail_refresh,
                fail_dial: self.script.fail_cluster_dial,
                replies: Mutex::new(self.script.cluster_replies.iter().map(clone_reply).collect()),
                calls: self.calls.clone(),
            }
        }
    }

    fn clone_reply(reply: &RedisResult<Value>) -> RedisResult<Value> {
        match reply {
            Ok(value) => Ok(value.clone()),
            Err(err) => Err(RedisError::from((err.kind(), "scripted failure"))),
        }
    }

    struct FakeTopology {
        fail_refresh: bool,
        fail_dial: bool,
        replies: Mutex<VecDeque<RedisResult<Value>>>,
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl ClusterTopology for FakeTopology {
        async fn refresh(&mut self) -> RedisResult<usize> {
            self.calls.lock().unwrap().push(Call::Refresh);
            if self.fail_refresh {
                return Err(RedisError::from((
                    ErrorKind::ResponseError,
                    "ERR This instance has cluster support disabled",
                )));
            }
            Ok(3)
        }

        async fn dial(&self) -> RedisResult<Connection> {
            self.calls.lock().unwrap().push(Call::ClusterDial);
            if self.fail_dial {
                return Err(refused());
            }
            let replies = std::mem::take(&mut *self.replies.lock().unwrap());
            Ok(Connection::new(
                ScriptedConnection::replying(replies.into()),
                ConnectionKind::Cluster,
            ))
        }
    }

    fn dialer(script: Script) -> (Dialer<FakeConnector>, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        let dialer = Dialer::with_connector(FakeConnector::scripted(script))
            .observer(observer.clone())
            .retry_policy(RetryPolicy::new(3, Duration::from_millis(1)));
        (dialer, observer)
    }

    fn cluster_options() -> ConnectionOptions {
        ConnectionOptions::builder().cluster(true).build()
    }

    #[tokio::test]
    async fn test_standalone_primary_success() {
        let (dialer, observer) = dialer(Script::default());

        let outcome = dialer
            .dial("localhost:6379", &ConnectionOptions::default())
            .await
            .expect("dial");

        assert_eq!(outcome.path(), DialPath::Url);
        assert!(!outcome.is_degraded());
        assert_eq!(outcome.connection().kind(), ConnectionKind::Standalone);
        assert_eq!(
            dialer.connector().calls(),
            [Call::DialUrl {
                url: "redis://localhost:6379".into(),
                password: None
            }]
        );
        assert_eq!(observer.events(), ["dial_attempt", "connected"]);
    }

    #[tokio::test]
    async fn test_fallback_uses_scheme_of_raw_address() {
        let (dialer, observer) = dialer(Script {
            fail_url: true,
            ..Default::default()
        });

        let outcome = dialer
            .dial("tls://badhost:1234", &ConnectionOptions::default())
            .await
            .expect("fallback dial");

        assert_eq!(outcome.path(), DialPath::ExplicitScheme);
        assert_eq!(outcome.degraded().len(), 1);
        assert!(matches!(
            &outcome.degraded()[0],
            Error::Dial { address, .. } if address == "tls://badhost:1234"
        ));
        assert_eq!(
            dialer.connector().calls()[1],
            Call::Dial("tls".into(), "badhost:1234".into())
        );
        assert_eq!(
            observer.events(),
            ["dial_attempt", "dial_failed", "dial_attempt", "connected"]
        );
    }

    #[tokio::test]
    async fn test_fallback_without_scheme_uses_tcp() {
        let (dialer, _) = dialer(Script {
            fail_url: true,
            ..Default::default()
        });

        let outcome = dialer
            .dial("badhost:1234", &ConnectionOptions::default())
            .await
            .expect("fallback dial");

        assert_eq!(outcome.path(), DialPath::DefaultTcp);
        assert_eq!(
            dialer.connector().calls(),
            [
                Call::DialUrl {
                    url: "redis://badhost:1234".into(),
                    password: None
                },
                Call::Dial("tcp".into(), "badhost:1234".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_fallback_with_two_separators_uses_tcp() {
        let (dialer, _) = dialer(Script {
            fail_url: true,
            ..Default::default()
        });

        let outcome = dialer
            .dial("a://b://c", &ConnectionOptions::default())
            .await
            .expect("fallback dial");

        assert_eq!(outcome.path(), DialPath::DefaultTcp);
        assert_eq!(
            dialer.connector().calls()[1],
            Call::Dial("tcp".into(), "a://b://c".into())
        );
    }

    #[tokio::test]
    async fn test_both_standalone_paths_fail() {
        let (dialer, _) = dialer(Script {
            fail_url: true,
            fail_dial: true,
            ..Default::default()
        });

        let err = dialer
            .dial("tls://badhost:1234", &ConnectionOptions::default())
            .await
            .expect_err("should fail");

        match err {
            Error::Dial { address, source } => {
                assert_eq!(address, "tls://badhost:1234");
                assert_eq!(source.kind(), ErrorKind::IoError);
            }
            other => panic!("unexpected: {:?}", other),
        }
        // No third level
        assert_eq!(dialer.connector().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_cluster_dial() {
        let (dialer, observer) = dialer(Script::default());

        let outcome = dialer
            .dial("redis://node-1:7000", &cluster_options())
            .await
            .expect("cluster dial");

        assert_eq!(outcome.path(), DialPath::Cluster);
        assert!(outcome.connection().is_cluster());
        assert!(!outcome.is_degraded());
        assert_eq!(
            dialer.connector().calls(),
            [
                Call::ClusterSeed("node-1:7000".into()),
                Call::Refresh,
                Call::ClusterDial
            ]
        );
        assert_eq!(
            observer.events(),
            [
                "topology_discover",
                "topology_refreshed",
                "dial_attempt",
                "connected"
            ]
        );
    }

    #[tokio::test]
    async fn test_cluster_dial_proceeds_after_refresh_failure() {
        let (dialer, observer) = dialer(Script {
            fail_refresh: true,
            ..Default::default()
        });

        let outcome = dialer
            .dial("node-1", &cluster_options())
            .await
            .expect("cluster dial");

        assert_eq!(outcome.path(), DialPath::Cluster);
        assert!(outcome.is_degraded());
        assert!(matches!(
            &outcome.degraded()[0],
            Error::TopologyRefresh { seed, .. } if seed == "node-1:6379"
        ));
        assert!(!outcome.degraded()[0].is_fatal());
        assert!(dialer.connector().calls().contains(&Call::ClusterDial));
        assert!(observer.events().contains(&"topology_refresh_failed"));
    }

    #[tokio::test]
    async fn test_cluster_dial_failure() {
        let (dialer, _) = dialer(Script {
            fail_cluster_dial: true,
            ..Default::default()
        });

        let err = dialer
            .dial("node-1:7000", &cluster_options())
            .await
            .expect_err("should fail");

        assert!(matches!(err, Error::Dial { address, .. } if address == "node-1:7000"));
    }

    #[tokio::test]
    async fn test_cluster_retry_wrap_failure() {
        let (dialer, observer) = dialer(Script::default());
        let dialer = dialer.retry_policy(RetryPolicy::new(0, Duration::ZERO));

        let err = dialer
            .dial("node-1:7000", &cluster_options())
            .await
            .expect_err("should fail");

        assert!(matches!(err, Error::RetryWrap(_)));
        assert!(observer.events().contains(&"retry_wrap_failed"));
    }

    #[tokio::test]
    async fn test_cluster_connection_retries_commands() {
        let (dialer, _) = dialer(Script {
            cluster_replies: vec![
                Err(RedisError::from((ErrorKind::TryAgain, "TRYAGAIN"))),
                Ok(Value::SimpleString("PONG".into())),
            ],
            ..Default::default()
        });

        let mut conn = dialer
            .dial("node-1:7000", &cluster_options())
            .await
            .expect("cluster dial")
            .into_connection();

        let reply = CommandExecutor::default()
            .execute(&mut conn, "PING", &[])
            .await
            .into_result()
            .expect("retried");
        assert_eq!(reply, Value::SimpleString("PONG".into()));
    }

    #[tokio::test]
    async fn test_password_override_reaches_connector() {
        let (dialer, _) = dialer(Script::default());
        let options = ConnectionOptions::builder()
            .password("global")
            .password_for("cache-2:6379", "override")
            .build();

        dialer.dial("cache-1:6379", &options).await.expect("dial");
        dialer.dial("cache-2:6379", &options).await.expect("dial");

        let passwords: Vec<_> = dialer
            .connector()
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::DialUrl { password, .. } => password,
                _ => None,
            })
            .collect();
        assert_eq!(passwords, ["global", "override"]);
    }

    #[tokio::test]
    async fn test_concurrent_dials_share_options() {
        let (dialer, _) = dialer(Script::default());
        let options = ConnectionOptions::builder().password("shared").build();

        let addresses = ["a:6379", "b:6379", "c:6379"];
        let outcomes =
            futures::future::join_all(addresses.iter().map(|addr| dialer.dial(addr, &options)))
                .await;

        assert!(outcomes.iter().all(|outcome| outcome.is_ok()));
        assert_eq!(dialer.connector().calls().len(), 3);
    }

    #[test]
    fn test_dial_path_labels() {
        assert_eq!(DialPath::Url.to_string(), "url");
        assert_eq!(DialPath::ExplicitScheme.as_str(), "explicit_scheme");
        assert_eq!(DialPath::DefaultTcp.as_str(), "default_tcp");
    }
}

//! Protocol-client seam
//!
//! [`Connector`] is everything the dialer needs from a Redis client library:
//! a URL dial, an explicit `(scheme, address)` dial and a cluster topology
//! handle. [`RedisConnector`] implements it on top of the `redis` crate.

use super::address::parse_host_port;
use crate::connection::{Connection, ConnectionKind};
use crate::options::directive::DialDirectives;
use crate::options::DEFAULT_TIMEOUT;
use redis::aio::MultiplexedConnection;
use redis::cluster::ClusterClientBuilder;
use redis::{
    Client, ConnectionAddr, ConnectionInfo, ErrorKind, IntoConnectionInfo, RedisError,
    RedisResult, TlsCertificates, Value,
};
use std::future::Future;
use std::time::Duration;

/// Opens connections for the dialer
pub trait Connector: Send + Sync {
    /// Cluster topology handle
    type Topology: ClusterTopology + Send;

    /// Dial a scheme-qualified URL
    fn dial_url(
        &self,
        url: &str,
        directives: &DialDirectives,
    ) -> impl Future<Output = RedisResult<Connection>> + Send;

    /// Dial `address` with an explicit transport scheme (`tcp`, `tls`, `unix`, ...)
    fn dial(
        &self,
        scheme: &str,
        address: &str,
        directives: &DialDirectives,
    ) -> impl Future<Output = RedisResult<Connection>> + Send;

    /// Topology handle seeded with a single `host:port`
    fn cluster(&self, seed: &str, directives: &DialDirectives) -> Self::Topology;
}

/// Known nodes of a cluster
pub trait ClusterTopology {
    /// Ask the cluster for its nodes; returns the number of known nodes
    fn refresh(&mut self) -> impl Future<Output = RedisResult<usize>> + Send;

    /// Open a cluster connection through the known nodes
    fn dial(&self) -> impl Future<Output = RedisResult<Connection>> + Send;
}

/// [`Connector`] backed by the `redis` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisConnector;

impl Connector for RedisConnector {
    type Topology = RedisClusterTopology;

    async fn dial_url(&self, url: &str, directives: &DialDirectives) -> RedisResult<Connection> {
        let info = url.into_connection_info()?;
        let conn = open_standalone(info, directives).await?;
        Ok(Connection::new(conn, ConnectionKind::Standalone))
    }

    async fn dial(
        &self,
        scheme: &str,
        address: &str,
        directives: &DialDirectives,
    ) -> RedisResult<Connection> {
        let info = ConnectionInfo {
            addr: explicit_addr(scheme, address)?,
            redis: Default::default(),
        };
        let conn = open_standalone(info, directives).await?;
        Ok(Connection::new(conn, ConnectionKind::Standalone))
    }

    fn cluster(&self, seed: &str, directives: &DialDirectives) -> RedisClusterTopology {
        RedisClusterTopology::new(seed, directives.clone())
    }
}

/// Map an explicit `(scheme, address)` pair to a connection address
pub(crate) fn explicit_addr(scheme: &str, address: &str) -> RedisResult<ConnectionAddr> {
    match scheme {
        "tcp" | "redis" => {
            let (host, port) = host_port(address)?;
            Ok(ConnectionAddr::Tcp(host.to_string(), port))
        }
        "tls" | "rediss" => {
            let (host, port) = host_port(address)?;
            Ok(ConnectionAddr::TcpTls {
                host: host.to_string(),
                port,
                insecure: false,
                tls_params: None,
            })
        }
        #[cfg(unix)]
        "unix" | "redis+unix" => Ok(ConnectionAddr::Unix(address.into())),
        _ => Err(RedisError::from((
            ErrorKind::InvalidClientConfig,
            "unsupported scheme",
            scheme.to_string(),
        ))),
    }
}

fn host_port(address: &str) -> RedisResult<(&str, u16)> {
    parse_host_port(address).ok_or_else(|| {
        RedisError::from((
            ErrorKind::InvalidClientConfig,
            "invalid address",
            address.to_string(),
        ))
    })
}

/// Apply credential and TLS directives to `info`.
///
/// Credentials embedded in the URL take precedence; directives only fill
/// gaps. TLS material is returned only for TLS addresses.
pub(crate) fn prepare(
    mut info: ConnectionInfo,
    directives: &DialDirectives,
) -> (ConnectionInfo, Option<TlsCertificates>) {
    if info.redis.username.is_none() {
        info.redis.username = directives.username().map(str::to_string);
    }
    if info.redis.password.is_none() {
        info.redis.password = directives.password().map(str::to_string);
    }

    let mut certificates = None;
    if let ConnectionAddr::TcpTls { insecure, .. } = &mut info.addr {
        if let Some(tls) = directives.tls() {
            *insecure |= tls.skip_verification();
            certificates = tls.to_tls_certificates();
        }
    }
    (info, certificates)
}

/// `(response, connect)` timeouts, in the order the protocol client takes them
pub(crate) fn timeouts(directives: &DialDirectives) -> (Duration, Duration) {
    (
        directives.io_timeout().unwrap_or(DEFAULT_TIMEOUT),
        directives.connect_timeout().unwrap_or(DEFAULT_TIMEOUT),
    )
}

async fn open_standalone(
    info: ConnectionInfo,
    directives: &DialDirectives,
) -> RedisResult<MultiplexedConnection> {
    let (info, certificates) = prepare(info, directives);
    let client = match certificates {
        Some(certs) => Client::build_with_tls(info, certs)?,
        None => Client::open(info)?,
    };

    let (response_timeout, connect_timeout) = timeouts(directives);
    client
        .get_multiplexed_async_connection_with_timeouts(response_timeout, connect_timeout)
        .await
}

/// Cluster topology discovered with `CLUSTER SLOTS` through a seed node
#[derive(Debug, Clone)]
pub struct RedisClusterTopology {
    seed: String,
    nodes: Vec<String>,
    directives: DialDirectives,
}

impl RedisClusterTopology {
    /// Topology knowing only `seed`
    pub fn new(seed: impl Into<String>, directives: DialDirectives) -> Self {
        let seed = seed.into();
        Self {
            nodes: vec![seed.clone()],
            seed,
            directives,
        }
    }

    /// Seed node
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Known nodes as `host:port`, seed first
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }
}

impl ClusterTopology for RedisClusterTopology {
    async fn refresh(&mut self) -> RedisResult<usize> {
        let info = format!("redis://{}", self.seed).into_connection_info()?;
        let mut conn = open_standalone(info, &self.directives).await?;
        let slots: Value = redis::cmd("CLUSTER")
            .arg("SLOTS")
            .query_async(&mut conn)
            .await?;

        let seed_host = parse_host_port(&self.seed).map_or("", |(host, _)| host);
        for node in parse_slot_nodes(&slots, seed_host)? {
            if !self.nodes.contains(&node) {
                self.nodes.push(node);
            }
        }
        Ok(self.nodes.len())
    }

    async fn dial(&self) -> RedisResult<Connection> {
        let nodes: Vec<String> = self
            .nodes
            .iter()
            .map(|node| format!("redis://{}", node))
            .collect();

        let mut builder = ClusterClientBuilder::new(nodes)
            .connection_timeout(
                self.directives
                    .connect_timeout()
                    .unwrap_or(DEFAULT_TIMEOUT),
            )
            .response_timeout(self.directives.io_timeout().unwrap_or(DEFAULT_TIMEOUT));
        if let Some(username) = self.directives.username() {
            builder = builder.username(username.to_string());
        }
        if let Some(password) = self.directives.password() {
            builder = builder.password(password.to_string());
        }

        let conn = builder.build()?.get_async_connection().await?;
        Ok(Connection::new(conn, ConnectionKind::Cluster))
    }
}

/// Extract every master and replica `host:port` from a `CLUSTER SLOTS` reply.
///
/// Nodes reporting an empty or `?` IP are reachable through the address they
/// were asked on, so they map to `seed_host`.
pub(crate) fn parse_slot_nodes(slots: &Value, seed_host: &str) -> RedisResult<Vec<String>> {
    let Value::Array(ranges) = slots else {
        return Err(RedisError::from((
            ErrorKind::TypeError,
            "CLUSTER SLOTS reply is not an array",
        )));
    };

    let mut nodes = Vec::new();
    for range in ranges {
        let Value::Array(entry) = range else {
            continue;
        };
        // start slot, end slot, then one entry per node
        for node in entry.iter().skip(2) {
            let Value::Array(fields) = node else {
                continue;
            };
            let host = match fields.first() {
                Some(Value::BulkString(ip)) => String::from_utf8_lossy(ip).into_owned(),
                Some(Value::SimpleString(ip)) => ip.clone(),
                _ => continue,
            };
            let port = match fields.get(1).and_then(|port| match port {
                Value::Int(port) => u16::try_from(*port).ok(),
                _ => None,
            }) {
                Some(port) => port,
                None => continue,
            };

            let host = if host.is_empty() || host == "?" {
                seed_host
            } else {
                host.as_str()
            };
            let node = if host.contains(':') {
                format!("[{}]:{}", host, port)
            } else {
                format!("{}:{}", host, port)
            };
            if !nodes.contains(&node) {
                nodes.push(node);
            }
        }
    }
    Ok(nodes)
}

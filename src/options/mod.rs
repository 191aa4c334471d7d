//! Connection options
//!
//! [`ConnectionOptions`] is the configuration surface of a dial: one timeout
//! shared by connect/read/write, TLS material, credentials, per-address
//! password overrides and the cluster flag. It is read-only during a dial and
//! can be shared by reference between concurrent dials.

pub mod directive;
mod settings;

pub use settings::{ConnectionSettings, PasswordMap};

use crate::client::address::Topology;
use crate::connection::TlsSettings;
use std::time::Duration;

/// Connect/read/write timeout applied when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Options for one or more dials
#[derive(Clone)]
pub struct ConnectionOptions {
    /// Timeout shared by connect, read and write
    pub timeout: Duration,
    /// TLS material, applied to TLS dials
    pub tls: TlsSettings,
    /// ACL username
    pub username: Option<String>,
    /// Password used for every address without an override
    pub password: Option<String>,
    /// Per-address password overrides, keyed by the raw address string
    pub password_map: PasswordMap,
    /// Dial the address as a cluster seed node
    pub is_cluster: bool,
}

impl ConnectionOptions {
    /// Options with defaults: 15s timeout, default TLS, no credentials, standalone
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            tls: TlsSettings::default(),
            username: None,
            password: None,
            password_map: PasswordMap::default(),
            is_cluster: false,
        }
    }

    /// Create a builder
    ///
    /// # Examples
    ///
    /// ```
    /// use redis_dialer::ConnectionOptions;
    /// use std::time::Duration;
    ///
    /// let options = ConnectionOptions::builder()
    ///     .timeout(Duration::from_secs(5))
    ///     .username("exporter")
    ///     .password("secret")
    ///     .password_for("redis://cache-2:6379", "other-secret")
    ///     .build();
    /// assert!(!options.is_cluster);
    /// ```
    pub fn builder() -> ConnectionOptionsBuilder {
        ConnectionOptionsBuilder {
            options: Self::new(),
        }
    }

    /// Topology selected by the cluster flag
    pub fn topology(&self) -> Topology {
        Topology::from_cluster_flag(self.is_cluster)
    }
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("timeout", &self.timeout)
            .field("tls", &self.tls)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("password_map", &self.password_map)
            .field("is_cluster", &self.is_cluster)
            .finish()
    }
}

/// Builder for [`ConnectionOptions`]
#[derive(Debug, Clone)]
pub struct ConnectionOptionsBuilder {
    options: ConnectionOptions,
}

impl ConnectionOptionsBuilder {
    /// Set the connect/read/write timeout
    ///
    /// Default: 15 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Set TLS material
    pub fn tls(mut self, tls: TlsSettings) -> Self {
        self.options.tls = tls;
        self
    }

    /// Set the ACL username. An empty username counts as unset.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.options.username = Some(username.into()).filter(|u| !u.is_empty());
        self
    }

    /// Set the global password. An empty password counts as unset.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.options.password = Some(password.into()).filter(|p| !p.is_empty());
        self
    }

    /// Override the password for one address
    pub fn password_for(mut self, address: impl Into<String>, password: impl Into<String>) -> Self {
        self.options.password_map.insert(address, password);
        self
    }

    /// Replace all per-address password overrides
    pub fn password_map(mut self, password_map: PasswordMap) -> Self {
        self.options.password_map = password_map;
        self
    }

    /// Dial addresses as cluster seed nodes
    pub fn cluster(mut self, is_cluster: bool) -> Self {
        self.options.is_cluster = is_cluster;
        self
    }

    /// Build the options
    pub fn build(self) -> ConnectionOptions {
        self.options
    }
}

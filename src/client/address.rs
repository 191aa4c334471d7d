//! Address normalization
//!
//! Accepted address shapes:
//! * `scheme://host[:port]`
//! * `host:port`
//! * `host`
//!
//! Cluster seeds are dialed as bare `host:port`; standalone addresses are
//! dialed as scheme-qualified URLs. Normalization is best effort: malformed
//! input is passed through and the dial reports the failure.

use url::Url;

/// Default Redis port, applied to cluster seeds without one
pub const DEFAULT_PORT: u16 = 6379;

/// Scheme prefixed to standalone addresses without one
pub const DEFAULT_SCHEME: &str = "redis";

/// Scheme used on the last standalone fallback when the address has none
pub const FALLBACK_SCHEME: &str = "tcp";

/// Separator between scheme and remainder
pub const SCHEME_SEPARATOR: &str = "://";

/// Deployment topology of the target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Topology {
    /// Single node, addressed directly
    #[default]
    Standalone,
    /// Sharded deployment discovered through a seed node
    Cluster,
}

impl Topology {
    /// Topology for a cluster-mode flag
    pub fn from_cluster_flag(is_cluster: bool) -> Self {
        if is_cluster {
            Self::Cluster
        } else {
            Self::Standalone
        }
    }
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standalone => write!(f, "standalone"),
            Self::Cluster => write!(f, "cluster"),
        }
    }
}

/// Whether `address` carries a scheme
pub fn has_scheme(address: &str) -> bool {
    address.contains(SCHEME_SEPARATOR)
}

/// Split `address` into scheme and remainder.
///
/// Returns `None` unless the address holds exactly one scheme separator.
pub fn split_scheme(address: &str) -> Option<(&str, &str)> {
    let mut frags = address.split(SCHEME_SEPARATOR);
    match (frags.next(), frags.next(), frags.next()) {
        (Some(scheme), Some(rest), None) => Some((scheme, rest)),
        _ => None,
    }
}

/// Rewrite `address` into the form the dial path for `topology` expects.
///
/// # Examples
///
/// ```
/// use redis_dialer::client::address::{normalize, Topology};
///
/// assert_eq!(normalize("cache", Topology::Cluster), "cache:6379");
/// assert_eq!(normalize("redis://cache:7000", Topology::Cluster), "cache:7000");
/// assert_eq!(normalize("cache:6379", Topology::Standalone), "redis://cache:6379");
/// ```
pub fn normalize(address: &str, topology: Topology) -> String {
    match topology {
        Topology::Cluster => normalize_cluster(address),
        Topology::Standalone => normalize_standalone(address),
    }
}

fn normalize_standalone(address: &str) -> String {
    if has_scheme(address) {
        address.to_string()
    } else {
        format!("{}{}{}", DEFAULT_SCHEME, SCHEME_SEPARATOR, address)
    }
}

fn normalize_cluster(address: &str) -> String {
    if !has_scheme(address) {
        return with_default_port(address);
    }

    match Url::parse(address) {
        Ok(url) => {
            if let Some(host) = url.host_str() {
                // `Url::port` hides a port equal to the scheme's default (http:80, ...)
                let port = url
                    .port()
                    .or_else(|| explicit_port(address))
                    .unwrap_or(DEFAULT_PORT);
                return format!("{}:{}", host, port);
            }
            tracing::debug!(address, "no host in cluster address");
        }
        Err(e) => tracing::debug!(address, error = %e, "unparseable cluster address"),
    }

    // Best effort: drop the scheme and treat the rest as host-like
    let rest = address
        .split_once(SCHEME_SEPARATOR)
        .map_or(address, |(_, rest)| rest);
    with_default_port(rest)
}

/// Port written in the authority of a scheme-qualified address
fn explicit_port(address: &str) -> Option<u16> {
    let (_, rest) = address.split_once(SCHEME_SEPARATOR)?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    let (host, port) = host_port.rsplit_once(':')?;
    // A colon inside IPv6 brackets is not a port separator
    if host.starts_with('[') && !host.ends_with(']') {
        return None;
    }
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    port.parse().ok()
}

fn with_default_port(address: &str) -> String {
    if address.split(':').count() == 2 {
        address.to_string()
    } else {
        format!("{}:{}", address, DEFAULT_PORT)
    }
}

/// Split a `host[:port]` string, applying [`DEFAULT_PORT`] when no port is given.
///
/// Brackets around IPv6 hosts are removed. Returns `None` for an empty host
/// or an unparseable port.
pub fn parse_host_port(address: &str) -> Option<(&str, u16)> {
    let (host, port) = match address.rsplit_once(':') {
        Some((host, port)) if !host.ends_with(':') => (host, port.parse().ok()?),
        Some(_) => (address, DEFAULT_PORT),
        None => (address, DEFAULT_PORT),
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return None;
    }
    Some((host, port))
}

//! Dial directives
//!
//! A [`DialDirective`] is one atomic dial-time setting. [`build_directives`]
//! turns [`ConnectionOptions`] into an immutable, ordered [`DialDirectives`]
//! collection.
//!
//! # Override contract
//!
//! Directives are independent and composable. When the same setting appears
//! more than once, the **last** occurrence wins. The accessors on
//! [`DialDirectives`] resolve settings this way, so consumers never depend on
//! the order in which they apply directives. [`build_directives`] relies on
//! it to let a per-address password override the global one.

use super::ConnectionOptions;
use crate::connection::TlsSettings;
use std::sync::Arc;
use std::time::Duration;

/// One dial-time setting
#[derive(Clone)]
pub enum DialDirective {
    /// Timeout for establishing the connection
    ConnectTimeout(Duration),
    /// Timeout for reading a reply
    ReadTimeout(Duration),
    /// Timeout for writing a command
    WriteTimeout(Duration),
    /// TLS material, used when the address asks for TLS
    Tls(TlsSettings),
    /// ACL username
    Username(String),
    /// Password
    Password(String),
}

impl std::fmt::Debug for DialDirective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectTimeout(t) => f.debug_tuple("ConnectTimeout").field(t).finish(),
            Self::ReadTimeout(t) => f.debug_tuple("ReadTimeout").field(t).finish(),
            Self::WriteTimeout(t) => f.debug_tuple("WriteTimeout").field(t).finish(),
            Self::Tls(tls) => f.debug_tuple("Tls").field(tls).finish(),
            Self::Username(u) => f.debug_tuple("Username").field(u).finish(),
            Self::Password(_) => f.debug_tuple("Password").field(&"<redacted>").finish(),
        }
    }
}

/// Immutable, ordered collection of dial directives.
///
/// Cloning is cheap; the directives are shared.
#[derive(Clone, Debug)]
pub struct DialDirectives {
    directives: Arc<[DialDirective]>,
}

impl DialDirectives {
    /// Iterate directives in order
    pub fn iter(&self) -> impl Iterator<Item = &DialDirective> {
        self.directives.iter()
    }

    /// Number of directives
    pub fn len(&self) -> usize {
        self.directives.len()
    }

    /// Whether there are no directives
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    fn last<'a, T>(&'a self, f: impl FnMut(&'a DialDirective) -> Option<T>) -> Option<T> {
        self.directives.iter().rev().find_map(f)
    }

    /// Effective connect timeout
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.last(|d| match d {
            DialDirective::ConnectTimeout(t) => Some(*t),
            _ => None,
        })
    }

    /// Effective read timeout
    pub fn read_timeout(&self) -> Option<Duration> {
        self.last(|d| match d {
            DialDirective::ReadTimeout(t) => Some(*t),
            _ => None,
        })
    }

    /// Effective write timeout
    pub fn write_timeout(&self) -> Option<Duration> {
        self.last(|d| match d {
            DialDirective::WriteTimeout(t) => Some(*t),
            _ => None,
        })
    }

    /// Bound for one request/response exchange: the longer of the read and write timeouts
    pub fn io_timeout(&self) -> Option<Duration> {
        match (self.read_timeout(), self.write_timeout()) {
            (Some(r), Some(w)) => Some(r.max(w)),
            (r, w) => r.or(w),
        }
    }

    /// Effective TLS material
    pub fn tls(&self) -> Option<&TlsSettings> {
        self.last(|d| match d {
            DialDirective::Tls(tls) => Some(tls),
            _ => None,
        })
    }

    /// Effective username
    pub fn username(&self) -> Option<&str> {
        self.last(|d| match d {
            DialDirective::Username(u) => Some(u.as_str()),
            _ => None,
        })
    }

    /// Effective password
    pub fn password(&self) -> Option<&str> {
        self.last(|d| match d {
            DialDirective::Password(p) => Some(p.as_str()),
            _ => None,
        })
    }
}

impl FromIterator<DialDirective> for DialDirectives {
    fn from_iter<I: IntoIterator<Item = DialDirective>>(iter: I) -> Self {
        Self {
            directives: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DialDirectives {
    type Item = &'a DialDirective;
    type IntoIter = std::slice::Iter<'a, DialDirective>;

    fn into_iter(self) -> Self::IntoIter {
        self.directives.iter()
    }
}

/// Translate options into the directives for dialing `address`.
///
/// Always emits the three timeouts and a TLS directive. A username directive
/// is emitted only when a username is configured. The global password comes
/// next, followed by the override for `address` from the password map, so
/// the override is the effective password.
pub fn build_directives(options: &ConnectionOptions, address: &str) -> DialDirectives {
    let mut directives = vec![
        DialDirective::ConnectTimeout(options.timeout),
        DialDirective::ReadTimeout(options.timeout),
        DialDirective::WriteTimeout(options.timeout),
        DialDirective::Tls(options.tls.clone()),
    ];

    if let Some(username) = options.username.as_deref().filter(|u| !u.is_empty()) {
        directives.push(DialDirective::Username(username.to_string()));
    }

    if let Some(password) = options.password.as_deref().filter(|p| !p.is_empty()) {
        directives.push(DialDirective::Password(password.to_string()));
    }

    if let Some(password) = options.password_map.get(address) {
        directives.push(DialDirective::Password(password.to_string()));
    }

    directives.into_iter().collect()
}

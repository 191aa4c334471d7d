//! Deserializable connection settings and the password map file

use super::{ConnectionOptions, DEFAULT_TIMEOUT};
use crate::connection::TlsSettings;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-address password overrides.
///
/// Keys are raw address strings exactly as they are dialed
/// (`redis://cache-1:6379`, `cache-2:6379`, ...). The serialized form is a
/// flat JSON object:
///
/// ```json
/// {
///   "redis://cache-1:6379": "secret-1",
///   "redis://cache-2:6379": "secret-2"
/// }
/// ```
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct PasswordMap(HashMap<String, String>);

impl PasswordMap {
    /// Empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the override for `address`
    pub fn insert(&mut self, address: impl Into<String>, password: impl Into<String>) {
        self.0.insert(address.into(), password.into());
    }

    /// Override for `address`. Empty passwords count as no override.
    pub fn get(&self, address: &str) -> Option<&str> {
        self.0
            .get(address)
            .map(String::as_str)
            .filter(|p| !p.is_empty())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a password map from a JSON object
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid password map: {}", e)))
    }

    /// Load a password map from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loaded password map");
        Self::from_json(&json)
    }
}

impl<K, V> FromIterator<(K, V)> for PasswordMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl std::fmt::Debug for PasswordMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut addresses: Vec<&str> = self.0.keys().map(String::as_str).collect();
        addresses.sort_unstable();
        f.debug_tuple("PasswordMap").field(&addresses).finish()
    }
}

/// Flat, deserializable form of [`ConnectionOptions`].
///
/// Meant to be embedded in whatever configuration format the host
/// application reads; certificate and password files are loaded by
/// [`into_options`](ConnectionSettings::into_options).
///
/// ```
/// use redis_dialer::ConnectionSettings;
///
/// let settings: ConnectionSettings = serde_json::from_str(
///     r#"{ "timeout_ms": 2000, "username": "exporter", "is_cluster": true }"#,
/// ).unwrap();
/// let options = settings.into_options().unwrap();
/// assert!(options.is_cluster);
/// ```
#[derive(Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionSettings {
    /// Connect/read/write timeout in milliseconds (default: 15000)
    pub timeout_ms: Option<u64>,
    /// Skip server certificate verification
    pub skip_tls_verification: bool,
    /// PEM file holding the CA certificate set
    pub ca_cert_path: Option<PathBuf>,
    /// PEM file holding the client certificate chain
    pub client_cert_path: Option<PathBuf>,
    /// PEM file holding the client private key
    pub client_key_path: Option<PathBuf>,
    /// ACL username
    pub username: Option<String>,
    /// Global password
    pub password: Option<String>,
    /// JSON file with per-address password overrides
    pub password_file: Option<PathBuf>,
    /// Inline per-address password overrides; entries win over `password_file`
    pub passwords: PasswordMap,
    /// Dial addresses as cluster seed nodes
    pub is_cluster: bool,
}

impl ConnectionSettings {
    /// Load referenced files and build the options
    pub fn into_options(self) -> Result<ConnectionOptions> {
        let mut tls = TlsSettings::builder().skip_verification(self.skip_tls_verification);
        if let Some(path) = self.ca_cert_path {
            tls = tls.ca_cert_path(path);
        }
        if let Some(path) = self.client_cert_path {
            tls = tls.client_cert_path(path);
        }
        if let Some(path) = self.client_key_path {
            tls = tls.client_key_path(path);
        }

        let mut password_map = match self.password_file {
            Some(path) => PasswordMap::load(path)?,
            None => PasswordMap::new(),
        };
        password_map.0.extend(self.passwords.0);

        let mut builder = ConnectionOptions::builder()
            .timeout(
                self.timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_TIMEOUT),
            )
            .tls(tls.build()?)
            .password_map(password_map)
            .cluster(self.is_cluster);
        if let Some(username) = self.username {
            builder = builder.username(username);
        }
        if let Some(password) = self.password {
            builder = builder.password(password);
        }

        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{CERT_PEM, KEY_PEM};
    use std::io::Write;

    #[test]
    fn test_password_map_from_json() {
        let map = PasswordMap::from_json(
            r#"{"redis://a:6379": "pw-a", "b:6379": "pw-b", "redis://c:6379": ""}"#,
        )
        .expect("parse");
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("redis://a:6379"), Some("pw-a"));
        assert_eq!(map.get("b:6379"), Some("pw-b"));
        assert_eq!(map.get("redis://c:6379"), None);
        assert_eq!(map.get("redis://d:6379"), None);
    }

    #[test]
    fn test_password_map_rejects_non_object() {
        let result = PasswordMap::from_json(r#"["redis://a:6379"]"#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_password_map_load_missing_file() {
        let result = PasswordMap::load("/nonexistent/passwords.json");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_password_map_from_iter() {
        let map: PasswordMap = [("redis://a:6379", "x")].into_iter().collect();
        assert_eq!(map.get("redis://a:6379"), Some("x"));
    }

    #[test]
    fn test_settings_defaults() {
        let settings: ConnectionSettings = serde_json::from_str("{}").expect("parse");
        let options = settings.into_options().expect("options");
        assert_eq!(options.timeout, DEFAULT_TIMEOUT);
        assert!(!options.is_cluster);
        assert!(!options.tls.skip_verification());
    }

    #[test]
    fn test_settings_rejects_unknown_fields() {
        let result = serde_json::from_str::<ConnectionSettings>(r#"{"timeout": 5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_with_files() {
        let mut passwords = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            passwords,
            r#"{{"redis://a:6379": "from-file", "redis://b:6379": "from-file"}}"#
        )
        .expect("write");
        let mut cert = tempfile::NamedTempFile::new().expect("tempfile");
        cert.write_all(CERT_PEM.as_bytes()).expect("write");
        let mut key = tempfile::NamedTempFile::new().expect("tempfile");
        key.write_all(KEY_PEM.as_bytes()).expect("write");

        let json = serde_json::json!({
            "timeout_ms": 250,
            "skip_tls_verification": true,
            "ca_cert_path": cert.path(),
            "client_cert_path": cert.path(),
            "client_key_path": key.path(),
            "username": "exporter",
            "password": "global",
            "password_file": passwords.path(),
            "passwords": { "redis://b:6379": "inline" },
            "is_cluster": true,
        });
        let settings: ConnectionSettings = serde_json::from_value(json).expect("parse");
        let options = settings.into_options().expect("options");

        assert_eq!(options.timeout, Duration::from_millis(250));
        assert!(options.tls.skip_verification());
        assert!(options.tls.client_certificate().is_some());
        assert!(options.tls.ca_certificates().is_some());
        assert_eq!(options.username.as_deref(), Some("exporter"));
        assert_eq!(options.password.as_deref(), Some("global"));
        assert_eq!(options.password_map.get("redis://a:6379"), Some("from-file"));
        assert_eq!(options.password_map.get("redis://b:6379"), Some("inline"));
        assert!(options.is_cluster);
    }
}

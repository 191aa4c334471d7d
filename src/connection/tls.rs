//! TLS material for secure connections to Redis.
//!
//! [`TlsSettings`] carries the three TLS inputs of a dial: the
//! skip-verification flag, an optional client certificate (for mTLS) and an
//! optional CA certificate set. PEM material is validated when the settings
//! are built so a bad file fails fast instead of at handshake time.
//!
//! The settings only take effect when the dialed address asks for TLS
//! (`rediss://`, or the `tls` scheme on the explicit fallback path); plaintext
//! addresses ignore them.

use crate::{Error, Result};
use rustls_pki_types::CertificateDer;
use std::fs;
use std::path::{Path, PathBuf};

/// Client certificate chain and private key, both PEM encoded.
#[derive(Clone)]
pub struct ClientCertificate {
    cert_chain: Vec<u8>,
    private_key: Vec<u8>,
}

impl ClientCertificate {
    /// PEM encoded certificate chain
    pub fn cert_chain(&self) -> &[u8] {
        &self.cert_chain
    }

    /// PEM encoded private key
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }
}

impl std::fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("cert_chain", &format_args!("<{} bytes>", self.cert_chain.len()))
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// TLS settings applied to TLS dials.
///
/// # Examples
///
/// ```ignore
/// use redis_dialer::TlsSettings;
///
/// // System roots, verification on
/// let tls = TlsSettings::default();
///
/// // Custom CA plus client certificate (mTLS)
/// let tls = TlsSettings::builder()
///     .ca_cert_path("/etc/redis/ca.pem")
///     .client_cert_path("/etc/redis/client.pem")
///     .client_key_path("/etc/redis/client.key")
///     .build()?;
///
/// // Self-signed test servers
/// let tls = TlsSettings::builder().skip_verification(true).build()?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct TlsSettings {
    skip_verification: bool,
    client_certificate: Option<ClientCertificate>,
    ca_certificates: Option<Vec<u8>>,
}

impl TlsSettings {
    /// Create a new TLS settings builder.
    pub fn builder() -> TlsSettingsBuilder {
        TlsSettingsBuilder::default()
    }

    /// Whether server certificate verification is skipped
    pub fn skip_verification(&self) -> bool {
        self.skip_verification
    }

    /// Client certificate for mTLS, if configured
    pub fn client_certificate(&self) -> Option<&ClientCertificate> {
        self.client_certificate.as_ref()
    }

    /// PEM encoded CA certificate set, if configured
    pub fn ca_certificates(&self) -> Option<&[u8]> {
        self.ca_certificates.as_deref()
    }

    /// Whether any certificate material is configured
    pub fn has_certificates(&self) -> bool {
        self.client_certificate.is_some() || self.ca_certificates.is_some()
    }

    /// Certificate material in the form the protocol client expects.
    ///
    /// Returns `None` when neither a client certificate nor a CA set is
    /// configured, in which case the platform roots are used.
    pub fn to_tls_certificates(&self) -> Option<redis::TlsCertificates> {
        if !self.has_certificates() {
            return None;
        }

        Some(redis::TlsCertificates {
            client_tls: self
                .client_certificate
                .as_ref()
                .map(|cert| redis::ClientTlsConfig {
                    client_cert: cert.cert_chain.clone(),
                    client_key: cert.private_key.clone(),
                }),
            root_cert: self.ca_certificates.clone(),
        })
    }
}

/// Builder for [`TlsSettings`].
///
/// PEM material can be given inline or as file paths; paths are read in
/// [`build`](TlsSettingsBuilder::build). Inline material wins over a path for
/// the same item.
#[derive(Debug, Default)]
pub struct TlsSettingsBuilder {
    skip_verification: bool,
    ca_cert_path: Option<PathBuf>,
    ca_cert_pem: Option<Vec<u8>>,
    client_cert_path: Option<PathBuf>,
    client_cert_pem: Option<Vec<u8>>,
    client_key_path: Option<PathBuf>,
    client_key_pem: Option<Vec<u8>>,
}

impl TlsSettingsBuilder {
    /// Skip server certificate verification (default: false).
    ///
    /// Only meant for test servers with self-signed certificates.
    pub fn skip_verification(mut self, skip: bool) -> Self {
        self.skip_verification = skip;
        self
    }

    /// Path to a PEM file holding the CA certificate set
    pub fn ca_cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    /// Inline PEM encoded CA certificate set
    pub fn ca_cert_pem(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.ca_cert_pem = Some(pem.into());
        self
    }

    /// Path to a PEM file holding the client certificate chain
    pub fn client_cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_cert_path = Some(path.into());
        self
    }

    /// Path to a PEM file holding the client private key
    pub fn client_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_key_path = Some(path.into());
        self
    }

    /// Inline PEM encoded client certificate chain and private key
    pub fn client_cert_pem(mut self, cert: impl Into<Vec<u8>>, key: impl Into<Vec<u8>>) -> Self {
        self.client_cert_pem = Some(cert.into());
        self.client_key_pem = Some(key.into());
        self
    }

    /// Build the TLS settings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - a certificate or key file cannot be read
    /// - a certificate file holds no PEM certificate
    /// - the key file holds no PEM private key
    /// - only one half of the client certificate/key pair is configured
    pub fn build(self) -> Result<TlsSettings> {
        let ca_certificates = match (self.ca_cert_pem, self.ca_cert_path) {
            (Some(pem), _) => Some(pem),
            (None, Some(path)) => Some(read_pem(&path, "CA certificate")?),
            (None, None) => None,
        };
        if let Some(pem) = &ca_certificates {
            parse_certificates(pem, "CA certificate")?;
        }

        let cert = match (self.client_cert_pem, self.client_cert_path) {
            (Some(pem), _) => Some(pem),
            (None, Some(path)) => Some(read_pem(&path, "client certificate")?),
            (None, None) => None,
        };
        let key = match (self.client_key_pem, self.client_key_path) {
            (Some(pem), _) => Some(pem),
            (None, Some(path)) => Some(read_pem(&path, "client key")?),
            (None, None) => None,
        };

        let client_certificate = match (cert, key) {
            (Some(cert_chain), Some(private_key)) => {
                parse_certificates(&cert_chain, "client certificate")?;
                validate_private_key(&private_key)?;
                Some(ClientCertificate {
                    cert_chain,
                    private_key,
                })
            }
            (None, None) => None,
            (Some(_), None) => {
                return Err(Error::Config(
                    "client certificate configured without a private key".into(),
                ))
            }
            (None, Some(_)) => {
                return Err(Error::Config(
                    "client private key configured without a certificate".into(),
                ))
            }
        };

        Ok(TlsSettings {
            skip_verification: self.skip_verification,
            client_certificate,
            ca_certificates,
        })
    }
}

fn read_pem(path: &Path, what: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read {} file '{}': {}",
            what,
            path.display(),
            e
        ))
    })
}

/// Parse every certificate out of a PEM buffer, rejecting buffers that hold none.
fn parse_certificates(pem: &[u8], what: &str) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = std::io::Cursor::new(pem);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", what, e)))?;

    if certs.is_empty() {
        return Err(Error::Config(format!("No valid certificates found in {}", what)));
    }

    Ok(certs)
}

fn validate_private_key(pem: &[u8]) -> Result<()> {
    let mut reader = std::io::Cursor::new(pem);
    match rustls_pemfile::private_key(&mut reader) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(Error::Config("No private key found in client key".into())),
        Err(e) => Err(Error::Config(format!("Failed to parse client key: {}", e))),
    }
}

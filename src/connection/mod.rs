//! Connection handles
//!
//! This module handles:
//! * The opaque connection handle returned by a dial
//! * The bounded retry decorator used for cluster connections
//! * TLS material

mod conn;
mod retry;
mod tls;

pub use conn::{Connection, ConnectionKind};
pub use retry::{
    is_retryable, RetryConnection, RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY,
};
pub use tls::{ClientCertificate, TlsSettings, TlsSettingsBuilder};

#[cfg(test)]
pub(crate) use tls::tests::{CERT_PEM, KEY_PEM};

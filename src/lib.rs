//! Connection establishment for Redis exporters.
//!
//! `redis-dialer` turns a target address and a bundle of [`ConnectionOptions`]
//! into a live Redis connection:
//!
//! * [`options::directive`] translates options into an ordered, immutable set of dial
//!   directives (timeouts, TLS, credentials)
//! * [`client::address`] normalizes `scheme://host:port`, `host:port` and `host` for
//!   the selected topology
//! * [`client::dialer`] dials: cluster discovery plus a retry-wrapped cluster
//!   connection, or a standalone URL dial with two fallback levels
//! * [`command`] issues commands over the resulting [`Connection`]
//!
//! The Redis protocol itself is provided by the [`redis`] crate.
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> redis_dialer::Result<()> {
//! use redis_dialer::{CommandArg, ConnectionOptions};
//! use std::time::Duration;
//!
//! let options = ConnectionOptions::builder()
//!     .timeout(Duration::from_secs(5))
//!     .password("secret")
//!     .build();
//!
//! let outcome = redis_dialer::connect("localhost:6379", &options).await?;
//! let mut conn = outcome.into_connection();
//!
//! let reply = conn.execute("PING", &[]).await.into_result();
//! let echoed = conn
//!     .execute("ECHO", &[CommandArg::from("hello")])
//!     .await
//!     .context()?;
//! # let _ = (reply, echoed);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, rust_2018_idioms)]

pub mod client;
pub mod command;
pub mod connection;
pub mod error;
pub mod metrics;
pub mod observe;
pub mod options;

pub use client::address::Topology;
pub use client::{connect, DialOutcome, DialPath, Dialer};
pub use command::{CommandArg, CommandExecutor, CommandResult};
pub use connection::{Connection, ConnectionKind, RetryConnection, RetryPolicy, TlsSettings};
pub use error::{Error, Result};
pub use observe::{DialObserver, NoopObserver, TracingObserver};
pub use options::directive::{build_directives, DialDirective, DialDirectives};
pub use options::{ConnectionOptions, ConnectionOptionsBuilder, ConnectionSettings, PasswordMap};

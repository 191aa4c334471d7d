//! Integration tests for redis-dialer
//!
//! These tests require a running Redis instance. Set `REDIS_ADDR` to override
//! the default `127.0.0.1:6379`; the cluster test needs `REDIS_CLUSTER_ADDR`.

use redis_dialer::{
    CommandArg, ConnectionOptions, DialPath, Dialer, Error, NoopObserver,
};
use std::sync::Arc;
use std::time::Duration;

fn redis_addr() -> String {
    std::env::var("REDIS_ADDR").unwrap_or_else(|_| "127.0.0.1:6379".to_string())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_standalone_ping() {
    init_tracing();

    let options = ConnectionOptions::builder()
        .timeout(Duration::from_secs(5))
        .build();
    let outcome = redis_dialer::connect(&redis_addr(), &options)
        .await
        .expect("connect");
    assert_eq!(outcome.path(), DialPath::Url);

    let mut conn = outcome.into_connection();
    let reply = conn.execute("PING", &[]).await.into_result().expect("ping");
    let pong: String = redis::from_redis_value(&reply).expect("string reply");
    assert_eq!(pong, "PONG");
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_standalone_commands() {
    init_tracing();

    let mut conn = redis_dialer::connect(&redis_addr(), &ConnectionOptions::default())
        .await
        .expect("connect")
        .into_connection();

    conn.execute(
        "SET",
        &["redis_dialer:test".into(), CommandArg::from(41i64)],
    )
    .await
    .context()
    .expect("set");
    let value = conn
        .execute("INCR", &["redis_dialer:test".into()])
        .await
        .context()
        .expect("incr");
    assert_eq!(value, redis::Value::Int(42));

    conn.execute("DEL", &["redis_dialer:test".into()])
        .await
        .context()
        .expect("del");
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_fallback_to_explicit_scheme() {
    init_tracing();

    // `tcp` is not a URL scheme the protocol client accepts, so only the
    // explicit-scheme fallback can connect
    let address = format!("tcp://{}", redis_addr());
    let outcome = Dialer::new()
        .observer(Arc::new(NoopObserver))
        .dial(&address, &ConnectionOptions::default())
        .await
        .expect("fallback connect");

    assert_eq!(outcome.path(), DialPath::ExplicitScheme);
    assert!(outcome.is_degraded());

    let mut conn = outcome.into_connection();
    let reply = conn.execute("PING", &[]).await.into_result().expect("ping");
    assert_eq!(reply, redis::Value::SimpleString("PONG".into()));
}

#[tokio::test]
async fn test_unreachable_address_fails() {
    let options = ConnectionOptions::builder()
        .timeout(Duration::from_millis(200))
        .build();

    let err = redis_dialer::connect("127.0.0.1:1", &options)
        .await
        .expect_err("nothing listens on port 1");
    assert!(matches!(err, Error::Dial { ref address, .. } if address == "127.0.0.1:1"));
    assert!(err.is_fatal());
}

#[tokio::test]
#[ignore] // Requires a Redis cluster running
async fn test_cluster_ping() {
    init_tracing();

    let Ok(seed) = std::env::var("REDIS_CLUSTER_ADDR") else {
        return;
    };
    let options = ConnectionOptions::builder().cluster(true).build();
    let outcome = redis_dialer::connect(&seed, &options)
        .await
        .expect("cluster connect");
    assert_eq!(outcome.path(), DialPath::Cluster);
    assert!(!outcome.is_degraded());

    let mut conn = outcome.into_connection();
    assert!(conn.is_cluster());
    let reply = conn.execute("PING", &[]).await.into_result().expect("ping");
    assert_eq!(reply, redis::Value::SimpleString("PONG".into()));
}

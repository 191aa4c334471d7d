//! Metrics emitted while dialing and executing commands.
//!
//! Recorded through the [`metrics`] facade; nothing is exported unless the
//! host application installs a recorder.
//!
//! | Metric | Kind | Labels |
//! |---|---|---|
//! | `redis_dialer_dial_attempts_total` | counter | `path` |
//! | `redis_dialer_dial_failures_total` | counter | `path` |
//! | `redis_dialer_dials_total` | counter | `topology`, `outcome` |
//! | `redis_dialer_topology_refresh_failures_total` | counter | |
//! | `redis_dialer_command_total` | counter | `outcome` |
//! | `redis_dialer_dial_duration_ms` | histogram | `topology` |
//! | `redis_dialer_command_duration_ms` | histogram | `command` (uppercased) |

/// Label keys and values
pub mod labels {
    /// Dial path label key
    pub const PATH: &str = "path";
    /// Topology label key
    pub const TOPOLOGY: &str = "topology";
    /// Outcome label key
    pub const OUTCOME: &str = "outcome";
    /// Command label key
    pub const COMMAND: &str = "command";

    /// Successful outcome
    pub const OUTCOME_OK: &str = "ok";
    /// Failed outcome
    pub const OUTCOME_ERROR: &str = "error";
    /// Connected with a non-fatal failure along the way
    pub const OUTCOME_DEGRADED: &str = "degraded";

    /// Command label for names that do not look like a Redis command
    pub const COMMAND_OTHER: &str = "OTHER";

    /// Bounded command label: the uppercased name, or [`COMMAND_OTHER`]
    pub fn command(name: &str) -> String {
        let plausible = !name.is_empty()
            && name.len() <= 32
            && name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));
        if plausible {
            name.to_ascii_uppercase()
        } else {
            COMMAND_OTHER.to_string()
        }
    }
}

/// Counters
pub mod counters {
    use super::labels;

    /// A dial attempt started on `path`
    pub fn dial_attempted(path: &str) {
        ::metrics::counter!(
            "redis_dialer_dial_attempts_total",
            labels::PATH => path.to_string()
        )
        .increment(1);
    }

    /// A dial attempt on `path` failed
    pub fn dial_failed(path: &str) {
        ::metrics::counter!(
            "redis_dialer_dial_failures_total",
            labels::PATH => path.to_string()
        )
        .increment(1);
    }

    /// A dial call finished
    pub fn dial_completed(topology: &str, outcome: &str) {
        ::metrics::counter!(
            "redis_dialer_dials_total",
            labels::TOPOLOGY => topology.to_string(),
            labels::OUTCOME => outcome.to_string()
        )
        .increment(1);
    }

    /// Cluster topology refresh failed
    pub fn topology_refresh_failed() {
        ::metrics::counter!("redis_dialer_topology_refresh_failures_total").increment(1);
    }

    /// A command finished with `outcome`
    pub fn command_completed(outcome: &str) {
        ::metrics::counter!(
            "redis_dialer_command_total",
            labels::OUTCOME => outcome.to_string()
        )
        .increment(1);
    }
}

/// Histograms
pub mod histograms {
    use super::labels;

    /// Wall time of a whole dial call, in milliseconds
    pub fn dial_duration(topology: &str, duration_ms: u64) {
        ::metrics::histogram!(
            "redis_dialer_dial_duration_ms",
            labels::TOPOLOGY => topology.to_string()
        )
        .record(duration_ms as f64);
    }

    /// Round trip of one command, in milliseconds
    pub fn command_duration(command: &str, duration_ms: u64) {
        ::metrics::histogram!(
            "redis_dialer_command_duration_ms",
            labels::COMMAND => labels::command(command)
        )
        .record(duration_ms as f64);
    }
}

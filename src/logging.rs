//! Subscriber setup for applications, tests and benches using this crate.
//!
//! The library itself only emits `tracing` events (table loads, Code500 sessions, segment
//! parsing, UT1 iteration warnings); installing a subscriber is left to the caller.
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a human-readable subscriber filtered by `RUST_LOG`, or by `default_filter` when the
/// variable is unset or invalid.
///
/// Arguments
/// -----------------
/// * `default_filter`: Filter directives such as `"info"` or `"ephem_timecore=debug"`.
///
/// Return
/// ----------
/// * `true` if this call installed the global subscriber, `false` if one was already set.
pub fn init_tracing(default_filter: &str) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

//! Logging setup
//!
//! The crate logs through the `log` facade; binaries pick the backend.

/// Install `env_logger` with the `info` default filter
pub fn init() -> bool {
    init_with_filter("info")
}

/// Install `env_logger`, falling back to `filter` when `RUST_LOG` is unset
///
/// Returns `false` when a logger was already installed.
pub fn init_with_filter(filter: &str) -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .try_init()
        .is_ok()
}

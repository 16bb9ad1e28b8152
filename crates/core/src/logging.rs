//! Tracing subscriber setup

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ReflectConfig;

/// Install a fmt subscriber for the engine's logs.
///
/// `RUST_LOG` takes precedence. Otherwise the level follows `config.debug`.
/// Returns false if a global subscriber was already set.
pub fn init(config: &ReflectConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

fn default_directive(config: &ReflectConfig) -> &'static str {
    if config.debug {
        "typemeta_core=debug"
    } else {
        "typemeta_core=info"
    }
}

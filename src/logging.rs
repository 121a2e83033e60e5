// src/logging.rs
//! Logger bootstrap and the `dfatal!` diagnostic.
//!
//! `dfatal!` marks programming errors that must never happen in shipped content
//! (invalid enum values, conflicting shader declarations, missing callback data).
//! It always logs at `error` level and keeps running with a safe fallback. Building
//! with the `strict-dfatal` feature turns it into a panic in debug builds so tests and
//! tools catch the misuse at the call site.

use log::LevelFilter;

/// Logs a fatal-in-debug diagnostic. See the module docs.
#[macro_export]
macro_rules! dfatal {
    ($($arg:tt)+) => {{
        log::error!($($arg)+);
        if cfg!(all(debug_assertions, feature = "strict-dfatal")) {
            panic!($($arg)+);
        }
    }};
}

/// Default level: verbose while developing, quiet in release.
pub fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

/// Parses a level name from config (`"trace"`, `"info"`, ...).
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.trim().parse().ok()
}

/// Installs `env_logger` once. `RUST_LOG` still overrides `level`.
///
/// Later calls (and calls after another logger was installed) are ignored.
pub fn init(level: Option<LevelFilter>) {
    let result = env_logger::Builder::new()
        .filter_level(level.unwrap_or_else(default_level))
        .format_timestamp_millis()
        .format_target(false)
        .parse_default_env()
        .try_init();
    if result.is_err() {
        log::trace!("logger already initialized");
    }
}

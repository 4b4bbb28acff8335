//! Logging setup.
//!
//! Logs go to **stderr**; stdout belongs to the host tool's plugin protocol.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `sakura_provider_core=debug`)
//!
//! The configured trace mode adds directives on top of `RUST_LOG`:
//! API tracing enables `debug` for the [`API_TARGET`] target, wire tracing
//! enables `trace` for the [`HTTP_TARGET`] target.
//!
//! ```bash
//! # Show debug logs for the core
//! RUST_LOG=sakura_provider_core=debug ./terraform-provider-sakura
//!
//! # Same, plus every API operation
//! SAKURACLOUD_TRACE=api RUST_LOG=sakura_provider_core=debug ./terraform-provider-sakura
//! ```

use tracing_subscriber::{filter::Directive, fmt, prelude::*, EnvFilter};

use crate::types::{TraceFlags, TraceMode};

/// Target of API-level trace events.
pub const API_TARGET: &str = "api";

/// Target of wire-level trace events.
pub const HTTP_TARGET: &str = "http";

/// Extra filter directives for the given trace flags.
pub fn directives_for(flags: TraceFlags) -> Vec<String> {
    let mut directives = Vec::new();
    if flags.api {
        directives.push(format!("{}=debug", API_TARGET));
    }
    if flags.http {
        directives.push(format!("{}=trace", HTTP_TARGET));
    }
    directives
}

fn filter(default_level: &str, flags: TraceFlags) -> EnvFilter {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    directives_for(flags)
        .iter()
        .filter_map(|d| d.parse::<Directive>().ok())
        .fold(filter, EnvFilter::add_directive)
}

fn try_init(default_level: &str, flags: TraceFlags) -> bool {
    tracing_subscriber::registry()
        .with(filter(default_level, flags))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok()
}

/// Initialize the default logging subscriber at `info`.
///
/// Does nothing if a global subscriber is already set.
pub fn init_logging() {
    try_init("info", TraceFlags::default());
}

/// Initialize logging with a custom default level, used when `RUST_LOG` is
/// not set.
pub fn init_logging_with_default(default_level: &str) {
    try_init(default_level, TraceFlags::default());
}

/// Try to initialize logging, returning false if already initialized.
pub fn try_init_logging() -> bool {
    try_init("info", TraceFlags::default())
}

/// Initialize logging with the directives a trace mode asks for.
///
/// Call after the configuration is resolved. Returns false if a subscriber
/// was already set.
pub fn try_init_logging_for(trace: TraceMode) -> bool {
    try_init("info", trace.flags())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("sakura_provider_core=debug").is_ok());
        assert!(EnvFilter::try_new("warn,api=debug,http=trace").is_ok());
    }

    #[test]
    fn test_directives_follow_trace_mode() {
        assert!(directives_for(TraceMode::Off.flags()).is_empty());

        assert_eq!(directives_for(TraceMode::Api.flags()), vec!["api=debug"]);
        assert_eq!(
            directives_for(TraceMode::Both.flags()),
            vec!["api=debug", "http=trace"]
        );
        for directive in directives_for(TraceMode::Both.flags()) {
            assert!(directive.parse::<Directive>().is_ok());
        }
    }
}

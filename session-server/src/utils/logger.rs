//! Logging Infrastructure
//!
//! `RUST_LOG` controls filtering; `LOG_FORMAT=json` switches to structured
//! JSON lines for log shipping. Security events use the `security` target
//! and audit mirrors the `audit` target, so both can be routed separately.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "session_server=info,tower_http=info,security=info,audit=info";

/// Initialize the logger
pub fn init_logger() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    init_logger_with(None, json);
}

/// Initialize the logger with an explicit filter directive
pub fn init_logger_with(filter: Option<&str>, json: bool) {
    let filter = match filter {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false);

    // try_init: tests may install a subscriber more than once
    let _ = if json {
        builder.json().with_current_span(false).try_init()
    } else {
        builder.try_init()
    };
}

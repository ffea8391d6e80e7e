//! Tracing subscriber setup for the command-line tool.
//!
//! ## Environment Variables
//!
//! 1. **`DELTA_PATCHER_LOG`** (highest priority). A bare level such as
//!    `debug` applies to this crate only; anything with filter syntax is used
//!    as-is.
//! 2. **`RUST_LOG`**, used directly.
//! 3. **Default**: `warn`, or `debug` for this crate with `--verbose`.
//!
//! Output goes to stderr so patched content on stdout stays clean.

use std::env;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "DELTA_PATCHER_LOG";

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let directives = filter_directives(
        env::var(LOG_ENV).ok().as_deref(),
        env::var("RUST_LOG").ok().as_deref(),
        verbose,
    );
    let filter = EnvFilter::try_new(directives)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
}

fn filter_directives(own: Option<&str>, rust_log: Option<&str>, verbose: bool) -> String {
    if let Some(own) = own {
        if own.contains('=') || own.contains(',') || own.contains(':') {
            return own.to_string();
        }
        return format!("warn,delta_patcher={own}");
    }

    if let Some(rust_log) = rust_log {
        return rust_log.to_string();
    }

    if verbose {
        "warn,delta_patcher=debug".to_string()
    } else {
        "warn".to_string()
    }
}

//! Logging setup.
//!
//! Diagnostics go to stderr through `tracing`; what the operator reads is
//! printed by [`crate::ui`]. `NXRELEASE_LOG` takes an `EnvFilter` directive
//! (default `warn`), `NXRELEASE_LOG_FORMAT=json` switches to JSON lines.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "NXRELEASE_LOG";
pub const LOG_FORMAT_ENV: &str = "NXRELEASE_LOG_FORMAT";

pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed (e.g. by a test harness).
    let result = if json {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.with_target(false).try_init()
    };
    if let Err(e) = result {
        eprintln!("logging not initialized: {e}");
    }
}

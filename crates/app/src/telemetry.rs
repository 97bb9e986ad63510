//! Tracing setup for the `lingo` binary.
//!
//! `LINGO_LOG` holds the filter directives (e.g. `"info,session=debug"`).
//! `LINGO_LOG_FORMAT=json` switches to structured JSON lines; anything else
//! prints the compact human format.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,session=info,entitlement=info";

pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("LINGO_LOG").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // Logs go to stderr so they never interleave with the quiz on stdout.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match std::env::var("LINGO_LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.compact().init(),
    }
}

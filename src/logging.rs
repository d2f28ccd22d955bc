//! Unified logging for diagnostic output.
//!
//! Parse-path diagnostics (grammar init failures, native parser panics,
//! store misses) go through `tracing`; this module wires up a compact
//! subscriber. The `RUST_LOG` environment variable takes precedence over
//! the level passed by the caller.

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: Once = Once::new();

/// Compact time format: HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Initialize logging with a default level.
///
/// Call once at startup. Safe to call multiple times (only the first call
/// takes effect). Levels follow the usual ladder: `error`, `warn`
/// (default, quiet operation), `info`, `debug`, `trace`.
pub fn init_with_level(default_level: &str) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(default_level)
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_timer(CompactTime)
            .with_level(true)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}

/// Initialize logging with the quiet default (`warn`).
pub fn init() {
    init_with_level("warn");
}

//! Test bootstrap: one tracing subscriber per test process.

use std::sync::Once;

use tracing::debug;
use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter};

static TEST_SETUP: Once = Once::new();

/// Directives used when `RUST_LOG` is unset: everything from this crate,
/// only warnings from dependencies.
pub const DEFAULT_TEST_DIRECTIVES: &str = "warn,nodecomp=trace";

/// Installs the global tracing subscriber for tests. Safe to call from every
/// test; only the first call has an effect.
pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TEST_DIRECTIVES));

        let layer = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_thread_names(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(filter);

        // Another harness may already own the global dispatcher.
        if let Err(e) = tracing_subscriber::registry().with(layer).try_init() {
            eprintln!("test logging not installed: {e}");
        }
        debug!("test setup complete");
    });
}

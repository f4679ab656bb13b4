//! Structured logging and tracing configuration.
//!
//! Provides setup for observability using the `tracing` crate with:
//! - Plain text or JSON output
//! - Filtering from `RUST_LOG`, falling back to the configured level
//! - Span helpers that tag every live query with a subscription id

use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Registry,
};

/// Initialize tracing.
///
/// `RUST_LOG` takes precedence over `level` when set. Output goes to stderr
/// so query results on stdout stay machine-readable.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed in this process.
pub fn init_tracing(level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        let json_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        Registry::default().with(env_filter).with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true);

        Registry::default().with(env_filter).with(fmt_layer).init();
    }

    tracing::debug!("Tracing initialized: level={}, json={}", level, json);
}

/// Span constructors shared across the crate.
pub mod spans {
    use tracing::{debug_span, info_span, Span};
    use uuid::Uuid;

    /// Span covering one live query subscription.
    ///
    /// Every subscription gets a fresh id so interleaved streams can be told
    /// apart in the logs.
    #[must_use]
    pub fn observation_span(kind: &str, target: &str) -> Span {
        debug_span!(
            "observation",
            id = %Uuid::new_v4(),
            kind = %kind,
            target = %target,
        )
    }

    /// Span covering one media scan.
    #[must_use]
    pub fn scan_span(root: &str) -> Span {
        info_span!("media_scan", root = %root)
    }
}

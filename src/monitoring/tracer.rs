/*!
 * Structured Tracing
 * Subscriber setup and session spans using the tracing crate
 */

use tracing::{info, info_span, Span};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Environment variable selecting JSON output
pub const ENV_TRACE_JSON: &str = "THREADWATCH_TRACE_JSON";

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: debug when verbose, info otherwise)
/// - THREADWATCH_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns false when the process already has a global subscriber, which is
/// then left in place.
pub fn init_tracing(verbose: bool) -> bool {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json_requested() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(verbose, "Structured tracing initialized");
    }
    installed
}

fn json_requested() -> bool {
    std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Span for a background thread of one capture session
pub fn session_span(component: &'static str, session: Uuid) -> Span {
    info_span!("threadwatch", component, session = %session)
}

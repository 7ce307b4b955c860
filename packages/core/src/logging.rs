use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Default log filter: application at `info`, sqlx statement logging
/// demoted to `warn` so per-query output stays out of request logs.
const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging. Call once at startup, before the
/// first query or request is handled; `RUST_LOG` overrides the
/// default filter when set.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("medtracker logging initialized");
}

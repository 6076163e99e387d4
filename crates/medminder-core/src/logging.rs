//! Tracing subscriber setup for host applications.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "medminder_core=info,medminder_llm=info,warn"
}

/// Install the global fmt subscriber. `RUST_LOG` wins over `filter`, which wins
/// over [`default_log_filter`]. Returns false if a subscriber was already installed.
pub fn try_init(filter: Option<&str>) -> bool {
    let fallback = filter.unwrap_or(default_log_filter());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .try_init()
        .is_ok()
}

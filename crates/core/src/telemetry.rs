use tracing_subscriber::{EnvFilter, fmt};

/// Initialise the global tracing subscriber with an `info` default.
pub fn init() {
    init_with("info");
}

/// Initialise the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_directives` when set. Calling this twice is a no-op.
pub fn init_with(default_directives: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    if fmt().with_env_filter(filter).with_target(true).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

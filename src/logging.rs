use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the process-wide subscriber. Call once, from `main`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("eventclaw=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

use tracing_subscriber::{prelude::*, EnvFilter};

/// Initialize tracing.
///
/// Safe to call more than once; only the first call installs the
/// subscriber, so every test may call this.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter))
        .try_init();
}

use tracing_subscriber::EnvFilter;

/// Initialize a simple stdout tracing subscriber for development.
///
/// `RUST_LOG` wins over the built-in filter when set.
pub fn init_stdout_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,remix_core=debug"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Like [`init_stdout_tracing`] but returns an error instead of panicking when
/// a global subscriber is already installed.
pub fn try_init_stdout_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,remix_core=debug"));

    tracing_subscriber::fmt().with_env_filter(filter).try_init()
}

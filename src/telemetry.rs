use tracing_subscriber::EnvFilter;

/// Initialize logging. Everything goes to stderr: stdout belongs to the
/// selected output stream.
pub fn init(debug: bool) {
    let default_filter = if debug { "info,hdip_rx=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

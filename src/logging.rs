use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "propdesk=info";

/// Installs the global subscriber. `RUST_LOG` wins over the default filter.
/// Logs go to stderr so stdout stays usable for command output.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();
}

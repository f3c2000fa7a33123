//! Tracing subscriber setup for binaries. Library code only emits events.

use crate::config::LoggingConfig;

/// Install a global `fmt` subscriber. `RUST_LOG` takes precedence over `config.level`.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    // A second install (tests, embedding) keeps the first subscriber.
    tracing::subscriber::set_global_default(subscriber).ok();
}

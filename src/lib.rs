pub mod cli;
pub mod config;
pub mod proxy;
pub mod supervisor;

/// Shared by the supervisor binary and the two standalone server binaries.
pub fn init_logs() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, registry, EnvFilter};

    let _ = registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_PKG_NAME")).into()),
        )
        .with(fmt::layer().with_ansi(cfg!(debug_assertions)))
        .try_init();
}

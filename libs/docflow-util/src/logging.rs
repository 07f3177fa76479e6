//! Tracing-subscriber wiring shared by every docflow binary. Request-level logging middleware
//! is out of scope (§1), but the ambient subscriber setup is not: every orchestrator and worker
//! instruments its own spans, and something has to install the subscriber that renders them.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Installs a global tracing subscriber. Call once, at binary startup.
pub fn init(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_error::ErrorLayer::default());

    match format {
        LogFormat::Text => registry.with(fmt::layer()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

//! Structured logging.
//!
//! `RUST_LOG` takes precedence over the configured level. Production mode
//! drops ANSI colors so log collectors get plain text.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;

/// Default directive when neither `RUST_LOG` nor a usable level is given.
const FALLBACK_FILTER: &str = "inference_gateway=info,tower_http=info";

fn filter_for(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(format!(
                "inference_gateway={level},tower_http={level}",
                level = config.log_level
            ))
        })
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER))
}

/// Initialize the global tracing subscriber. Safe to call once per process.
pub fn init_logging(config: &ObservabilityConfig, production: bool) {
    let result = tracing_subscriber::registry()
        .with(filter_for(config))
        .with(tracing_subscriber::fmt::layer().with_ansi(!production).with_target(!production))
        .try_init();

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {}", e);
    }
}

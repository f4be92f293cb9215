//! Tracing init, kept as its own function since `main` has little else
//! to set up before the dispatch task and listeners start.

use crate::config::LoggingConfig;

pub fn init(logging: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(logging.level.clone()));

    if logging.json {
        tracing_subscriber::fmt().with_env_filter(env_filter).with_target(true).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).with_target(true).init();
    }
}

//! Tracing setup for embedding applications.

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber and routes `log` records
/// (the store and mail layers log through the `log` facade) into it.
/// Filtering follows `RUST_LOG`, defaulting to `info`. Safe to call
/// more than once; later calls are no-ops.
pub fn init() {
    let _ = tracing_log::LogTracer::init();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
    }
}

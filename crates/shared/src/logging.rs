use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install the global tracing subscriber once.
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies to every target.
pub fn init_logging(default_level: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    });
}

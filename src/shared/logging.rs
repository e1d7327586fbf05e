use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the default tracing subscriber for embedding applications and
/// tests. Safe to call more than once; later calls are no-ops.
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lorebase_sync=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

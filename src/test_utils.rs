use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize test logging once per test binary.
/// Honors `RUST_LOG`; output goes through the test writer so it is only
/// shown for failing tests.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

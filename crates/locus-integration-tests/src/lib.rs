//! Shared helpers for Locus integration tests

/// Initialize test logging once; later calls are no-ops.
///
/// Honors `RUST_LOG`, defaulting to `info` for the locus crates.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("locus_core=info,locus_directory=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init()
        .ok();
}

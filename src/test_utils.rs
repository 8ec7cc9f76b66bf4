//! Shared test setup

/// Test logging, enabled with `--features test-logging`
#[cfg(all(test, feature = "test-logging"))]
pub mod logging {
    use std::sync::Once;
    use tracing_subscriber::{EnvFilter, fmt};

    static INIT: Once = Once::new();

    /// Install a test subscriber once per test binary.
    ///
    /// `RUST_LOG` wins over the default filter. Test modules hook this up
    /// through `ctor`:
    ///
    /// ```rust,ignore
    /// #[cfg(feature = "test-logging")]
    /// #[ctor::ctor]
    /// fn init_test_logging() {
    ///     crate::test_utils::logging::init();
    /// }
    /// ```
    ///
    /// ```bash
    /// RUST_LOG=lsp_sansio_client=trace cargo test --features test-logging
    /// ```
    pub fn init() {
        INIT.call_once(|| {
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lsp_sansio_client=trace,debug,tokio=info"));

            // Another harness may already own the global subscriber
            let _ = fmt()
                .with_env_filter(filter)
                .with_test_writer()
                .with_target(true)
                .compact()
                .try_init();
        });
    }
}

//! Integration test crate for the keepsake workspace.
//!
//! This crate carries no production code — only the shared test scaffolding
//! and integration tests that exercise end-to-end capsule flows across
//! multiple workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p keepsake-integration-tests
//! ```

use std::sync::Once;

static TRACING: Once = Once::new();

/// Install the test tracing subscriber, once per process.
///
/// Output goes through the test writer so it interleaves with the harness;
/// filter with `RUST_LOG` as usual.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

//! Test utilities for addonpack
//!
//! Helpers shared by unit and integration tests: a logging setup that plays
//! well with the test harness, and fixtures that write addon source trees.
//!
//! # Example
//!
//! ```rust,no_run
//! use addonpack::test_utils::{AddonFixture, init_test_logging};
//!
//! init_test_logging(None);
//! let temp = tempfile::TempDir::new().unwrap();
//! let source = AddonFixture::basic().write_to(temp.path()).unwrap();
//! assert!(source.join("config.cpp").is_file());
//! ```

pub mod fixtures;

pub use fixtures::AddonFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. `level` wins over `RUST_LOG`; with
/// neither, nothing is logged.
///
/// ```bash
/// RUST_LOG=build=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

//! Integration test suite for addonpack
//!
//! End-to-end tests that run the `addonpack` binary against addon trees
//! written into temporary directories.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! - **build**: the build pipeline, determinism, exclusion and failures
//! - **preprocess**: the `preprocess` command
//! - **archive**: `inspect`, `unpack` and `cat` on built archives
//! - **cli**: global flags and config file handling

#[path = "../common/mod.rs"]
mod common;

mod archive;
mod build;
mod cli;
mod preprocess;

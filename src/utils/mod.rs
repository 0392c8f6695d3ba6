//! Utility modules shared across addonpack.
//!
//! - [`fs`]: deterministic directory walks, copying and removal
//! - [`platform`]: conversions between host paths, logical paths and archive names
//! - [`progress`]: progress bars for long-running stages

pub mod fs;
pub mod platform;
pub mod progress;

//! Configuration for addonpack.
//!
//! A single optional TOML file supplies defaults that the command line extends.
//! It is looked up in this order:
//!
//! 1. `--config <path>` (must exist)
//! 2. the `ADDONPACK_CONFIG` environment variable
//! 3. `~/.addonpack/config.toml`
//!
//! A missing file in the last two locations yields the default configuration.
//!
//! ```toml
//! include = ["~/addons/cba_a3", "$P_DRIVE"]
//! exclude = ["*.psd", "source/**"]
//! muted_warnings = ["redefinition-wo-undef"]
//! temp_path = "/var/tmp"
//!
//! [tools.model_binarizer]
//! program = "binarize"
//! args = ["-norecurse", "{source}", "{target_dir}"]
//!
//! [tools.signer]
//! program = "dssignfile"
//! args = ["{key}", "{archive}"]
//! ```
//!
//! Paths may use `~` and environment variables; they are expanded with
//! `shellexpand` when read.

pub mod global;

pub use global::{Config, ToolsConfig};

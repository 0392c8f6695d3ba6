//! addonpack - builds game addon source trees into packed archives
//!
//! An addon is a directory of configs, scripts, models and textures that the
//! game loads from a single archive. addonpack takes that directory through a
//! fixed pipeline:
//!
//! 1. configs are run through a C-style macro preprocessor and compiled
//! 2. models and terrains are handed to an external binarizer in an isolated
//!    workspace holding everything they reference
//! 3. the results are packed into an archive with a SHA-1 trailer
//! 4. the archive is optionally signed by an external signer
//!
//! Files refer to each other by *logical path*, `\prefix\sub\file.ext`, where
//! the prefix is declared by a `$PBOPREFIX$` marker at the addon root. The
//! [`resolver`] maps logical paths back to files under a list of include roots.
//!
//! # Modules
//!
//! - [`build`] - the pipeline and its stages
//! - [`preprocess`] - `#define`, `#include`, conditionals and macro expansion
//! - [`resolver`] - addon prefixes and logical path lookup
//! - [`pbo`] - archive writer, reader and extraction
//! - [`formats`] - dependency discovery in models and terrains
//! - [`tools`] - external tool invocation and the [`tools::Binarizer`] trait
//! - [`sign`] - detached signatures
//! - [`workspace`] - temporary build directories
//! - [`config`] - `~/.addonpack/config.toml`
//! - [`core`] - error types and user-facing error reports
//! - [`cli`] - the `addonpack` command
//!
//! # Example
//!
//! ```rust,no_run
//! use addonpack::build::{BuildOptions, Toolchain, build};
//! use addonpack::config::Config;
//! use std::path::PathBuf;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::load(None)?;
//! let options = BuildOptions {
//!     source: PathBuf::from("addons/main"),
//!     target: PathBuf::from("release/main.pbo"),
//!     exclude: config.exclude.clone(),
//!     ..BuildOptions::default()
//! };
//! let report = build(&options, &Toolchain::from_config(&config.tools, true))?;
//! println!("sha1 {}", report.checksum);
//! # Ok(())
//! # }
//! ```

pub mod build;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod formats;
pub mod pattern;
pub mod pbo;
pub mod preprocess;
pub mod resolver;
pub mod sign;
pub mod tools;
pub mod utils;
pub mod workspace;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

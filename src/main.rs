//! addonpack CLI entry point
//!
//! Parses the command line, runs the command, and turns errors into a
//! readable report with suggestions before exiting with status 1.
//!
//! Commands:
//! - `build` - Pack an addon directory into an archive
//! - `preprocess` - Print the preprocessed text of a config
//! - `binarize` - Compile or binarize a single file
//! - `inspect` - List an archive and verify its checksum
//! - `unpack` - Extract an archive
//! - `cat` - Print one archive entry

use addonpack::cli;
use addonpack::core::error::user_friendly_error;
use clap::Parser;

fn main() {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    if let Err(e) = cli.execute() {
        user_friendly_error(e).display();
        std::process::exit(1);
    }
}

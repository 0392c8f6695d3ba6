//! External tool integration.
//!
//! Config compilers, model binarizers and signers are programs configured in
//! the addonpack config as a `program` plus an `args` template. Templates may
//! contain placeholders that are filled per invocation:
//!
//! | placeholder    | value                                   |
//! |----------------|-----------------------------------------|
//! | `{source}`     | file being processed                    |
//! | `{target}`     | file to produce                         |
//! | `{source_dir}` | directory of `{source}`                 |
//! | `{target_dir}` | directory of `{target}`                 |
//! | `{key}`        | private key (signer only)               |
//! | `{archive}`    | archive to sign (signer only)           |
//! | `{signature}`  | signature file to write (signer only)   |
//!
//! The [`Binarizer`] trait hides whether a step is done by an external program
//! or in-process.

pub mod binarizer;
pub mod command;

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use binarizer::{Binarizer, ExternalBinarizer, PassThrough, PreprocessingCompiler};
pub use command::{ToolCommand, ToolOutput};

/// Tool role names, as used in config sections and error messages.
pub mod roles {
    /// Compiles text configs to their binary form
    pub const CONFIG_COMPILER: &str = "config_compiler";
    /// Converts editable models and terrains
    pub const MODEL_BINARIZER: &str = "model_binarizer";
    /// Produces detached archive signatures
    pub const SIGNER: &str = "signer";
}

/// A configured external program.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Program name or path
    pub program: String,
    /// Argument template; empty means the role's default arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl ToolSpec {
    /// Builds the command for one invocation.
    pub fn command(&self, role: &str, placeholders: &Placeholders, default_args: &[&str]) -> ToolCommand {
        let template: Vec<&str> = if self.args.is_empty() {
            default_args.to_vec()
        } else {
            self.args.iter().map(String::as_str).collect()
        };
        ToolCommand::new(role, &self.program).args(template.into_iter().map(|a| placeholders.apply(a)))
    }
}

/// Values substituted into argument templates.
#[derive(Debug, Clone, Default)]
pub struct Placeholders {
    values: Vec<(&'static str, String)>,
}

impl Placeholders {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `{name}` to `path`.
    pub fn path(mut self, name: &'static str, path: &Path) -> Self {
        self.values.push((name, path.display().to_string()));
        self
    }

    /// Sets `{source}`, `{target}`, `{source_dir}` and `{target_dir}`.
    pub fn source_target(self, source: &Path, target: &Path) -> Self {
        let source_dir = source.parent().unwrap_or_else(|| Path::new("."));
        let target_dir = target.parent().unwrap_or_else(|| Path::new("."));
        self.path("source", source)
            .path("target", target)
            .path("source_dir", source_dir)
            .path("target_dir", target_dir)
    }

    /// Replaces every known placeholder in `template`.
    pub fn apply(&self, template: &str) -> String {
        self.values
            .iter()
            .fold(template.to_string(), |text, (name, value)| {
                text.replace(&format!("{{{name}}}"), value)
            })
    }
}

//! Error handling for addonpack
//!
//! Errors come in two layers:
//! 1. [`AddonError`] - strongly-typed failures that callers can match on
//! 2. [`ErrorContext`] - a wrapper that adds a suggestion and details for CLI output
//!
//! # Error Categories
//!
//! Every [`AddonError`] variant belongs to one [`ErrorKind`]:
//! - **Syntax**: malformed directives, unterminated comments or argument lists
//! - **Resolution**: circular or too deeply nested includes, files that cannot be found
//! - **Structural**: unmatched conditionals, macro arity mismatches
//! - **Io**: read, write, copy and remove failures
//! - **ExternalTool**: a configured tool is missing or exited with a non-zero status
//! - **Archive**: failures while writing, reading or signing an archive
//!
//! Preprocessor and resolver operations return `Result<T, AddonError>` directly. The
//! build pipeline and the CLI work with [`anyhow::Error`] and embed `AddonError` values
//! in the chain, so [`user_friendly_error`] can still find them with `downcast_ref`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use addonpack::core::{AddonError, user_friendly_error};
//!
//! let error = AddonError::UnexpectedEndif {
//!     file: "config.cpp".to_string(),
//!     line: 12,
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Category of an [`AddonError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input text
    Syntax,
    /// A file or include could not be located, or include nesting is invalid
    Resolution,
    /// Well-formed input whose structure does not add up
    Structural,
    /// Filesystem failure
    Io,
    /// External tool missing or failed
    ExternalTool,
    /// Archive assembly, reading or signing failure
    Archive,
    /// Invalid configuration or options
    Config,
}

/// Stage of the build pipeline, used to attribute build failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    /// Option validation and the overwrite check
    Prepare,
    /// Temp workspace creation and source copy
    Workspace,
    /// Per-file compilation and binarization
    Binarize,
    /// Header, payload and trailer writing
    Archive,
    /// Detached signature creation
    Sign,
    /// Workspace teardown
    Cleanup,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Prepare => "prepare",
            Self::Workspace => "workspace",
            Self::Binarize => "binarize",
            Self::Archive => "archive",
            Self::Sign => "sign",
            Self::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// Typed failures raised by addonpack.
///
/// Preprocessor variants carry the source file and physical line they were raised
/// at. Paths are stored as display strings so the enum stays cheap to clone.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AddonError {
    /// A file includes itself, directly or through other includes
    ///
    /// `stack` lists every frame from the top-level file to the repeated file.
    #[error("Circular #include of {file}\n  include stack:\n    {}", .stack.join("\n    "))]
    CircularInclude {
        /// File that was about to be entered a second time
        file: String,
        /// Include stack at the point of detection, outermost first
        stack: Vec<String>,
    },

    /// Include nesting exceeded the maximum depth
    #[error("Too many nested includes ({depth}) while entering {file}\n  include stack:\n    {}", .stack.join("\n    "))]
    TooManyIncludes {
        /// File that would exceed the limit
        file: String,
        /// Depth that was reached
        depth: usize,
        /// Include stack at the point of detection
        stack: Vec<String>,
    },

    /// An `#include` could not be resolved
    #[error("Failed to find {include} included from {file}:{line}")]
    IncludeNotFound {
        /// Path as written in the directive
        include: String,
        /// Requesting file
        file: String,
        /// Line of the directive
        line: usize,
    },

    /// A directive name that the preprocessor does not know
    #[error("Unknown preprocessor directive \"{directive}\" in {file}:{line}")]
    UnknownDirective {
        /// Directive name without the leading `#`
        directive: String,
        /// Source file
        file: String,
        /// Line of the directive
        line: usize,
    },

    /// A known directive with arguments that cannot be parsed
    #[error("Failed to parse #{directive} in {file}:{line}: {reason}")]
    MalformedDirective {
        /// Directive name
        directive: String,
        /// What was wrong with it
        reason: String,
        /// Source file
        file: String,
        /// Line of the directive
        line: usize,
    },

    /// A block comment still open at end of file
    #[error("Unterminated block comment in {file}, opened at line {line}")]
    UnterminatedComment {
        /// Source file
        file: String,
        /// Line the comment was opened on
        line: usize,
    },

    /// A macro invocation whose argument list never closes
    #[error("Incomplete argument list for macro \"{name}\" in {file}:{line}")]
    UnterminatedArguments {
        /// Macro name
        name: String,
        /// Source file
        file: String,
        /// Line of the invocation
        line: usize,
    },

    /// `#else` or `#endif` without an open `#ifdef`/`#ifndef`
    #[error("Unexpected #endif in {file}:{line}")]
    UnexpectedEndif {
        /// Source file
        file: String,
        /// Line of the directive
        line: usize,
    },

    /// End of file reached with conditional blocks still open
    #[error("Unterminated conditional block in {file}: {depth} #ifdef/#ifndef without #endif")]
    UnterminatedConditional {
        /// Source file
        file: String,
        /// Number of frames still open
        depth: usize,
    },

    /// Macro invoked with the wrong number of arguments
    #[error("Macro \"{name}\" expects {expected} arguments, {given} given ({file}:{line})")]
    ArgumentCountMismatch {
        /// Macro name
        name: String,
        /// Declared parameter count
        expected: usize,
        /// Arguments supplied at the call site
        given: usize,
        /// Source file
        file: String,
        /// Line of the invocation
        line: usize,
    },

    /// A `#define` body that violates stringizing or concatenation rules
    #[error("Invalid definition of macro \"{name}\" in {file}:{line}: {reason}")]
    InvalidMacro {
        /// Macro name
        name: String,
        /// What was wrong with the body
        reason: String,
        /// Source file
        file: String,
        /// Line of the definition
        line: usize,
    },

    /// Macro expansion kept changing the text past the pass limit
    #[error("Macro expansion does not terminate in {file}:{line}")]
    MacroRecursion {
        /// Source file
        file: String,
        /// Line being expanded
        line: usize,
    },

    /// A referenced file could not be located
    #[error("File not found: {path}")]
    FileNotFound {
        /// Reference as requested
        path: String,
    },

    /// The build target already exists and overwriting was not requested
    #[error("Target {path} already exists, use --force to overwrite")]
    TargetExists {
        /// Archive path
        path: String,
    },

    /// A build stage failed; the underlying error is next in the chain
    #[error("Build failed at stage '{stage}' for {target}")]
    BuildStage {
        /// Stage that failed
        stage: BuildStage,
        /// Archive being built
        target: String,
    },

    /// A configured external program could not be found
    #[error("External tool '{tool}' not found: {program}")]
    ExternalToolMissing {
        /// Logical tool name (config_compiler, model_binarizer, signer)
        tool: String,
        /// Program that was looked up
        program: String,
    },

    /// An external program exited unsuccessfully
    #[error("External tool '{tool}' failed on {path} (exit code {code:?})")]
    ExternalToolFailed {
        /// Logical tool name
        tool: String,
        /// File that was being processed
        path: String,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Captured stderr/stdout, empty when output was not captured
        output: String,
    },

    /// Archive bytes that do not follow the expected layout
    #[error("Invalid archive {path}: {reason}")]
    InvalidArchive {
        /// Archive path
        path: String,
        /// What was wrong
        reason: String,
    },

    /// Stored checksum does not match the archive contents
    #[error("Checksum mismatch in {path}: stored {stored}, computed {computed}")]
    ChecksumMismatch {
        /// Archive path
        path: String,
        /// Hex digest found in the trailer
        stored: String,
        /// Hex digest recomputed from the contents
        computed: String,
    },

    /// Archive entry lookup failed
    #[error("Archive {path} has no entry named {name}")]
    EntryNotFound {
        /// Archive path
        path: String,
        /// Requested entry name
        name: String,
    },

    /// Signing key path is not a private key file
    #[error("Invalid signing key {path}: expected a .biprivatekey file")]
    InvalidKey {
        /// Key path
        path: String,
    },

    /// Invalid options or configuration
    #[error("Invalid configuration: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// Filesystem failure
    #[error("Failed to {operation} {path}: {message}")]
    Io {
        /// Operation being performed
        operation: String,
        /// Path involved
        path: String,
        /// Underlying I/O error text
        message: String,
    },

    /// Removal attempted outside the process temp root
    #[error("Refusing to remove {path}: not inside temp root {root}")]
    OutsideTempRoot {
        /// Path whose removal was requested
        path: String,
        /// Temp root of this process
        root: String,
    },
}

impl AddonError {
    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedDirective { .. }
            | Self::UnterminatedComment { .. }
            | Self::UnterminatedArguments { .. }
            | Self::UnknownDirective { .. }
            | Self::InvalidMacro { .. } => ErrorKind::Syntax,
            Self::CircularInclude { .. }
            | Self::TooManyIncludes { .. }
            | Self::IncludeNotFound { .. }
            | Self::FileNotFound { .. } => ErrorKind::Resolution,
            Self::UnexpectedEndif { .. }
            | Self::UnterminatedConditional { .. }
            | Self::ArgumentCountMismatch { .. }
            | Self::MacroRecursion { .. } => ErrorKind::Structural,
            Self::Io { .. } | Self::OutsideTempRoot { .. } | Self::TargetExists { .. } => {
                ErrorKind::Io
            }
            Self::ExternalToolMissing { .. } | Self::ExternalToolFailed { .. } => {
                ErrorKind::ExternalTool
            }
            Self::BuildStage { .. }
            | Self::InvalidArchive { .. }
            | Self::ChecksumMismatch { .. }
            | Self::EntryNotFound { .. }
            | Self::InvalidKey { .. } => ErrorKind::Archive,
            Self::ConfigError { .. } => ErrorKind::Config,
        }
    }

    /// Wrap an [`std::io::Error`] with the operation and path it happened on.
    pub fn io(operation: &str, path: &std::path::Path, error: &std::io::Error) -> Self {
        Self::Io {
            operation: operation.to_string(),
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }
}

/// An [`AddonError`] plus optional guidance for the user.
///
/// ```rust,no_run
/// use addonpack::core::{AddonError, ErrorContext};
///
/// let context = ErrorContext::new(AddonError::TargetExists { path: "out.pbo".into() })
///     .with_suggestion("Pass --force to overwrite the existing archive");
/// context.display();
/// ```
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// The underlying error
    pub error: AddonError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a context with no suggestion or details.
    #[must_use]
    pub const fn new(error: AddonError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add an actionable suggestion, shown in green.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error, shown in yellow.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details and suggestion to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-facing [`ErrorContext`].
///
/// The chain is searched for the innermost [`AddonError`] that is not a
/// [`AddonError::BuildStage`] wrapper; the stage wrapper, if present, becomes the
/// details line. Errors with no typed cause fall back to a generic context holding
/// the full chain.
///
/// A stage attached with `.context(...)` is not visible through
/// [`anyhow::Error::chain`], so it is looked up on the error itself first.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let mut stage: Option<&AddonError> = error
        .downcast_ref::<AddonError>()
        .filter(|e| matches!(e, AddonError::BuildStage { .. }));
    let mut cause: Option<&AddonError> = None;

    for link in error.chain() {
        if let Some(addon_error) = link.downcast_ref::<AddonError>() {
            match addon_error {
                AddonError::BuildStage { .. } => {
                    if stage.is_none() {
                        stage = Some(addon_error);
                    }
                }
                _ => cause = Some(addon_error),
            }
        }
    }

    if let Some(cause) = cause {
        let mut context = create_error_context(cause);
        if let Some(stage) = stage {
            context = context.with_details(stage.to_string());
        }
        return context;
    }

    if let Some(stage) = stage {
        let root = error.root_cause().to_string();
        return ErrorContext::new(stage.clone()).with_details(root);
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(AddonError::Io {
            operation: "access".to_string(),
            path: "(unknown)".to_string(),
            message: io_error.to_string(),
        })
        .with_suggestion("Check file permissions and try again");
    }

    let message = format!("{error:#}");
    ErrorContext::new(AddonError::ConfigError {
        message: message.clone(),
    })
    .with_details(message)
}

/// Attach a suggestion to a typed error, based on its variant.
pub fn create_error_context(error: &AddonError) -> ErrorContext {
    let context = ErrorContext::new(error.clone());
    match error {
        AddonError::CircularInclude { .. } => {
            context.with_suggestion("Remove the #include that closes the cycle, or guard the header with #ifndef")
        }
        AddonError::TooManyIncludes { .. } => {
            context.with_suggestion("Reduce include nesting or guard headers against repeated inclusion")
        }
        AddonError::IncludeNotFound { include, .. } => {
            let suggestion = if include.starts_with('\\') {
                "Add the directory containing the addon with this prefix as an include root (-i)"
            } else {
                "Relative includes are resolved against the including file's directory"
            };
            context.with_suggestion(suggestion)
        }
        AddonError::ArgumentCountMismatch { .. } => {
            context.with_suggestion("Check the #define for the macro and the invocation's commas and parentheses")
        }
        AddonError::UnexpectedEndif { .. } | AddonError::UnterminatedConditional { .. } => {
            context.with_suggestion("Every #ifdef/#ifndef needs exactly one matching #endif")
        }
        AddonError::TargetExists { .. } => {
            context.with_suggestion("Pass --force to overwrite the existing archive")
        }
        AddonError::ExternalToolMissing { tool, .. } => context.with_suggestion(format!(
            "Install the program or update [tools.{tool}] in your addonpack config"
        )),
        AddonError::ExternalToolFailed { output, .. } if !output.is_empty() => {
            context.with_details(output.trim().to_string())
        }
        AddonError::ExternalToolFailed { .. } => {
            context.with_suggestion("Re-run with --tool-output to see the tool's output")
        }
        AddonError::InvalidKey { .. } => {
            context.with_suggestion("Pass the path to a .biprivatekey file with -k")
        }
        AddonError::ChecksumMismatch { .. } => {
            context.with_details("The archive is corrupt or was modified after packing")
        }
        AddonError::OutsideTempRoot { .. } => {
            context.with_suggestion("Use a dedicated directory for --temp")
        }
        _ => context,
    }
}

//! Macro preprocessor for addon config sources.
//!
//! Implements the C-style subset that addon configs rely on: `#define` with
//! parameters, stringizing (`#x`) and concatenation (`a##b`), `#undef`,
//! `#ifdef`/`#ifndef`/`#else`/`#endif`, and `#include` resolved through the
//! [`Resolver`]. Output is the expanded text plus a [`LineMap`] pointing every
//! emitted line back at its source file and line.
//!
//! All state for one top-level compile lives in a [`CompileContext`] that is
//! passed down the include chain by mutable reference.
//!
//! # Processing order per logical line
//!
//! 1. comments are removed ([`source::CommentStripper`])
//! 2. inside an inactive conditional block only `#ifdef`, `#ifndef`, `#else`
//!    and `#endif` are looked at
//! 3. a line starting with `enum ` is dropped along with every following line
//!    up to the first one containing `;`; the text after that `;` continues
//! 4. directives are dispatched; anything else is expanded and emitted
//!
//! Blank lines are not emitted.
//!
//! # Examples
//!
//! ```rust,no_run
//! use addonpack::preprocess::{CompileContext, preprocess_to_string};
//! use addonpack::resolver::Resolver;
//! use std::path::{Path, PathBuf};
//!
//! # fn example() -> Result<(), addonpack::core::AddonError> {
//! let resolver = Resolver::new(vec![PathBuf::from(".")]);
//! let mut ctx = CompileContext::new(&resolver);
//! let text = preprocess_to_string(Path::new("addons/main/config.cpp"), &mut ctx)?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```

pub mod conditional;
pub mod expand;
pub mod line_map;
pub mod macros;
pub mod source;

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::constants::MAX_INCLUDE_DEPTH;
use crate::core::AddonError;
use crate::resolver::{LookupOptions, Resolver};
use crate::utils::fs::normalize_path;

pub use conditional::ConditionalStack;
pub use expand::{Location, expand};
pub use line_map::{LineMap, LineRecord};
pub use macros::{MacroDefinition, MacroTable, Segment, parse_define};

/// A non-fatal preprocessor finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Warning name, usable with `-w` to mute it
    pub name: &'static str,
    /// Human readable message
    pub message: String,
    /// Source file
    pub file: String,
    /// Physical line
    pub line: usize,
}

/// Files currently being expanded, outermost first.
#[derive(Debug, Clone, Default)]
pub struct IncludeStack {
    frames: Vec<PathBuf>,
}

impl IncludeStack {
    /// Enters `file`, failing on a cycle or when nesting gets too deep.
    pub fn push(&mut self, file: &Path) -> Result<(), AddonError> {
        let display = |frames: &[PathBuf]| {
            frames
                .iter()
                .map(|f| f.display().to_string())
                .chain(std::iter::once(file.display().to_string()))
                .collect::<Vec<_>>()
        };

        if self.frames.iter().any(|f| f == file) {
            return Err(AddonError::CircularInclude {
                file: file.display().to_string(),
                stack: display(&self.frames),
            });
        }
        if self.frames.len() >= MAX_INCLUDE_DEPTH {
            return Err(AddonError::TooManyIncludes {
                file: file.display().to_string(),
                depth: self.frames.len() + 1,
                stack: display(&self.frames),
            });
        }

        self.frames.push(file.to_path_buf());
        Ok(())
    }

    /// Leaves the innermost file.
    pub fn pop(&mut self) -> Option<PathBuf> {
        self.frames.pop()
    }

    /// Frames, outermost first.
    #[must_use]
    pub fn frames(&self) -> &[PathBuf] {
        &self.frames
    }

    /// Current nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// State shared by every file of one top-level compile.
#[derive(Debug)]
pub struct CompileContext<'r> {
    /// Macros defined so far
    pub macros: MacroTable,
    /// Files being expanded
    pub include_stack: IncludeStack,
    /// Origin of every emitted line
    pub line_map: LineMap,
    /// Warnings that were not muted
    pub diagnostics: Vec<Diagnostic>,
    muted: HashSet<String>,
    resolver: &'r Resolver,
}

impl<'r> CompileContext<'r> {
    /// Creates an empty context resolving includes with `resolver`.
    #[must_use]
    pub fn new(resolver: &'r Resolver) -> Self {
        Self {
            macros: MacroTable::new(),
            include_stack: IncludeStack::default(),
            line_map: LineMap::new(),
            diagnostics: Vec::new(),
            muted: HashSet::new(),
            resolver,
        }
    }

    /// Suppresses the named warnings.
    #[must_use]
    pub fn with_muted_warnings<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.muted.extend(names.into_iter().map(Into::into));
        self
    }

    /// Records a warning unless it is muted.
    pub fn warn(&mut self, diagnostic: Diagnostic) {
        if self.muted.contains(diagnostic.name) {
            return;
        }
        warn!(
            target: "preprocess",
            "{}:{}: {} [{}]",
            diagnostic.file,
            diagnostic.line,
            diagnostic.message,
            diagnostic.name
        );
        self.diagnostics.push(diagnostic);
    }

    /// The resolver used for `#include`.
    #[must_use]
    pub fn resolver(&self) -> &'r Resolver {
        self.resolver
    }
}

/// Preprocesses `source`, writing expanded text to `out`.
///
/// Macros defined by `source` and its includes stay in `ctx.macros` afterwards.
pub fn preprocess(
    source: &Path,
    out: &mut dyn Write,
    ctx: &mut CompileContext<'_>,
) -> Result<(), AddonError> {
    let identity = file_identity(source);
    ctx.include_stack.push(&identity)?;
    let result = FileProcessor::new(source, ctx).run(out, ctx);
    ctx.include_stack.pop();
    result
}

/// Preprocesses `source` into a string.
pub fn preprocess_to_string(
    source: &Path,
    ctx: &mut CompileContext<'_>,
) -> Result<String, AddonError> {
    let mut out = Vec::new();
    preprocess(source, &mut out, ctx)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Canonical identity of a file for cycle detection.
fn file_identity(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| normalize_path(path))
}

struct FileProcessor<'p> {
    path: &'p Path,
    name: String,
    file_index: usize,
    conditionals: ConditionalStack,
    in_enum: bool,
}

impl<'p> FileProcessor<'p> {
    fn new(path: &'p Path, ctx: &mut CompileContext<'_>) -> Self {
        let name = path.display().to_string();
        let file_index = ctx.line_map.add_file(&name);
        Self {
            path,
            name,
            file_index,
            conditionals: ConditionalStack::new(),
            in_enum: false,
        }
    }

    fn run(mut self, out: &mut dyn Write, ctx: &mut CompileContext<'_>) -> Result<(), AddonError> {
        debug!(target: "preprocess", "processing {}", self.name);
        let bytes = std::fs::read(self.path).map_err(|e| AddonError::io("read", self.path, &e))?;
        let content = String::from_utf8_lossy(&bytes);

        let mut comments = source::CommentStripper::new();
        for logical in source::logical_lines(&content) {
            let stripped = comments.strip(&logical.text, logical.line);
            self.process_line(stripped.trim_start(), logical.line, out, ctx)?;
        }
        comments.finish(&self.name)?;

        if self.conditionals.depth() > 0 {
            return Err(AddonError::UnterminatedConditional {
                file: self.name.clone(),
                depth: self.conditionals.depth(),
            });
        }
        Ok(())
    }

    fn process_line(
        &mut self,
        text: &str,
        line: usize,
        out: &mut dyn Write,
        ctx: &mut CompileContext<'_>,
    ) -> Result<(), AddonError> {
        if !self.conditionals.is_active() {
            if let Some((directive, _)) = split_directive(text) {
                self.conditional_directive(directive, "", false, line, ctx)?;
            }
            return Ok(());
        }

        let mut text = text;
        if self.in_enum {
            let Some(end) = text.find(';') else {
                return Ok(());
            };
            self.in_enum = false;
            text = text[end + 1..].trim_start();
        } else if text.starts_with("enum ") {
            self.in_enum = true;
            return Ok(());
        }

        if let Some((directive, args)) = split_directive(text) {
            return self.directive(directive, args, line, out, ctx);
        }

        if text.trim().is_empty() {
            return Ok(());
        }

        let location = Location {
            file: self.name.clone(),
            line,
        };
        let expanded = expand(text, &ctx.macros, &location)?;
        writeln!(out, "{expanded}").map_err(|e| AddonError::io("write output of", self.path, &e))?;
        ctx.line_map.push(self.file_index, line);
        Ok(())
    }

    fn directive(
        &mut self,
        directive: &str,
        args: &str,
        line: usize,
        out: &mut dyn Write,
        ctx: &mut CompileContext<'_>,
    ) -> Result<(), AddonError> {
        match directive {
            "include" => self.include(args, line, out, ctx),
            "define" => {
                let mut warnings = Vec::new();
                let definition = parse_define(args, &self.name, line, &mut warnings)?;
                for warning in warnings {
                    ctx.warn(warning);
                }
                let name = definition.name.clone();
                if ctx.macros.define(definition).is_some() {
                    ctx.warn(Diagnostic {
                        name: macros::REDEFINITION,
                        message: format!("Macro \"{name}\" redefinition without #undef"),
                        file: self.name.clone(),
                        line,
                    });
                }
                Ok(())
            }
            "undef" => {
                ctx.macros.undef(args.trim());
                Ok(())
            }
            "ifdef" | "ifndef" | "else" | "endif" => {
                self.conditional_directive(directive, args, true, line, ctx)
            }
            _ => Err(AddonError::UnknownDirective {
                directive: directive.to_string(),
                file: self.name.clone(),
                line,
            }),
        }
    }

    /// Handles conditional directives; anything else is ignored when `active`
    /// is false.
    fn conditional_directive(
        &mut self,
        directive: &str,
        args: &str,
        active: bool,
        line: usize,
        ctx: &CompileContext<'_>,
    ) -> Result<(), AddonError> {
        match directive {
            "ifdef" | "ifndef" => {
                let defined = active && ctx.macros.contains(args.trim());
                let condition = if directive == "ifdef" { defined } else { !defined };
                self.conditionals.open(active && condition);
                Ok(())
            }
            "else" => self.conditionals.flip().map_err(|_| AddonError::MalformedDirective {
                directive: "else".to_string(),
                reason: "#else without an open #ifdef or #ifndef".to_string(),
                file: self.name.clone(),
                line,
            }),
            "endif" => self.conditionals.close().map_err(|_| AddonError::UnexpectedEndif {
                file: self.name.clone(),
                line,
            }),
            _ => Ok(()),
        }
    }

    fn include(
        &mut self,
        args: &str,
        line: usize,
        out: &mut dyn Write,
        ctx: &mut CompileContext<'_>,
    ) -> Result<(), AddonError> {
        let normalized = args.replace(['<', '>'], "\"");
        let reference = normalized
            .split('"')
            .nth(1)
            .filter(|r| normalized.matches('"').count() >= 2 && !r.is_empty())
            .ok_or_else(|| AddonError::MalformedDirective {
                directive: "include".to_string(),
                reason: format!("expected \"path\" or <path>, found '{}'", args.trim()),
                file: self.name.clone(),
                line,
            })?;

        let not_found = || AddonError::IncludeNotFound {
            include: reference.to_string(),
            file: self.name.clone(),
            line,
        };
        let resolved = ctx
            .resolver()
            .find_file(reference, self.path, LookupOptions::include())
            .map_err(|_| not_found())?;
        if !resolved.is_file() {
            return Err(not_found());
        }

        debug!(target: "preprocess", "{}:{} includes {}", self.name, line, resolved.display());
        preprocess(&resolved, out, ctx)
    }
}

/// Splits `#name args` into the directive name and its arguments.
fn split_directive(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix('#')?.trim_start_matches([' ', '\t']);
    let end = rest.find([' ', '\t']).unwrap_or(rest.len());
    let (name, args) = rest.split_at(end);
    Some((name, args.trim_start_matches([' ', '\t'])))
}

//! Builder for running external tools.
//!
//! Every external program (config compiler, model binarizer, signer) is run
//! through [`ToolCommand`] so lookup, logging, output capture and error
//! mapping behave the same for all of them.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use crate::core::AddonError;

/// Fluent builder for one external tool invocation.
///
/// ```rust,no_run
/// use addonpack::tools::ToolCommand;
///
/// # fn example() -> anyhow::Result<()> {
/// let output = ToolCommand::new("config_compiler", "cfgconvert")
///     .args(["-bin", "-dst", "config.bin", "config.cpp"])
///     .current_dir("build")
///     .execute()?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    tool: String,
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    capture_output: bool,
    subject: Option<String>,
}

/// Captured output of a successful run; empty when output was not captured.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl ToolCommand {
    /// Creates a command running `program` for the tool role `tool`.
    pub fn new(tool: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            capture_output: true,
            subject: None,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Runs the tool in `dir`.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Captures output (the default) or lets it through to the terminal.
    pub const fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    /// File the tool works on, used in error messages.
    pub fn subject(mut self, path: &Path) -> Self {
        self.subject = Some(path.display().to_string());
        self
    }

    /// Arguments added so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Runs the tool, failing unless it exits successfully.
    pub fn execute(self) -> Result<ToolOutput> {
        let start = Instant::now();
        let program = which::which(&self.program).map_err(|_| AddonError::ExternalToolMissing {
            tool: self.tool.clone(),
            program: self.program.clone(),
        })?;

        tracing::debug!(
            target: "tools",
            "({}) {} {}",
            self.tool,
            program.display(),
            self.args.join(" ")
        );

        let mut cmd = Command::new(&program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        if self.capture_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let output = cmd
            .output()
            .with_context(|| format!("Failed to run {} ({})", self.tool, program.display()))?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            tracing::debug!(
                target: "tools",
                "({}) exited with {:?}",
                self.tool,
                output.status.code()
            );
            let combined = match (stdout.trim(), stderr.trim()) {
                ("", err) => err.to_string(),
                (out, "") => out.to_string(),
                (out, err) => format!("{out}\n{err}"),
            };
            return Err(AddonError::ExternalToolFailed {
                tool: self.tool,
                path: self.subject.unwrap_or_else(|| self.args.join(" ")),
                code: output.status.code(),
                output: combined,
            }
            .into());
        }

        if !stdout.trim().is_empty() {
            tracing::trace!(target: "tools", "({}) {}", self.tool, stdout.trim());
        }
        if !stderr.trim().is_empty() {
            tracing::trace!(target: "tools", "({}) {}", self.tool, stderr.trim());
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(target: "tools", "({}) took {:.2}s", self.tool, elapsed.as_secs_f64());
        }

        Ok(ToolOutput { stdout, stderr })
    }
}

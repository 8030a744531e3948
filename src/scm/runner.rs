//! External tool invocation.
//!
//! Backends never spawn processes directly; they go through a [Runner] so
//! tests can script tool output with [crate::scm::MockRunner].

use crate::error::{Result, ScmverError};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Variables forwarded from the caller's environment to every tool
const BASE_PASSTHROUGH: &[&str] = &[
    "PATH",
    "HOME",
    "TMPDIR",
    "LC_ALL",
    "LANG",
    "LD_LIBRARY_PATH",
    "SystemRoot",
];

/// An external command-line tool a backend depends on
#[derive(Debug, Clone, Copy)]
pub struct Tool {
    /// Backend name used in messages
    pub name: &'static str,
    /// Executable names tried in order
    pub commands: &'static [&'static str],
    /// Arguments placed before every invocation
    pub prefix: &'static [&'static str],
    /// Extra variables forwarded from the caller's environment
    pub passthrough: &'static [&'static str],
    /// Variables set for every invocation
    pub env: &'static [(&'static str, &'static str)],
}

impl Tool {
    /// Searches `PATH` for the first available executable name
    pub fn locate(&self) -> Result<PathBuf> {
        self.commands
            .iter()
            .find_map(|cmd| which::which(cmd).ok())
            .ok_or_else(|| ScmverError::ToolNotFound(self.commands.join(" or ")))
    }
}

/// Captured result of one tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit status; `None` when killed by a signal
    pub code: Option<i32>,
}

impl ToolOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        ToolOutput {
            stdout: stdout.into(),
            stderr: String::new(),
            code: Some(0),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        ToolOutput {
            stdout: String::new(),
            stderr: stderr.into(),
            code: Some(code),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Returns stdout, or a tool error when the exit status is non-zero
    pub fn checked(self, tool: &Tool) -> Result<String> {
        if self.is_success() {
            Ok(self.stdout)
        } else {
            Err(ScmverError::tool(
                tool.commands.first().copied().unwrap_or(tool.name),
                self.code.unwrap_or(-1),
                self.stderr.trim(),
            ))
        }
    }
}

/// Runs external tools on behalf of backends
pub trait Runner: Send + Sync {
    /// Invokes `tool` with `args` in `cwd`, whatever the exit status
    fn run(&self, tool: &Tool, args: &[&str], cwd: Option<&Path>) -> Result<ToolOutput>;

    /// Invokes `tool` and returns stdout, failing on a non-zero exit status
    fn output(&self, tool: &Tool, args: &[&str], cwd: Option<&Path>) -> Result<String> {
        self.run(tool, args, cwd)?.checked(tool)
    }
}

/// [Runner] spawning real processes with a sanitized environment
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&self, tool: &Tool, args: &[&str], cwd: Option<&Path>) -> Result<ToolOutput> {
        let program = tool.locate()?;
        let mut cmd = Command::new(&program);
        cmd.args(tool.prefix).args(args);

        cmd.env_clear();
        for key in BASE_PASSTHROUGH.iter().chain(tool.passthrough) {
            if let Some(value) = std::env::var_os(key) {
                cmd.env(key, value);
            }
        }
        cmd.env("LC_MESSAGES", "C").env("LANGUAGE", "C");
        for (key, value) in tool.env {
            cmd.env(key, value);
        }
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        debug!(program = %program.display(), ?args, cwd = ?cwd, "running {}", tool.name);
        let output = cmd.output()?;
        let result = ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        };
        debug!(code = ?result.code, "{} finished", tool.name);
        Ok(result)
    }
}

/// One component of a tool version (`2`, `rc`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum VersionPart {
    Number(u64),
    Label(String),
}

impl fmt::Display for VersionPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionPart::Number(n) => write!(f, "{}", n),
            VersionPart::Label(s) => write!(f, "{}", s),
        }
    }
}

/// Version reported by a tool's banner; empty when unknown
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ToolVersion(pub Vec<VersionPart>);

impl ToolVersion {
    pub fn unknown() -> Self {
        ToolVersion(Vec::new())
    }

    pub fn is_unknown(&self) -> bool {
        self.0.is_empty()
    }

    /// Splits a release string such as `6.4rc2` into `(6, 4, "rc", 2)`
    pub fn from_release(release: &str) -> Self {
        let mut parts = Vec::new();
        for piece in release.split('.') {
            let mut rest = piece;
            while !rest.is_empty() {
                let numeric = rest.starts_with(|c: char| c.is_ascii_digit());
                let end = rest
                    .find(|c: char| c.is_ascii_digit() != numeric)
                    .unwrap_or(rest.len());
                let (head, tail) = rest.split_at(end);
                parts.push(match head.parse() {
                    Ok(n) => VersionPart::Number(n),
                    Err(_) => VersionPart::Label(head.to_string()),
                });
                rest = tail;
            }
        }
        ToolVersion(parts)
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

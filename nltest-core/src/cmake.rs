//! Structured CMake command lines.
//!
//! Arguments are kept as individual tokens and only joined when rendered for
//! display, so generator names with spaces never need hand-written quoting.

use std::fmt;
use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

pub const CMAKE: &str = "cmake";

/// One `cmake` process invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CmakeInvocation {
    program: String,
    args: Vec<String>,
}

impl Default for CmakeInvocation {
    fn default() -> Self {
        Self::new()
    }
}

impl CmakeInvocation {
    pub fn new() -> Self {
        Self {
            program: CMAKE.to_string(),
            args: Vec::new(),
        }
    }

    /// `-G <name>` as two tokens.
    pub fn generator(self, name: impl Into<String>) -> Self {
        self.arg("-G").arg(name)
    }

    /// `-A <platform>` as two tokens.
    pub fn arch(self, platform: impl Into<String>) -> Self {
        self.arg("-A").arg(platform)
    }

    pub fn define(self, key: &str, value: impl fmt::Display) -> Self {
        self.arg(format!("-D{key}={value}"))
    }

    pub fn source_dir(self, dir: &Path) -> Self {
        self.arg("-S").arg(dir.display().to_string())
    }

    pub fn build_dir(self, dir: &Path) -> Self {
        self.arg("-B").arg(dir.display().to_string())
    }

    /// Switch to build mode: `--build <dir>`.
    pub fn build(self, dir: &Path) -> Self {
        self.arg("--build").arg(dir.display().to_string())
    }

    pub fn config(self, name: impl Into<String>) -> Self {
        self.arg("--config").arg(name)
    }

    pub fn target(self, name: impl Into<String>) -> Self {
        self.arg("--target").arg(name)
    }

    pub fn arg(mut self, token: impl Into<String>) -> Self {
        self.args.push(token.into());
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// True when some argument token equals `token` exactly.
    pub fn has_arg(&self, token: &str) -> bool {
        self.args.iter().any(|a| a == token)
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Run to completion with inherited stdio; non-zero exit is an error.
    pub fn run(&self) -> Result<()> {
        tracing::info!(command = %self, "running");
        let status = self
            .to_command()
            .status()
            .with_context(|| format!("spawning `{self}`"))?;

        if !status.success() {
            return Err(anyhow!("`{self}` failed with {status}"));
        }
        Ok(())
    }
}

impl fmt::Display for CmakeInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(token: &str) -> String {
    let needs_quotes = token.is_empty() || token.chars().any(|c| c.is_whitespace() || c == '"');
    if !needs_quotes {
        return token.to_string();
    }
    format!("\"{}\"", token.replace('\\', "\\\\").replace('"', "\\\""))
}

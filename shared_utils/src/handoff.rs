//! Handoff to the downstream process.
//!
//! On Unix the bootstrapper replaces its own process image, so the
//! downstream program inherits the PID, the standard streams and the
//! environment, and its exit status is the one the supervisor observes.
//! Elsewhere the program runs as a child and its exit code is returned for
//! the caller to exit with.

use std::fmt;
use std::io;
use std::process::Command;
use tracing::info;

use crate::config::ScraperConfig;

/// Program that takes over once the tunnel phase is finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub program: String,
    pub args: Vec<String>,
}

impl EntryPoint {
    pub fn from_config(config: &ScraperConfig) -> Self {
        EntryPoint {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Transfers control to the entry point.
pub trait ProcessHandoff: Send + Sync {
    /// Returns only if the program could not be started, or, where process
    /// replacement is unavailable, with the child's exit code.
    fn hand_off(&self, entry: &EntryPoint) -> io::Result<i32>;
}

/// Handoff through `execvp`, with a spawn-and-wait fallback off Unix.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecHandoff;

impl ProcessHandoff for ExecHandoff {
    #[cfg(unix)]
    fn hand_off(&self, entry: &EntryPoint) -> io::Result<i32> {
        use std::os::unix::process::CommandExt;

        info!(entry_point = %entry, "Replacing process with entry point");
        Err(entry.command().exec())
    }

    #[cfg(not(unix))]
    fn hand_off(&self, entry: &EntryPoint) -> io::Result<i32> {
        info!(entry_point = %entry, "Running entry point as child process");
        let status = entry.command().status()?;
        Ok(status.code().unwrap_or(1))
    }
}

/// Shell-style status for a program that could not be started.
pub fn start_failure_code(err: &io::Error) -> i32 {
    match err.kind() {
        io::ErrorKind::NotFound => 127,
        _ => 126,
    }
}

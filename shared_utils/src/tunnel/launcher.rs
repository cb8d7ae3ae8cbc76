//! VPN client daemon launch.

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command as TokioCommand;
use tracing::{debug, info};

use crate::config::VpnConfig;

/// Command line used to start the VPN client.
///
/// Holds only paths and flags; credential values live in the auth file, so
/// the command is safe to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpnCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl VpnCommand {
    /// `<binary> --config <profile> --auth-user-pass <auth_file> [extra...] <daemon_flag>`
    pub fn from_config(config: &VpnConfig) -> Self {
        let mut args = vec![
            "--config".to_string(),
            path_arg(&config.profile_path),
            "--auth-user-pass".to_string(),
            path_arg(&config.auth_file),
        ];
        args.extend(config.extra_args.iter().cloned());
        if !config.daemon_flag.is_empty() {
            args.push(config.daemon_flag.clone());
        }

        VpnCommand {
            program: config.binary.clone(),
            args,
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl fmt::Display for VpnCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Exit status of the foreground launch command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchStatus {
    /// Exit code, `None` when the command was killed by a signal
    pub code: Option<i32>,
    /// Terminating signal, Unix only
    pub signal: Option<i32>,
}

impl LaunchStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Status as a shell would report it: the exit code, or `128 + signo`
    /// for a signalled command.
    pub fn exit_code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => 1,
        }
    }
}

impl From<ExitStatus> for LaunchStatus {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        LaunchStatus {
            code: status.code(),
            signal,
        }
    }
}

/// Starts the VPN client.
#[async_trait]
pub trait VpnLauncher: Send + Sync {
    /// Run the launch command and wait for it to return. With a daemon flag
    /// the client detaches and the command returns right away; what the
    /// daemon does afterwards is not observed.
    async fn launch(&self, command: &VpnCommand) -> io::Result<LaunchStatus>;
}

/// Launcher that runs the real command.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

#[async_trait]
impl VpnLauncher for SystemLauncher {
    async fn launch(&self, command: &VpnCommand) -> io::Result<LaunchStatus> {
        info!(command = %command, "Starting VPN client");

        let status = TokioCommand::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .status()
            .await?;

        debug!(status = %status, "VPN launch command returned");
        Ok(LaunchStatus::from(status))
    }
}

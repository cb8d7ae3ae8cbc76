//! Tunnel bootstrap sequence.
//!
//! Runs the phases in a fixed order: read credentials, write the auth file,
//! launch the VPN daemon, wait for the tunnel interface, then hand off to
//! the downstream entry point. Missing credentials are the only condition
//! checked before anything is launched. A tunnel that never appears is
//! reported but does not stop the handoff unless `require_tunnel` is set.

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::{BootstrapConfig, ConfigError};
use crate::credentials::Credentials;
use crate::handoff::{EntryPoint, ExecHandoff, ProcessHandoff, start_failure_code};
use crate::tunnel::{
    InterfaceProbe, ReadinessOutcome, ReadinessPoller, Sleeper, SystemLauncher, SystemProbe,
    TokioSleeper, VpnCommand, VpnLauncher,
};

/// Result type for bootstrap operations.
pub type BootstrapResult<T> = Result<T, BootstrapError>;

/// Errors that end the bootstrap before or instead of the handoff.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Invalid configuration or missing credentials
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Auth file could not be written
    #[error("Failed to write credential file {path}: {source}")]
    CredentialFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// VPN client could not be started at all
    #[error("Failed to start VPN client {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// VPN launch command returned a failure status
    #[error("VPN launch command exited with status {code}")]
    LaunchExit { code: i32 },

    /// Tunnel never appeared and the configuration requires it
    #[error("Tunnel interface {interface} not up after {attempts} attempts")]
    TunnelUnavailable { interface: String, attempts: u32 },

    /// Entry point could not be started
    #[error("Failed to start entry point {program}: {source}")]
    Handoff {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl BootstrapError {
    /// Process exit status this error maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            BootstrapError::Config(_) => 1,
            BootstrapError::CredentialFile { .. } => 1,
            BootstrapError::Launch { source, .. } => start_failure_code(source),
            BootstrapError::LaunchExit { code } => *code,
            BootstrapError::TunnelUnavailable { .. } => 1,
            BootstrapError::Handoff { source, .. } => start_failure_code(source),
        }
    }
}

/// Orchestrates the bootstrap phases over injectable collaborators.
pub struct Bootstrapper<L, P, S, H> {
    config: BootstrapConfig,
    launcher: L,
    probe: P,
    sleeper: S,
    handoff: H,
}

impl Bootstrapper<SystemLauncher, SystemProbe, TokioSleeper, ExecHandoff> {
    /// Bootstrapper wired to the real system.
    pub fn system(config: BootstrapConfig) -> Self {
        Bootstrapper::new(config, SystemLauncher, SystemProbe, TokioSleeper, ExecHandoff)
    }
}

impl<L, P, S, H> Bootstrapper<L, P, S, H>
where
    L: VpnLauncher,
    P: InterfaceProbe,
    S: Sleeper,
    H: ProcessHandoff,
{
    pub fn new(config: BootstrapConfig, launcher: L, probe: P, sleeper: S, handoff: H) -> Self {
        Bootstrapper {
            config,
            launcher,
            probe,
            sleeper,
            handoff,
        }
    }

    /// Full sequence using `lookup` for environment values.
    ///
    /// On Unix a successful handoff never returns.
    pub async fn run_with<F>(&self, lookup: F) -> BootstrapResult<i32>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.prepare(lookup).await?;
        self.hand_off()
    }

    /// Every phase up to, but not including, the handoff.
    pub async fn prepare<F>(&self, lookup: F) -> BootstrapResult<ReadinessOutcome>
    where
        F: Fn(&str) -> Option<String>,
    {
        let run_id = uuid::Uuid::new_v4();
        let span = info_span!("bootstrap", run_id = %run_id);

        async {
            let credentials = Credentials::from_lookup(&lookup)?;

            let auth_file = &self.config.vpn.auth_file;
            credentials
                .write_auth_file(auth_file)
                .map_err(|source| BootstrapError::CredentialFile {
                    path: auth_file.clone(),
                    source,
                })?;
            info!(path = %auth_file.display(), "Credential file written");

            self.launch_vpn().await?;

            let outcome = self.wait_for_tunnel().await?;

            self.report_missing_env(&lookup);

            Ok::<_, BootstrapError>(outcome)
        }
        .instrument(span)
        .await
    }

    /// Hand control to the entry point. Called exactly once per run.
    ///
    /// Errors are returned, not logged; the caller reports them once.
    pub fn hand_off(&self) -> BootstrapResult<i32> {
        let entry = EntryPoint::from_config(&self.config.scraper);
        info!(entry_point = %entry, "Handing off to entry point");

        self.handoff
            .hand_off(&entry)
            .map_err(|source| BootstrapError::Handoff {
                program: entry.program.clone(),
                source,
            })
    }

    async fn launch_vpn(&self) -> BootstrapResult<()> {
        let command = VpnCommand::from_config(&self.config.vpn);

        let status = self
            .launcher
            .launch(&command)
            .await
            .map_err(|source| BootstrapError::Launch {
                program: command.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(BootstrapError::LaunchExit {
                code: status.exit_code(),
            });
        }

        debug!("VPN client detached");
        Ok(())
    }

    async fn wait_for_tunnel(&self) -> BootstrapResult<ReadinessOutcome> {
        let poller = ReadinessPoller::from_config(&self.config.readiness);
        let outcome = poller.wait(&self.probe, &self.sleeper).await;

        match outcome {
            ReadinessOutcome::Ready { attempt } => {
                info!(interface = poller.interface(), attempt, "Tunnel ready");
            }
            ReadinessOutcome::TimedOut { attempts } if self.config.readiness.require_tunnel => {
                return Err(BootstrapError::TunnelUnavailable {
                    interface: poller.interface().to_string(),
                    attempts,
                });
            }
            ReadinessOutcome::TimedOut { attempts } => {
                warn!(
                    interface = poller.interface(),
                    attempts, "Continuing without a confirmed tunnel"
                );
            }
        }

        Ok(outcome)
    }

    fn report_missing_env<F>(&self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing: Vec<&str> = self
            .config
            .scraper
            .required_env
            .iter()
            .map(String::as_str)
            .filter(|key| lookup(*key).is_none_or(|value| value.is_empty()))
            .collect();

        if !missing.is_empty() {
            warn!(variables = ?missing, "Entry point environment is incomplete");
        }
    }
}

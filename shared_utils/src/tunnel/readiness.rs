//! Bounded polling for the tunnel interface.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ReadinessConfig;

/// Checks whether a network interface currently exists.
#[async_trait]
pub trait InterfaceProbe: Send + Sync {
    async fn interface_exists(&self, name: &str) -> bool;
}

/// Pauses between probes. Injected so tests do not wait on the wall clock.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Probe backed by the kernel's interface name table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

#[async_trait]
impl InterfaceProbe for SystemProbe {
    async fn interface_exists(&self, name: &str) -> bool {
        lookup_interface(name)
    }
}

#[cfg(unix)]
fn lookup_interface(name: &str) -> bool {
    match nix::net::if_::if_nametoindex(name) {
        Ok(index) => {
            debug!(interface = name, index, "Interface present");
            true
        }
        Err(errno) => {
            debug!(interface = name, error = %errno, "Interface absent");
            false
        }
    }
}

#[cfg(not(unix))]
fn lookup_interface(name: &str) -> bool {
    warn!(interface = name, "Interface lookup is not supported on this platform");
    false
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// State of the readiness loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    /// Probing; holds the number of the next attempt (1-based)
    Polling { attempt: u32 },
    /// Finished, either because the interface appeared or attempts ran out
    Done(ReadinessOutcome),
}

/// How the readiness loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessOutcome {
    /// Interface detected on the given attempt
    Ready { attempt: u32 },
    /// Interface never appeared within the attempt ceiling
    TimedOut { attempts: u32 },
}

/// Polls for an interface at a fixed interval up to a fixed attempt count.
///
/// Each attempt probes first and sleeps only if the interface is absent and
/// another attempt remains, so a run makes at most `max_attempts` probes and
/// `max_attempts - 1` pauses. Exhausting the attempts is not an error: the
/// caller decides what a timeout means.
#[derive(Debug, Clone)]
pub struct ReadinessPoller {
    interface: String,
    max_attempts: u32,
    interval: Duration,
}

impl ReadinessPoller {
    pub fn new(interface: impl Into<String>, max_attempts: u32, interval: Duration) -> Self {
        ReadinessPoller {
            interface: interface.into(),
            max_attempts,
            interval,
        }
    }

    pub fn from_config(config: &ReadinessConfig) -> Self {
        Self::new(
            config.interface.clone(),
            config.max_attempts,
            config.interval(),
        )
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Run the loop to completion.
    pub async fn wait<P, S>(&self, probe: &P, sleeper: &S) -> ReadinessOutcome
    where
        P: InterfaceProbe + ?Sized,
        S: Sleeper + ?Sized,
    {
        let mut state = self.initial_state();

        loop {
            match state {
                ReadinessState::Polling { attempt } => {
                    state = self.step(attempt, probe, sleeper).await;
                }
                ReadinessState::Done(outcome) => return outcome,
            }
        }
    }

    fn initial_state(&self) -> ReadinessState {
        if self.max_attempts == 0 {
            ReadinessState::Done(ReadinessOutcome::TimedOut { attempts: 0 })
        } else {
            ReadinessState::Polling { attempt: 1 }
        }
    }

    async fn step<P, S>(&self, attempt: u32, probe: &P, sleeper: &S) -> ReadinessState
    where
        P: InterfaceProbe + ?Sized,
        S: Sleeper + ?Sized,
    {
        if probe.interface_exists(&self.interface).await {
            info!(interface = %self.interface, attempt, "Tunnel interface is up");
            return ReadinessState::Done(ReadinessOutcome::Ready { attempt });
        }

        if attempt >= self.max_attempts {
            warn!(
                interface = %self.interface,
                attempts = attempt,
                "Tunnel interface did not appear"
            );
            return ReadinessState::Done(ReadinessOutcome::TimedOut { attempts: attempt });
        }

        debug!(
            interface = %self.interface,
            attempt,
            max_attempts = self.max_attempts,
            "Waiting for tunnel interface"
        );
        sleeper.sleep(self.interval).await;
        ReadinessState::Polling {
            attempt: attempt + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Reports the interface as present from the given probe number onward.
    struct AppearsAt {
        at: Option<u32>,
        probes: AtomicU32,
    }

    impl AppearsAt {
        fn new(at: Option<u32>) -> Self {
            AppearsAt {
                at,
                probes: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl InterfaceProbe for AppearsAt {
        async fn interface_exists(&self, _name: &str) -> bool {
            let n = self.probes.fetch_add(1, Ordering::SeqCst) + 1;
            self.at.is_some_and(|at| n >= at)
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        pauses: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.pauses.lock().unwrap().push(duration);
        }
    }

    fn poller() -> ReadinessPoller {
        ReadinessPoller::new("tun0", 25, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_ready_on_first_probe() {
        let probe = AppearsAt::new(Some(1));
        let sleeper = RecordingSleeper::default();

        let outcome = poller().wait(&probe, &sleeper).await;

        assert_eq!(outcome, ReadinessOutcome::Ready { attempt: 1 });
        assert_eq!(probe.probes.load(Ordering::SeqCst), 1);
        assert!(sleeper.pauses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stops_at_attempt_k() {
        for k in [2u32, 7, 25] {
            let probe = AppearsAt::new(Some(k));
            let sleeper = RecordingSleeper::default();

            let outcome = poller().wait(&probe, &sleeper).await;

            assert_eq!(outcome, ReadinessOutcome::Ready { attempt: k });
            assert_eq!(probe.probes.load(Ordering::SeqCst), k);
            assert_eq!(sleeper.pauses.lock().unwrap().len(), (k - 1) as usize);
        }
    }

    #[tokio::test]
    async fn test_times_out_after_ceiling() {
        let probe = AppearsAt::new(None);
        let sleeper = RecordingSleeper::default();

        let outcome = poller().wait(&probe, &sleeper).await;

        assert_eq!(outcome, ReadinessOutcome::TimedOut { attempts: 25 });
        assert_eq!(probe.probes.load(Ordering::SeqCst), 25);

        let pauses = sleeper.pauses.lock().unwrap();
        assert_eq!(pauses.len(), 24);
        assert!(pauses.iter().all(|d| *d == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_late_interface_is_missed() {
        let probe = AppearsAt::new(Some(26));
        let sleeper = RecordingSleeper::default();

        let outcome = poller().wait(&probe, &sleeper).await;

        assert_eq!(outcome, ReadinessOutcome::TimedOut { attempts: 25 });
        assert_eq!(probe.probes.load(Ordering::SeqCst), 25);
    }

    #[tokio::test]
    async fn test_zero_attempts_never_probes() {
        let probe = AppearsAt::new(Some(1));
        let sleeper = RecordingSleeper::default();

        let outcome = ReadinessPoller::new("tun0", 0, Duration::from_secs(1))
            .wait(&probe, &sleeper)
            .await;

        assert_eq!(outcome, ReadinessOutcome::TimedOut { attempts: 0 });
        assert_eq!(probe.probes.load(Ordering::SeqCst), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_probe_loopback() {
        let name = if cfg!(target_os = "linux") { "lo" } else { "lo0" };
        assert!(SystemProbe.interface_exists(name).await);
        assert!(!SystemProbe.interface_exists("nosuchtun99").await);
    }
}

//! Tunnel launch and readiness abstractions.
//!
//! The VPN client is started as an external daemon; its tunnel is only
//! ever observed from the outside, by probing for the network interface it
//! creates.

mod launcher;
mod readiness;

pub use launcher::{LaunchStatus, SystemLauncher, VpnCommand, VpnLauncher};
pub use readiness::{
    InterfaceProbe, ReadinessOutcome, ReadinessPoller, ReadinessState, Sleeper, SystemProbe,
    TokioSleeper,
};

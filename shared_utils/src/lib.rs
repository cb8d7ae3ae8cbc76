//! Shared utilities for the VPN tunnel bootstrapper.
//!
//! This crate provides the pieces the `bootstrapper` binary wires together:
//! configuration loading, credential handling, VPN daemon launch, tunnel
//! readiness polling and the final handoff to the downstream process.

pub mod bootstrap;
pub mod config;
pub mod credentials;
pub mod handoff;
pub mod logging;
pub mod tunnel;

// Re-export commonly used items for convenience
pub use bootstrap::{BootstrapError, BootstrapResult, Bootstrapper};
pub use config::{BootstrapConfig, ConfigError};
pub use credentials::Credentials;

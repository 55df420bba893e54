//! Typed domain errors with distinguishable process exit codes.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`. All variants
//! implement `thiserror::Error` and convert to `anyhow::Error` via `?`;
//! `main` downcasts back to pick the exit code, so scripting callers can
//! branch on the failure kind.

use thiserror::Error;

/// Fatal failure kinds surfaced by the core.
///
/// Codes 13, 15, and 17 are load-bearing for existing scripts; the rest
/// fill out the taxonomy with distinct values.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("Context '{0}' is not in the instance cache. Run 'fleet create' or use --no-cache.")]
    UnknownContext(String),

    #[error("{0}")]
    MissingRequiredInput(String),

    #[error("No running instances in context '{0}'")]
    NoReachableInstances(String),

    #[error("At least one public address is '0'. Make sure the instance is running")]
    InstanceNotReady,

    #[error("No cached user for this instance. Please provide a user (--user)")]
    MissingCredential,

    #[error("Instance '{dns}' still unreachable after {attempts} attempts")]
    UnreachableAfterRetries { dns: String, attempts: u32 },

    #[error("Context name 'all' is reserved. Choose another name")]
    ReservedName,

    #[error("Unrecognized region '{0}'")]
    UnknownRegionAlias(String),
}

impl FleetError {
    /// Process exit code for this failure kind.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnknownContext(_) => 12,
            Self::MissingRequiredInput(_) => 13,
            Self::NoReachableInstances(_) | Self::InstanceNotReady => 14,
            Self::MissingCredential => 15,
            Self::UnreachableAfterRetries { .. } => 16,
            Self::ReservedName => 17,
            Self::UnknownRegionAlias(_) => 18,
        }
    }
}

//! Pure domain types: instance records, regions, defaults, typed errors.
//!
//! This module imports nothing from `crate::infra`, `crate::commands`, or
//! `crate::application` and performs no I/O.

pub mod config;
pub mod error;
pub mod instance;
pub mod region;

pub use error::FleetError;
pub use instance::{InstanceRecord, LifecycleState, SENTINEL_ADDR};

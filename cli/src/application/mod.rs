//! Application layer: port traits and the services that drive them.
//!
//! Modules here import only from `crate::domain` and `crate::application`
//! — never from `crate::infra`, `crate::commands`, or `crate::output`.

pub mod batch;
pub mod ports;
pub mod probe;
pub mod remote;
pub mod resolver;

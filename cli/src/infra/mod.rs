//! Infrastructure adapters: the production implementations of the
//! application-layer ports.

pub mod cache;
pub mod command_runner;
pub mod config;
pub mod confirm;
pub mod directory;

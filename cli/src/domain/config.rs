//! Operator defaults, selected by profile.
//!
//! Loaded once by the CLI layer (see `infra::config`) and threaded by
//! reference into command handlers — core logic never reads ambient
//! process state.

use serde::{Deserialize, Serialize};

/// Per-profile defaults from `~/.fleet/config.yaml`.
///
/// Every field is a fallback of last resort: explicit command-line values
/// win, then instance-cached credentials, then these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    /// Region alias or canonical id.
    #[serde(default)]
    pub region: Option<String>,
    /// Remote-access user.
    #[serde(default)]
    pub user: String,
    /// Path to the remote-access private key.
    #[serde(default)]
    pub key: String,
}

/// Profile name used when `--profile` is not given.
pub const DEFAULT_PROFILE: &str = "default";

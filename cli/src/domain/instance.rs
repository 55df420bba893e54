//! Instance records: the value type describing one compute instance.
//!
//! Serde field names are the cache-file schema and must stay stable — the
//! cache file is read back by every later invocation.

use serde::{Deserialize, Serialize};

/// Address value meaning "not currently known" (instance pending, stopped,
/// or mid-termination). Consumers must treat it as "not remotely reachable".
pub const SENTINEL_ADDR: &str = "0";

/// Provider-defined instance lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    Pending,
    Running,
    Stopping,
    Stopped,
    ShuttingDown,
    Terminated,
}

impl LifecycleState {
    /// Parse the provider's state string (`"shutting-down"` etc.).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "stopping" => Some(Self::Stopping),
            "stopped" => Some(Self::Stopped),
            "shutting-down" => Some(Self::ShuttingDown),
            "terminated" => Some(Self::Terminated),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::ShuttingDown => "shutting-down",
            Self::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compute instance: identity, addresses, placement, observed state,
/// and cached remote-access credentials.
///
/// Empty `access_user`/`access_key_path` mean "unset, fall back to a
/// caller-supplied override or the profile default".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub instance_type: String,
    pub placement: String,
    #[serde(rename = "pr_ip")]
    pub private_address: String,
    #[serde(rename = "pub_ip")]
    pub public_address: String,
    #[serde(rename = "dns")]
    pub dns_name: String,
    #[serde(rename = "last_observed_state")]
    pub lifecycle_state: LifecycleState,
    #[serde(rename = "user", default)]
    pub access_user: String,
    #[serde(rename = "key", default)]
    pub access_key_path: String,
}

impl InstanceRecord {
    /// Build a record from freshly observed provider state, enforcing the
    /// address invariant: public address and DNS name are meaningful only
    /// while the instance is running, and the private address only while it
    /// is not terminated. Any other state forces the sentinel.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_observed(
        id: String,
        instance_type: String,
        placement: String,
        private_address: Option<String>,
        public_address: Option<String>,
        dns_name: Option<String>,
        lifecycle_state: LifecycleState,
    ) -> Self {
        let sentinel = || SENTINEL_ADDR.to_string();
        let private_address = if lifecycle_state == LifecycleState::Terminated {
            sentinel()
        } else {
            private_address.unwrap_or_else(sentinel)
        };
        let (public_address, dns_name) = if lifecycle_state == LifecycleState::Running {
            (
                public_address.unwrap_or_else(sentinel),
                dns_name.unwrap_or_else(sentinel),
            )
        } else {
            (sentinel(), sentinel())
        };
        Self {
            id,
            instance_type,
            placement,
            private_address,
            public_address,
            dns_name,
            lifecycle_state,
            access_user: String::new(),
            access_key_path: String::new(),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lifecycle_state == LifecycleState::Running
    }

    /// True when the instance has a concrete public address and DNS name.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.public_address != SENTINEL_ADDR && self.dns_name != SENTINEL_ADDR
    }

    /// Reset the remotely-reachable addresses to the sentinel, e.g. after a
    /// stop request has been issued.
    pub fn clear_public_addresses(&mut self) {
        self.public_address = SENTINEL_ADDR.to_string();
        self.dns_name = SENTINEL_ADDR.to_string();
    }
}

/// Sort a list ascending by instance id. Index `i` into a context is only
/// stable because every load/query path applies this sort first.
pub fn sort_by_id(instances: &mut [InstanceRecord]) {
    instances.sort_by(|a, b| a.id.cmp(&b.id));
}

//! Port trait definitions for the application layer.
//!
//! Ports are the contracts infrastructure must fulfill. Production
//! implementations live in `crate::infra`; tests substitute hand-rolled
//! stubs.

use std::collections::BTreeMap;
use std::process::{ExitStatus, Output};
use std::time::Duration;

use anyhow::Result;

use crate::domain::InstanceRecord;

/// In-memory form of the instance cache: context name → ordered record list.
pub type CacheMap = BTreeMap<String, Vec<InstanceRecord>>;

/// Parameters for launching new instances.
///
/// When `template` is set it overrides every other field and is handed to
/// the provider verbatim (the `--json` launch path).
#[derive(Debug, Clone, Default)]
pub struct LaunchSpec {
    /// Machine image id. Required unless `template` is set.
    pub image: Option<String>,
    /// Instance type/shape, e.g. `t2.micro`.
    pub instance_type: String,
    /// Number of instances to launch.
    pub count: u32,
    /// Provider key-pair name for the new instances.
    pub key_pair: Option<String>,
    /// Context name, applied as the `Name` tag.
    pub context: String,
    /// Availability zone constraint.
    pub availability_zone: Option<String>,
    /// Placement group constraint.
    pub placement_group: Option<String>,
    /// Request spot capacity (one-time, terminate on interruption).
    pub spot: bool,
    /// Security groups to attach.
    pub security_groups: Vec<String>,
    /// Enable EBS optimization.
    pub ebs_optimized: bool,
    /// Raw launch template, overriding all of the above.
    pub template: Option<serde_json::Value>,
}

/// The cloud provider's instance-description and lifecycle API.
///
/// Lifecycle calls accept a batch of ids and are fire-and-forget: no
/// synchronous wait for the state transition. Describe calls must tolerate
/// transient missing address fields (an instance mid-termination has no
/// private address) by substituting sentinels, never erroring.
#[allow(async_fn_in_trait)]
pub trait FleetDirectory {
    /// All instances tagged `Name == ctx` in states
    /// pending|running|stopping|stopped, sorted ascending by id.
    async fn describe_context(&self, ctx: &str) -> Result<Vec<InstanceRecord>>;

    /// Live state for an explicit id set, sorted ascending by id.
    async fn describe_ids(&self, ids: &[String]) -> Result<Vec<InstanceRecord>>;

    /// Distinct context names present on live (non-terminated) instances.
    async fn list_context_names(&self) -> Result<Vec<String>>;

    /// Launch instances; returns the new instance ids.
    async fn create(&self, spec: &LaunchSpec) -> Result<Vec<String>>;

    async fn terminate(&self, ids: &[String]) -> Result<()>;
    async fn start(&self, ids: &[String]) -> Result<()>;
    async fn stop(&self, ids: &[String]) -> Result<()>;
    async fn reboot(&self, ids: &[String]) -> Result<()>;
}

/// Persisted instance cache.
pub trait InstanceCache {
    /// Load the whole mapping. A missing backing file is an empty map.
    fn load(&self) -> Result<CacheMap>;

    /// Write the whole mapping back, atomically. Each context list is
    /// sorted by id before writing.
    fn save(&self, contexts: &CacheMap) -> Result<()>;
}

/// External process execution.
///
/// `run` captures output under a timeout with a guaranteed kill; the
/// status/spawn variants inherit stdio for interactive remote sessions and
/// parallel fan-out, with no timeout.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run with captured output and the given timeout. The child is killed
    /// if the timeout fires.
    async fn run(&self, program: &str, args: &[&str], timeout: Duration) -> Result<Output>;

    /// Run with inherited stdio, blocking until exit.
    async fn run_status(&self, program: &str, args: &[&str]) -> Result<ExitStatus>;

    /// Spawn with inherited stdio and return the child handle. The caller
    /// owns the child lifetime; `kill_on_drop` is set as a safety net.
    ///
    /// # Errors
    ///
    /// Returns an error if the process fails to spawn.
    fn spawn_status(&self, program: &str, args: &[&str]) -> Result<tokio::process::Child>;
}

/// Confirmation gate for destructive actions.
///
/// Blocks on one line of operator input with no timeout; only an exact
/// match against `required_phrase` confirms.
pub trait ConfirmationGate {
    /// Present `prompt` and return whether the operator typed
    /// `required_phrase` exactly.
    ///
    /// # Errors
    ///
    /// Returns an error if input cannot be read.
    fn confirm(&self, prompt: &str, required_phrase: &str) -> Result<bool>;
}

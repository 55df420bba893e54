//! Reachability probing: poll an instance over ssh until it accepts a
//! trivial command.
//!
//! Only invoked when the caller opts into `--wait`; by default remote
//! operations assume reachability and surface the transport's own error.

use std::time::Duration;

use anyhow::Result;

use crate::application::ports::CommandRunner;
use crate::application::remote::RemoteAccess;
use crate::domain::{FleetError, InstanceRecord};

/// Retry budget and pacing for reachability probes.
#[derive(Debug, Clone, Copy)]
pub struct ProbeSettings {
    /// Per-attempt budget, applied both as the ssh `ConnectTimeout` and as
    /// the hard kill timeout on the probe process.
    pub attempt_timeout: Duration,
    /// Sleep between attempts.
    pub backoff: Duration,
    /// Consecutive failures tolerated before giving up.
    pub max_attempts: u32,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(5),
            backoff: Duration::from_secs(3),
            max_attempts: 20,
        }
    }
}

/// Block until `inst` accepts a trivial ssh command.
///
/// A non-zero exit, spawn failure, or timeout all count as a failed
/// attempt. Every 3rd consecutive failure prints a still-retrying notice.
///
/// # Errors
///
/// Returns [`FleetError::UnreachableAfterRetries`] once the attempt budget
/// is exhausted; this aborts the whole batch, not just this instance.
pub async fn wait_until_reachable(
    runner: &impl CommandRunner,
    access: &RemoteAccess,
    inst: &InstanceRecord,
    settings: &ProbeSettings,
) -> Result<()> {
    let argv = access.probe_argv(inst, settings.attempt_timeout.as_secs());
    let args: Vec<&str> = argv[1..].iter().map(String::as_str).collect();

    for attempt in 1..=settings.max_attempts {
        match runner.run(&argv[0], &args, settings.attempt_timeout).await {
            Ok(output) if output.status.success() => return Ok(()),
            Ok(_) | Err(_) => {}
        }
        if attempt % 3 == 0 {
            eprintln!(
                "Still waiting for {} ({attempt}/{} attempts)",
                inst.dns_name, settings.max_attempts
            );
        }
        if attempt < settings.max_attempts {
            tokio::time::sleep(settings.backoff).await;
        }
    }

    Err(FleetError::UnreachableAfterRetries {
        dns: inst.dns_name.clone(),
        attempts: settings.max_attempts,
    }
    .into())
}

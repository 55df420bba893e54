//! Batch execution: fan one remote command out across an instance list.
//!
//! Sequential mode runs each child to completion before starting the next;
//! parallel mode launches one child per instance (no bounded pool — a
//! deliberate simplicity trade-off for small fleets) and joins them all
//! before returning. Launch order always follows the resolved list order.

use anyhow::{Context, Result};

use crate::application::ports::CommandRunner;
use crate::domain::InstanceRecord;

/// Sequential vs process-level fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyMode {
    Sequential,
    Parallel,
}

/// One child's result. `exit_code` is `None` when the child was killed by
/// a signal.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub instance_id: String,
    pub exit_code: Option<i32>,
}

impl BatchOutcome {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Per-instance completion results, in launch order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchReport {
    pub fn failures(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(BatchOutcome::succeeded)
    }
}

/// Run `build_argv(inst)` for every instance under `mode`.
///
/// Children inherit stdio; their output interleaves on the operator's
/// terminal exactly as the underlying tools print it. Individual exit codes
/// are collected into the report rather than aborting the batch.
///
/// # Errors
///
/// Returns an error only when a child fails to spawn or cannot be awaited.
pub async fn execute<R, F>(
    runner: &R,
    instances: &[InstanceRecord],
    mode: ConcurrencyMode,
    build_argv: F,
) -> Result<BatchReport>
where
    R: CommandRunner,
    F: Fn(&InstanceRecord) -> Vec<String>,
{
    let mut report = BatchReport::default();
    match mode {
        ConcurrencyMode::Sequential => {
            for inst in instances {
                let argv = build_argv(inst);
                let args: Vec<&str> = argv[1..].iter().map(String::as_str).collect();
                let status = runner
                    .run_status(&argv[0], &args)
                    .await
                    .with_context(|| format!("running {} against {}", argv[0], inst.id))?;
                report.outcomes.push(BatchOutcome {
                    instance_id: inst.id.clone(),
                    exit_code: status.code(),
                });
            }
        }
        ConcurrencyMode::Parallel => {
            let mut children = Vec::with_capacity(instances.len());
            for inst in instances {
                let argv = build_argv(inst);
                let args: Vec<&str> = argv[1..].iter().map(String::as_str).collect();
                let child = runner
                    .spawn_status(&argv[0], &args)
                    .with_context(|| format!("spawning {} against {}", argv[0], inst.id))?;
                children.push((inst.id.clone(), child));
            }
            // Wait-all barrier: completion order is unspecified, join order
            // follows launch order.
            for (instance_id, mut child) in children {
                let status = child
                    .wait()
                    .await
                    .with_context(|| format!("waiting on child for {instance_id}"))?;
                report.outcomes.push(BatchOutcome {
                    instance_id,
                    exit_code: status.code(),
                });
            }
        }
    }
    Ok(report)
}

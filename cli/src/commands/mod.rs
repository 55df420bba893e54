//! One module per subcommand. Handlers are pure functions over port traits
//! so the CLI layer can bind them directly and tests can substitute stubs.

pub mod contexts;
pub mod create;
pub mod info;
pub mod lifecycle;
pub mod refresh;
pub mod rsync;
pub mod scp;
pub mod ssh;
pub mod terminate;

use anyhow::Result;

use crate::application::batch::BatchReport;
use crate::application::ports::{CacheMap, FleetDirectory};
use crate::application::resolver::Selection;
use crate::domain::InstanceRecord;
use crate::output::OutputContext;

/// `--indices` absent means the whole context.
pub(crate) fn selection_from(indices: Option<&Vec<usize>>) -> Selection {
    match indices {
        Some(indices) => Selection::Indices(indices.clone()),
        None => Selection::All,
    }
}

/// Expand requested context names: `all` stands for every cached context.
pub(crate) fn expand_contexts(
    requested: &[String],
    cache: Option<&CacheMap>,
) -> Result<Vec<String>> {
    if requested.len() == 1 && requested[0] == "all" {
        match cache {
            Some(map) => Ok(map.keys().cloned().collect()),
            None => anyhow::bail!("context 'all' requires the instance cache (drop --no-cache)"),
        }
    } else {
        Ok(requested.to_vec())
    }
}

/// The context's instance list: the cache entry when one exists, otherwise
/// a live tag query. Always sorted ascending by id.
pub(crate) async fn context_instances(
    directory: &impl FleetDirectory,
    cache: Option<&CacheMap>,
    ctx: &str,
) -> Result<Vec<InstanceRecord>> {
    if let Some(list) = cache.and_then(|m| m.get(ctx)) {
        let mut list = list.clone();
        crate::domain::instance::sort_by_id(&mut list);
        return Ok(list);
    }
    directory.describe_context(ctx).await
}

pub(crate) fn join_ids(instances: &[InstanceRecord]) -> String {
    instances
        .iter()
        .map(|i| i.id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Surface a batch result: per-instance failures are reported and any
/// failure makes the whole command fail.
pub(crate) fn finish_batch(out: &OutputContext, report: &BatchReport) -> Result<()> {
    if report.all_succeeded() {
        return Ok(());
    }
    for outcome in report.failures() {
        let code = outcome
            .exit_code
            .map_or_else(|| "killed by signal".to_string(), |c| format!("exit code {c}"));
        out.warn(&format!("{}: {code}", outcome.instance_id));
    }
    let failed = report.failures().count();
    anyhow::bail!("{failed} of {} instances failed", report.outcomes.len())
}

//! `fleet terminate` — confirmation-gated instance termination.

use anyhow::Result;
use clap::Args;

use crate::application::ports::{ConfirmationGate, FleetDirectory, InstanceCache};
use crate::application::resolver::select_indices;
use crate::commands::{context_instances, expand_contexts, join_ids};
use crate::infra::cache::remove_indices;
use crate::output::OutputContext;

/// The literal the operator must type to confirm termination.
pub const CONFIRM_PHRASE: &str = "terminate";

#[derive(Args)]
pub struct TerminateArgs {
    /// Context names; 'all' expands to every cached context
    #[arg(required = true)]
    pub ctx: Vec<String>,

    /// Zero-based indices into each context's sorted list
    #[arg(long, value_name = "IDX", num_args = 1..)]
    pub indices: Option<Vec<usize>>,
}

/// Terminate selected instances, one confirmation and one batched
/// provider call per context. A declined confirmation skips only that
/// context; earlier terminations stand.
pub async fn run(
    args: &TerminateArgs,
    out: &OutputContext,
    directory: &impl FleetDirectory,
    cache: Option<&impl InstanceCache>,
    gate: &impl ConfirmationGate,
) -> Result<()> {
    let mut contexts = cache.map(InstanceCache::load).transpose()?;
    let names = expand_contexts(&args.ctx, contexts.as_ref())?;

    for ctx in &names {
        // Snapshot at selection time: cache removals below are computed
        // against exactly this ordering.
        let instances = context_instances(directory, contexts.as_ref(), ctx).await?;
        let selected = match &args.indices {
            Some(indices) => select_indices(&instances, indices)?,
            None => instances,
        };

        let what = match &args.indices {
            Some(indices) => format!("instances {indices:?}"),
            None => "**ALL** instances".to_string(),
        };
        let prompt = format!("Are you sure you want to terminate {what} in context '{ctx}'?");
        if !gate.confirm(&prompt, CONFIRM_PHRASE)? {
            out.status(&format!("Skipping context '{ctx}'"));
            continue;
        }

        let ids: Vec<String> = selected.iter().map(|i| i.id.clone()).collect();
        directory.terminate(&ids).await?;
        out.status(&format!("Terminating instances {}", join_ids(&selected)));

        if let Some(map) = contexts.as_mut() {
            match &args.indices {
                Some(indices) => {
                    if let Some(list) = map.get_mut(ctx) {
                        remove_indices(list, indices);
                    }
                }
                None => {
                    map.remove(ctx);
                }
            }
        }
    }

    if let (Some(store), Some(map)) = (cache, contexts) {
        store.save(&map)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{CacheMap, LaunchSpec};
    use crate::domain::{InstanceRecord, LifecycleState};
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    fn inst(id: &str) -> InstanceRecord {
        InstanceRecord::from_observed(
            id.to_string(),
            "t2.micro".to_string(),
            "us-east-1a".to_string(),
            Some("10.0.0.1".to_string()),
            Some("3.80.0.1".to_string()),
            Some(format!("{id}.example")),
            LifecycleState::Running,
        )
    }

    /// Records terminate calls; other directory methods are unreachable.
    #[derive(Default)]
    struct RecordingDirectory {
        terminate_calls: RefCell<Vec<Vec<String>>>,
    }

    impl FleetDirectory for RecordingDirectory {
        async fn describe_context(&self, _: &str) -> Result<Vec<InstanceRecord>> {
            anyhow::bail!("not expected")
        }

        async fn describe_ids(&self, _: &[String]) -> Result<Vec<InstanceRecord>> {
            anyhow::bail!("not expected")
        }

        async fn list_context_names(&self) -> Result<Vec<String>> {
            anyhow::bail!("not expected")
        }

        async fn create(&self, _: &LaunchSpec) -> Result<Vec<String>> {
            anyhow::bail!("not expected")
        }

        async fn terminate(&self, ids: &[String]) -> Result<()> {
            self.terminate_calls.borrow_mut().push(ids.to_vec());
            Ok(())
        }

        async fn start(&self, _: &[String]) -> Result<()> {
            anyhow::bail!("not expected")
        }

        async fn stop(&self, _: &[String]) -> Result<()> {
            anyhow::bail!("not expected")
        }

        async fn reboot(&self, _: &[String]) -> Result<()> {
            anyhow::bail!("not expected")
        }
    }

    /// In-memory cache double.
    struct MemoryCache {
        contents: RefCell<CacheMap>,
    }

    impl InstanceCache for MemoryCache {
        fn load(&self) -> Result<CacheMap> {
            Ok(self.contents.borrow().clone())
        }

        fn save(&self, contexts: &CacheMap) -> Result<()> {
            *self.contents.borrow_mut() = contexts.clone();
            Ok(())
        }
    }

    struct CannedGate {
        answer: bool,
    }

    impl ConfirmationGate for CannedGate {
        fn confirm(&self, _: &str, _: &str) -> Result<bool> {
            Ok(self.answer)
        }
    }

    fn fixture() -> MemoryCache {
        let mut map = BTreeMap::new();
        map.insert(
            "train".to_string(),
            vec![inst("i-00"), inst("i-01"), inst("i-02"), inst("i-03"), inst("i-04")],
        );
        MemoryCache {
            contents: RefCell::new(map),
        }
    }

    fn quiet_out() -> OutputContext {
        OutputContext::new(true, true)
    }

    #[tokio::test]
    async fn declined_confirmation_issues_zero_terminate_calls() {
        let dir = RecordingDirectory::default();
        let cache = fixture();
        let args = TerminateArgs {
            ctx: vec!["train".to_string()],
            indices: None,
        };
        run(&args, &quiet_out(), &dir, Some(&cache), &CannedGate { answer: false })
            .await
            .expect("declined confirmation is not an error");
        assert!(dir.terminate_calls.borrow().is_empty());
        assert!(
            cache.contents.borrow().contains_key("train"),
            "no side effects on decline"
        );
    }

    #[tokio::test]
    async fn confirmed_termination_is_one_batched_call() {
        let dir = RecordingDirectory::default();
        let cache = fixture();
        let args = TerminateArgs {
            ctx: vec!["train".to_string()],
            indices: None,
        };
        run(&args, &quiet_out(), &dir, Some(&cache), &CannedGate { answer: true })
            .await
            .expect("runs");
        let calls = dir.terminate_calls.borrow();
        assert_eq!(calls.len(), 1, "exactly one batched call");
        assert_eq!(calls[0], ["i-00", "i-01", "i-02", "i-03", "i-04"]);
        assert!(
            !cache.contents.borrow().contains_key("train"),
            "whole context removed from cache"
        );
    }

    #[tokio::test]
    async fn indexed_termination_removes_exactly_those_positions() {
        let dir = RecordingDirectory::default();
        let cache = fixture();
        let args = TerminateArgs {
            ctx: vec!["train".to_string()],
            indices: Some(vec![0, 2, 4]),
        };
        run(&args, &quiet_out(), &dir, Some(&cache), &CannedGate { answer: true })
            .await
            .expect("runs");
        assert_eq!(dir.terminate_calls.borrow()[0], ["i-00", "i-02", "i-04"]);
        let contents = cache.contents.borrow();
        let ids: Vec<&str> = contents["train"].iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["i-01", "i-03"], "survivors keep relative order");
    }
}

//! `fleet start|stop|reboot` — batched lifecycle transitions.

use anyhow::Result;
use clap::Args;

use crate::application::ports::{FleetDirectory, InstanceCache};
use crate::application::resolver::{Selection, select_indices};
use crate::commands::{context_instances, expand_contexts, join_ids, selection_from};
use crate::output::OutputContext;

#[derive(Args)]
pub struct LifecycleArgs {
    /// Context names; 'all' expands to every cached context
    #[arg(required = true)]
    pub ctx: Vec<String>,

    /// Zero-based indices into each context's sorted list
    #[arg(long, value_name = "IDX", num_args = 1..)]
    pub indices: Option<Vec<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Start,
    Stop,
    Reboot,
}

impl LifecycleAction {
    fn gerund(self) -> &'static str {
        match self {
            Self::Start => "Starting",
            Self::Stop => "Stopping",
            Self::Reboot => "Rebooting",
        }
    }
}

/// Issue one batched lifecycle call per context. Fire-and-forget: the
/// provider acknowledges the request, no wait for the state transition.
pub async fn run(
    action: LifecycleAction,
    args: &LifecycleArgs,
    out: &OutputContext,
    directory: &impl FleetDirectory,
    cache: Option<&impl InstanceCache>,
) -> Result<()> {
    let mut contexts = cache.map(InstanceCache::load).transpose()?;
    let names = expand_contexts(&args.ctx, contexts.as_ref())?;
    let selection = selection_from(args.indices.as_ref());

    for ctx in &names {
        let instances = context_instances(directory, contexts.as_ref(), ctx).await?;
        let selected = match &selection {
            Selection::All => instances,
            Selection::Indices(indices) => select_indices(&instances, indices)?,
        };
        let ids: Vec<String> = selected.iter().map(|i| i.id.clone()).collect();
        match action {
            LifecycleAction::Start => directory.start(&ids).await?,
            LifecycleAction::Stop => directory.stop(&ids).await?,
            LifecycleAction::Reboot => directory.reboot(&ids).await?,
        }
        out.status(&format!("{} '{ctx}' instances {}", action.gerund(), join_ids(&selected)));

        // A stop invalidates the cached public addresses immediately.
        if action == LifecycleAction::Stop
            && let Some(list) = contexts.as_mut().and_then(|m| m.get_mut(ctx))
        {
            for inst in list {
                inst.clear_public_addresses();
            }
        }
    }

    if let (Some(store), Some(map)) = (cache, contexts) {
        store.save(&map)?;
    }
    Ok(())
}

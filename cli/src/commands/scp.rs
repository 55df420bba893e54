//! `fleet scp` — copy a file to or from a context.

use anyhow::Result;
use clap::Args;

use crate::application::batch::{self, ConcurrencyMode};
use crate::application::ports::{CommandRunner, FleetDirectory, InstanceCache};
use crate::application::remote::CopyDirection;
use crate::application::resolver::{ContextResolver, resolve_credentials};
use crate::commands::{finish_batch, selection_from};
use crate::domain::FleetError;
use crate::domain::config::Defaults;
use crate::output::OutputContext;

#[derive(Args)]
pub struct ScpArgs {
    /// Context name
    pub ctx: String,

    /// File to copy (local for --put, remote for --get)
    pub file: String,

    /// Copy local file to the instances
    #[arg(long, conflicts_with = "get")]
    pub put: bool,

    /// Copy remote file from the instances
    #[arg(long)]
    pub get: bool,

    /// Destination (remote for --put, local for --get)
    #[arg(long, short = 'l', default_value = ".")]
    pub location: String,

    /// Copy directories recursively
    #[arg(long)]
    pub recursive: bool,

    /// Zero-based indices into the context's sorted list (default: all
    /// running instances)
    #[arg(long, value_name = "IDX", num_args = 1..)]
    pub indices: Option<Vec<usize>>,

    /// Remote-access user (overrides cached and profile values)
    #[arg(long, short = 'u', default_value = "")]
    pub user: String,

    /// Remote-access key path (overrides cached and profile values)
    #[arg(long, short = 'i', default_value = "")]
    pub key: String,

    /// Fan out concurrently instead of one instance at a time
    #[arg(long, short = 'p')]
    pub parallel: bool,
}

pub async fn run(
    args: &ScpArgs,
    out: &OutputContext,
    directory: &impl FleetDirectory,
    cache: Option<&impl InstanceCache>,
    runner: &impl CommandRunner,
    defaults: &Defaults,
) -> Result<()> {
    let direction = match (args.put, args.get) {
        (true, false) => CopyDirection::Put,
        (false, true) => CopyDirection::Get,
        _ => {
            return Err(FleetError::MissingRequiredInput(
                "Please provide a direction (--put or --get)".to_string(),
            )
            .into());
        }
    };

    let selection = selection_from(args.indices.as_ref());
    let filter_running = args.indices.is_none();

    let mut resolver = ContextResolver::new(directory, cache.map(InstanceCache::load).transpose()?);
    let instances = resolver.resolve(&args.ctx, &selection, filter_running).await?;
    let access = resolve_credentials(&instances, &args.user, &args.key, defaults)?;

    let mode = if args.parallel {
        ConcurrencyMode::Parallel
    } else {
        ConcurrencyMode::Sequential
    };
    let report = batch::execute(runner, &instances, mode, |inst| {
        access.scp_argv(inst, &args.file, &args.location, direction, args.recursive)
    })
    .await?;

    if let (Some(store), Some(map)) = (cache, resolver.into_cache()) {
        store.save(&map)?;
    }
    finish_batch(out, &report)
}

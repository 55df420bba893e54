//! `fleet ssh` — run a command (or open a session) across a context.

use anyhow::Result;
use clap::Args;

use crate::application::batch::{self, ConcurrencyMode};
use crate::application::ports::{CommandRunner, FleetDirectory, InstanceCache};
use crate::application::probe::{self, ProbeSettings};
use crate::application::resolver::{ContextResolver, Selection, resolve_credentials};
use crate::commands::finish_batch;
use crate::domain::config::Defaults;
use crate::output::OutputContext;

#[derive(Args)]
pub struct SshArgs {
    /// Context name
    pub ctx: String,

    /// Zero-based indices into the context's sorted list (default: 0)
    #[arg(long, value_name = "IDX", num_args = 1.., conflicts_with = "all")]
    pub indices: Option<Vec<usize>>,

    /// Target every running instance in the context
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Remote-access user (overrides cached and profile values)
    #[arg(long, short = 'u', default_value = "")]
    pub user: String,

    /// Remote-access key path (overrides cached and profile values)
    #[arg(long, short = 'i', default_value = "")]
    pub key: String,

    /// Command to run remotely; empty opens an interactive session
    #[arg(long, short = 'c', default_value = "")]
    pub comm: String,

    /// Fan out concurrently instead of one instance at a time
    #[arg(long, short = 'p')]
    pub parallel: bool,

    /// Allocate a pseudo-terminal for elevated execution
    #[arg(long, short = 's')]
    pub sudo: bool,

    /// Block until each instance answers a trivial probe first
    #[arg(long, short = 'w')]
    pub wait: bool,
}

pub async fn run(
    args: &SshArgs,
    out: &OutputContext,
    directory: &impl FleetDirectory,
    cache: Option<&impl InstanceCache>,
    runner: &impl CommandRunner,
    defaults: &Defaults,
) -> Result<()> {
    let selection = if args.all {
        Selection::All
    } else {
        Selection::Indices(args.indices.clone().unwrap_or_else(|| vec![0]))
    };

    let mut resolver = ContextResolver::new(directory, cache.map(InstanceCache::load).transpose()?);
    let instances = resolver.resolve(&args.ctx, &selection, args.all).await?;
    let access = resolve_credentials(&instances, &args.user, &args.key, defaults)?;

    if args.wait {
        let settings = ProbeSettings::default();
        for inst in &instances {
            probe::wait_until_reachable(runner, &access, inst, &settings).await?;
        }
    }

    let mode = if args.parallel {
        ConcurrencyMode::Parallel
    } else {
        ConcurrencyMode::Sequential
    };
    let report = batch::execute(runner, &instances, mode, |inst| {
        access.ssh_argv(inst, &args.comm, args.sudo)
    })
    .await?;

    if let (Some(store), Some(map)) = (cache, resolver.into_cache()) {
        store.save(&map)?;
    }
    finish_batch(out, &report)
}

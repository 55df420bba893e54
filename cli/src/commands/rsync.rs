//! `fleet rsync` — mirror a local tree onto a context.

use anyhow::{Context, Result};
use clap::Args;

use crate::application::batch::{self, ConcurrencyMode};
use crate::application::ports::{CommandRunner, ConfirmationGate, FleetDirectory, InstanceCache};
use crate::application::resolver::{ContextResolver, resolve_credentials};
use crate::commands::{finish_batch, selection_from};
use crate::domain::config::Defaults;
use crate::output::OutputContext;

/// The literal the operator must type to confirm the remote `rm -rf`.
pub const CONFIRM_PHRASE: &str = "yes";

#[derive(Args)]
pub struct RsyncArgs {
    /// Context name
    pub ctx: String,

    /// Local file or directory to mirror
    #[arg(long, short = 'f')]
    pub file: String,

    /// Remote destination directory
    #[arg(long, short = 'l', default_value = ".")]
    pub location: String,

    /// Patterns to exclude, repeated per pattern
    #[arg(long, short = 'e', value_name = "PATTERN", num_args = 1..)]
    pub exclude: Vec<String>,

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

    /// Delete and recreate the destination directory first
    #[arg(long)]
    pub force: bool,
}

pub async fn run(
    args: &RsyncArgs,
    out: &OutputContext,
    directory: &impl FleetDirectory,
    cache: Option<&impl InstanceCache>,
    runner: &impl CommandRunner,
    gate: &impl ConfirmationGate,
    defaults: &Defaults,
) -> Result<()> {
    let selection = selection_from(args.indices.as_ref());
    let filter_running = args.indices.is_none();

    let mut resolver = ContextResolver::new(directory, cache.map(InstanceCache::load).transpose()?);
    let instances = resolver.resolve(&args.ctx, &selection, filter_running).await?;
    let access = resolve_credentials(&instances, &args.user, &args.key, defaults)?;

    if args.force {
        // One confirmation covers the whole batch.
        let prompt = format!(
            "Are you sure you want to run 'rm -rf' on '{}' across {} instance(s)?",
            args.location,
            instances.len()
        );
        if !gate.confirm(&prompt, CONFIRM_PHRASE)? {
            out.status("Cancelled.");
            if let (Some(store), Some(map)) = (cache, resolver.into_cache()) {
                store.save(&map)?;
            }
            return Ok(());
        }
        for inst in &instances {
            for command in [
                format!("rm -rf {}", args.location),
                format!("mkdir -p {}", args.location),
            ] {
                let argv = access.ssh_argv(inst, &command, false);
                let arg_refs: Vec<&str> = argv[1..].iter().map(String::as_str).collect();
                runner
                    .run_status(&argv[0], &arg_refs)
                    .await
                    .with_context(|| format!("resetting {} on {}", args.location, inst.id))?;
            }
        }
    }

    let mode = if args.parallel {
        ConcurrencyMode::Parallel
    } else {
        ConcurrencyMode::Sequential
    };
    let report = batch::execute(runner, &instances, mode, |inst| {
        access.rsync_argv(inst, &args.file, &args.location, &args.exclude)
    })
    .await?;

    if let (Some(store), Some(map)) = (cache, resolver.into_cache()) {
        store.save(&map)?;
    }
    finish_batch(out, &report)
}

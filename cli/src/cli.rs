//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use crate::domain::region::{self, DEFAULT_REGION};
use crate::infra::cache::CacheStore;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config;
use crate::infra::confirm::StdinGate;
use crate::infra::directory::AwsCliDirectory;
use crate::output::OutputContext;

/// Manage named groups of cloud compute instances
#[derive(Parser)]
#[command(
    name = "fleet",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Provider region, by canonical id or alias
    #[arg(short, long, global = true)]
    pub region: Option<String>,

    /// Named profile from the config file
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Skip the instance cache and query the provider directly
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List context names known to the provider
    Contexts,

    /// Launch new instances into a context
    Create(commands::create::CreateArgs),

    /// Start stopped instances
    Start(commands::lifecycle::LifecycleArgs),

    /// Stop running instances
    Stop(commands::lifecycle::LifecycleArgs),

    /// Reboot instances
    Reboot(commands::lifecycle::LifecycleArgs),

    /// Terminate instances (asks for confirmation)
    Terminate(commands::terminate::TerminateArgs),

    /// Show instance details, whole table or a single field
    Info(commands::info::InfoArgs),

    /// Re-describe cached instances and rewrite the cache
    Refresh(commands::refresh::RefreshArgs),

    /// Run a command (or open a session) across a context
    Ssh(commands::ssh::SshArgs),

    /// Mirror a local tree onto a context
    Rsync(commands::rsync::RsyncArgs),

    /// Copy a file to or from a context
    Scp(commands::scp::ScpArgs),
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails; `main` maps typed failures
    /// to their exit codes.
    pub async fn run(self) -> Result<()> {
        let defaults = config::load_profile(&config::default_path()?, self.profile.as_deref())?;

        // Resolved before any provider call so a bad alias never reaches
        // the API.
        let requested = self
            .region
            .as_deref()
            .or(defaults.region.as_deref())
            .unwrap_or(DEFAULT_REGION);
        let region = region::resolve(requested)?;

        let out = OutputContext::new(self.no_color, self.quiet);
        let runner = TokioCommandRunner::new();
        let directory = AwsCliDirectory::new(&runner, region.id);
        let cache = if self.no_cache {
            None
        } else {
            Some(CacheStore::new()?)
        };
        let gate = StdinGate;

        use commands::lifecycle::LifecycleAction;
        match self.command {
            Command::Contexts => commands::contexts::run(&out, &directory).await,
            Command::Create(args) => {
                commands::create::run(&args, &out, &directory, region, cache.as_ref()).await
            }
            Command::Start(args) => {
                commands::lifecycle::run(
                    LifecycleAction::Start,
                    &args,
                    &out,
                    &directory,
                    cache.as_ref(),
                )
                .await
            }
            Command::Stop(args) => {
                commands::lifecycle::run(
                    LifecycleAction::Stop,
                    &args,
                    &out,
                    &directory,
                    cache.as_ref(),
                )
                .await
            }
            Command::Reboot(args) => {
                commands::lifecycle::run(
                    LifecycleAction::Reboot,
                    &args,
                    &out,
                    &directory,
                    cache.as_ref(),
                )
                .await
            }
            Command::Terminate(args) => {
                commands::terminate::run(&args, &out, &directory, cache.as_ref(), &gate).await
            }
            Command::Info(args) => {
                commands::info::run(&args, &out, &directory, cache.as_ref()).await
            }
            Command::Refresh(args) => {
                let Some(store) = cache.as_ref() else {
                    anyhow::bail!("refresh requires the instance cache (drop --no-cache)")
                };
                commands::refresh::run(&args, &out, &directory, store).await
            }
            Command::Ssh(args) => {
                commands::ssh::run(&args, &out, &directory, cache.as_ref(), &runner, &defaults)
                    .await
            }
            Command::Rsync(args) => {
                commands::rsync::run(
                    &args,
                    &out,
                    &directory,
                    cache.as_ref(),
                    &runner,
                    &gate,
                    &defaults,
                )
                .await
            }
            Command::Scp(args) => {
                commands::scp::run(&args, &out, &directory, cache.as_ref(), &runner, &defaults)
                    .await
            }
        }
    }
}

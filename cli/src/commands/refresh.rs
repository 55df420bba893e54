//! `fleet refresh` — re-describe cached instances and rewrite the cache.

use anyhow::Result;
use clap::Args;

use crate::application::ports::{FleetDirectory, InstanceCache};
use crate::commands::expand_contexts;
use crate::domain::FleetError;
use crate::domain::instance::sort_by_id;
use crate::output::OutputContext;

#[derive(Args)]
pub struct RefreshArgs {
    /// Context names; 'all' expands to every cached context
    #[arg(required = true)]
    pub ctx: Vec<String>,

    /// Remote-access user to cache on the refreshed records
    #[arg(long, short = 'u', default_value = "")]
    pub user: String,

    /// Remote-access key path to cache on the refreshed records
    #[arg(long, default_value = "")]
    pub key: String,
}

/// # Errors
///
/// Fails with [`FleetError::UnknownContext`] when a named context is not in
/// the cache — refreshing is only meaningful for cached state.
pub async fn run(
    args: &RefreshArgs,
    out: &OutputContext,
    directory: &impl FleetDirectory,
    cache: &impl InstanceCache,
) -> Result<()> {
    let mut contexts = cache.load()?;
    let names = expand_contexts(&args.ctx, Some(&contexts))?;

    for ctx in &names {
        let Some(list) = contexts.get_mut(ctx) else {
            return Err(FleetError::UnknownContext(ctx.clone()).into());
        };
        if list.is_empty() {
            continue;
        }
        let ids: Vec<String> = list.iter().map(|i| i.id.clone()).collect();
        let user = if args.user.is_empty() {
            list[0].access_user.clone()
        } else {
            args.user.clone()
        };
        let key = if args.key.is_empty() {
            list[0].access_key_path.clone()
        } else {
            args.key.clone()
        };

        let mut fresh = directory.describe_ids(&ids).await?;
        for inst in &mut fresh {
            inst.access_user.clone_from(&user);
            inst.access_key_path.clone_from(&key);
        }
        sort_by_id(&mut fresh);
        out.status(&format!("Refreshed context '{ctx}' ({} instances)", fresh.len()));
        *list = fresh;
    }

    cache.save(&contexts)?;
    Ok(())
}

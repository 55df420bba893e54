//! `fleet info` — per-field or full instance listings.

use anyhow::Result;
use clap::Args;

use crate::application::ports::{FleetDirectory, InstanceCache};
use crate::application::resolver::select_indices;
use crate::commands::{context_instances, expand_contexts};
use crate::domain::InstanceRecord;
use crate::domain::instance::sort_by_id;
use crate::output::OutputContext;

#[derive(Args)]
pub struct InfoArgs {
    /// Context names; 'all' expands to every cached context
    #[arg(required = true)]
    pub ctx: Vec<String>,

    /// Zero-based indices into each context's sorted list
    #[arg(long, value_name = "IDX", num_args = 1..)]
    pub indices: Option<Vec<usize>>,

    /// Print only the public address
    #[arg(long)]
    pub pubip: bool,

    /// Print only the private address
    #[arg(long)]
    pub prip: bool,

    /// Print only the DNS name
    #[arg(long)]
    pub dns: bool,

    /// Print only the instance type
    #[arg(long = "type")]
    pub instance_type: bool,

    /// Print only the availability zone
    #[arg(long)]
    pub zone: bool,

    /// Print only the lifecycle state
    #[arg(long)]
    pub state: bool,

    /// Bare values without index columns, for scripting
    #[arg(long)]
    pub text: bool,
}

impl InfoArgs {
    fn field(&self, inst: &InstanceRecord) -> Option<String> {
        if self.pubip {
            Some(inst.public_address.clone())
        } else if self.dns {
            Some(inst.dns_name.clone())
        } else if self.prip {
            Some(inst.private_address.clone())
        } else if self.instance_type {
            Some(inst.instance_type.clone())
        } else if self.zone {
            Some(inst.placement.clone())
        } else if self.state {
            Some(inst.lifecycle_state.to_string())
        } else {
            None
        }
    }
}

pub async fn run(
    args: &InfoArgs,
    out: &OutputContext,
    directory: &impl FleetDirectory,
    cache: Option<&impl InstanceCache>,
) -> Result<()> {
    let mut contexts = cache.map(InstanceCache::load).transpose()?;
    let names = expand_contexts(&args.ctx, contexts.as_ref())?;
    let field_mode = args.pubip
        || args.prip
        || args.dns
        || args.instance_type
        || args.zone
        || args.state;

    for (n, ctx) in names.iter().enumerate() {
        let mut instances = context_instances(directory, contexts.as_ref(), ctx).await?;
        if instances.is_empty() {
            out.status(&format!("Context '{ctx}' has no live instances"));
            continue;
        }

        // The full listing refreshes cached entries so the observed state
        // column is live; field selectors read whatever is on hand.
        if !field_mode
            && let Some(list) = contexts.as_mut().and_then(|m| m.get_mut(ctx))
        {
            let ids: Vec<String> = list.iter().map(|i| i.id.clone()).collect();
            let user = list[0].access_user.clone();
            let key = list[0].access_key_path.clone();
            let mut fresh = directory.describe_ids(&ids).await?;
            for inst in &mut fresh {
                inst.access_user.clone_from(&user);
                inst.access_key_path.clone_from(&key);
            }
            sort_by_id(&mut fresh);
            *list = fresh.clone();
            instances = fresh;
        }

        if !args.text {
            out.header(&format!("Context '{ctx}'"));
        }

        let indexed: Vec<(usize, InstanceRecord)> = match &args.indices {
            Some(indices) => {
                let selected = select_indices(&instances, indices)?;
                indices.iter().copied().zip(selected).collect()
            }
            None => instances.into_iter().enumerate().collect(),
        };

        if field_mode {
            for (i, inst) in &indexed {
                let value = args.field(inst).unwrap_or_default();
                if args.text {
                    println!("{value}");
                } else {
                    println!("  {i}  {value}");
                }
            }
        } else {
            println!("{} instances:", indexed.len());
            for (i, inst) in &indexed {
                println!(
                    "  {i:2}  {}  {}  {}  {:15}  {}",
                    inst.id,
                    inst.instance_type,
                    inst.placement,
                    inst.private_address,
                    inst.lifecycle_state
                );
            }
        }

        if n < names.len() - 1 && !args.text {
            println!();
        }
    }

    if let (Some(store), Some(map)) = (cache, contexts) {
        store.save(&map)?;
    }
    Ok(())
}

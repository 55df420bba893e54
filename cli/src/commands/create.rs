//! `fleet create` — launch new instances into a context.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use crate::application::ports::{FleetDirectory, InstanceCache, LaunchSpec};
use crate::domain::FleetError;
use crate::domain::region::Region;
use crate::output::OutputContext;

#[derive(Args)]
pub struct CreateArgs {
    /// Context name for the new instances (applied as the Name tag)
    #[arg(long)]
    pub ctx: String,

    /// Launch template file; overrides every other launch flag
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Machine image id
    #[arg(long)]
    pub ami: Option<String>,

    /// Instance type
    #[arg(long = "type", default_value = "t2.micro")]
    pub instance_type: String,

    /// Number of instances
    #[arg(long, default_value_t = 1)]
    pub cnt: u32,

    /// Provider key-pair name
    #[arg(long, short = 'k')]
    pub key_pair: Option<String>,

    /// Availability zone
    #[arg(long)]
    pub az: Option<String>,

    /// Placement group
    #[arg(long)]
    pub pg: Option<String>,

    /// Request spot capacity
    #[arg(long)]
    pub spot: bool,

    /// Remote-access user cached on the new instances
    #[arg(long, short = 'u', default_value = "")]
    pub user: String,

    /// Remote-access key path cached on the new instances
    #[arg(long, default_value = "")]
    pub key: String,
}

/// # Errors
///
/// Fails with [`FleetError::ReservedName`] before any provider call when
/// the context is named `all`, and [`FleetError::MissingRequiredInput`]
/// when neither an AMI nor a launch template is given.
pub async fn run(
    args: &CreateArgs,
    out: &OutputContext,
    directory: &impl FleetDirectory,
    region: &Region,
    cache: Option<&impl InstanceCache>,
) -> Result<()> {
    if args.ctx == "all" {
        return Err(FleetError::ReservedName.into());
    }

    let spec = build_spec(args, region)?;
    out.status(&format!("Launching {} instance(s) in context '{}'", spec.count, args.ctx));
    let ids = directory.create(&spec).await?;
    out.status(&format!("Created instances {}", ids.join(", ")));

    if let Some(store) = cache {
        // The provider needs a moment before the new ids are describable.
        tokio::time::sleep(Duration::from_secs(1)).await;
        let mut created = directory.describe_ids(&ids).await?;
        for inst in &mut created {
            inst.access_user.clone_from(&args.user);
            inst.access_key_path.clone_from(&args.key);
        }
        let mut contexts = store.load()?;
        contexts.entry(args.ctx.clone()).or_default().extend(created);
        store.save(&contexts)?;
    }
    Ok(())
}

fn build_spec(args: &CreateArgs, region: &Region) -> Result<LaunchSpec> {
    if let Some(path) = &args.json {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading launch template {}", path.display()))?;
        let template = serde_json::from_str(&content)
            .with_context(|| format!("parsing launch template {}", path.display()))?;
        return Ok(LaunchSpec {
            context: args.ctx.clone(),
            template: Some(template),
            ..LaunchSpec::default()
        });
    }

    let Some(image) = args.ami.clone() else {
        return Err(FleetError::MissingRequiredInput(
            "Please provide an AMI (--ami) or a launch template (--json)".to_string(),
        )
        .into());
    };
    Ok(LaunchSpec {
        image: Some(image),
        instance_type: args.instance_type.clone(),
        count: args.cnt,
        key_pair: args.key_pair.clone(),
        context: args.ctx.clone(),
        availability_zone: args.az.clone(),
        placement_group: args.pg.clone(),
        spot: args.spot,
        security_groups: vec![region.security_group.to_string()],
        ebs_optimized: args.instance_type != "t2.micro",
        template: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::region;

    fn args() -> CreateArgs {
        CreateArgs {
            ctx: "train".to_string(),
            json: None,
            ami: Some("ami-12345".to_string()),
            instance_type: "m5.large".to_string(),
            cnt: 3,
            key_pair: None,
            az: None,
            pg: None,
            spot: false,
            user: String::new(),
            key: String::new(),
        }
    }

    #[test]
    fn spec_gets_region_security_group_and_ebs_optimization() {
        let region = region::resolve("virginia").expect("region");
        let spec = build_spec(&args(), region).expect("spec");
        assert_eq!(spec.security_groups, ["sg-098524cf5a5d0011f"]);
        assert!(spec.ebs_optimized, "non-default type is EBS optimized");
        assert_eq!(spec.count, 3);
    }

    #[test]
    fn default_instance_type_is_not_ebs_optimized() {
        let mut a = args();
        a.instance_type = "t2.micro".to_string();
        let region = region::resolve("virginia").expect("region");
        let spec = build_spec(&a, region).expect("spec");
        assert!(!spec.ebs_optimized);
    }

    #[test]
    fn missing_ami_without_template_is_fatal() {
        let mut a = args();
        a.ami = None;
        let region = region::resolve("virginia").expect("region");
        let err = build_spec(&a, region).expect_err("no image source");
        let fleet = err.downcast_ref::<FleetError>().expect("typed error");
        assert_eq!(fleet.exit_code(), 13);
    }
}

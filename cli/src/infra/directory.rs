//! Fleet directory adapter backed by the `aws` CLI.
//!
//! Drives `aws ec2 …` with `--output json` through the [`CommandRunner`]
//! and navigates the response with `serde_json`. Missing address fields on
//! an instance (e.g. mid-termination) map to sentinels, never errors.

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Value, json};

use crate::application::ports::{CommandRunner, FleetDirectory, LaunchSpec};
use crate::domain::instance::sort_by_id;
use crate::domain::{InstanceRecord, LifecycleState};

/// Timeout for provider API calls.
const API_TIMEOUT: Duration = Duration::from_secs(30);

/// States a context query includes: everything but the terminated tail.
const LIVE_STATES: &str = "pending,running,stopping,stopped";

pub struct AwsCliDirectory<'a, R> {
    runner: &'a R,
    region: String,
}

impl<'a, R: CommandRunner> AwsCliDirectory<'a, R> {
    pub fn new(runner: &'a R, region: &str) -> Self {
        Self {
            runner,
            region: region.to_string(),
        }
    }

    async fn invoke(&self, args: &[&str]) -> Result<Value> {
        let mut full = vec!["ec2"];
        full.extend_from_slice(args);
        full.extend_from_slice(&["--region", &self.region, "--output", "json"]);
        let output = self
            .runner
            .run("aws", &full, API_TIMEOUT)
            .await
            .with_context(|| format!("aws ec2 {}", args[0]))?;
        if !output.status.success() {
            bail!(
                "aws ec2 {} failed: {}",
                args[0],
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        if output.stdout.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("parsing aws ec2 {} response", args[0]))
    }

    async fn lifecycle_call(&self, verb: &str, ids: &[String]) -> Result<()> {
        let mut args = vec![verb, "--instance-ids"];
        args.extend(ids.iter().map(String::as_str));
        self.invoke(&args).await.map(|_| ())
    }
}

impl<R: CommandRunner> FleetDirectory for AwsCliDirectory<'_, R> {
    async fn describe_context(&self, ctx: &str) -> Result<Vec<InstanceRecord>> {
        let tag_filter = format!("Name=tag:Name,Values={ctx}");
        let state_filter = format!("Name=instance-state-name,Values={LIVE_STATES}");
        let response = self
            .invoke(&["describe-instances", "--filters", &tag_filter, &state_filter])
            .await?;
        parse_reservations(&response)
    }

    async fn describe_ids(&self, ids: &[String]) -> Result<Vec<InstanceRecord>> {
        let mut args = vec!["describe-instances", "--instance-ids"];
        args.extend(ids.iter().map(String::as_str));
        let response = self.invoke(&args).await?;
        parse_reservations(&response)
    }

    async fn list_context_names(&self) -> Result<Vec<String>> {
        let state_filter = format!("Name=instance-state-name,Values={LIVE_STATES}");
        let response = self
            .invoke(&["describe-instances", "--filters", &state_filter])
            .await?;
        let mut names = BTreeSet::new();
        for inst in reservation_instances(&response) {
            let tags = inst.get("Tags").and_then(Value::as_array);
            for tag in tags.into_iter().flatten() {
                if tag.get("Key").and_then(Value::as_str) == Some("Name")
                    && let Some(value) = tag.get("Value").and_then(Value::as_str)
                {
                    names.insert(value.to_string());
                }
            }
        }
        Ok(names.into_iter().collect())
    }

    async fn create(&self, spec: &LaunchSpec) -> Result<Vec<String>> {
        let input = launch_input(spec)?;
        let input_json = serde_json::to_string(&input).context("serializing launch input")?;
        let response = self
            .invoke(&["run-instances", "--cli-input-json", &input_json])
            .await?;
        let instances = response
            .get("Instances")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("run-instances response has no Instances"))?;
        instances
            .iter()
            .map(|inst| {
                inst.get("InstanceId")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("launched instance missing InstanceId"))
            })
            .collect()
    }

    async fn terminate(&self, ids: &[String]) -> Result<()> {
        self.lifecycle_call("terminate-instances", ids).await
    }

    async fn start(&self, ids: &[String]) -> Result<()> {
        self.lifecycle_call("start-instances", ids).await
    }

    async fn stop(&self, ids: &[String]) -> Result<()> {
        self.lifecycle_call("stop-instances", ids).await
    }

    async fn reboot(&self, ids: &[String]) -> Result<()> {
        self.lifecycle_call("reboot-instances", ids).await
    }
}

fn reservation_instances(response: &Value) -> impl Iterator<Item = &Value> {
    response
        .get("Reservations")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|res| res.get("Instances").and_then(Value::as_array))
        .flatten()
}

/// Flatten a describe-instances response into sorted instance records.
fn parse_reservations(response: &Value) -> Result<Vec<InstanceRecord>> {
    let mut instances = Vec::new();
    for inst in reservation_instances(response) {
        let id = inst
            .get("InstanceId")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("instance missing InstanceId"))?;
        let state_name = inst
            .get("State")
            .and_then(|s| s.get("Name"))
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("instance {id} missing State.Name"))?;
        let state = LifecycleState::parse(state_name)
            .ok_or_else(|| anyhow!("instance {id} has unknown state '{state_name}'"))?;

        let field = |key: &str| {
            inst.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        instances.push(InstanceRecord::from_observed(
            id.to_string(),
            field("InstanceType").unwrap_or_default(),
            inst.get("Placement")
                .and_then(|p| p.get("AvailabilityZone"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            field("PrivateIpAddress"),
            field("PublicIpAddress"),
            field("PublicDnsName"),
            state,
        ));
    }
    sort_by_id(&mut instances);
    Ok(instances)
}

/// Build the run-instances input document from a launch spec.
///
/// A raw template overrides everything else.
fn launch_input(spec: &LaunchSpec) -> Result<Value> {
    if let Some(template) = &spec.template {
        return Ok(template.clone());
    }
    let image = spec
        .image
        .as_deref()
        .ok_or_else(|| anyhow!("launch spec has neither an image nor a template"))?;

    let mut input = json!({
        "ImageId": image,
        "InstanceType": spec.instance_type,
        "MinCount": spec.count,
        "MaxCount": spec.count,
        "TagSpecifications": [{
            "ResourceType": "instance",
            "Tags": [{"Key": "Name", "Value": spec.context}],
        }],
    });
    let doc = input
        .as_object_mut()
        .ok_or_else(|| anyhow!("launch input is not an object"))?;

    if let Some(key_pair) = &spec.key_pair {
        doc.insert("KeyName".to_string(), json!(key_pair));
    }
    if !spec.security_groups.is_empty() {
        doc.insert("SecurityGroupIds".to_string(), json!(spec.security_groups));
    }
    if spec.ebs_optimized {
        doc.insert("EbsOptimized".to_string(), json!(true));
    }

    let mut placement = serde_json::Map::new();
    if let Some(az) = &spec.availability_zone {
        placement.insert("AvailabilityZone".to_string(), json!(az));
    }
    if let Some(pg) = &spec.placement_group {
        placement.insert("GroupName".to_string(), json!(pg));
    }
    if !placement.is_empty() {
        doc.insert("Placement".to_string(), Value::Object(placement));
    }

    if spec.spot {
        doc.insert(
            "InstanceMarketOptions".to_string(),
            json!({
                "MarketType": "spot",
                "SpotOptions": {
                    "SpotInstanceType": "one-time",
                    "InstanceInterruptionBehavior": "terminate",
                },
            }),
        );
    }

    Ok(input)
}

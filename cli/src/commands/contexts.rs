//! `fleet contexts` — list context names known to the provider.

use anyhow::Result;

use crate::application::ports::FleetDirectory;
use crate::output::OutputContext;

pub async fn run(out: &OutputContext, directory: &impl FleetDirectory) -> Result<()> {
    let names = directory.list_context_names().await?;
    out.header("Contexts:");
    for (i, name) in names.iter().enumerate() {
        println!("  {i:2}  {name}");
    }
    Ok(())
}

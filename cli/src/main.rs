//! fleet - manage named groups of cloud compute instances and fan
//! ssh/rsync/scp across them.

use clap::Parser;

use fleet_cli::cli::Cli;
use fleet_cli::domain::FleetError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = cli.run().await {
        eprintln!("Error: {e}");
        let code = e
            .downcast_ref::<FleetError>()
            .map_or(1, FleetError::exit_code);
        std::process::exit(code);
    }
}

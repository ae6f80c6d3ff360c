use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use std::time::Duration;
use url::Url;

use service_node::discovery::{DiscoveryClient, HttpRegistry};

#[derive(Parser)]
#[command(name = "discovery-cli")]
#[command(about = "Read-only view of a discovery registry", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:7070")]
    registry: String,

    /// Deadline for each registry call, in milliseconds.
    #[arg(short, long, default_value_t = 2000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every instance registered under a service name
    Lookup { name: String },
    /// Print the first reachable endpoint of a service
    Endpoint { name: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let timeout = Duration::from_millis(cli.timeout_ms);
    let registry_url: Url = cli.registry.parse()?;
    let registry = HttpRegistry::new(registry_url, timeout)?;
    let client = DiscoveryClient::new(registry, timeout);

    match cli.command {
        Commands::Lookup { name } => {
            let records = client.lookup(name).records().await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Commands::Endpoint { name } => {
            let lookup = client.lookup(name);
            let wanted = lookup.name().to_string();
            let mut members = Box::pin(lookup.stream());
            match members.next().await {
                Some(record) => println!("{}", record?.endpoint()),
                None => {
                    eprintln!("No instances of {} registered", wanted);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

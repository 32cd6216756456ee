use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "kernel-cli")]
#[command(about = "Management CLI for the interception kernel", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show kernel version, configuration and cache state
    Status,
    /// Reload the kernel configuration
    Reload,
    /// Clear the current version's cache
    Clear,
    /// List workers and their pending calls
    Workers,
    /// Send a message to a worker
    Dispatch {
        /// Worker name, e.g. worker-0
        name: String,
        /// Message type, e.g. COMPUTE
        kind: String,
        /// JSON payload
        #[arg(default_value = "null")]
        payload: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let control = format!("{}/__kernel/control", cli.url);

    let res = match cli.command {
        Commands::Status => client.post(&control).json(&json!({"type": "KERNEL_STATUS"})).send().await?,
        Commands::Reload => client.post(&control).json(&json!({"type": "RELOAD_CONFIG"})).send().await?,
        Commands::Clear => client.post(&control).json(&json!({"type": "CLEAR_CACHE"})).send().await?,
        Commands::Workers => client.get(format!("{}/__kernel/workers", cli.url)).send().await?,
        Commands::Dispatch { name, kind, payload } => {
            let payload: Value = serde_json::from_str(&payload)?;
            client
                .post(format!("{}/__kernel/workers/{}", cli.url, name))
                .json(&json!({"type": kind, "payload": payload}))
                .send()
                .await?
        }
    };
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: kernel returned status {}", status);
        eprintln!("Response: {}", text);
        return Ok(());
    }

    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

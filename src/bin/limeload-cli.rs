use clap::{Parser, Subcommand};
use reqwest::Method;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "limeload-cli")]
#[command(about = "Management CLI for the limeload API", long_about = None)]
struct Cli {
    #[arg(short, long, env = "LIMELOAD_URL", default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select the next server
    Select,
    /// List healthy servers
    Servers,
    /// Show selection statistics
    Stats,
    /// Reset selection statistics
    ResetStats,
    /// Probe one server now
    Health { id: String },
    /// Remove a server from the pool
    Remove { id: String },
    /// Change a server's status (healthy, unhealthy, maintenance, unknown)
    SetStatus { id: String, status: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let (method, path, body) = match cli.command {
        Commands::Select => (Method::GET, "/select-server".to_string(), None),
        Commands::Servers => (Method::GET, "/servers".to_string(), None),
        Commands::Stats => (Method::GET, "/stats".to_string(), None),
        Commands::ResetStats => (Method::POST, "/stats/reset".to_string(), None),
        Commands::Health { id } => (Method::GET, format!("/health/{}", id), None),
        Commands::Remove { id } => (Method::DELETE, format!("/servers/{}", id), None),
        Commands::SetStatus { id, status } => (
            Method::PUT,
            format!("/servers/{}/status", id),
            Some(json!({ "status": status.to_lowercase() })),
        ),
    };

    let mut request = client.request(method, format!("{}{}", base, path));
    if let Some(body) = body {
        request = request.json(&body);
    }
    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

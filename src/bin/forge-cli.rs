use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "forge-cli")]
#[command(about = "Management CLI for the header-forge control API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8780")]
    url: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show engine status
    Status,
    /// Show the rule-match counter
    Count,
    /// Reset the rule-match counter
    ResetCount,
    /// Arm the auto-disable timer (0 clears it)
    SetTimer { minutes: u64 },
    /// Disarm the auto-disable timer
    ClearTimer,
    /// Export the profile bundle
    Export,
    /// Import a profile bundle from a JSON file
    Import { file: PathBuf },
    /// Apply an update-rules payload from a JSON file
    Apply { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/control/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Count => {
            let res = client
                .get(format!("{}/control/count", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::ResetCount => {
            let res = client
                .post(format!("{}/control/count/reset", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::SetTimer { minutes } => {
            let res = client
                .post(format!("{}/control/timer", cli.url))
                .headers(headers)
                .json(&serde_json::json!({ "minutes": minutes }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::ClearTimer => {
            let res = client
                .delete(format!("{}/control/timer", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Export => {
            let res = client
                .get(format!("{}/control/export", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Import { file } => {
            let payload = std::fs::read_to_string(file)?;
            let res = client
                .post(format!("{}/control/import", cli.url))
                .headers(headers)
                .body(payload)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Apply { file } => {
            let payload: Value = serde_json::from_str(&std::fs::read_to_string(file)?)?;
            let res = client
                .post(format!("{}/control/rules", cli.url))
                .headers(headers)
                .json(&payload)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: control API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

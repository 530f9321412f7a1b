use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "coastline-cli")]
#[command(about = "Dashboard CLI for the Coastline CMS service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, env = "COASTLINE_ADMIN_KEY", default_value = "change-me")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status
    Status,
    /// Print the merged visual config
    Config,
    /// Print the live stylesheet
    Css,
    /// Save a visual config patch from a JSON file
    Save { file: PathBuf },
    /// Preview a patch from a JSON file and print the resulting stylesheet
    Preview { file: PathBuf },
    /// Drop the current preview
    ResetPreview,
    /// Restore the default visual config
    Reset,
    /// Reload the visual config from the backend
    Reload,
    /// Show recent dashboard notifications
    Notifications,
    /// List reviews waiting for approval
    PendingReviews,
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
    let admin = |path: &str| format!("{}/admin/{}", cli.url, path);

    let res = match cli.command {
        Commands::Status => client.get(admin("status")).headers(headers).send().await?,
        Commands::Config => client.get(format!("{}/api/visual-config", cli.url)).send().await?,
        Commands::Css => {
            let res = client.get(format!("{}/theme.css", cli.url)).send().await?;
            return print_text(res).await;
        }
        Commands::Save { file } => {
            client
                .put(admin("visual-config"))
                .headers(headers)
                .json(&read_patch(&file)?)
                .send()
                .await?
        }
        Commands::Preview { file } => {
            let res = client
                .post(admin("visual-config/preview"))
                .headers(headers)
                .json(&read_patch(&file)?)
                .send()
                .await?;
            return print_text(res).await;
        }
        Commands::ResetPreview => {
            let res = client
                .delete(admin("visual-config/preview"))
                .headers(headers)
                .send()
                .await?;
            return print_text(res).await;
        }
        Commands::Reset => {
            client
                .post(admin("visual-config/reset"))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Reload => {
            client
                .post(admin("visual-config/reload"))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Notifications => {
            client
                .get(admin("notifications"))
                .headers(headers)
                .send()
                .await?
        }
        Commands::PendingReviews => {
            client
                .get(admin("reviews/pending"))
                .headers(headers)
                .send()
                .await?
        }
    };
    print_response(res).await
}

fn read_patch(file: &PathBuf) -> Result<Value, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(file)?;
    Ok(serde_json::from_str(&raw)?)
}

async fn print_text(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        eprintln!("{}", text);
        std::process::exit(1);
    }
    println!("{}", text);
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let body = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };
    if status == reqwest::StatusCode::MULTI_STATUS {
        eprintln!("Warning: save was only partially applied");
        println!("{}", body);
        std::process::exit(2);
    }
    if status.is_success() {
        println!("{}", body);
        return Ok(());
    }
    eprintln!("Error: service returned status {}", status);
    eprintln!("{}", body);
    std::process::exit(1);
}

//! Fleet Control - CLI client for the fleet compliance report service
//!
//! Renders prompts locally and submits report requests to fleetd.

mod client;
mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fleet_common::{build_report_prompt, parse_request, GenerateRequest};
use owo_colors::OwoColorize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_URL: &str = "http://127.0.0.1:8000";

#[derive(Parser)]
#[command(name = "fleetctl")]
#[command(about = "Fleet compliance report client", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the report prompt for a request file without contacting the daemon
    Prompt {
        /// Path to a GenerateRequest JSON file
        #[arg(long, short)]
        file: PathBuf,
    },

    /// Submit a request file and print the report as markdown
    Generate {
        /// Path to a GenerateRequest JSON file
        #[arg(long, short)]
        file: PathBuf,

        /// Base URL of fleetd
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,

        /// Write the markdown report here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show daemon health
    Health {
        /// Base URL of fleetd
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Prompt { file } => {
            let request = load_request(&file)?;
            println!(
                "{}",
                build_report_prompt(&request.company_info, &request.input_data)
            );
        }
        Commands::Generate { file, url, output } => {
            // Validate locally first so schema errors do not need a round trip
            let request = load_request(&file)?;
            let response = client::generate(&url, &request).await?;
            let document = render::report_markdown(&response.sections);

            match output {
                Some(path) => {
                    fs::write(&path, &document)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!(
                        "{} {} sections written to {}",
                        "✓".green(),
                        response.sections.len(),
                        path.display()
                    );
                }
                None => print!("{}", document),
            }
        }
        Commands::Health { url } => {
            let health = client::health(&url).await?;
            println!("{}", render::health_line(&health));
        }
    }

    Ok(())
}

fn load_request(path: &Path) -> Result<GenerateRequest> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_request(&bytes).with_context(|| format!("{} is not a valid report request", path.display()))
}

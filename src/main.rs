mod error;
mod export;
mod fill;
mod llm;
mod normalize;
mod pipeline;
mod record;
mod repair;
mod scrape;

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use llm::LlmClient;
use record::{Field, Record, Value};

#[derive(Parser)]
#[command(name = "rr_scraper", about = "RoyalRoad story scraper with LLM gap filling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape story pages, fill missing values, print and export records
    Scrape {
        /// RoyalRoad fiction URLs
        #[arg(required = true)]
        urls: Vec<String>,
        /// Write records to this CSV file
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Completion model used for missing-value inference
        #[arg(short, long, default_value = "gpt-4o")]
        model: String,
        /// Completion attempts per record before giving up
        #[arg(long, default_value_t = fill::DEFAULT_ATTEMPTS)]
        attempts: u32,
        /// Completion-service API key (falls back to OPENAI_API_KEY)
        #[arg(long)]
        api_key: Option<String>,
        /// Alternate completion endpoint (falls back to OPENAI_API_BASE)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Validate completion-service credentials and exit
    Check {
        /// Completion-service API key (falls back to OPENAI_API_KEY)
        #[arg(long)]
        api_key: Option<String>,
        /// Alternate completion endpoint (falls back to OPENAI_API_BASE)
        #[arg(long)]
        base_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scrape {
            urls,
            out,
            model,
            attempts,
            api_key,
            base_url,
        } => {
            let llm = build_llm_client(api_key, base_url)?;
            llm.validate_key().await?;
            let http = scrape::http_client().context("Failed to build HTTP client")?;

            let pb = ProgressBar::new(urls.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
                    .progress_chars("=> "),
            );

            let mut seen: HashSet<&str> = HashSet::new();
            let mut records = Vec::new();
            let mut errors = 0usize;

            for url in &urls {
                if !seen.insert(url.as_str()) {
                    warn!("URL {} already scraped, skipping", url);
                    pb.inc(1);
                    continue;
                }
                match pipeline::build_record(&http, &llm, url, &model, attempts).await {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        warn!("Failed to scrape {}: {}", url, e);
                        errors += 1;
                    }
                }
                pb.inc(1);
            }
            pb.finish_and_clear();

            println!("Scraped {} records ({} errors).", records.len(), errors);
            print_overview(&records);

            if let Some(path) = out {
                export::write_csv(&path, &records)?;
                println!("Wrote {} records to {}", records.len(), path.display());
            }
            Ok(())
        }
        Commands::Check { api_key, base_url } => {
            let llm = build_llm_client(api_key, base_url)?;
            llm.validate_key().await?;
            println!("Credentials accepted by {}", llm.base_url());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Explicit configuration: CLI args win, the environment is read once here
/// and passed into the client constructor.
fn build_llm_client(
    api_key: Option<String>,
    base_url: Option<String>,
) -> anyhow::Result<LlmClient> {
    let api_key = api_key
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .context("No API key: pass --api-key or set OPENAI_API_KEY")?;
    let base_url = base_url.or_else(|| std::env::var("OPENAI_API_BASE").ok());
    Ok(LlmClient::new(api_key, base_url))
}

fn print_overview(records: &[Record]) {
    if records.is_empty() {
        return;
    }

    println!(
        "{:>3} | {:<32} | {:<20} | {:>5} | {:>9} | {:>5}",
        "#", "Title", "Author", "Score", "Followers", "Pages"
    );
    println!("{}", "-".repeat(90));

    for (i, r) in records.iter().enumerate() {
        println!(
            "{:>3} | {:<32} | {:<20} | {:>5} | {:>9} | {:>5}",
            i + 1,
            truncate(&r.get(Field::Title).to_string(), 32),
            truncate(&r.get(Field::Author).to_string(), 20),
            display_cell(r.get(Field::OverallScore)),
            display_cell(r.get(Field::Followers)),
            display_cell(r.get(Field::Pages)),
        );
    }
}

fn display_cell(value: &Value) -> String {
    if value.is_absent() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

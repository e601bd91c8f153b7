use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(
    name = "gleaner",
    version,
    about = "Declarative HTML scraper for paginated event listings",
    long_about = None
)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Run only the scraper with this name
    #[arg(short, long)]
    scraper: Option<String>,

    /// Write items to stdout regardless of the configured writer
    #[arg(long)]
    stdout: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, default_value = "text")]
    log_format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    tracing::info!(
        config = %cli.config.display(),
        scraper = ?cli.scraper,
        stdout = cli.stdout,
        "gleaner starting"
    );

    commands::scrape(commands::ScrapeParams {
        config: cli.config,
        scraper: cli.scraper,
        stdout: cli.stdout,
    })
    .await?;

    tracing::info!("gleaner completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("gleaner=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("gleaner=info,warn")
    };

    // Logs go to stderr so stdout stays clean for the item stream
    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

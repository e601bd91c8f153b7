use anyhow::{Context, Result};
use futures::future::join_all;
use std::path::PathBuf;
use tokio::sync::mpsc;

use gleaner::config::Config;
use gleaner::crawler::fetcher::fetcher_for;
use gleaner::crawler::{CrawlReport, Scraper};
use gleaner::error::GleanerErrorTrait;
use gleaner::models::{Item, ScraperSpec};
use gleaner::output::{self, StdoutWriter, Writer};

pub struct ScrapeParams {
    pub config: PathBuf,
    pub scraper: Option<String>,
    pub stdout: bool,
}

/// Run the configured scrapers concurrently into one writer
pub async fn scrape(params: ScrapeParams) -> Result<()> {
    let config = Config::load(&params.config)?;

    let specs: Vec<ScraperSpec> = match &params.scraper {
        Some(name) => vec![config
            .scraper(name)
            .cloned()
            .with_context(|| format!("No scraper named '{name}' in {}", params.config.display()))?],
        None => config.scrapers.clone(),
    };

    let mut writer: Box<dyn Writer> = if params.stdout {
        Box::new(StdoutWriter::stdout())
    } else {
        output::from_config(&config.writer).context("Failed to set up writer")?
    };

    let (tx, rx) = mpsc::channel::<Item>(config.global.channel_capacity);
    let writer_task = tokio::spawn(async move { writer.write(rx).await });

    let mut handles = Vec::with_capacity(specs.len());
    for spec in specs {
        let name = spec.name.clone();
        let scraper = match Scraper::new(spec) {
            Ok(scraper) => scraper,
            Err(e) => {
                tracing::error!(
                    scraper = %name,
                    category = e.category().description(),
                    error = %e,
                    "Invalid scraper, skipping"
                );
                continue;
            }
        };
        let fetcher = fetcher_for(scraper.spec(), &config.global)
            .with_context(|| format!("Failed to create fetcher for scraper '{name}'"))?;
        let mut tx = tx.clone();

        handles.push(tokio::spawn(async move {
            scraper.run(fetcher.as_ref(), &mut tx).await
        }));
    }
    // The writer stops once every scraper has dropped its sender
    drop(tx);

    for result in join_all(handles).await {
        match result {
            Ok(report) => log_report(&report),
            Err(e) => tracing::error!(error = %e, "Scraper task failed"),
        }
    }

    let summary = writer_task.await.context("Writer task failed")??;
    tracing::info!(items = summary.items, sources = summary.sources, "All scrapers finished");

    Ok(())
}

fn log_report(report: &CrawlReport) {
    match &report.error {
        Some(e) => tracing::warn!(
            scraper = %report.scraper,
            pages = report.pages,
            emitted = report.emitted,
            category = e.category().description(),
            recoverable = e.is_recoverable(),
            error = %e,
            "Scraper stopped early"
        ),
        None => tracing::info!(
            scraper = %report.scraper,
            pages = report.pages,
            emitted = report.emitted,
            skipped = report.skipped.len(),
            "Scraper done"
        ),
    }
}

//! gleaner - declarative HTML scraper
//!
//! Extracts structured records from paginated HTML listings according to a
//! declarative field specification. Fields can live on the listing page or on
//! a linked subpage, dates can be assembled from fragments scattered over the
//! page, and records can be filtered before they are written.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`] - Scraper definitions and the extracted [`models::Item`]
//! - [`parser`] - Selector handling, text extraction and field resolution
//! - [`date`] - Date assembly from fragments, layouts and calendar names
//! - [`crawler`] - The crawl loop, page fetchers, URL resolution and filters
//! - [`output`] - Writers for stdout and HTTP APIs
//! - [`config`] - TOML configuration with environment overrides
//! - [`error`] - Unified error type
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use gleaner::crawler::fetcher::StaticFetcher;
//! use gleaner::crawler::Scraper;
//! use gleaner::models::{ElementLocation, FieldSpec, Paginator, ScraperSpec};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let spec = ScraperSpec {
//!         name: "venue".to_string(),
//!         url: "https://venue.example/program".to_string(),
//!         item: "div.event".to_string(),
//!         exclude_with_selector: Vec::new(),
//!         fields: vec![
//!             FieldSpec::text("title", ElementLocation::with_selector("h2")),
//!             FieldSpec::url("url", ElementLocation::with_selector("a")),
//!         ],
//!         filters: Vec::new(),
//!         paginator: Paginator::default(),
//!         render_js: false,
//!     };
//!
//!     let fetcher = StaticFetcher::with_config("gleaner", 2, 3, Duration::from_secs(30))?;
//!     let outcome = Scraper::new(spec)?.get_items(&fetcher).await;
//!     println!("{} items", outcome.items.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod date;
pub mod error;
pub mod models;
pub mod output;
pub mod parser;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::crawler::fetcher::{Fetcher, RenderingFetcher, StaticFetcher};
    pub use crate::crawler::{CrawlOutcome, CrawlReport, ItemSink, Scraper};
    pub use crate::error::{Error, ErrorCategory, GleanerErrorTrait, Result};
    pub use crate::models::{FieldSpec, Item, ScraperSpec, Value};
    pub use crate::output::Writer;
}

// Direct re-exports for convenience
pub use models::{Item, ScraperSpec, Value};

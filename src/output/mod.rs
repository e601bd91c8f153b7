//! Output writers
//!
//! A writer drains the item channel that all scrapers of a run feed and
//! delivers the items somewhere: JSON on stdout or a remote HTTP API.

pub mod api;
pub mod stdout;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::{WriterConfig, WriterKind};
use crate::models::Item;
use crate::utils::error::SinkError;

pub use api::ApiWriter;
pub use stdout::StdoutWriter;

/// What a writer delivered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub items: usize,
    /// Distinct `sourceUrl` values seen (only tracked by the API writer)
    pub sources: usize,
}

/// Consumer of the item stream
#[async_trait]
pub trait Writer: Send {
    /// Consume items until the channel is closed
    ///
    /// # Errors
    ///
    /// Returns a `SinkError` when delivery fails; the remaining items are not
    /// consumed.
    async fn write(&mut self, items: mpsc::Receiver<Item>) -> Result<WriteSummary, SinkError>;
}

/// Build the writer selected in the configuration
///
/// # Errors
///
/// Returns a `SinkError` if the API writer cannot be set up
pub fn from_config(config: &WriterConfig) -> Result<Box<dyn Writer>, SinkError> {
    match config.kind {
        WriterKind::Stdout => Ok(Box::new(StdoutWriter::stdout())),
        WriterKind::Api => Ok(Box::new(ApiWriter::from_config(config)?)),
    }
}

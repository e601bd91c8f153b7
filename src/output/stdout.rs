//! JSON writer for standard output

use async_trait::async_trait;
use tokio::io::{self, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::{WriteSummary, Writer};
use crate::models::Item;
use crate::utils::error::SinkError;

/// Writes every item as two-space indented JSON
///
/// HTML characters such as `<` and `&` are written as is.
pub struct StdoutWriter<W: AsyncWrite + Unpin + Send = io::Stdout> {
    out: W,
}

impl StdoutWriter<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: AsyncWrite + Unpin + Send> StdoutWriter<W> {
    /// Write to any output instead of stdout
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    async fn write_item(&mut self, item: &Item) -> Result<(), SinkError> {
        let mut json = match serde_json::to_vec_pretty(item) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(item = ?item, error = %e, "Cannot serialize item, skipping");
                return Ok(());
            }
        };
        json.push(b'\n');
        self.out.write_all(&json).await?;
        Ok(())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Writer for StdoutWriter<W> {
    async fn write(&mut self, mut items: mpsc::Receiver<Item>) -> Result<WriteSummary, SinkError> {
        let mut summary = WriteSummary::default();

        while let Some(item) = items.recv().await {
            self.write_item(&item).await?;
            summary.items += 1;
        }

        self.out.flush().await?;
        tracing::info!(items = summary.items, "Wrote items to stdout");
        Ok(summary)
    }
}

//! HTTP API writer
//!
//! Replaces the items of every source on a remote event API. For each
//! `sourceUrl` seen for the first time, the API is asked to delete that
//! source's items starting at the date of the first new item; the items are
//! then POSTed as JSON arrays in batches.
//!
//! Items of one source are expected to arrive in ascending date order.
//!
//! # Requests
//!
//! ```text
//! DELETE {uri}?sourceUrl=<source>&datetime=<YYYY-MM-DD HH:MM, UTC>   -> 200
//! POST   {uri}  [ {...}, {...} ]                                     -> 201
//! ```

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode, Url};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;

use super::{WriteSummary, Writer};
use crate::config::WriterConfig;
use crate::models::{Item, Value};
use crate::utils::error::SinkError;

/// Items per POST request
pub const BATCH_SIZE: usize = 100;

const SOURCE_FIELD: &str = "sourceUrl";
const DATE_FIELD: &str = "date";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Writer for the event API
pub struct ApiWriter {
    client: Client,
    uri: Url,
    user: String,
    password: String,
}

impl ApiWriter {
    /// # Errors
    ///
    /// `SinkError::InvalidUrl` if `uri` does not parse, `SinkError::Http` if
    /// the HTTP client cannot be created
    pub fn new(uri: &str, user: impl Into<String>, password: impl Into<String>) -> Result<Self, SinkError> {
        let uri = Url::parse(uri).map_err(|e| SinkError::InvalidUrl(format!("{uri}: {e}")))?;
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            uri,
            user: user.into(),
            password: password.into(),
        })
    }

    /// # Errors
    ///
    /// See [`ApiWriter::new`]
    pub fn from_config(config: &WriterConfig) -> Result<Self, SinkError> {
        Self::new(&config.uri, config.user.clone(), config.password.clone())
    }

    /// Delete the stored items of `source` from the date of `item` on
    async fn delete_source(&self, source: &str, item: &Item) -> Result<(), SinkError> {
        let first_date = item
            .get(DATE_FIELD)
            .and_then(Value::as_date)
            .ok_or_else(|| missing_field(DATE_FIELD, "date", item))?;
        let datetime = first_date.with_timezone(&Utc).format("%Y-%m-%d %H:%M").to_string();

        let mut url = self.uri.clone();
        url.query_pairs_mut()
            .append_pair(SOURCE_FIELD, source)
            .append_pair("datetime", &datetime);

        tracing::debug!(source, datetime, "Deleting existing items");
        let response = self
            .client
            .delete(url.clone())
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await?;

        expect_status(response, "DELETE", &url, StatusCode::OK).await
    }

    async fn post_batch(&self, batch: &[Item]) -> Result<(), SinkError> {
        tracing::debug!(items = batch.len(), "Posting batch");
        let response = self
            .client
            .post(self.uri.clone())
            .basic_auth(&self.user, Some(&self.password))
            .json(batch)
            .send()
            .await?;

        expect_status(response, "POST", &self.uri, StatusCode::CREATED).await
    }
}

#[async_trait]
impl Writer for ApiWriter {
    async fn write(&mut self, mut items: mpsc::Receiver<Item>) -> Result<WriteSummary, SinkError> {
        let mut sources: HashSet<String> = HashSet::new();
        let mut batch: Vec<Item> = Vec::with_capacity(BATCH_SIZE);
        let mut written = 0;

        while let Some(item) = items.recv().await {
            let source = item
                .get(SOURCE_FIELD)
                .and_then(Value::as_str)
                .ok_or_else(|| missing_field(SOURCE_FIELD, "string", &item))?
                .to_string();

            if !sources.contains(&source) {
                self.delete_source(&source, &item).await?;
                sources.insert(source);
            }

            batch.push(item);
            written += 1;
            if batch.len() == BATCH_SIZE {
                self.post_batch(&batch).await?;
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.post_batch(&batch).await?;
        }

        tracing::info!(items = written, sources = sources.len(), "Wrote items to the API");
        Ok(WriteSummary {
            items: written,
            sources: sources.len(),
        })
    }
}

fn missing_field(field: &'static str, expected: &'static str, item: &Item) -> SinkError {
    SinkError::MissingField {
        field,
        expected,
        item: format!("{item:?}"),
    }
}

async fn expect_status(
    response: reqwest::Response,
    method: &'static str,
    url: &Url,
    expected: StatusCode,
) -> Result<(), SinkError> {
    let status = response.status();
    if status == expected {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(SinkError::UnexpectedStatus {
        method,
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}

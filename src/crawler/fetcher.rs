//! Page retrieval
//!
//! The crawl loop only needs "give me the markup behind this URL", expressed by
//! the [`Fetcher`] trait. Two implementations are provided:
//! - [`StaticFetcher`]: plain HTTP GET with rate limiting, retries and charset
//!   detection
//! - [`RenderingFetcher`]: asks a headless browser service for the rendered
//!   DOM of pages that build their content with JavaScript

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use regex::bytes::Regex;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE},
    Client, Response,
};
use std::num::NonZeroU32;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::config::GlobalConfig;
use crate::error::GleanerErrorTrait;
use crate::models::ScraperSpec;
use crate::utils::error::FetchError;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Number of leading bytes searched for a `<meta charset>` declaration
const META_SNIFF_LEN: usize = 2048;

/// Source of page markup
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the document at `url` as text
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        (**self).fetch(url).await
    }
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Box<F> {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        (**self).fetch(url).await
    }
}

/// Pick the fetcher a scraper asks for
///
/// # Errors
///
/// Returns `FetchError::Http` if the HTTP client cannot be created
pub fn fetcher_for(spec: &ScraperSpec, global: &GlobalConfig) -> Result<Arc<dyn Fetcher>, FetchError> {
    if spec.render_js {
        Ok(Arc::new(RenderingFetcher::from_config(global)?))
    } else {
        Ok(Arc::new(StaticFetcher::from_config(global)?))
    }
}

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

fn rate_limiter(requests_per_second: u32) -> DirectLimiter {
    let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_second(rate))
}

/// Turn the last recoverable error of an exhausted retry loop into `MaxRetriesExceeded`
fn exhausted(url: &str, max_retries: u32, error: FetchError) -> FetchError {
    if max_retries > 0 && error.is_recoverable() {
        FetchError::MaxRetriesExceeded {
            url: url.to_string(),
            last_error: error.to_string(),
        }
    } else {
        error
    }
}

fn map_send_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(error)
    }
}

/// HTTP fetcher for server-rendered pages
pub struct StaticFetcher {
    /// HTTP client with configured user agent, timeout and compression
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: DirectLimiter,

    retry: RetryConfig,
}

impl StaticFetcher {
    /// Create a fetcher from the global settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn from_config(global: &GlobalConfig) -> Result<Self, FetchError> {
        Self::with_config(
            &global.user_agent,
            global.requests_per_second,
            global.max_retries,
            global.request_timeout(),
        )
    }

    /// Create a fetcher with custom configuration
    ///
    /// # Arguments
    ///
    /// * `user_agent` - Value of the User-Agent header
    /// * `requests_per_second` - Maximum number of requests per second
    /// * `max_retries` - Maximum number of retry attempts
    /// * `timeout` - Request timeout duration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_config(
        user_agent: &str,
        requests_per_second: u32,
        max_retries: u32,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(default_headers())
            .timeout(timeout)
            .gzip(true)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            rate_limiter: rate_limiter(requests_per_second),
            retry: RetryConfig::new(max_retries),
        })
    }

    /// Replace the backoff schedule
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        self.rate_limiter.until_ready().await;

        let response = self.client.get(url).send().await.map_err(map_send_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ServerError(status.as_u16()));
        }

        decode_response(response).await
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
        tracing::debug!(url, "Fetching page");

        with_retry_if(&self.retry, || self.fetch_once(url), FetchError::is_recoverable)
            .await
            .map_err(|e| exhausted(url, self.retry.max_retries, e))
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("de-DE,de;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers
}

/// Fetcher that delegates to a browserless style rendering service
///
/// Sends `POST {endpoint}/content` with `{"url": ...}` and returns the
/// rendered markup.
pub struct RenderingFetcher {
    client: Client,
    content_url: String,
    rate_limiter: DirectLimiter,
    retry: RetryConfig,
}

impl RenderingFetcher {
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn from_config(global: &GlobalConfig) -> Result<Self, FetchError> {
        Self::new(
            &global.render_endpoint,
            global.requests_per_second,
            global.max_retries,
            global.request_timeout(),
        )
    }

    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(
        endpoint: &str,
        requests_per_second: u32,
        max_retries: u32,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            content_url: format!("{}/content", endpoint.trim_end_matches('/')),
            rate_limiter: rate_limiter(requests_per_second),
            retry: RetryConfig::new(max_retries),
        })
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn render_once(&self, url: &str) -> Result<String, FetchError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .post(&self.content_url)
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ServerError(status.as_u16()));
        }

        decode_response(response).await
    }
}

#[async_trait]
impl Fetcher for RenderingFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        tracing::debug!(url, endpoint = %self.content_url, "Rendering page");

        with_retry_if(&self.retry, || self.render_once(url), FetchError::is_recoverable)
            .await
            .map_err(|e| exhausted(url, self.retry.max_retries, e))
    }
}

/// Read the body and decode it with the detected charset
async fn decode_response(response: Response) -> Result<String, FetchError> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_default();

    let bytes = response.bytes().await.map_err(map_send_error)?;
    Ok(decode_bytes(&bytes, &content_type))
}

/// Decode bytes to a string
///
/// Strategies in order:
/// 1. charset of the Content-Type header
/// 2. `<meta charset>` or `<meta http-equiv>` declaration near the start of the document
/// 3. strict UTF-8
/// 4. windows-1252, which accepts any byte sequence
///
/// A declared charset is decoded lossily: malformed sequences become U+FFFD
/// and are logged, the page is still scraped.
pub fn decode_bytes(bytes: &[u8], content_type: &str) -> String {
    let declared = charset_from_content_type(content_type).or_else(|| charset_from_meta(bytes));

    if let Some(encoding) = declared {
        let (text, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            tracing::warn!(
                charset = encoding.name(),
                "Content has malformed sequences, replaced with U+FFFD"
            );
        }
        return text.into_owned();
    }

    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        return text.into_owned();
    }

    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text.into_owned()
}

fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, value)| Encoding::for_label(value.trim().trim_matches('"').as_bytes()))
}

fn charset_from_meta(bytes: &[u8]) -> Option<&'static Encoding> {
    static META_CHARSET: OnceLock<Option<Regex>> = OnceLock::new();

    let regex = META_CHARSET
        .get_or_init(|| Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([A-Za-z0-9_\-:.]+)"#).ok())
        .as_ref()?;

    let head = &bytes[..bytes.len().min(META_SNIFF_LEN)];
    regex
        .captures(head)
        .and_then(|c| c.get(1))
        .and_then(|m| Encoding::for_label(m.as_bytes()))
}

//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use gleaner::crawler::fetcher::Fetcher;
use gleaner::models::{ElementLocation, FieldSpec, Paginator, ScraperSpec};
use gleaner::utils::error::FetchError;
use std::collections::HashMap;
use std::sync::Mutex;

pub const PROGRAM_URL: &str = "https://venue.test/programm";

pub const PAGE_1: &str = include_str!("../fixtures/html/program_page1.html");
pub const PAGE_2: &str = include_str!("../fixtures/html/program_page2.html");
pub const PAGE_3: &str = include_str!("../fixtures/html/program_page3.html");
pub const EVENT_DETAIL: &str = include_str!("../fixtures/html/event_detail.html");

/// Fetcher serving pages from memory and recording every request
///
/// Unknown URLs answer with a 404.
#[derive(Default)]
pub struct MapFetcher {
    pages: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl MapFetcher {
    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    /// The three program pages, linked through `?page=N`
    pub fn program() -> Self {
        Self::default()
            .with_page(PROGRAM_URL, PAGE_1)
            .with_page(&format!("{PROGRAM_URL}?page=2"), PAGE_2)
            .with_page(&format!("{PROGRAM_URL}?page=3"), PAGE_3)
    }

    /// Every requested URL, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// How often `url` was requested
    pub fn count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == url).count()
    }
}

#[async_trait]
impl Fetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or(FetchError::ServerError(404))
    }
}

/// Scraper over the program fixtures with title and link fields
pub fn program_spec() -> ScraperSpec {
    ScraperSpec {
        name: "venue".to_string(),
        url: PROGRAM_URL.to_string(),
        item: "div.event".to_string(),
        exclude_with_selector: vec![".cancelled".to_string()],
        fields: vec![
            FieldSpec::text("title", ElementLocation::with_selector("h2.title")),
            FieldSpec::url("url", ElementLocation::with_selector("a.more")),
        ],
        filters: Vec::new(),
        paginator: Paginator {
            location: ElementLocation::with_selector("a.next"),
            max_pages: 0,
        },
        render_js: false,
    }
}

/// Titles of the given items, in order
pub fn titles(items: &[gleaner::Item]) -> Vec<String> {
    items.iter().map(|item| item["title"].to_string()).collect()
}

//! Crawl loop
//!
//! A [`Scraper`] walks the pages of one [`ScraperSpec`]: fetch a page, resolve
//! every item on it, follow subpages where fields ask for them, filter, strip
//! hidden fields and hand the result to an [`ItemSink`]. Then it follows the
//! paginator to the next page.
//!
//! Parsed documents are confined to synchronous helpers, so a running scraper
//! is a `Send` future and can be spawned on the runtime.

pub mod fetcher;
pub mod filter;
pub mod url;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::date::overlapping_part;
use crate::error::{self, Error, GleanerErrorTrait};
use crate::models::{Item, ScraperSpec, Value};
use crate::parser::item::{
    resolve_main_fields, resolve_subpage_fields, subpage_urls, FieldFailure, SubpageCache,
};
use crate::parser::selectors::{parse_selector, ExclusionSet};
use crate::utils::error::{ExtractError, SpecError};
use fetcher::Fetcher;
use filter::{strip_hidden, FilterSet};

/// Receiver of the items a scraper produces, in document order
#[async_trait]
pub trait ItemSink: Send {
    /// # Errors
    ///
    /// `Error::SinkClosed` when the receiving side is gone
    async fn accept(&mut self, item: Item) -> error::Result<()>;
}

#[async_trait]
impl ItemSink for Vec<Item> {
    async fn accept(&mut self, item: Item) -> error::Result<()> {
        self.push(item);
        Ok(())
    }
}

#[async_trait]
impl ItemSink for mpsc::Sender<Item> {
    async fn accept(&mut self, item: Item) -> error::Result<()> {
        self.send(item).await.map_err(|_| Error::SinkClosed)
    }
}

/// An item dropped because one of its fields could not be resolved
#[derive(Debug)]
pub struct SkippedItem {
    pub page_url: String,
    pub field: String,
    pub error: ExtractError,
    /// Fields resolved before the failure
    pub partial: Item,
}

/// Summary of one scraper run
#[derive(Debug)]
pub struct CrawlReport {
    pub scraper: String,
    /// Pages fetched successfully
    pub pages: usize,
    pub emitted: usize,
    /// Items matching an exclusion selector
    pub excluded: usize,
    /// Items dropped by filters
    pub filtered: usize,
    pub skipped: Vec<SkippedItem>,
    /// Error that ended the run early
    pub error: Option<Error>,
}

impl CrawlReport {
    fn new(scraper: &str) -> Self {
        Self {
            scraper: scraper.to_string(),
            pages: 0,
            emitted: 0,
            excluded: 0,
            filtered: 0,
            skipped: Vec::new(),
            error: None,
        }
    }

    /// Whether the run reached the end of pagination
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Items collected in memory together with the run summary
#[derive(Debug)]
pub struct CrawlOutcome {
    pub items: Vec<Item>,
    pub report: CrawlReport,
}

/// Result of scanning one listing page
#[derive(Default)]
struct PageScan {
    /// Items with their main page fields resolved
    pending: Vec<Item>,
    skipped: Vec<SkippedItem>,
    excluded: usize,
    next_url: Option<String>,
}

enum ItemOutcome {
    Keep(Item),
    Filtered,
    Skipped(SkippedItem),
}

/// A validated scraper definition, ready to run
pub struct Scraper {
    spec: ScraperSpec,
    item_selector: Selector,
    exclusions: ExclusionSet,
    filters: FilterSet,
}

impl Scraper {
    /// Validate `spec` and compile its selectors and filters
    ///
    /// # Errors
    ///
    /// Returns a `SpecError` for duplicate field names, selectors or filter
    /// regexes that do not compile, subpage fields whose source is not a main
    /// page field, and date fields covering a part in two components.
    pub fn new(spec: ScraperSpec) -> Result<Self, SpecError> {
        check_field_names(&spec)?;
        check_date_components(&spec)?;
        check_field_selectors(&spec)?;

        let item_selector = compile_selector(&spec.name, &spec.item)?;
        let exclusions = spec
            .exclude_with_selector
            .iter()
            .map(|s| compile_selector(&spec.name, s))
            .collect::<Result<Vec<_>, _>>()?;
        if !spec.paginator.location.selector.trim().is_empty() {
            compile_selector(&spec.name, &spec.paginator.location.selector)?;
        }
        let filters = FilterSet::compile(&spec.name, &spec.filters)?;

        Ok(Self {
            spec,
            item_selector,
            exclusions: ExclusionSet::new(exclusions),
            filters,
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &ScraperSpec {
        &self.spec
    }

    /// Run the scraper, collecting the items in memory
    pub async fn get_items<F: Fetcher + ?Sized>(&self, fetcher: &F) -> CrawlOutcome {
        let mut items = Vec::new();
        let report = self.run(fetcher, &mut items).await;
        CrawlOutcome { items, report }
    }

    /// Run the scraper, handing every kept item to `sink`
    ///
    /// A page that cannot be fetched or a closed sink ends the run; items
    /// delivered before that stay delivered and the error is recorded in the
    /// report. Items whose fields fail are skipped and the run goes on.
    pub async fn run<F, S>(&self, fetcher: &F, sink: &mut S) -> CrawlReport
    where
        F: Fetcher + ?Sized,
        S: ItemSink + ?Sized,
    {
        let scraper = self.spec.name.as_str();
        let max_pages = self.spec.paginator.max_pages;
        let mut report = CrawlReport::new(scraper);
        let mut visited = HashSet::new();
        let mut current = self.spec.url.clone();

        info!(scraper, url = %current, max_pages, "Starting scraper");

        loop {
            visited.insert(current.clone());

            let body = match fetcher.fetch(&current).await {
                Ok(body) => body,
                Err(e) => {
                    error!(
                        scraper,
                        url = %current,
                        category = e.category().description(),
                        error = %e,
                        "Failed to fetch page, stopping"
                    );
                    report.error = Some(e.into());
                    break;
                }
            };
            report.pages += 1;

            let scan = self.scan_page(&current, &body);
            debug!(
                scraper,
                page = report.pages,
                items = scan.pending.len(),
                excluded = scan.excluded,
                "Scanned page"
            );
            report.excluded += scan.excluded;
            report.skipped.extend(scan.skipped);

            for item in scan.pending {
                match self.complete_item(fetcher, &current, item).await {
                    ItemOutcome::Keep(item) => {
                        if let Err(e) = sink.accept(item).await {
                            warn!(scraper, error = %e, "Item sink closed, stopping");
                            report.error = Some(e);
                            return finish(report);
                        }
                        report.emitted += 1;
                    }
                    ItemOutcome::Filtered => report.filtered += 1,
                    ItemOutcome::Skipped(skipped) => report.skipped.push(skipped),
                }
            }

            let Some(next) = scan.next_url else {
                debug!(scraper, page = report.pages, "No next page");
                break;
            };
            if max_pages > 0 && report.pages >= max_pages {
                debug!(scraper, page = report.pages, max_pages, "Reached maximum pages limit");
                break;
            }
            if visited.contains(&next) {
                warn!(scraper, url = %next, "Next page was already visited, stopping");
                break;
            }
            current = next;
        }

        finish(report)
    }

    /// Resolve the main page fields of every item and find the next page
    fn scan_page(&self, page_url: &str, body: &str) -> PageScan {
        let document = Html::parse_document(body);
        let mut scan = PageScan::default();

        for node in document.select(&self.item_selector) {
            if self.exclusions.excludes(node) {
                scan.excluded += 1;
                continue;
            }
            match resolve_main_fields(&self.spec.fields, node, page_url) {
                Ok(item) => scan.pending.push(item),
                Err(failure) => scan.skipped.push(self.skip(page_url, failure)),
            }
        }

        scan.next_url = self.next_page_url(document.root_element(), page_url);
        scan
    }

    fn next_page_url(&self, root: ElementRef<'_>, page_url: &str) -> Option<String> {
        let location = &self.spec.paginator.location;
        if location.selector.trim().is_empty() {
            return None;
        }

        match url::extract_url(location, root, page_url) {
            Ok(next) if !next.is_empty() => Some(next),
            Ok(_) => None,
            Err(e) => {
                warn!(scraper = %self.spec.name, error = %e, "Cannot read next page URL");
                None
            }
        }
    }

    /// Fetch the item's subpages, resolve the remaining fields and apply filters
    async fn complete_item<F: Fetcher + ?Sized>(&self, fetcher: &F, page_url: &str, item: Item) -> ItemOutcome {
        let urls = match subpage_urls(&self.spec.fields, &item) {
            Ok(urls) => urls,
            Err(failure) => return ItemOutcome::Skipped(self.skip(page_url, failure)),
        };

        let mut bodies = Vec::with_capacity(urls.len());
        for url in urls {
            match fetcher.fetch(&url).await {
                Ok(body) => bodies.push((url, body)),
                Err(source) => {
                    let failure = FieldFailure {
                        field: self.field_reading(&url, &item).unwrap_or_default(),
                        error: ExtractError::Subpage { url, source },
                        partial: item,
                    };
                    return ItemOutcome::Skipped(self.skip(page_url, failure));
                }
            }
        }

        self.finish_item(page_url, item, bodies)
    }

    fn finish_item(&self, page_url: &str, mut item: Item, bodies: Vec<(String, String)>) -> ItemOutcome {
        if !bodies.is_empty() {
            let cache = SubpageCache::parse(bodies);
            if let Err(failure) = resolve_subpage_fields(&self.spec.fields, &mut item, &cache) {
                return ItemOutcome::Skipped(self.skip(page_url, failure));
            }
        }

        if !self.filters.keep(&item) {
            debug!(scraper = %self.spec.name, item = ?item, "Item filtered out");
            return ItemOutcome::Filtered;
        }

        strip_hidden(&mut item, &self.spec.fields);
        ItemOutcome::Keep(item)
    }

    /// Name of the first subpage field reading from `url`
    fn field_reading(&self, url: &str, item: &Item) -> Option<String> {
        self.spec
            .fields
            .iter()
            .find(|field| {
                field
                    .subpage_source()
                    .and_then(|source| item.get(source))
                    .and_then(Value::as_str)
                    == Some(url)
            })
            .map(|field| field.name.clone())
    }

    fn skip(&self, page_url: &str, failure: FieldFailure) -> SkippedItem {
        warn!(
            scraper = %self.spec.name,
            field = %failure.field,
            category = failure.error.category().description(),
            recoverable = failure.error.is_recoverable(),
            error = %failure.error,
            partial = ?failure.partial,
            "Skipping item"
        );
        SkippedItem {
            page_url: page_url.to_string(),
            field: failure.field,
            error: failure.error,
            partial: failure.partial,
        }
    }
}

fn finish(report: CrawlReport) -> CrawlReport {
    info!(
        scraper = %report.scraper,
        pages = report.pages,
        emitted = report.emitted,
        excluded = report.excluded,
        filtered = report.filtered,
        skipped = report.skipped.len(),
        complete = report.is_complete(),
        "Scraper finished"
    );
    report
}

fn compile_selector(scraper: &str, selector: &str) -> Result<Selector, SpecError> {
    parse_selector(selector).map_err(|e| match e {
        ExtractError::InvalidSelector { selector, reason } => SpecError::InvalidSelector {
            scraper: scraper.to_string(),
            selector,
            reason,
        },
        other => SpecError::InvalidSelector {
            scraper: scraper.to_string(),
            selector: selector.to_string(),
            reason: other.to_string(),
        },
    })
}

/// Field names are unique and subpage fields read from main page fields
fn check_field_names(spec: &ScraperSpec) -> Result<(), SpecError> {
    let mut seen = HashSet::new();
    for field in &spec.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(SpecError::DuplicateField {
                scraper: spec.name.clone(),
                field: field.name.clone(),
            });
        }
    }

    let main_page: HashSet<&str> = spec
        .fields
        .iter()
        .filter(|f| f.subpage_source().is_none())
        .map(|f| f.name.as_str())
        .collect();

    for field in &spec.fields {
        if let Some(source) = field.subpage_source() {
            if !main_page.contains(source) {
                return Err(SpecError::UnknownSubpageField {
                    scraper: spec.name.clone(),
                    field: field.name.clone(),
                    source_field: source.to_string(),
                });
            }
        }
    }

    Ok(())
}

/// No two components of a date field cover the same part
fn check_date_components(spec: &ScraperSpec) -> Result<(), SpecError> {
    for field in &spec.fields {
        if let Some(part) = overlapping_part(&field.components) {
            return Err(SpecError::DateComponentOverlap {
                scraper: spec.name.clone(),
                field: field.name.clone(),
                part,
            });
        }
    }
    Ok(())
}

/// Field and date component selectors compile; empty ones select nothing
fn check_field_selectors(spec: &ScraperSpec) -> Result<(), SpecError> {
    let locations = spec.fields.iter().flat_map(|field| {
        std::iter::once(&field.location).chain(field.components.iter().map(|c| &c.location))
    });
    for location in locations {
        if !location.selector.trim().is_empty() {
            compile_selector(&spec.name, &location.selector)?;
        }
    }
    Ok(())
}

//! CSS selector compilation and item exclusion
//!
//! Selectors come from scraper definitions, so they are compiled at runtime and
//! compilation failures are reported as errors instead of panicking.

use scraper::{ElementRef, Selector};

use crate::utils::error::ExtractError;

/// Compile a selector, mapping failures to a field-level error
pub fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{e:?}"),
    })
}

/// Descendants of `scope` matched by `selector`, in document order
///
/// An empty selector matches nothing.
pub fn select_all<'a>(scope: ElementRef<'a>, selector: &str) -> Result<Vec<ElementRef<'a>>, ExtractError> {
    if selector.trim().is_empty() {
        return Ok(Vec::new());
    }
    let selector = parse_selector(selector)?;
    Ok(scope.select(&selector).collect())
}

/// Compiled exclusion selectors of a scraper
#[derive(Debug, Default)]
pub struct ExclusionSet {
    selectors: Vec<Selector>,
}

impl ExclusionSet {
    pub fn new(selectors: Vec<Selector>) -> Self {
        Self { selectors }
    }

    /// Whether the item node matches or contains any exclusion selector
    pub fn excludes(&self, item: ElementRef<'_>) -> bool {
        self.selectors
            .iter()
            .any(|selector| selector.matches(&item) || item.select(selector).next().is_some())
    }
}

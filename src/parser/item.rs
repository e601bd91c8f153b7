//! Field dispatcher and per-item subpage cache
//!
//! Item resolution happens in two steps so that parsed documents never live
//! across an await point:
//! 1. [`resolve_main_fields`] resolves every field found on the listing page
//!    and [`subpage_urls`] lists the distinct subpages the item needs.
//! 2. Once the caller has fetched those bodies, [`SubpageCache::parse`] parses
//!    each one once and [`resolve_subpage_fields`] fills in the remaining
//!    fields.

use scraper::{ElementRef, Html};
use std::collections::HashMap;

use crate::crawler::url::extract_url;
use crate::date::resolve_date;
use crate::models::{FieldKind, FieldSpec, Item, Value};
use crate::parser::text::extract_text;
use crate::utils::error::ExtractError;

/// Resolve one field against `scope`
///
/// Static fields copy their literal, dynamic fields dispatch on their type. An
/// empty URL falls back to `page_url`.
///
/// # Errors
///
/// `ExtractError::EmptyField` for an empty text field that may not be empty,
/// and whatever the extraction primitives report.
pub fn resolve_field(field: &FieldSpec, scope: ElementRef<'_>, page_url: &str) -> Result<Value, ExtractError> {
    match field.kind() {
        FieldKind::Static(value) => Ok(Value::Text(value.to_string())),
        FieldKind::Text(location) => {
            let text = extract_text(location, scope)?;
            if text.is_empty() && !field.can_be_empty {
                return Err(ExtractError::EmptyField {
                    field: field.name.clone(),
                });
            }
            Ok(Value::Text(text))
        }
        FieldKind::Url(location) => {
            let url = extract_url(location, scope, page_url)?;
            if url.is_empty() {
                Ok(Value::Url(page_url.to_string()))
            } else {
                Ok(Value::Url(url))
            }
        }
        FieldKind::Date(_) => Ok(Value::Date(resolve_date(field, scope)?)),
    }
}

/// A field failed and the item it belongs to is dropped
#[derive(Debug)]
pub struct FieldFailure {
    pub field: String,
    pub error: ExtractError,
    /// Fields resolved before the failure
    pub partial: Item,
}

impl FieldFailure {
    fn new(field: &FieldSpec, error: ExtractError, partial: &Item) -> Self {
        Self {
            field: field.name.clone(),
            error,
            partial: partial.clone(),
        }
    }
}

/// Resolve every field that lives on the listing page, in declaration order
pub fn resolve_main_fields(
    fields: &[FieldSpec],
    scope: ElementRef<'_>,
    page_url: &str,
) -> Result<Item, FieldFailure> {
    let mut item = Item::new();

    for field in fields.iter().filter(|f| f.subpage_source().is_none()) {
        match resolve_field(field, scope, page_url) {
            Ok(value) => {
                item.insert(field.name.clone(), value);
            }
            Err(error) => return Err(FieldFailure::new(field, error, &item)),
        }
    }

    Ok(item)
}

/// URL a subpage field reads from, taken from the already resolved `item`
fn subpage_url<'a>(field: &FieldSpec, source: &str, item: &'a Item) -> Result<&'a str, ExtractError> {
    item.get(source)
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ExtractError::MissingSubpageUrl {
            field: field.name.clone(),
            source_field: source.to_string(),
        })
}

/// Distinct subpage URLs `item` needs, in order of first reference
pub fn subpage_urls(fields: &[FieldSpec], item: &Item) -> Result<Vec<String>, FieldFailure> {
    let mut urls: Vec<String> = Vec::new();

    for field in fields {
        let Some(source) = field.subpage_source() else {
            continue;
        };
        let url = subpage_url(field, source, item).map_err(|e| FieldFailure::new(field, e, item))?;
        if !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
    }

    Ok(urls)
}

/// Parsed subpages of the item currently being resolved, keyed by URL
///
/// Built fresh for every item and dropped with it, so two items linking to the
/// same subpage each fetch it.
#[derive(Default)]
pub struct SubpageCache {
    documents: HashMap<String, Html>,
}

impl SubpageCache {
    /// Parse each fetched body once
    pub fn parse(bodies: Vec<(String, String)>) -> Self {
        let documents = bodies
            .into_iter()
            .map(|(url, body)| {
                let document = Html::parse_document(&body);
                (url, document)
            })
            .collect();
        Self { documents }
    }

    pub fn get(&self, url: &str) -> Option<&Html> {
        self.documents.get(url)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Resolve the fields living on subpages, in declaration order
///
/// Each field is resolved against the root of its subpage, with relative URLs
/// resolved against the subpage's own URL.
pub fn resolve_subpage_fields(
    fields: &[FieldSpec],
    item: &mut Item,
    cache: &SubpageCache,
) -> Result<(), FieldFailure> {
    for field in fields {
        let Some(source) = field.subpage_source() else {
            continue;
        };

        let url = match subpage_url(field, source, item) {
            Ok(url) => url.to_string(),
            Err(error) => return Err(FieldFailure::new(field, error, item)),
        };
        let Some(document) = cache.get(&url) else {
            let error = ExtractError::MissingSubpageUrl {
                field: field.name.clone(),
                source_field: source.to_string(),
            };
            return Err(FieldFailure::new(field, error, item));
        };

        match resolve_field(field, document.root_element(), &url) {
            Ok(value) => {
                item.insert(field.name.clone(), value);
            }
            Err(error) => return Err(FieldFailure::new(field, error, item)),
        }
    }

    Ok(())
}

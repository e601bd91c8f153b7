//! Item filtering and hidden field removal

use regex::Regex;

use crate::models::{FieldSpec, Filter, Item};
use crate::utils::error::SpecError;

#[derive(Debug)]
struct CompiledFilter {
    field: String,
    regex: Regex,
}

impl CompiledFilter {
    /// `None` when the item has no such field
    fn matches(&self, item: &Item) -> Option<bool> {
        item.get(&self.field)
            .map(|value| self.regex.is_match(&value.to_string()))
    }
}

/// Compiled filters of one scraper
///
/// An item is kept when at least one applicable `match = true` filter matches
/// (vacuously true when none applies) and no `match = false` filter matches.
/// Filters on fields the item does not have are ignored.
#[derive(Debug, Default)]
pub struct FilterSet {
    required: Vec<CompiledFilter>,
    excluding: Vec<CompiledFilter>,
}

impl FilterSet {
    /// # Errors
    ///
    /// `SpecError::InvalidFilterRegex` for the first pattern that does not compile
    pub fn compile(scraper: &str, filters: &[Filter]) -> Result<Self, SpecError> {
        let mut set = Self::default();

        for filter in filters {
            let regex = Regex::new(&filter.regex).map_err(|source| SpecError::InvalidFilterRegex {
                scraper: scraper.to_string(),
                pattern: filter.regex.clone(),
                source,
            })?;
            let compiled = CompiledFilter {
                field: filter.field.clone(),
                regex,
            };
            if filter.must_match {
                set.required.push(compiled);
            } else {
                set.excluding.push(compiled);
            }
        }

        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.excluding.is_empty()
    }

    pub fn keep(&self, item: &Item) -> bool {
        let mut applicable = 0;
        let mut any_required_match = false;
        for filter in &self.required {
            if let Some(matched) = filter.matches(item) {
                applicable += 1;
                any_required_match |= matched;
            }
        }

        let excluded = self
            .excluding
            .iter()
            .any(|filter| filter.matches(item) == Some(true));

        (applicable == 0 || any_required_match) && !excluded
    }
}

/// Remove the fields marked `hide`
pub fn strip_hidden(item: &mut Item, fields: &[FieldSpec]) {
    for field in fields.iter().filter(|f| f.hide) {
        item.remove(&field.name);
    }
}

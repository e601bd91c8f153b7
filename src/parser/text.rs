//! Text extraction primitive
//!
//! Shared by text fields and date components: locate a node, read an attribute,
//! the whole subtree text or a single direct text child, then trim, apply the
//! optional regex extraction and truncate.

use regex::Regex;
use scraper::ElementRef;

use crate::models::{AttributePolicy, ElementLocation, RegexExtract};
use crate::parser::selectors::select_all;
use crate::utils::error::ExtractError;
use crate::utils::truncate_text;

/// Extract the string identified by `location` below `scope`
///
/// Returns an empty string when fewer than `node_index + 1` nodes match and no
/// regex is configured.
///
/// # Errors
///
/// Returns `ExtractError::InvalidSelector` or `ExtractError::InvalidRegex` for a
/// broken location, `ExtractError::NoRegexMatch` or
/// `ExtractError::RegexIndexOutOfBounds` when the regex step misses.
pub fn extract_text(location: &ElementLocation, scope: ElementRef<'_>) -> Result<String, ExtractError> {
    let nodes = select_all(scope, &location.selector)?;

    let mut raw = String::new();
    if let Some(node) = nodes.get(location.node_index) {
        match location.attribute() {
            Some(attr) => {
                let source = match location.attribute_policy {
                    AttributePolicy::FirstMatch => nodes[0],
                    AttributePolicy::NodeIndex => *node,
                };
                raw = source.value().attr(attr).unwrap_or_default().to_string();
            }
            None if location.entire_subtree => {
                raw = node.text().collect();
            }
            None => {
                if let Some(found) = child_text(location, *node)? {
                    return Ok(found);
                }
            }
        }
    }

    finish(location, &raw)
}

/// Walk the direct children of `node` looking for the configured text child
///
/// `Ok(Some)` is a final value. `Ok(None)` means no text child was selected and
/// the caller falls back to the empty string.
fn child_text(location: &ElementLocation, node: ElementRef<'_>) -> Result<Option<String>, ExtractError> {
    let scan_all = location.scans_all_children();

    for (offset, child) in node.children().enumerate() {
        let selected = scan_all || i64::try_from(offset).is_ok_and(|o| o == location.child_index);
        if !selected {
            continue;
        }
        let Some(text) = child.value().as_text() else {
            continue;
        };
        match finish(location, text) {
            Ok(value) => return Ok(Some(value)),
            Err(e) if !scan_all => return Err(e),
            Err(_) => {}
        }
    }

    Ok(None)
}

/// Trim, extract by regex, truncate
fn finish(location: &ElementLocation, raw: &str) -> Result<String, ExtractError> {
    let extracted = extract_regex(&location.regex_extract, raw.trim())?;
    Ok(truncate_text(&extracted, location.max_length))
}

/// Apply a regex extraction to `text`
///
/// Without a pattern the text is returned unchanged. Index `-1` selects the last
/// match.
///
/// # Errors
///
/// `ExtractError::InvalidRegex` if the pattern does not compile,
/// `ExtractError::NoRegexMatch` if nothing matches,
/// `ExtractError::RegexIndexOutOfBounds` if the index names no match.
pub fn extract_regex(config: &RegexExtract, text: &str) -> Result<String, ExtractError> {
    if !config.is_enabled() {
        return Ok(text.to_string());
    }

    let regex = Regex::new(&config.exp).map_err(|source| ExtractError::InvalidRegex {
        pattern: config.exp.clone(),
        source,
    })?;

    let matches: Vec<&str> = regex.find_iter(text).map(|m| m.as_str()).collect();
    if matches.is_empty() {
        return Err(ExtractError::NoRegexMatch {
            pattern: config.exp.clone(),
        });
    }

    let selected = if config.index == -1 {
        matches.last()
    } else {
        usize::try_from(config.index)
            .ok()
            .and_then(|i| matches.get(i))
    };

    selected
        .map(|s| (*s).to_string())
        .ok_or_else(|| ExtractError::RegexIndexOutOfBounds {
            pattern: config.exp.clone(),
            index: config.index,
            matches: matches.len(),
        })
}

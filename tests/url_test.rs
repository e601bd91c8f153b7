//! Integration tests for URL extraction and resolution

mod common;

use gleaner::crawler::url::{extract_url, resolve_url};
use gleaner::models::ElementLocation;
use proptest::prelude::*;
use scraper::Html;

/// Test next page extraction from the program fixture
#[test]
fn test_next_link_from_fixture() {
    let document = Html::parse_document(common::PAGE_1);
    let location = ElementLocation::with_selector("a.next");

    let next = extract_url(&location, document.root_element(), common::PROGRAM_URL).unwrap();

    assert_eq!(next, "https://venue.test/programm?page=2");
}

/// Test that the last program page has no next link
#[test]
fn test_no_next_link_on_last_page() {
    let document = Html::parse_document(common::PAGE_3);
    let location = ElementLocation::with_selector("a.next");

    let next = extract_url(&location, document.root_element(), "https://venue.test/programm?page=3").unwrap();

    assert!(next.is_empty());
}

/// Test reading a non-default attribute
#[test]
fn test_extract_src_attribute() {
    let document = Html::parse_document(common::EVENT_DETAIL);
    let location = ElementLocation {
        attr: Some("src".to_string()),
        ..ElementLocation::with_selector("img.poster")
    };

    let url = extract_url(&location, document.root_element(), "https://venue.test/events/1").unwrap();

    assert_eq!(url, "https://venue.test/img/poster.jpg");
}

#[test]
fn test_resolution_cases() {
    let base = "https://venue.test:8443/de/programm?page=1";

    assert_eq!(resolve_url("/events/7", base), "https://venue.test:8443/events/7");
    assert_eq!(resolve_url("events/7", base), "https://venue.test:8443/events/7");
    assert_eq!(resolve_url("?page=2", base), "https://venue.test:8443/de/programm?page=2");
    assert_eq!(resolve_url("//cdn.test/a.jpg", base), "https://cdn.test/a.jpg");
    assert_eq!(resolve_url("  ", base), "");
}

proptest! {
    /// Absolute URLs pass through unchanged
    #[test]
    fn prop_absolute_urls_unchanged(host in "[a-z]{1,12}", path in "[a-z0-9/]{0,20}") {
        let absolute = format!("https://{host}.test/{path}");
        prop_assert_eq!(resolve_url(&absolute, "https://venue.test/programm"), absolute);
    }

    /// Root-relative paths land on the page's origin
    #[test]
    fn prop_root_relative_keeps_origin(path in "/[a-z0-9]{1,12}(/[a-z0-9]{1,8}){0,3}") {
        let resolved = resolve_url(&path, "http://venue.test/a/b");
        prop_assert!(resolved.starts_with("http://venue.test/"));
        prop_assert!(resolved.ends_with(&path));
        prop_assert!(!resolved.contains("//venue.test//"));
    }
}

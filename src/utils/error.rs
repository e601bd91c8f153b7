//! Error types for the gleaner engine
//!
//! This module defines the domain error types used throughout the application.

use thiserror::Error;

use crate::models::DatePart;

/// Errors that can occur while fetching a page
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Maximum retry attempts exceeded
    #[error("Maximum retry attempts exceeded for {url}: {last_error}")]
    MaxRetriesExceeded { url: String, last_error: String },

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Errors raised while resolving a single field of an item
#[derive(Error, Debug)]
pub enum ExtractError {
    /// CSS selector could not be compiled
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// Extraction regex could not be compiled
    #[error("Invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Regex found nothing in the extracted text
    #[error("No matching strings found for regex: {pattern}")]
    NoRegexMatch { pattern: String },

    /// Regex index does not name an existing match
    #[error("Regex index out of bounds. Regex '{pattern}' gave only {matches} matches, index {index} requested")]
    RegexIndexOutOfBounds {
        pattern: String,
        index: i64,
        matches: usize,
    },

    /// Required field resolved to an empty string
    #[error("Field {field} cannot be empty")]
    EmptyField { field: String },

    /// Subpage field references a field that holds no URL
    #[error("Field {field} references subpage field {source_field} which has no value")]
    MissingSubpageUrl { field: String, source_field: String },

    /// Subpage could not be fetched
    #[error("Failed to fetch subpage {url}: {source}")]
    Subpage {
        url: String,
        #[source]
        source: FetchError,
    },

    /// Date assembly failed
    #[error("Date error: {0}")]
    Date(#[from] DateError),
}

/// Errors raised by the date assembly algorithm
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// `date_location` is not a known time zone
    #[error("Unknown time zone: {0}")]
    UnknownTimeZone(String),

    /// `date_language` has no calendar name table
    #[error("Unsupported date language: {0}")]
    UnsupportedLanguage(String),

    /// Two components claim the same calendar part
    #[error("Date parsing error: '{0}' covered at least twice")]
    PartCoveredTwice(DatePart),

    /// Neither components nor defaults provide day and month
    #[error("Date parsing error: to generate a date at least a day and a month is needed")]
    MissingDayOrMonth,

    /// A fragment had no layout to parse it with
    #[error("Date parsing error: no layouts configured")]
    NoLayouts,

    /// Assembled text does not fit the layout
    #[error("Cannot parse '{value}' as '{layout}': {reason}")]
    Layout {
        layout: String,
        value: String,
        reason: String,
    },

    /// Parsed wall-clock time does not exist in the zone
    #[error("Local time {0} does not exist in the configured time zone")]
    NonexistentLocalTime(String),
}

/// Errors in a scraper definition, detected before the crawl starts
#[derive(Error, Debug)]
pub enum SpecError {
    /// Two fields share a name
    #[error("Scraper {scraper}: field name '{field}' is used more than once")]
    DuplicateField { scraper: String, field: String },

    /// Item, field or paginator selector could not be compiled
    #[error("Scraper {scraper}: invalid selector '{selector}': {reason}")]
    InvalidSelector {
        scraper: String,
        selector: String,
        reason: String,
    },

    /// Filter regex could not be compiled
    #[error("Scraper {scraper}: invalid filter regex '{pattern}': {source}")]
    InvalidFilterRegex {
        scraper: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// `on_subpage` names a field that is not resolved on the main page
    #[error("Scraper {scraper}: field {field} is on subpage '{source_field}' which is not a main page field")]
    UnknownSubpageField {
        scraper: String,
        field: String,
        source_field: String,
    },

    /// Two components of one date field claim the same calendar part
    #[error("Scraper {scraper}: date field {field} covers '{part}' in more than one component")]
    DateComponentOverlap {
        scraper: String,
        field: String,
        part: DatePart,
    },
}

/// Errors raised by output writers
#[derive(Error, Debug)]
pub enum SinkError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with an unexpected status
    #[error("{method} {url} returned status {status}: {body}")]
    UnexpectedStatus {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    /// Item lacks a field the writer depends on
    #[error("Item is missing a {expected} field '{field}': {item}")]
    MissingField {
        field: &'static str,
        expected: &'static str,
        item: String,
    },

    /// Endpoint URL is invalid
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

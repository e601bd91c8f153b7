// Core data structures for gleaner scrapers

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Child index value that scans every direct text child for a regex match
pub const SCAN_ALL_CHILDREN: i64 = -1;

/// Attribute read when a URL location does not name one
pub const DEFAULT_URL_ATTRIBUTE: &str = "href";

/// Language used for month and weekday names when a date field names none
pub const DEFAULT_DATE_LANGUAGE: &str = "de_DE";

/// Extracts a substring by regex: the match at `index`, or the last one for `-1`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexExtract {
    #[serde(default)]
    pub exp: String,
    #[serde(default)]
    pub index: i64,
}

impl RegexExtract {
    pub fn is_enabled(&self) -> bool {
        !self.exp.is_empty()
    }
}

/// Which matched node an attribute is read from by the text primitive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributePolicy {
    /// Always the first node matched by the selector, whatever `node_index` says
    #[default]
    FirstMatch,
    /// The node at `node_index`
    NodeIndex,
}

/// Locates a string inside the node set matched by `selector`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementLocation {
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub node_index: usize,
    /// Offset among the direct children; [`SCAN_ALL_CHILDREN`] scans them all
    #[serde(default)]
    pub child_index: i64,
    #[serde(default)]
    pub regex_extract: RegexExtract,
    #[serde(default)]
    pub attr: Option<String>,
    /// Truncate to this many characters (0 disables)
    #[serde(default)]
    pub max_length: usize,
    #[serde(default)]
    pub entire_subtree: bool,
    #[serde(default)]
    pub attribute_policy: AttributePolicy,
}

impl ElementLocation {
    /// Location matching `selector` with every other setting at its default
    pub fn with_selector(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            ..Default::default()
        }
    }

    /// Configured attribute, ignoring an empty string
    pub fn attribute(&self) -> Option<&str> {
        self.attr.as_deref().filter(|a| !a.is_empty())
    }

    pub fn scans_all_children(&self) -> bool {
        self.child_index == SCAN_ALL_CHILDREN
    }
}

/// One of the four calendar parts a date component can provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePart {
    Day,
    Month,
    Year,
    Time,
}

impl fmt::Display for DatePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
            Self::Time => "time",
        };
        f.write_str(name)
    }
}

/// Calendar parts covered by a date component
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoveredDateParts {
    #[serde(default)]
    pub day: bool,
    #[serde(default)]
    pub month: bool,
    #[serde(default)]
    pub year: bool,
    #[serde(default)]
    pub time: bool,
}

impl CoveredDateParts {
    /// First part (in day, month, year, time order) covered by both
    pub fn overlap(&self, other: &Self) -> Option<DatePart> {
        if self.day && other.day {
            Some(DatePart::Day)
        } else if self.month && other.month {
            Some(DatePart::Month)
        } else if self.year && other.year {
            Some(DatePart::Year)
        } else if self.time && other.time {
            Some(DatePart::Time)
        } else {
            None
        }
    }

    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            day: self.day || other.day,
            month: self.month || other.month,
            year: self.year || other.year,
            time: self.time || other.time,
        }
    }
}

/// A single independently located fragment of a date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateComponent {
    #[serde(default)]
    pub covers: CoveredDateParts,
    #[serde(default)]
    pub location: ElementLocation,
    /// Alternative layouts the fragment may appear in
    #[serde(default)]
    pub layout: Vec<String>,
}

/// Configured type of a dynamic field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Url,
    Date,
}

/// How a field gets its value, derived from its configuration
#[derive(Debug, Clone, Copy)]
pub enum FieldKind<'a> {
    /// Constant copied into every item
    Static(&'a str),
    Text(&'a ElementLocation),
    Url(&'a ElementLocation),
    Date(&'a [DateComponent]),
}

/// A field of the records a scraper extracts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// Static value; when set the field is a constant
    #[serde(default)]
    pub value: Option<String>,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub location: ElementLocation,
    /// Name of a main page URL field whose page holds this field
    #[serde(default)]
    pub on_subpage: Option<String>,
    #[serde(default)]
    pub can_be_empty: bool,
    #[serde(default)]
    pub components: Vec<DateComponent>,
    /// IANA time zone of the page's dates; empty means UTC
    #[serde(default)]
    pub date_location: String,
    #[serde(default = "default_date_language")]
    pub date_language: String,
    #[serde(default)]
    pub hide: bool,
}

fn default_date_language() -> String {
    DEFAULT_DATE_LANGUAGE.to_string()
}

impl FieldSpec {
    /// Dynamic text field at `location`
    pub fn text(name: impl Into<String>, location: ElementLocation) -> Self {
        Self {
            name: name.into(),
            value: None,
            field_type: FieldType::Text,
            location,
            on_subpage: None,
            can_be_empty: false,
            components: Vec::new(),
            date_location: String::new(),
            date_language: default_date_language(),
            hide: false,
        }
    }

    /// Dynamic URL field at `location`
    pub fn url(name: impl Into<String>, location: ElementLocation) -> Self {
        Self {
            field_type: FieldType::Url,
            ..Self::text(name, location)
        }
    }

    /// Date field assembled from `components`
    pub fn date(name: impl Into<String>, components: Vec<DateComponent>) -> Self {
        Self {
            field_type: FieldType::Date,
            components,
            ..Self::text(name, ElementLocation::default())
        }
    }

    /// Constant field
    pub fn constant(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::text(name, ElementLocation::default())
        }
    }

    /// Static value, ignoring an empty string
    pub fn static_value(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }

    /// Subpage source field, ignoring an empty string
    pub fn subpage_source(&self) -> Option<&str> {
        if self.static_value().is_some() {
            return None;
        }
        self.on_subpage.as_deref().filter(|s| !s.is_empty())
    }

    pub fn kind(&self) -> FieldKind<'_> {
        if let Some(value) = self.static_value() {
            return FieldKind::Static(value);
        }
        match self.field_type {
            FieldType::Text => FieldKind::Text(&self.location),
            FieldType::Url => FieldKind::Url(&self.location),
            FieldType::Date => FieldKind::Date(&self.components),
        }
    }
}

/// Keeps or drops items by matching a field's value against a regex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub regex: String,
    /// `true`: the value must match; `false`: the value must not match
    #[serde(rename = "match", default)]
    pub must_match: bool,
}

/// Where the next page link lives and how many pages to follow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginator {
    #[serde(default)]
    pub location: ElementLocation,
    /// Page limit; 0 means unbounded
    #[serde(default)]
    pub max_pages: usize,
}

/// Declarative definition of one scraper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScraperSpec {
    pub name: String,
    pub url: String,
    /// Selector of the item nodes
    pub item: String,
    #[serde(default)]
    pub exclude_with_selector: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub paginator: Paginator,
    #[serde(default, alias = "renderJs")]
    pub render_js: bool,
}

/// Value of a resolved field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Url(String),
    Date(DateTime<FixedOffset>),
}

impl Value {
    /// String content of text and URL values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Url(s) => Some(s),
            Self::Date(_) => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::Date(d) => Some(d),
            _ => None,
        }
    }
}

/// Text form used by filters
///
/// Dates carry a fixed offset, not a zone, so they read as
/// `2024-12-31 22:00:00 +0100`. Zone abbreviations such as `CET` never appear.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) | Self::Url(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S %z")),
        }
    }
}

/// One extracted record, keyed by field name
pub type Item = BTreeMap<String, Value>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_covered_parts_overlap_reports_first_part() {
        let a = CoveredDateParts {
            day: true,
            month: true,
            ..Default::default()
        };
        let b = CoveredDateParts {
            month: true,
            time: true,
            ..Default::default()
        };
        assert_eq!(a.overlap(&b), Some(DatePart::Month));
        assert_eq!(a.overlap(&CoveredDateParts::default()), None);

        let merged = a.merge(&b);
        assert!(merged.day && merged.month && merged.time && !merged.year);
    }

    #[test]
    fn test_field_kind_dispatch() {
        let constant = FieldSpec::constant("city", "Berlin");
        assert!(matches!(constant.kind(), FieldKind::Static("Berlin")));

        let mut empty_static = FieldSpec::url("link", ElementLocation::with_selector("a"));
        empty_static.value = Some(String::new());
        assert!(matches!(empty_static.kind(), FieldKind::Url(_)));

        let date = FieldSpec::date("date", vec![DateComponent::default()]);
        assert!(matches!(date.kind(), FieldKind::Date(c) if c.len() == 1));
    }

    #[test]
    fn test_static_field_ignores_subpage() {
        let mut field = FieldSpec::constant("type", "concert");
        field.on_subpage = Some("url".to_string());
        assert_eq!(field.subpage_source(), None);
    }

    #[test]
    fn test_field_deserialization_defaults() {
        let field: FieldSpec = toml::from_str(
            r#"
            name = "title"
            [location]
            selector = "h2"
            child_index = -1
            "#,
        )
        .unwrap();

        assert_eq!(field.field_type, FieldType::Text);
        assert_eq!(field.date_language, "de_DE");
        assert!(field.location.scans_all_children());
        assert_eq!(field.location.attribute_policy, AttributePolicy::FirstMatch);
        assert!(!field.can_be_empty);
    }

    #[test]
    fn test_unknown_field_type_is_rejected() {
        let result: Result<FieldSpec, _> = toml::from_str(
            r#"
            name = "price"
            type = "number"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_value_display_and_json() {
        let date = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 4, 12, 18, 30, 0)
            .unwrap();
        let value = Value::Date(date);
        assert_eq!(value.to_string(), "2024-04-12 18:30:00 +0200");
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            "\"2024-04-12T18:30:00+02:00\""
        );

        let url = Value::Url("https://x.test/a?b=<c>".to_string());
        assert_eq!(url.as_str(), Some("https://x.test/a?b=<c>"));
        assert!(url.as_date().is_none());
    }
}

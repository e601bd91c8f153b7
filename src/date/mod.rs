//! Date assembly
//!
//! Pages rarely print a date in one place. A date field therefore lists
//! components, each locating a fragment of text and declaring which calendar
//! parts (day, month, year, time) it covers together with the layouts the
//! fragment may be written in. Missing year and time are filled with the current
//! year and 20:00, every combination of layouts is tried against the joined
//! fragments, and the first one that parses wins.

pub mod layout;
pub mod locale;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use scraper::ElementRef;

use crate::models::{CoveredDateParts, DateComponent, DatePart, FieldSpec, DEFAULT_DATE_LANGUAGE};
use crate::parser::text::extract_text;
use crate::utils::error::{DateError, ExtractError};
use locale::CalendarLocale;

/// Time used when no component covers the time of day
pub const DEFAULT_TIME: &str = "20:00";
const DEFAULT_TIME_LAYOUT: &str = "15:04";
const YEAR_LAYOUT: &str = "2006";

/// Extracted text of one component and the layouts it may be written in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFragment {
    pub text: String,
    pub layouts: Vec<String>,
}

impl DateFragment {
    fn new(text: impl Into<String>, layouts: Vec<String>) -> Self {
        Self {
            text: text.into(),
            layouts,
        }
    }
}

/// Resolve a date field against `scope`
///
/// # Errors
///
/// Returns `ExtractError::Date` for configuration problems (unknown zone or
/// language, parts covered twice, no day or month) and for text that no layout
/// combination parses. Errors of the text extraction of a component are
/// returned as is.
pub fn resolve_date(field: &FieldSpec, scope: ElementRef<'_>) -> Result<DateTime<FixedOffset>, ExtractError> {
    let zone = resolve_time_zone(&field.date_location)?;
    let language = if field.date_language.is_empty() {
        DEFAULT_DATE_LANGUAGE
    } else {
        field.date_language.as_str()
    };
    let locale = locale::lookup(language)
        .ok_or_else(|| DateError::UnsupportedLanguage(language.to_string()))?;

    let (mut fragments, covered) = collect_fragments(&field.components, scope)?;
    let current_year = Utc::now().with_timezone(&zone).year();
    complete_fragments(&mut fragments, covered, current_year)?;

    let text = assembled_text(&fragments);
    let layouts = layout_permutations(&fragments);
    tracing::trace!(field = %field.name, text, layouts = layouts.len(), "Parsing assembled date");

    Ok(parse_first(&text, &layouts, zone, locale)?)
}

/// First part claimed by more than one of `components`, in component order
pub fn overlapping_part(components: &[DateComponent]) -> Option<DatePart> {
    let mut claimed = CoveredDateParts::default();
    for component in components {
        if let Some(part) = claimed.overlap(&component.covers) {
            return Some(part);
        }
        claimed = claimed.merge(&component.covers);
    }
    None
}

/// Extract the fragments of `components` in order
///
/// Components claiming a part twice are an error whether or not their text
/// is found. Components whose text comes out empty are skipped and cover
/// nothing.
pub fn collect_fragments(
    components: &[DateComponent],
    scope: ElementRef<'_>,
) -> Result<(Vec<DateFragment>, CoveredDateParts), ExtractError> {
    if let Some(part) = overlapping_part(components) {
        return Err(DateError::PartCoveredTwice(part).into());
    }

    let mut fragments = Vec::new();
    let mut covered = CoveredDateParts::default();

    for component in components {
        let text = extract_text(&component.location, scope)?;
        if text.is_empty() {
            continue;
        }

        let layouts = component
            .layout
            .iter()
            .map(|layout| normalize_meridiem(layout))
            .collect();
        fragments.push(DateFragment::new(normalize_meridiem(&text), layouts));
        covered = covered.merge(&component.covers);
    }

    Ok((fragments, covered))
}

/// Append default year and time fragments for parts no component covered
///
/// # Errors
///
/// `DateError::MissingDayOrMonth` when day or month is still missing.
pub fn complete_fragments(
    fragments: &mut Vec<DateFragment>,
    covered: CoveredDateParts,
    current_year: i32,
) -> Result<(), DateError> {
    if !covered.year {
        fragments.push(DateFragment::new(current_year.to_string(), vec![YEAR_LAYOUT.to_string()]));
    }
    if !covered.time {
        fragments.push(DateFragment::new(DEFAULT_TIME, vec![DEFAULT_TIME_LAYOUT.to_string()]));
    }
    if !covered.day || !covered.month {
        return Err(DateError::MissingDayOrMonth);
    }
    Ok(())
}

/// Every combination of one layout per fragment, in order, each followed by a space
pub fn layout_permutations(fragments: &[DateFragment]) -> Vec<String> {
    let mut layouts = vec![String::new()];
    for fragment in fragments {
        layouts = layouts
            .iter()
            .flat_map(|prefix| {
                fragment
                    .layouts
                    .iter()
                    .map(move |layout| format!("{prefix}{layout} "))
            })
            .collect();
    }
    layouts
}

/// The fragment texts joined like the layouts, with the `Mrz` spelling fixed up
pub fn assembled_text(fragments: &[DateFragment]) -> String {
    let joined: String = fragments
        .iter()
        .map(|fragment| format!("{} ", fragment.text))
        .collect();
    joined.replacen("Mrz", "Mär", 1)
}

/// Parse `text` with the first layout that fits and attach the zone's offset
///
/// # Errors
///
/// The error of the last layout tried, or `DateError::NoLayouts` when there are
/// none.
pub fn parse_first(
    text: &str,
    layouts: &[String],
    zone: Tz,
    locale: &CalendarLocale,
) -> Result<DateTime<FixedOffset>, DateError> {
    let mut last_error = DateError::NoLayouts;

    for candidate in layouts {
        match layout::parse(candidate, text, locale) {
            Ok(naive) => return localize(naive, zone),
            Err(reason) => {
                last_error = DateError::Layout {
                    layout: candidate.clone(),
                    value: text.to_string(),
                    reason,
                };
            }
        }
    }

    Err(last_error)
}

/// Time zone named by `date_location`; empty and `UTC` mean UTC
pub fn resolve_time_zone(name: &str) -> Result<Tz, DateError> {
    match name.trim() {
        "" | "UTC" => Ok(Tz::UTC),
        other => other
            .parse::<Tz>()
            .map_err(|_| DateError::UnknownTimeZone(other.to_string())),
    }
}

fn localize(naive: NaiveDateTime, zone: Tz) -> Result<DateTime<FixedOffset>, DateError> {
    let local = zone
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| DateError::NonexistentLocalTime(naive.to_string()))?;
    let offset = local.offset().fix();
    Ok(local.with_timezone(&offset))
}

fn normalize_meridiem(text: &str) -> String {
    text.replacen("p.m.", "pm", 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ElementLocation, FieldSpec};
    use chrono::Timelike;
    use scraper::Html;

    fn component(selector: &str, covers: CoveredDateParts, layouts: &[&str]) -> DateComponent {
        DateComponent {
            covers,
            location: ElementLocation::with_selector(selector),
            layout: layouts.iter().map(|l| l.to_string()).collect(),
        }
    }

    fn day_month() -> CoveredDateParts {
        CoveredDateParts {
            day: true,
            month: true,
            ..Default::default()
        }
    }

    fn time() -> CoveredDateParts {
        CoveredDateParts {
            time: true,
            ..Default::default()
        }
    }

    fn resolve(html: &str, field: &FieldSpec) -> Result<DateTime<FixedOffset>, ExtractError> {
        let doc = Html::parse_fragment(html);
        resolve_date(field, doc.root_element())
    }

    #[test]
    fn test_day_month_and_time_with_default_year() {
        let mut field = FieldSpec::date(
            "date",
            vec![
                component("span.date", day_month(), &["02.01"]),
                component("span.time", time(), &["15:04"]),
            ],
        );
        field.date_location = "Europe/Berlin".to_string();

        let html = r#"<span class="date">12.04</span><span class="time">18:30</span>"#;
        let dt = resolve(html, &field).unwrap();

        let year = Utc::now().with_timezone(&chrono_tz::Europe::Berlin).year();
        assert_eq!((dt.year(), dt.month(), dt.day()), (year, 4, 12));
        assert_eq!((dt.hour(), dt.minute()), (18, 30));
        assert_eq!(dt.offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_default_time_is_eight_pm_utc() {
        let field = FieldSpec::date(
            "date",
            vec![component(
                "p",
                CoveredDateParts {
                    year: true,
                    ..day_month()
                },
                &["2. January 2006"],
            )],
        );
        let dt = resolve("<p>3. Dezember 2023</p>", &field).unwrap();
        assert_eq!(dt.to_rfc3339(), "2023-12-03T20:00:00+00:00");
    }

    #[test]
    fn test_alternative_layouts_first_success_wins() {
        let field = FieldSpec::date(
            "date",
            vec![component(
                "p",
                CoveredDateParts {
                    year: true,
                    ..day_month()
                },
                &["02.01.2006", "2. January 2006"],
            )],
        );
        let dt = resolve("<p>3. Mai 2025</p>", &field).unwrap();
        assert_eq!((dt.month(), dt.day()), (5, 3));
    }

    #[test]
    fn test_mrz_is_read_as_maerz() {
        let field = FieldSpec::date(
            "date",
            vec![component(
                "p",
                CoveredDateParts {
                    year: true,
                    ..day_month()
                },
                &["2. Jan 2006"],
            )],
        );
        let dt = resolve("<p>15. Mrz 2024</p>", &field).unwrap();
        assert_eq!((dt.month(), dt.day()), (3, 15));
    }

    #[test]
    fn test_pm_with_periods_is_normalized() {
        let mut field = FieldSpec::date(
            "date",
            vec![
                component("span.d", day_month(), &["January 2"]),
                component("span.t", time(), &["3:04 p.m."]),
            ],
        );
        field.date_language = "en_US".to_string();

        let html = r#"<span class="d">June 7</span><span class="t">7:30 p.m.</span>"#;
        let dt = resolve(html, &field).unwrap();
        assert_eq!((dt.hour(), dt.minute()), (19, 30));
    }

    #[test]
    fn test_empty_component_is_skipped() {
        let year = CoveredDateParts {
            year: true,
            ..Default::default()
        };
        let field = FieldSpec::date(
            "date",
            vec![
                component("span.missing", year, &["2006"]),
                component("span.date", day_month(), &["02.01."]),
            ],
        );
        let dt = resolve(r#"<span class="date">24.12.</span>"#, &field).unwrap();
        assert_eq!((dt.month(), dt.day(), dt.hour()), (12, 24, 20));
    }

    #[test]
    fn test_part_covered_twice_behind_empty_component() {
        let field = FieldSpec::date(
            "date",
            vec![
                component("span.missing", day_month(), &["02.01."]),
                component("span.date", day_month(), &["02.01."]),
            ],
        );
        let err = resolve(r#"<span class="date">24.12.</span>"#, &field).unwrap_err();
        assert!(matches!(err, ExtractError::Date(DateError::PartCoveredTwice(DatePart::Day))));
        assert_eq!(overlapping_part(&field.components), Some(DatePart::Day));
    }

    #[test]
    fn test_part_covered_twice_after_complete_date() {
        let everything = CoveredDateParts {
            day: true,
            month: true,
            year: true,
            time: true,
        };
        let field = FieldSpec::date(
            "date",
            vec![
                component("span.full", everything, &["02.01.2006 15:04"]),
                component("span.extra", time(), &["15:04"]),
            ],
        );
        let html = r#"<span class="full">24.12.2024 18:00</span><span class="extra">19:00</span>"#;
        let err = resolve(html, &field).unwrap_err();
        assert!(matches!(err, ExtractError::Date(DateError::PartCoveredTwice(DatePart::Time))));
    }

    #[test]
    fn test_part_covered_twice() {
        let field = FieldSpec::date(
            "date",
            vec![
                component("span.a", day_month(), &["02.01."]),
                component(
                    "span.b",
                    CoveredDateParts {
                        day: true,
                        ..Default::default()
                    },
                    &["2"],
                ),
            ],
        );
        let html = r#"<span class="a">01.02.</span><span class="b">3</span>"#;
        let err = resolve(html, &field).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Date(DateError::PartCoveredTwice(DatePart::Day))
        ));
    }

    #[test]
    fn test_missing_month_fails_in_any_order() {
        let day = CoveredDateParts {
            day: true,
            ..Default::default()
        };
        let html = r#"<span class="d">3</span><span class="t">10:00</span>"#;

        for components in [
            vec![component("span.d", day, &["2"]), component("span.t", time(), &["15:04"])],
            vec![component("span.t", time(), &["15:04"]), component("span.d", day, &["2"])],
        ] {
            let err = resolve(html, &FieldSpec::date("date", components)).unwrap_err();
            assert!(matches!(err, ExtractError::Date(DateError::MissingDayOrMonth)));
        }
    }

    #[test]
    fn test_unknown_zone_and_language() {
        let mut field = FieldSpec::date("date", vec![component("p", day_month(), &["02.01."])]);
        field.date_location = "Mars/Olympus".to_string();
        assert!(matches!(
            resolve("<p>01.01.</p>", &field).unwrap_err(),
            ExtractError::Date(DateError::UnknownTimeZone(_))
        ));

        field.date_location = String::new();
        field.date_language = "tlh".to_string();
        assert!(matches!(
            resolve("<p>01.01.</p>", &field).unwrap_err(),
            ExtractError::Date(DateError::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn test_unparsable_text_reports_layout_error() {
        let field = FieldSpec::date("date", vec![component("p", day_month(), &["02.01."])]);
        let err = resolve("<p>tomorrow</p>", &field).unwrap_err();
        assert!(matches!(err, ExtractError::Date(DateError::Layout { .. })));
    }

    #[test]
    fn test_layout_permutations_cartesian_order() {
        let fragments = vec![
            DateFragment::new("x", vec!["a".to_string(), "b".to_string()]),
            DateFragment::new("y", vec!["1".to_string(), "2".to_string(), "3".to_string()]),
        ];
        assert_eq!(
            layout_permutations(&fragments),
            vec!["a 1 ", "a 2 ", "a 3 ", "b 1 ", "b 2 ", "b 3 "]
        );
        assert_eq!(assembled_text(&fragments), "x y ");
    }

    #[test]
    fn test_complete_fragments_appends_defaults() {
        let mut fragments = vec![DateFragment::new("12.04", vec!["02.01".to_string()])];
        complete_fragments(&mut fragments, day_month(), 2030).unwrap();
        assert_eq!(assembled_text(&fragments), "12.04 2030 20:00 ");
        assert_eq!(layout_permutations(&fragments), vec!["02.01 2006 15:04 "]);
    }

    #[test]
    fn test_no_layouts() {
        let err = parse_first("1.1.", &[], Tz::UTC, locale::lookup("de_DE").unwrap()).unwrap_err();
        assert_eq!(err, DateError::NoLayouts);
    }

    #[test]
    fn test_resolve_time_zone() {
        assert_eq!(resolve_time_zone("").unwrap(), Tz::UTC);
        assert_eq!(resolve_time_zone("UTC").unwrap(), Tz::UTC);
        assert_eq!(resolve_time_zone("Europe/Zurich").unwrap(), chrono_tz::Europe::Zurich);
        assert!(resolve_time_zone("Nowhere/Special").is_err());
    }
}

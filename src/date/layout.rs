//! Reference-date layouts
//!
//! Date layouts in scraper definitions are written by example, using the
//! reference date `Monday, January 2 2006 15:04:05 PM`: `2006` is the year,
//! `01` the month, `02` the day, `15` the hour and so on. Everything that is not
//! a recognised token must appear literally in the parsed text, except that a
//! run of spaces matches one or more spaces.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::locale::{CalendarLocale, NameKind};

/// One element of a tokenized layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    /// `January`
    LongMonth,
    /// `Jan`
    ShortMonth,
    /// `01` (zero padded) or `1`
    Month { padded: bool },
    /// `Monday`, matched and ignored
    LongWeekday,
    /// `Mon`, matched and ignored
    ShortWeekday,
    /// `02` (zero padded) or `2`
    Day { padded: bool },
    /// `_2`, optionally preceded by a space
    SpaceDay,
    /// `2006`
    LongYear,
    /// `06`
    ShortYear,
    /// `15`
    Hour,
    /// `03` (zero padded) or `3`
    Hour12 { padded: bool },
    /// `04` (zero padded) or `4`
    Minute { padded: bool },
    /// `05` (zero padded) or `5`
    Second { padded: bool },
    /// `PM` or `pm`
    AmPm,
}

const TOKENS: &[(&str, Token)] = &[
    ("January", Token::LongMonth),
    ("Jan", Token::ShortMonth),
    ("Monday", Token::LongWeekday),
    ("Mon", Token::ShortWeekday),
    ("2006", Token::LongYear),
    ("01", Token::Month { padded: true }),
    ("02", Token::Day { padded: true }),
    ("03", Token::Hour12 { padded: true }),
    ("04", Token::Minute { padded: true }),
    ("05", Token::Second { padded: true }),
    ("06", Token::ShortYear),
    ("15", Token::Hour),
    ("1", Token::Month { padded: false }),
    ("2", Token::Day { padded: false }),
    ("3", Token::Hour12 { padded: false }),
    ("4", Token::Minute { padded: false }),
    ("5", Token::Second { padded: false }),
    ("PM", Token::AmPm),
    ("pm", Token::AmPm),
];

/// Split a layout into tokens, merging adjacent literal characters
pub fn tokenize(layout: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut rest = layout;

    while let Some(c) = rest.chars().next() {
        let matched = if rest.starts_with("_2") && !rest.starts_with("_2006") {
            Some(("_2", Token::SpaceDay))
        } else {
            TOKENS
                .iter()
                .find(|(pattern, _)| rest.starts_with(pattern))
                .map(|(pattern, token)| (*pattern, token.clone()))
        };

        match matched {
            Some((pattern, token)) => {
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(token);
                rest = &rest[pattern.len()..];
            }
            None => {
                literal.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}

#[derive(Debug, Default)]
struct Fields {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
    minute: Option<u32>,
    second: Option<u32>,
    pm: Option<bool>,
}

/// Parse `value` against `layout`, reading names in `locale`
///
/// Parts the layout does not mention default to year 0, January, day 1 and
/// midnight.
///
/// # Errors
///
/// Returns a description of the first mismatch.
pub fn parse(layout: &str, value: &str, locale: &CalendarLocale) -> Result<NaiveDateTime, String> {
    let mut fields = Fields::default();
    let mut rest = value;

    for token in tokenize(layout) {
        rest = match token {
            Token::Literal(ref literal) => skip_literal(rest, literal)?,
            Token::LongMonth | Token::ShortMonth => {
                let kind = if token == Token::LongMonth {
                    NameKind::LongMonth
                } else {
                    NameKind::ShortMonth
                };
                let (index, len) = locale
                    .match_name(kind, rest)
                    .ok_or_else(|| format!("unknown month name at '{rest}'"))?;
                fields.month = Some(index as u32 + 1);
                &rest[len..]
            }
            Token::LongWeekday | Token::ShortWeekday => {
                let kind = if token == Token::LongWeekday {
                    NameKind::LongDay
                } else {
                    NameKind::ShortDay
                };
                let (_, len) = locale
                    .match_name(kind, rest)
                    .ok_or_else(|| format!("unknown weekday name at '{rest}'"))?;
                &rest[len..]
            }
            Token::Month { padded } => {
                let (month, tail) = take_number(rest, padded, "month")?;
                if !(1..=12).contains(&month) {
                    return Err(format!("month {month} out of range"));
                }
                fields.month = Some(month);
                tail
            }
            Token::Day { padded } => {
                let (day, tail) = take_number(rest, padded, "day")?;
                fields.day = Some(check_day(day)?);
                tail
            }
            Token::SpaceDay => {
                let trimmed = rest.strip_prefix(' ').unwrap_or(rest);
                let (day, tail) = take_number(trimmed, false, "day")?;
                fields.day = Some(check_day(day)?);
                tail
            }
            Token::LongYear => {
                let (year, tail) = take_digits(rest, 4, "year")?;
                fields.year = Some(year as i32);
                tail
            }
            Token::ShortYear => {
                let (yy, tail) = take_digits(rest, 2, "year")?;
                let century = if yy >= 69 { 1900 } else { 2000 };
                fields.year = Some(century + yy as i32);
                tail
            }
            Token::Hour => {
                let (hour, tail) = take_number(rest, false, "hour")?;
                if hour > 23 {
                    return Err(format!("hour {hour} out of range"));
                }
                fields.hour = Some(hour);
                tail
            }
            Token::Hour12 { padded } => {
                let (hour, tail) = take_number(rest, padded, "hour")?;
                if hour > 12 {
                    return Err(format!("hour {hour} out of range"));
                }
                fields.hour = Some(hour);
                tail
            }
            Token::Minute { padded } => {
                let (minute, tail) = take_number(rest, padded, "minute")?;
                if minute > 59 {
                    return Err(format!("minute {minute} out of range"));
                }
                fields.minute = Some(minute);
                tail
            }
            Token::Second { padded } => {
                let (second, tail) = take_number(rest, padded, "second")?;
                if second > 59 {
                    return Err(format!("second {second} out of range"));
                }
                fields.second = Some(second);
                tail
            }
            Token::AmPm => {
                let marker = rest.get(..2).map(str::to_ascii_lowercase);
                match marker.as_deref() {
                    Some("am") => fields.pm = Some(false),
                    Some("pm") => fields.pm = Some(true),
                    _ => return Err(format!("expected AM or PM at '{rest}'")),
                }
                &rest[2..]
            }
        };
    }

    if !rest.is_empty() {
        return Err(format!("extra text: '{rest}'"));
    }

    build(fields)
}

fn build(fields: Fields) -> Result<NaiveDateTime, String> {
    let mut hour = fields.hour.unwrap_or(0);
    match fields.pm {
        Some(true) if hour < 12 => hour += 12,
        Some(false) if hour == 12 => hour = 0,
        _ => {}
    }

    let year = fields.year.unwrap_or(0);
    let month = fields.month.unwrap_or(1);
    let day = fields.day.unwrap_or(1);
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| format!("day {day} out of range for {year}-{month:02}"))?;
    let time = NaiveTime::from_hms_opt(
        hour,
        fields.minute.unwrap_or(0),
        fields.second.unwrap_or(0),
    )
    .ok_or_else(|| "time out of range".to_string())?;

    Ok(date.and_time(time))
}

fn check_day(day: u32) -> Result<u32, String> {
    if (1..=31).contains(&day) {
        Ok(day)
    } else {
        Err(format!("day {day} out of range"))
    }
}

/// Match a literal, letting a run of spaces match one or more spaces
fn skip_literal<'a>(value: &'a str, literal: &str) -> Result<&'a str, String> {
    let mut value = value;
    let mut literal = literal;

    while let Some(c) = literal.chars().next() {
        if c == ' ' {
            if !value.is_empty() && !value.starts_with(' ') {
                return Err(format!("expected space at '{value}'"));
            }
            literal = literal.trim_start_matches(' ');
            value = value.trim_start_matches(' ');
            continue;
        }
        if !value.starts_with(c) {
            return Err(format!("expected '{c}' at '{value}'"));
        }
        literal = &literal[c.len_utf8()..];
        value = &value[c.len_utf8()..];
    }

    Ok(value)
}

/// One or two digits; exactly two when `padded`
fn take_number<'a>(value: &'a str, padded: bool, what: &str) -> Result<(u32, &'a str), String> {
    let digits = value.bytes().take(2).take_while(u8::is_ascii_digit).count();
    if digits == 0 || (padded && digits < 2) {
        return Err(format!("expected {what} at '{value}'"));
    }
    let number = value[..digits]
        .parse()
        .map_err(|_| format!("invalid {what} at '{value}'"))?;
    Ok((number, &value[digits..]))
}

/// Exactly `count` digits
fn take_digits<'a>(value: &'a str, count: usize, what: &str) -> Result<(u32, &'a str), String> {
    let digits = value.bytes().take(count).take_while(u8::is_ascii_digit).count();
    if digits < count {
        return Err(format!("expected {count}-digit {what} at '{value}'"));
    }
    let number = value[..count]
        .parse()
        .map_err(|_| format!("invalid {what} at '{value}'"))?;
    Ok((number, &value[count..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::locale::lookup;
    use chrono::{Datelike, Timelike};

    fn parse_de(layout: &str, value: &str) -> Result<NaiveDateTime, String> {
        parse(layout, value, lookup("de_DE").unwrap())
    }

    #[test]
    fn test_tokenize_numeric_layout() {
        assert_eq!(
            tokenize("02.01.2006 15:04"),
            vec![
                Token::Day { padded: true },
                Token::Literal(".".to_string()),
                Token::Month { padded: true },
                Token::Literal(".".to_string()),
                Token::LongYear,
                Token::Literal(" ".to_string()),
                Token::Hour,
                Token::Literal(":".to_string()),
                Token::Minute { padded: true },
            ]
        );
    }

    #[test]
    fn test_tokenize_names_and_literals() {
        assert_eq!(
            tokenize("Mon, _2. January um 3 pm"),
            vec![
                Token::ShortWeekday,
                Token::Literal(", ".to_string()),
                Token::SpaceDay,
                Token::Literal(". ".to_string()),
                Token::LongMonth,
                Token::Literal(" um ".to_string()),
                Token::Hour12 { padded: false },
                Token::Literal(" ".to_string()),
                Token::AmPm,
            ]
        );
    }

    #[test]
    fn test_parse_full_numeric() {
        let dt = parse_de("02.01.2006 15:04 ", "12.04.2024 18:30 ").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 4, 12));
        assert_eq!((dt.hour(), dt.minute()), (18, 30));
    }

    #[test]
    fn test_parse_german_names() {
        let dt = parse_de("Monday, 2. January 2006", "Freitag, 15. März 2024").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 3, 15));

        let dt = parse_de("Mon 2. Jan 2006", "Fr 3. Mai 2024").unwrap();
        assert_eq!((dt.month(), dt.day()), (5, 3));
    }

    #[test]
    fn test_parse_twelve_hour_clock() {
        let en = lookup("en_US").unwrap();
        let dt = parse("3:04 pm 2006-01-02", "7:30 pm 2024-06-01", en).unwrap();
        assert_eq!((dt.hour(), dt.minute()), (19, 30));

        let dt = parse("3 PM 2006-01-02", "12 am 2024-06-01", en).unwrap();
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_spaces_are_flexible() {
        let dt = parse_de("2.1. 2006", "5.6.    2024").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 6, 5));
    }

    #[test]
    fn test_padded_requires_two_digits() {
        assert!(parse_de("02.01.2006", "5.06.2024").is_err());
        assert!(parse_de("2.1.2006", "5.6.2024").is_ok());
    }

    #[test]
    fn test_short_year() {
        assert_eq!(parse_de("02.01.06", "01.02.24").unwrap().year(), 2024);
        assert_eq!(parse_de("02.01.06", "01.02.99").unwrap().year(), 1999);
    }

    #[test]
    fn test_rejects_extra_text_and_bad_ranges() {
        assert!(parse_de("02.01.2006", "12.04.2024 trailing").is_err());
        assert!(parse_de("02.01.2006", "32.04.2024").is_err());
        assert!(parse_de("02.01.2006", "31.04.2024").is_err());
        assert!(parse_de("15:04 02.01.2006", "24:00 01.01.2024").is_err());
    }

    #[test]
    fn test_missing_parts_default() {
        let dt = parse_de("02.01.2006", "24.12.2023").unwrap();
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (0, 0, 0));
    }
}

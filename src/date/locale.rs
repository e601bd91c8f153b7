//! Calendar names per language
//!
//! Month and weekday names for the languages date fields can be configured
//! with. Lookups are case-insensitive and English names are always accepted
//! as a fallback.

/// Month and weekday names of one language
#[derive(Debug)]
pub struct CalendarLocale {
    pub code: &'static str,
    pub long_months: [&'static str; 12],
    pub short_months: [&'static str; 12],
    /// Monday first
    pub long_days: [&'static str; 7],
    /// Monday first
    pub short_days: [&'static str; 7],
}

static ENGLISH: CalendarLocale = CalendarLocale {
    code: "en_US",
    long_months: [
        "January", "February", "March", "April", "May", "June", "July", "August", "September",
        "October", "November", "December",
    ],
    short_months: [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ],
    long_days: [
        "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
    ],
    short_days: ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"],
};

static GERMAN: CalendarLocale = CalendarLocale {
    code: "de_DE",
    long_months: [
        "Januar", "Februar", "März", "April", "Mai", "Juni", "Juli", "August", "September",
        "Oktober", "November", "Dezember",
    ],
    short_months: [
        "Jan", "Feb", "Mär", "Apr", "Mai", "Jun", "Jul", "Aug", "Sep", "Okt", "Nov", "Dez",
    ],
    long_days: [
        "Montag", "Dienstag", "Mittwoch", "Donnerstag", "Freitag", "Samstag", "Sonntag",
    ],
    short_days: ["Mo", "Di", "Mi", "Do", "Fr", "Sa", "So"],
};

static AUSTRIAN: CalendarLocale = CalendarLocale {
    code: "de_AT",
    long_months: [
        "Jänner", "Februar", "März", "April", "Mai", "Juni", "Juli", "August", "September",
        "Oktober", "November", "Dezember",
    ],
    short_months: [
        "Jän", "Feb", "Mär", "Apr", "Mai", "Jun", "Jul", "Aug", "Sep", "Okt", "Nov", "Dez",
    ],
    long_days: [
        "Montag", "Dienstag", "Mittwoch", "Donnerstag", "Freitag", "Samstag", "Sonntag",
    ],
    short_days: ["Mo", "Di", "Mi", "Do", "Fr", "Sa", "So"],
};

static FRENCH: CalendarLocale = CalendarLocale {
    code: "fr_FR",
    long_months: [
        "janvier", "février", "mars", "avril", "mai", "juin", "juillet", "août", "septembre",
        "octobre", "novembre", "décembre",
    ],
    short_months: [
        "janv.", "févr.", "mars", "avr.", "mai", "juin", "juil.", "août", "sept.", "oct.",
        "nov.", "déc.",
    ],
    long_days: [
        "lundi", "mardi", "mercredi", "jeudi", "vendredi", "samedi", "dimanche",
    ],
    short_days: ["lun.", "mar.", "mer.", "jeu.", "ven.", "sam.", "dim."],
};

static ITALIAN: CalendarLocale = CalendarLocale {
    code: "it_IT",
    long_months: [
        "gennaio", "febbraio", "marzo", "aprile", "maggio", "giugno", "luglio", "agosto",
        "settembre", "ottobre", "novembre", "dicembre",
    ],
    short_months: [
        "gen", "feb", "mar", "apr", "mag", "giu", "lug", "ago", "set", "ott", "nov", "dic",
    ],
    long_days: [
        "lunedì", "martedì", "mercoledì", "giovedì", "venerdì", "sabato", "domenica",
    ],
    short_days: ["lun", "mar", "mer", "gio", "ven", "sab", "dom"],
};

static SPANISH: CalendarLocale = CalendarLocale {
    code: "es_ES",
    long_months: [
        "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto",
        "septiembre", "octubre", "noviembre", "diciembre",
    ],
    short_months: [
        "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sep", "oct", "nov", "dic",
    ],
    long_days: [
        "lunes", "martes", "miércoles", "jueves", "viernes", "sábado", "domingo",
    ],
    short_days: ["lun", "mar", "mié", "jue", "vie", "sáb", "dom"],
};

static DUTCH: CalendarLocale = CalendarLocale {
    code: "nl_NL",
    long_months: [
        "januari", "februari", "maart", "april", "mei", "juni", "juli", "augustus",
        "september", "oktober", "november", "december",
    ],
    short_months: [
        "jan", "feb", "mrt", "apr", "mei", "jun", "jul", "aug", "sep", "okt", "nov", "dec",
    ],
    long_days: [
        "maandag", "dinsdag", "woensdag", "donderdag", "vrijdag", "zaterdag", "zondag",
    ],
    short_days: ["ma", "di", "wo", "do", "vr", "za", "zo"],
};

/// Look up the names for a language code such as `de_DE`
///
/// Regional variants sharing a table (`en_GB`, `de_CH`, `fr_CH`) resolve to it.
pub fn lookup(code: &str) -> Option<&'static CalendarLocale> {
    match code {
        "en_US" | "en_GB" | "en" => Some(&ENGLISH),
        "de_DE" | "de_CH" | "de" => Some(&GERMAN),
        "de_AT" => Some(&AUSTRIAN),
        "fr_FR" | "fr_CH" | "fr_BE" | "fr" => Some(&FRENCH),
        "it_IT" | "it_CH" | "it" => Some(&ITALIAN),
        "es_ES" | "es" => Some(&SPANISH),
        "nl_NL" | "nl_BE" | "nl" => Some(&DUTCH),
        _ => None,
    }
}

/// Which name table of a locale to match against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    LongMonth,
    ShortMonth,
    LongDay,
    ShortDay,
}

impl CalendarLocale {
    fn names(&self, kind: NameKind) -> &[&'static str] {
        match kind {
            NameKind::LongMonth => &self.long_months,
            NameKind::ShortMonth => &self.short_months,
            NameKind::LongDay => &self.long_days,
            NameKind::ShortDay => &self.short_days,
        }
    }

    /// Match a name at the start of `value`
    ///
    /// Returns the zero-based position in the table and the number of bytes
    /// consumed. The longest matching name wins; English names are tried after
    /// the locale's own.
    pub fn match_name(&self, kind: NameKind, value: &str) -> Option<(usize, usize)> {
        longest_prefix(self.names(kind), value).or_else(|| longest_prefix(ENGLISH.names(kind), value))
    }
}

fn longest_prefix(names: &[&str], value: &str) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;

    for (index, name) in names.iter().enumerate() {
        let wanted = name.chars().count();
        let Some(len) = prefix_len_ignore_case(value, name, wanted) else {
            continue;
        };
        if best.map_or(true, |(_, best_len)| len > best_len) {
            best = Some((index, len));
        }
    }

    best
}

/// Byte length of the first `chars` characters of `value` if they equal `name` ignoring case
fn prefix_len_ignore_case(value: &str, name: &str, chars: usize) -> Option<usize> {
    let end = value
        .char_indices()
        .nth(chars)
        .map_or(value.len(), |(i, _)| i);
    let candidate = &value[..end];

    if candidate.chars().count() == chars && candidate.to_lowercase() == name.to_lowercase() {
        Some(end)
    } else {
        None
    }
}

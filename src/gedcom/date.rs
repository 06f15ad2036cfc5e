use std::fmt;

use chrono::format::{DelayedFormat, StrftimeItems};
use chrono::{Datelike, Locale, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Error;

static DATE_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<day>\d{1,2})?\s*(?P<month>[A-Z]{3})?\s*(?P<year>\d{4})$").unwrap()
});

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// A calendar date that may only be known to the year.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartialDate {
    Year(i32),
    Full(NaiveDate),
}

/// Orders individuals with no recorded birth ahead of everyone else.
pub fn sentinel_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN)
}

impl PartialDate {
    /// Parse `[DD MON] YYYY`. Day and month must both be present or both absent.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let bad = || Error::DateFormat(raw.to_string());
        let caps = DATE_FORMAT.captures(raw.trim()).ok_or_else(bad)?;
        let year: i32 = caps["year"].parse().map_err(|_| bad())?;

        match (caps.name("day"), caps.name("month")) {
            (Some(day), Some(month)) => {
                let day: u32 = day.as_str().parse().map_err(|_| bad())?;
                let month = MONTHS
                    .iter()
                    .position(|m| *m == month.as_str())
                    .ok_or_else(bad)? as u32
                    + 1;
                NaiveDate::from_ymd_opt(year, month, day)
                    .map(PartialDate::Full)
                    .ok_or_else(bad)
            }
            (None, None) => {
                NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(bad)?;
                Ok(PartialDate::Year(year))
            }
            _ => Err(bad()),
        }
    }

    /// `None` when no raw string was recorded at all.
    pub fn resolve(raw: Option<&str>) -> Result<Option<Self>, Error> {
        raw.map(Self::parse).transpose()
    }

    pub fn year(&self) -> i32 {
        match self {
            PartialDate::Year(y) => *y,
            PartialDate::Full(d) => d.year(),
        }
    }

    /// Date used for ordering: a year-only date counts as January 1st.
    pub fn sort_date(&self) -> NaiveDate {
        match self {
            PartialDate::Full(d) => *d,
            PartialDate::Year(y) => NaiveDate::from_ymd_opt(*y, 1, 1).unwrap_or_else(sentinel_date),
        }
    }

    pub fn format(&self, locale: &DateLocale) -> String {
        match self {
            PartialDate::Year(y) => y.to_string(),
            PartialDate::Full(d) => locale.format_long(*d),
        }
    }
}

impl fmt::Display for PartialDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartialDate::Year(y) => write!(f, "{y}"),
            PartialDate::Full(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Long-form date formatting for one locale.
#[derive(Clone, Copy, Debug)]
pub struct DateLocale {
    locale: Locale,
    pattern: &'static str,
}

impl DateLocale {
    /// Accepts POSIX names (`da_DK`), BCP 47 tags (`da-DK`) and bare
    /// languages for which a default region is known (`da`, `en`).
    pub fn new(tag: &str) -> Result<Self, Error> {
        let normalized = tag.replace('-', "_");
        let full = match normalized.as_str() {
            "da" => "da_DK",
            "en" => "en_US",
            "nb" | "no" => "nb_NO",
            "sv" => "sv_SE",
            "de" => "de_DE",
            other => other,
        };
        let locale = Locale::try_from(full).map_err(|_| Error::Locale(tag.to_string()))?;
        Ok(DateLocale {
            locale,
            pattern: long_pattern(full),
        })
    }

    pub fn format_long(&self, date: NaiveDate) -> String {
        let items = StrftimeItems::new_with_locale(self.pattern, self.locale);
        DelayedFormat::new_with_locale(Some(date), None, items, self.locale).to_string()
    }
}

impl Default for DateLocale {
    fn default() -> Self {
        DateLocale {
            locale: Locale::da_DK,
            pattern: DOTTED,
        }
    }
}

const DOTTED: &str = "%-d. %B %Y";
const SPACED: &str = "%-d %B %Y";
const US: &str = "%B %-d, %Y";

fn long_pattern(full: &str) -> &'static str {
    let language = full.split('_').next().unwrap_or(full);
    match (language, full) {
        (_, "en_US") => US,
        ("da" | "nb" | "nn" | "de" | "fi" | "is", _) => DOTTED,
        _ => SPACED,
    }
}

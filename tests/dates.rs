use chrono::NaiveDate;
use rstest::rstest;

use gedcom_pdf::{DateLocale, Error, PartialDate};

#[test]
fn year_only_renders_bare_year() {
    let date = PartialDate::parse("1984").unwrap();
    assert_eq!(date, PartialDate::Year(1984));
    assert_eq!(date.format(&DateLocale::default()), "1984");
    assert_eq!(date.sort_date(), NaiveDate::from_ymd_opt(1984, 1, 1).unwrap());
}

#[test]
fn full_date() {
    let date = PartialDate::parse("15 JUN 1984").unwrap();
    assert_eq!(date, PartialDate::Full(NaiveDate::from_ymd_opt(1984, 6, 15).unwrap()));
    assert_eq!(date.year(), 1984);
}

#[rstest]
#[case::month_without_day("JUN 1984")]
#[case::day_without_month("15 1984")]
#[case::unknown_month("15 JUX 1984")]
#[case::impossible_day("31 FEB 1900")]
#[case::two_digit_year("15 JUN 84")]
#[case::approximate("ABT 1900")]
#[case::empty("")]
fn rejects_malformed_dates(#[case] raw: &str) {
    let err = PartialDate::parse(raw).unwrap_err();
    assert!(matches!(err, Error::DateFormat(ref s) if s == raw), "{raw}: {err}");
}

#[test]
fn absent_raw_string_is_absent_date() {
    assert_eq!(PartialDate::resolve(None).unwrap(), None);
    assert_eq!(PartialDate::resolve(Some("1901")).unwrap(), Some(PartialDate::Year(1901)));
    assert!(PartialDate::resolve(Some("1 1901")).is_err());
}

#[rstest]
#[case("da_DK", "15. juni 1984")]
#[case("da", "15. juni 1984")]
#[case("en_US", "June 15, 1984")]
#[case("en-US", "June 15, 1984")]
fn long_form_is_localized(#[case] tag: &str, #[case] expected: &str) {
    let locale = DateLocale::new(tag).unwrap();
    let date = PartialDate::parse("15 JUN 1984").unwrap();
    assert_eq!(date.format(&locale), expected);
}

#[test]
fn year_only_bypasses_locale() {
    let locale = DateLocale::new("en_US").unwrap();
    assert_eq!(PartialDate::Year(1900).format(&locale), "1900");
}

#[test]
fn unknown_locale_is_an_error() {
    assert!(matches!(DateLocale::new("xx_YY"), Err(Error::Locale(_))));
}

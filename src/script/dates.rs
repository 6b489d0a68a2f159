//! Literal conversion helpers: numbers and `ddMMMyyyy` date tokens.

use chrono::NaiveDate;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Locale-independent decimal parse.
///
/// Only text that looks numeric is accepted, so names such as `inf` or `NaN`
/// stay available as identifiers. `None` is the signal callers use to fall
/// back to a symbol lookup.
pub fn parse_number(text: &str) -> Option<f64> {
    let first = text.bytes().next()?;
    if !(first.is_ascii_digit() || matches!(first, b'.' | b'+' | b'-')) {
        return None;
    }
    let value: f64 = text.parse().ok()?;
    value.is_finite().then_some(value)
}

/// Parses a 9-character `ddMMMyyyy` token, e.g. `15Jan2020`.
///
/// The month abbreviation is matched case-sensitively.
pub fn parse_date_token(text: &str) -> Option<NaiveDate> {
    if text.len() != 9 || !text.is_ascii() {
        return None;
    }
    let (day, rest) = text.split_at(2);
    let (month, year) = rest.split_at(3);
    if !day.bytes().all(|b| b.is_ascii_digit()) || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let day: u32 = day.parse().ok()?;
    let year: i32 = year.parse().ok()?;
    let month = MONTHS.iter().position(|&m| m == month)? as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Actual/365 fixed year fraction from `valuation_date` to `date`.
pub fn year_fraction(valuation_date: NaiveDate, date: NaiveDate) -> f64 {
    (date - valuation_date).num_days() as f64 / 365.0
}

/// Converts a date token to a year fraction from `valuation_date`.
pub fn date_to_time(text: &str, valuation_date: NaiveDate) -> Option<f64> {
    parse_date_token(text).map(|d| year_fraction(valuation_date, d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number("5"), Some(5.0));
        assert_eq!(parse_number("-2.5"), Some(-2.5));
        assert_eq!(parse_number(".25"), Some(0.25));
        assert_eq!(parse_number("1e-3"), Some(1e-3));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("5abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn date_tokens() {
        assert_eq!(parse_date_token("15Jan2020"), Some(ymd(2020, 1, 15)));
        assert_eq!(parse_date_token("01Dec1999"), Some(ymd(1999, 12, 1)));
        assert_eq!(parse_date_token("15Xxx2020"), None);
        assert_eq!(parse_date_token("15jan2020"), None);
        assert_eq!(parse_date_token("15Jan20"), None);
        assert_eq!(parse_date_token("1xJan2020"), None);
        assert_eq!(parse_date_token("15Jan20x0"), None);
        assert_eq!(parse_date_token("31Feb2020"), None);
        assert_eq!(parse_date_token("+5Jan2020"), None);
    }

    #[test]
    fn year_fraction_is_act_365() {
        let today = ymd(2019, 1, 15);
        assert_relative_eq!(
            date_to_time("15Jan2020", today).unwrap(),
            365.0 / 365.0,
            epsilon = 1e-15
        );
        assert_relative_eq!(
            date_to_time("15Jan2021", today).unwrap(),
            731.0 / 365.0,
            epsilon = 1e-15
        );
        assert!(date_to_time("15Jan2018", today).unwrap() < 0.0);
    }
}

use std::fmt::{Debug, Write};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Turns human-readable date strings into date-times.
pub trait DateParser: Send + Sync + Debug {
    fn parse(&self, input: &str) -> Option<NaiveDateTime>;
}

/// Accepts the usual machine formats (RFC 3339, RFC 2822, ISO dates with or
/// without a time, unix timestamps) plus a handful of human ones such as
/// `January 1, 1900` and `1 Jan 2020`. Date-only inputs are at midnight.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissiveParser;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%B %d, %Y %H:%M",
    "%B %d, %Y %I:%M %p",
    "%b %d, %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%A, %B %d, %Y",
];

impl DateParser for PermissiveParser {
    fn parse(&self, input: &str) -> Option<NaiveDateTime> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Some(dt.with_timezone(&Utc).naive_utc());
        }

        if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
            return Some(dt.with_timezone(&Utc).naive_utc());
        }

        if let Ok(ts) = input.strip_prefix('@').unwrap_or(input).parse::<i64>() {
            if input.len() != 4 && input.len() != 8 {
                return Utc.timestamp_opt(ts, 0).single().map(|dt| dt.naive_utc());
            }
        }

        DATETIME_FORMATS.iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
            .or_else(|| DATE_FORMATS.iter()
                .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
                .map(|date| date.and_time(NaiveTime::MIN)))
            .or_else(|| NaiveDate::parse_from_str(&format!("{input}-01-01"), "%Y-%m-%d")
                .ok()
                .filter(|_| input.len() == 4)
                .map(|date| date.and_time(NaiveTime::MIN)))
    }
}

/// Translates a `Y-m-d H:i` style format string into a `chrono` one.
///
/// Letters with no `chrono` equivalent are emitted literally; a backslash
/// escapes the next character.
///
/// ```rust
/// use antlers::fields::translate_format;
///
/// assert_eq!(translate_format("Y-m-d H:i"), "%Y-%m-%d %H:%M");
/// assert_eq!(translate_format("F jS, Y"), "%B %-dS, %Y");
/// assert_eq!(translate_format("\\Y\\e\\a\\r: Y"), "Year: %Y");
/// ```
pub fn translate_format(format: &str) -> String {
    let mut output = String::with_capacity(format.len() * 2);
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        let spec = match c {
            'd' => "%d",
            'j' => "%-d",
            'D' => "%a",
            'l' => "%A",
            'N' => "%u",
            'w' => "%w",
            'W' => "%V",
            'F' => "%B",
            'M' => "%b",
            'm' => "%m",
            'n' => "%-m",
            'Y' => "%Y",
            'y' => "%y",
            'a' => "%P",
            'A' => "%p",
            'g' => "%-I",
            'G' => "%-H",
            'h' => "%I",
            'H' => "%H",
            'i' => "%M",
            's' => "%S",
            'u' => "%6f",
            'v' => "%3f",
            'e' | 'T' => "%Z",
            'O' => "%z",
            'P' => "%:z",
            'c' => "%Y-%m-%dT%H:%M:%S%:z",
            'r' => "%a, %d %b %Y %H:%M:%S %z",
            'U' => "%s",
            '%' => "%%",
            '\\' => {
                match chars.next() {
                    Some('%') => output.push_str("%%"),
                    Some(escaped) => output.push(escaped),
                    None => {}
                }

                continue;
            }
            other => {
                output.push(other);
                continue;
            }
        };

        output.push_str(spec);
    }

    output
}

/// Formats `datetime` with a `Y-m-d H:i` style format string.
///
/// ```rust
/// use antlers::fields::format_date;
/// use chrono::NaiveDate;
///
/// let dt = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap().and_hms_opt(14, 30, 0).unwrap();
/// assert_eq!(format_date(&dt, "Y-m-d H:i"), "2020-05-01 14:30");
/// assert_eq!(format_date(&dt, "D, j M"), "Fri, 1 May");
/// ```
pub fn format_date(datetime: &NaiveDateTime, format: &str) -> String {
    let mut output = String::new();
    let translated = translate_format(format);
    match write!(output, "{}", datetime.format(&translated)) {
        Ok(()) => output,
        // Zone specifiers can't be rendered for naive date-times.
        Err(_) => {
            let utc = Utc.from_utc_datetime(datetime);
            utc.format(&translated).to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, i: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, i, 0).unwrap()
    }

    #[test]
    fn parses_permissively() {
        let parser = PermissiveParser;
        let cases = [
            ("2020-05-01", dt(2020, 5, 1, 0, 0)),
            ("2020-05-01 14:30", dt(2020, 5, 1, 14, 30)),
            ("2020-05-01T14:30:00Z", dt(2020, 5, 1, 14, 30)),
            ("2020-05-01T16:30:00+02:00", dt(2020, 5, 1, 14, 30)),
            ("Fri, 01 May 2020 14:30:00 +0000", dt(2020, 5, 1, 14, 30)),
            ("January 1, 1900", dt(1900, 1, 1, 0, 0)),
            ("May 1 2020", dt(2020, 5, 1, 0, 0)),
            ("1 May 2020", dt(2020, 5, 1, 0, 0)),
            ("05/01/2020", dt(2020, 5, 1, 0, 0)),
            ("1588343400", dt(2020, 5, 1, 14, 30)),
            ("2020", dt(2020, 1, 1, 0, 0)),
        ];

        for (input, expected) in cases {
            assert_eq!(parser.parse(input), Some(expected), "{input}");
        }

        assert_eq!(parser.parse(""), None);
        assert_eq!(parser.parse("not a date"), None);
    }

    #[test]
    fn formats_with_zone_letters() {
        let formatted = format_date(&dt(2020, 5, 1, 14, 30), "c");
        assert_eq!(formatted, "2020-05-01T14:30:00+00:00");
    }
}

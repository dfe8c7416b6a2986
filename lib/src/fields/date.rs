use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::FormatError;
use crate::fields::{ConfigField, DateParser, FieldConfig, Fieldtype, PermissiveParser};
use crate::fields::dates::{format_date, translate_format};
use crate::value::Value;

/// The runtime representation of a date value.
pub const RUNTIME_FORMAT: &str = "Y-m-d H:i";

const DATE_ONLY_FORMAT: &str = "Y-m-d";

/// Dates, stored as `Y-m-d` or `Y-m-d H:i` strings unless the field
/// configures its own `format`.
#[derive(Debug, Clone)]
pub struct Date {
    parser: Arc<dyn DateParser>,
}

impl Default for Date {
    fn default() -> Self {
        Date { parser: Arc::new(PermissiveParser) }
    }
}

impl Date {
    pub fn new() -> Self {
        Date::default()
    }

    pub fn with_parser(parser: Arc<dyn DateParser>) -> Self {
        Date { parser }
    }

    /// The configured format, or one inferred from the value: anything longer
    /// than a bare `YYYY-MM-DD` carries a time.
    fn date_format<'a>(field: &'a FieldConfig<'_>, value: &str) -> &'a str {
        match field.get_str("format") {
            Some(format) => format,
            None if value.chars().count() > 10 => RUNTIME_FORMAT,
            None => DATE_ONLY_FORMAT,
        }
    }
}

fn as_input(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.trim().is_empty() => None,
        value => Some(value.render().trim().to_string()),
    }
}

/// Parses `input` exactly as `format` prescribes. Formats without a time
/// produce midnight.
fn parse_exact(input: &str, format: &str) -> Option<NaiveDateTime> {
    let format = translate_format(format);
    NaiveDateTime::parse_from_str(input, &format).ok()
        .or_else(|| NaiveDate::parse_from_str(input, &format).ok()
            .map(|date| date.and_time(NaiveTime::MIN)))
}

impl Fieldtype for Date {
    fn handle(&self) -> &'static str {
        "date"
    }

    fn config_fields(&self) -> Vec<ConfigField> {
        vec![
            ConfigField::new("allow_blank", "toggle"),
            ConfigField::new("allow_time", "toggle"),
            ConfigField::new("format", "text"),
            ConfigField::new("earliest_date", "text").with_default("January 1, 1900"),
        ]
    }

    fn pre_process(&self, field: &FieldConfig<'_>, value: Value) -> Result<Value, FormatError> {
        let Some(input) = as_input(&value) else {
            return Ok(Value::Null);
        };

        let format = Date::date_format(field, &input);
        let datetime = parse_exact(&input, format)
            .ok_or_else(|| field.format_error(&input, format))?;

        Ok(format_date(&datetime, RUNTIME_FORMAT).into())
    }

    fn process(&self, field: &FieldConfig<'_>, value: Value) -> Result<Value, FormatError> {
        let Some(input) = as_input(&value) else {
            return Ok(Value::Null);
        };

        let format = Date::date_format(field, &input);
        let datetime = self.parser.parse(&input)
            .ok_or_else(|| field.format_error(&input, "a recognizable date"))?;

        Ok(format_date(&datetime, format).into())
    }
}

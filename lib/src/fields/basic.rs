use std::sync::Arc;

use crate::error::FormatError;
use crate::fields::{ConfigField, FieldConfig, Fieldtype};
use crate::value::Value;

/// Single-line text. Non-string scalars are stored as their string form.
#[derive(Debug, Default, Clone, Copy)]
pub struct Text;

impl Fieldtype for Text {
    fn handle(&self) -> &'static str {
        "text"
    }

    fn config_fields(&self) -> Vec<ConfigField> {
        vec![
            ConfigField::new("placeholder", "text"),
            ConfigField::new("character_limit", "integer"),
        ]
    }

    fn process(&self, field: &FieldConfig<'_>, value: Value) -> Result<Value, FormatError> {
        let text = match value {
            Value::Null => return Ok(Value::Null),
            Value::String(ref s) => s.clone(),
            Value::Array(_) | Value::Dict(_) => {
                return Err(field.format_error(value.kind(), "text"));
            }
            ref scalar => Arc::from(&*scalar.render()),
        };

        let limit = field.get("character_limit").and_then(|v| v.to_i64()).unwrap_or(0);
        match limit > 0 && text.chars().count() > limit as usize {
            true => Ok(text.chars().take(limit as usize).collect::<String>().into()),
            false => Ok(Value::String(text)),
        }
    }
}

/// An on/off switch, stored as a boolean.
#[derive(Debug, Default, Clone, Copy)]
pub struct Toggle;

fn to_switch(value: &Value) -> bool {
    match value {
        Value::String(s) => !matches!(
            &*s.trim().to_ascii_lowercase(),
            "" | "0" | "false" | "no" | "off"
        ),
        value => value.is_truthy(),
    }
}

impl Fieldtype for Toggle {
    fn handle(&self) -> &'static str {
        "toggle"
    }

    fn config_fields(&self) -> Vec<ConfigField> {
        vec![ConfigField::new("default", "toggle").with_default(false)]
    }

    fn pre_process(&self, field: &FieldConfig<'_>, value: Value) -> Result<Value, FormatError> {
        match value {
            Value::Null => Ok(field.get_bool("default").into()),
            value => Ok(to_switch(&value).into()),
        }
    }

    fn process(&self, _: &FieldConfig<'_>, value: Value) -> Result<Value, FormatError> {
        Ok(to_switch(&value).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Dict;
    use crate::fields::fieldtype::defaults_of;

    #[test]
    fn text_limits_and_stringifies() {
        let handle: Arc<str> = "title".into();
        let config = crate::dict! { "character_limit" => 5 };
        let defaults = defaults_of(&Text);
        let field = FieldConfig { handle: &handle, config: &config, defaults: &defaults };

        assert_eq!(Text.process(&field, "Hello, world".into()).unwrap(), Value::from("Hello"));
        assert_eq!(Text.process(&field, 42.into()).unwrap(), Value::from("42"));
        assert!(Text.process(&field, Value::from(vec![1, 2])).is_err());
    }

    #[test]
    fn toggles() {
        let handle: Arc<str> = "featured".into();
        let (config, defaults) = (Dict::new(), defaults_of(&Toggle));
        let field = FieldConfig { handle: &handle, config: &config, defaults: &defaults };

        assert_eq!(Toggle.pre_process(&field, Value::Null).unwrap(), Value::from(false));
        assert_eq!(Toggle.process(&field, "off".into()).unwrap(), Value::from(false));
        assert_eq!(Toggle.process(&field, "yes".into()).unwrap(), Value::from(true));
        assert_eq!(Toggle.process(&field, 1.into()).unwrap(), Value::from(true));
    }
}

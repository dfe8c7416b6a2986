use std::fmt::Debug;
use std::sync::Arc;

use crate::error::FormatError;
use crate::value::{Dict, Value};

/// A configuration option a fieldtype understands, with its default.
#[derive(Debug, Clone)]
pub struct ConfigField {
    pub name: &'static str,
    pub kind: &'static str,
    pub default: Value,
}

impl ConfigField {
    pub fn new(name: &'static str, kind: &'static str) -> Self {
        ConfigField { name, kind, default: Value::Null }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = default.into();
        self
    }
}

/// Converts a field's values between their stored and runtime forms.
///
/// Both directions are pure: they read nothing but the value and the
/// field's configuration.
pub trait Fieldtype: Send + Sync + Debug {
    /// The name blueprints use to refer to this fieldtype, e.g. `date`.
    fn handle(&self) -> &'static str;

    fn config_fields(&self) -> Vec<ConfigField> {
        vec![]
    }

    /// Stored form to runtime form.
    fn pre_process(&self, field: &FieldConfig<'_>, value: Value) -> Result<Value, FormatError> {
        let _ = field;
        Ok(value)
    }

    /// Runtime form to stored form.
    fn process(&self, field: &FieldConfig<'_>, value: Value) -> Result<Value, FormatError> {
        let _ = field;
        Ok(value)
    }
}

/// The configuration of one field, as seen by its fieldtype: explicitly
/// configured values first, the fieldtype's defaults second.
#[derive(Debug, Clone, Copy)]
pub struct FieldConfig<'a> {
    pub handle: &'a Arc<str>,
    pub config: &'a Dict,
    pub defaults: &'a Dict,
}

impl FieldConfig<'_> {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
            .filter(|v| !v.is_null())
            .or_else(|| self.defaults.get(key).filter(|v| !v.is_null()))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).map_or(false, |v| v.is_truthy())
    }

    pub fn format_error(&self, value: impl Into<String>, format: impl Into<String>) -> FormatError {
        FormatError { field: self.handle.clone(), value: value.into(), format: format.into() }
    }
}

pub(crate) fn defaults_of(fieldtype: &dyn Fieldtype) -> Dict {
    fieldtype.config_fields()
        .into_iter()
        .map(|field| (Arc::from(field.name), field.default))
        .collect()
}

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{FormatError, Result};
use crate::fields::{Fieldtype, FieldConfig, Date, Text, Toggle};
use crate::fields::fieldtype::defaults_of;
use crate::value::{Dict, Value};

/// Looks up one of the built-in fieldtypes by its handle.
pub fn fieldtype(handle: &str) -> Option<Arc<dyn Fieldtype>> {
    let fieldtype: Arc<dyn Fieldtype> = match handle {
        "date" => Arc::new(Date::new()),
        "text" => Arc::new(Text),
        "toggle" => Arc::new(Toggle),
        _ => return None,
    };

    Some(fieldtype)
}

/// One field in a blueprint: its fieldtype plus configuration.
#[derive(Debug, Clone)]
pub struct Field {
    handle: Arc<str>,
    fieldtype: Arc<dyn Fieldtype>,
    config: Dict,
    defaults: Dict,
}

impl Field {
    pub fn new(handle: impl Into<Arc<str>>, fieldtype: Arc<dyn Fieldtype>, config: Dict) -> Self {
        let defaults = defaults_of(&*fieldtype);
        Field { handle: handle.into(), fieldtype, config, defaults }
    }

    pub fn handle(&self) -> &Arc<str> {
        &self.handle
    }

    pub fn fieldtype(&self) -> &Arc<dyn Fieldtype> {
        &self.fieldtype
    }

    pub fn config(&self) -> FieldConfig<'_> {
        FieldConfig { handle: &self.handle, config: &self.config, defaults: &self.defaults }
    }

    pub fn pre_process(&self, value: Value) -> Result<Value, FormatError> {
        self.fieldtype.pre_process(&self.config(), value)
    }

    pub fn process(&self, value: Value) -> Result<Value, FormatError> {
        self.fieldtype.process(&self.config(), value)
    }
}

/// A schema: the fields a piece of content is expected to have.
#[derive(Debug, Clone)]
pub struct Blueprint {
    handle: Arc<str>,
    fields: IndexMap<Arc<str>, Field>,
}

impl Blueprint {
    pub fn new(handle: impl Into<Arc<str>>) -> Self {
        Blueprint { handle: handle.into(), fields: IndexMap::new() }
    }

    /// Builds a blueprint from a mapping of field handles to configuration,
    /// each naming its fieldtype with a `type` key:
    ///
    /// ```toml
    /// [published]
    /// type = "date"
    /// format = "Y-m-d"
    /// ```
    pub fn from_dict(handle: impl Into<Arc<str>>, fields: &Dict) -> Result<Self> {
        let mut blueprint = Blueprint::new(handle);
        for (name, config) in fields {
            let Some(config) = config.as_dict() else {
                return err! {
                    "field configuration must be a table",
                    "blueprint" => blueprint.handle,
                    "field" => name,
                };
            };

            let kind = config.get("type").and_then(|v| v.as_str()).unwrap_or("text");
            let Some(fieldtype) = fieldtype(kind) else {
                return err! {
                    "unknown fieldtype",
                    "blueprint" => blueprint.handle,
                    "field" => name,
                    "type" => kind,
                };
            };

            let mut config = config.clone();
            config.shift_remove("type");
            blueprint = blueprint.with_field(name.clone(), fieldtype, config);
        }

        Ok(blueprint)
    }

    pub fn with_field(
        mut self,
        handle: impl Into<Arc<str>>,
        fieldtype: Arc<dyn Fieldtype>,
        config: Dict,
    ) -> Self {
        let field = Field::new(handle, fieldtype, config);
        self.fields.insert(field.handle.clone(), field);
        self
    }

    pub fn handle(&self) -> &Arc<str> {
        &self.handle
    }

    pub fn field(&self, handle: &str) -> Option<&Field> {
        self.fields.get(handle)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    /// The effective configuration of a field: defaults overlaid with what
    /// the blueprint configures.
    pub fn field_config(&self, handle: &str) -> Option<Dict> {
        let field = self.field(handle)?;
        let mut config = field.defaults.clone();
        config.extend(field.config.iter().map(|(k, v)| (k.clone(), v.clone())));
        Some(config)
    }

    /// Converts a stored record to its runtime form. Keys without a field
    /// pass through untouched.
    pub fn pre_process(&self, data: &Dict) -> Result<Dict, FormatError> {
        self.map(data, Field::pre_process)
    }

    /// Converts a runtime record to its stored form.
    pub fn process(&self, data: &Dict) -> Result<Dict, FormatError> {
        self.map(data, Field::process)
    }

    fn map<F>(&self, data: &Dict, f: F) -> Result<Dict, FormatError>
        where F: Fn(&Field, Value) -> Result<Value, FormatError>
    {
        data.iter()
            .map(|(key, value)| match self.fields.get(key) {
                Some(field) => Ok((key.clone(), f(field, value.clone())?)),
                None => Ok((key.clone(), value.clone())),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Format, Toml};

    fn article() -> Blueprint {
        let fields: Dict = Toml::read(r#"
            [published]
            type = "date"

            [featured]
            type = "toggle"

            [title]
            character_limit = 10
        "#).unwrap();

        Blueprint::from_dict("article", &fields).unwrap()
    }

    #[test]
    fn builds_from_config() {
        let blueprint = article();
        assert_eq!(blueprint.fields().count(), 3);
        assert_eq!(blueprint.field("published").unwrap().fieldtype().handle(), "date");
        assert_eq!(blueprint.field("title").unwrap().fieldtype().handle(), "text");

        let config = blueprint.field_config("published").unwrap();
        assert_eq!(config.get("earliest_date"), Some(&Value::from("January 1, 1900")));
        assert!(blueprint.field_config("missing").is_none());

        let bad = crate::dict! { "x" => crate::dict! { "type" => "nope" } };
        assert!(Blueprint::from_dict("bad", &bad).is_err());
    }

    #[test]
    fn processes_records() {
        let blueprint = article();
        let stored = crate::dict! {
            "published" => "2020-05-01",
            "featured" => "yes",
            "extra" => 7,
        };

        let runtime = blueprint.pre_process(&stored).unwrap();
        assert_eq!(runtime["published"], Value::from("2020-05-01 00:00"));
        assert_eq!(runtime["featured"], Value::from(true));
        assert_eq!(runtime["extra"], Value::from(7));

        let saved = blueprint.process(&crate::dict! {
            "published" => "May 1, 2020",
            "title" => "A rather long title",
        }).unwrap();

        assert_eq!(saved["published"], Value::from("2020-05-01 00:00"));
        assert_eq!(saved["title"], Value::from("A rather l"));

        let broken = crate::dict! { "published" => "yesterday" };
        assert!(blueprint.pre_process(&broken).is_err());
    }
}

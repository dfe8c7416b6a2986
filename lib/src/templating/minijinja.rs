use minijinja::Environment;
use minijinja::value::Value;

use crate::antlers::Registry;
use crate::error::{Chainable, Result};
use crate::templating::{Compiler, Source};
use crate::value::Dict;

/// Renders Jinja templates with `minijinja`.
#[derive(Debug)]
pub struct MiniJinjaCompiler {
    env: Environment<'static>,
}

impl Default for MiniJinjaCompiler {
    fn default() -> Self {
        MiniJinjaCompiler::new()
    }
}

impl MiniJinjaCompiler {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_function("now", ext::now);
        env.add_filter("deslug", ext::deslug);
        env.add_filter("date", ext::date);
        env.add_filter("split", ext::split);
        MiniJinjaCompiler { env }
    }

    /// The underlying environment, for registering more filters.
    pub fn env_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }
}

impl Compiler for MiniJinjaCompiler {
    fn compile(&self, source: &Source, data: &Dict, _: &Registry) -> Result<String> {
        let context = Value::from(crate::value::Value::from(data.clone()));
        self.env.render_named_str(&source.name, &source.text, context)
            .chain_with(|| error!("failed to render template", "template" => source.name))
    }
}

mod ext {
    use minijinja::value::{intern, Value};
    use minijinja::{Error, ErrorKind};

    use crate::fields::{format_date, DateParser, PermissiveParser};

    pub fn deslug(value: &str) -> String {
        value.replace(['-', '_'], " ")
    }

    /// `value | date("Y-m-d")`, taking `Y-m-d` style format letters.
    pub fn date(value: Value, fmt: &str) -> Result<Value, Error> {
        let input = match value.as_str() {
            Some(string) => string.to_string(),
            None => value.to_string(),
        };

        let datetime = PermissiveParser.parse(&input)
            .ok_or_else(|| Error::new(
                ErrorKind::InvalidOperation,
                format!("failed to parse {input} as a date")
            ))?;

        Ok(format_date(&datetime, fmt).into())
    }

    pub fn split(value: &str, pat: &str, n: Option<usize>) -> Result<Value, Error> {
        match n {
            Some(n) => Ok(value.split(pat).nth(n).map(Value::from).unwrap_or(Value::UNDEFINED)),
            None => Ok(value.split(pat).map(intern).collect()),
        }
    }

    pub fn now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs())
    }
}

mod value_object {
    use std::sync::Arc;
    use minijinja::value::{MapObject, SeqObject, Value};

    use crate::value;

    #[derive(Debug)]
    struct Dict(Arc<value::Dict>);

    #[derive(Debug)]
    struct Array(Arc<Vec<value::Value>>);

    impl MapObject for Dict {
        fn get_field(self: &Arc<Self>, key: &Value) -> Option<Value> {
            self.0.get(key.as_str()?)
                .cloned()
                .map(Value::from)
        }

        fn fields(self: &Arc<Self>) -> Vec<Value> {
            self.0.keys()
                .cloned()
                .map(Value::from)
                .collect()
        }

        fn field_count(self: &Arc<Self>) -> usize {
            self.0.len()
        }
    }

    impl SeqObject for Array {
        fn get_item(self: &Arc<Self>, idx: usize) -> Option<Value> {
            self.0.get(idx)
                .cloned()
                .map(Value::from)
        }

        fn item_count(self: &Arc<Self>) -> usize {
            self.0.len()
        }
    }

    impl From<value::Value> for Value {
        fn from(value: value::Value) -> Self {
            use crate::value::Value;

            match value {
                Value::Null => Self::UNDEFINED,
                Value::Bool(b) => Self::from(b),
                Value::Num(n) => match n.to_u128_lossy() {
                    Ok(v) => Self::from(v),
                    Err(v) => Self::from(v),
                },
                Value::Float(f) => Self::from(f.0),
                Value::String(s) => Self::from(s),
                Value::Array(a) => Self::from_any_seq_object(Arc::new(Array(a))),
                Value::Dict(d) => Self::from_any_map_object(Arc::new(Dict(d))),
            }
        }
    }
}

impl_error_detail_with_std_error!(minijinja::Error);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;
    use crate::templating::TemplateFormat;

    #[test]
    fn renders_jinja_with_crate_values() {
        let compiler = MiniJinjaCompiler::new();
        let data = dict! {
            "title" => "my-first-post",
            "tags" => vec!["a", "b"],
            "author" => dict! { "name" => "Ann" },
            "published" => "2024-03-05",
        };

        let text = "{{ title | deslug }} by {{ author.name }}: \
            {% for t in tags %}{{ t }}{{ loop.index }}{% endfor %} \
            {{ published | date('j/n/Y') }}";

        let source = Source::new("post.j2", text, TemplateFormat::Jinja);
        let output = compiler.compile(&source, &data, &Registry::new()).unwrap();
        assert_eq!(output, "my first post by Ann: a1b2 5/3/2024");

        let source = Source::new("bad.j2", "{% if %}", TemplateFormat::Jinja);
        assert!(compiler.compile(&source, &data, &Registry::new()).is_err());
    }
}

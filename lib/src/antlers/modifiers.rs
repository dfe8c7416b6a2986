//! The built-in modifiers.

use std::sync::Arc;

use pulldown_cmark::{html, Options, Parser};

use crate::antlers::Registry;
use crate::error::Result;
use crate::fields::{format_date, DateParser, PermissiveParser};
use crate::value::Value;

pub(crate) fn register(registry: &mut Registry) {
    registry
        .register_modifier("upper", text(|s| s.to_uppercase()))
        .register_modifier("lower", text(|s| s.to_lowercase()))
        .register_modifier("ucfirst", text(ucfirst))
        .register_modifier("title", text(title_case))
        .register_modifier("trim", text(|s| s.trim().to_string()))
        .register_modifier("slugify", text(crate::util::slugify))
        .register_modifier("deslug", text(|s| s.replace(['-', '_'], " ")))
        .register_modifier("markdown", text(markdown))
        .register_modifier("length", length)
        .register_modifier("truncate", truncate)
        .register_modifier("limit", limit)
        .register_modifier("reverse", reverse)
        .register_modifier("join", join)
        .register_modifier("default", default)
        .register_modifier("date", date)
        .register_modifier("json", json);
}

/// Lifts a string function to a modifier. `null` passes through untouched.
fn text<F>(f: F) -> impl Fn(Value, &[Arc<str>]) -> Result<Value> + Send + Sync
    where F: Fn(&str) -> String + Send + Sync
{
    move |value: Value, _: &[Arc<str>]| match value {
        Value::Null => Ok(Value::Null),
        value => Ok(Value::from(f(&value.render()))),
    }
}

fn usize_arg(name: &str, args: &[Arc<str>], i: usize) -> Result<usize> {
    match args.get(i) {
        Some(arg) => match arg.trim().parse() {
            Ok(n) => Ok(n),
            Err(_) => err!(format!("`{name}` expects a count"), "argument" => arg),
        },
        None => err!(format!("`{name}` is missing its count")),
    }
}

fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn title_case(s: &str) -> String {
    s.split(' ').map(ucfirst).collect::<Vec<_>>().join(" ")
}

fn markdown(s: &str) -> String {
    let options = Options::all().difference(Options::ENABLE_SMART_PUNCTUATION);
    let mut html = String::with_capacity(s.len() * 3 / 2);
    html::push_html(&mut html, Parser::new_ext(s, options));
    html
}

fn length(value: Value, _: &[Arc<str>]) -> Result<Value> {
    let len = match &value {
        Value::Null => 0,
        Value::Array(items) => items.len(),
        Value::Dict(dict) => dict.len(),
        value => value.render().chars().count(),
    };

    Ok(Value::from(len))
}

/// `truncate:count:suffix`; the suffix defaults to `...`.
fn truncate(value: Value, args: &[Arc<str>]) -> Result<Value> {
    let count = usize_arg("truncate", args, 0)?;
    let suffix = args.get(1).map_or("...", |s| &**s);
    let text = value.render().into_owned();
    match text.chars().count() > count {
        true => Ok(Value::from(text.chars().take(count).chain(suffix.chars()).collect::<String>())),
        false => Ok(Value::from(text)),
    }
}

fn limit(value: Value, args: &[Arc<str>]) -> Result<Value> {
    let count = usize_arg("limit", args, 0)?;
    match value {
        Value::Array(items) => Ok(items.iter().take(count).cloned().collect()),
        value => Ok(value),
    }
}

fn reverse(value: Value, _: &[Arc<str>]) -> Result<Value> {
    match value {
        Value::Array(items) => Ok(items.iter().rev().cloned().collect()),
        Value::Null => Ok(Value::Null),
        value => Ok(Value::from(value.render().chars().rev().collect::<String>())),
    }
}

/// `join:separator`; the separator defaults to `, `.
fn join(value: Value, args: &[Arc<str>]) -> Result<Value> {
    let separator = args.first().map_or(", ", |s| &**s);
    match value {
        Value::Array(items) => {
            let parts: Vec<_> = items.iter().map(|v| v.render()).collect();
            Ok(Value::from(parts.join(separator)))
        }
        value => Ok(value),
    }
}

fn default(value: Value, args: &[Arc<str>]) -> Result<Value> {
    match value.is_truthy() {
        true => Ok(value),
        false => Ok(args.first().cloned().map(Value::String).unwrap_or_default()),
    }
}

/// `date:format`, with `Y-m-d` style format letters. Defaults to `F j, Y`.
fn date(value: Value, args: &[Arc<str>]) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let format = args.first().map_or("F j, Y", |s| &**s);
    match PermissiveParser.parse(&value.render()) {
        Some(datetime) => Ok(Value::from(format_date(&datetime, format))),
        None => err!("value is not a recognizable date", "value" => value.render()),
    }
}

fn json(value: Value, _: &[Arc<str>]) -> Result<Value> {
    Ok(Value::from(serde_json::to_string(&value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;

    fn apply(name: &str, value: impl Into<Value>, args: &[&str]) -> Result<Value> {
        let mut registry = Registry::new();
        register(&mut registry);
        let args: Vec<Arc<str>> = args.iter().map(|&a| a.into()).collect();
        registry.modifier(name).unwrap().apply(value.into(), &args)
    }

    fn ok(name: &str, value: impl Into<Value>, args: &[&str]) -> String {
        apply(name, value, args).unwrap().render().into_owned()
    }

    #[test]
    fn string_modifiers() {
        assert_eq!(ok("upper", "abc", &[]), "ABC");
        assert_eq!(ok("lower", "AbC", &[]), "abc");
        assert_eq!(ok("ucfirst", "élan vital", &[]), "Élan vital");
        assert_eq!(ok("title", "the quick fox", &[]), "The Quick Fox");
        assert_eq!(ok("trim", "  x ", &[]), "x");
        assert_eq!(ok("slugify", "Hello, Wörld!", &[]), "hello-world");
        assert_eq!(ok("deslug", "hello-big_world", &[]), "hello big world");
        assert_eq!(ok("upper", (), &[]), "");
        assert_eq!(ok("upper", 12, &[]), "12");
    }

    #[test]
    fn sequence_modifiers() {
        let xs = || Value::from(vec!["a", "b", "c"]);
        assert_eq!(ok("length", xs(), &[]), "3");
        assert_eq!(ok("length", "héllo", &[]), "5");
        assert_eq!(ok("length", dict! { "a" => 1 }, &[]), "1");
        assert_eq!(ok("limit", xs(), &["2"]), "ab");
        assert_eq!(ok("reverse", xs(), &[]), "cba");
        assert_eq!(ok("reverse", "abc", &[]), "cba");
        assert_eq!(ok("join", xs(), &[]), "a, b, c");
        assert_eq!(ok("join", xs(), &["|"]), "a|b|c");
    }

    #[test]
    fn truncate_and_default() {
        assert_eq!(ok("truncate", "hello world", &["5"]), "hello...");
        assert_eq!(ok("truncate", "hello world", &["5", "!"]), "hello!");
        assert_eq!(ok("truncate", "hi", &["5"]), "hi");
        assert!(apply("truncate", "hi", &[]).is_err());
        assert!(apply("limit", "hi", &["many"]).is_err());

        assert_eq!(ok("default", "", &["none"]), "none");
        assert_eq!(ok("default", (), &["none"]), "none");
        assert_eq!(ok("default", "x", &["none"]), "x");
    }

    #[test]
    fn formatting_modifiers() {
        assert_eq!(ok("date", "2024-03-05 14:30", &["Y/m/d H:i"]), "2024/03/05 14:30");
        assert_eq!(ok("date", "2024-03-05", &[]), "March 5, 2024");
        assert!(apply("date", "not a date", &[]).is_err());

        assert_eq!(ok("markdown", "*hi*", &[]), "<p><em>hi</em></p>\n");
        assert_eq!(ok("json", dict! { "a" => vec![1, 2] }, &[]), r#"{"a":[1,2]}"#);
    }
}

//! The built-in `trans` and `trans_choice` tags.

use std::sync::Arc;

use crate::antlers::{Registry, TagContext};
use crate::error::Result;
use crate::value::{Dict, Value};

/// Lines missing from every other locale are looked up here.
pub const FALLBACK_LOCALE: &str = "en";

/// Looks up translation lines by `locale` then dotted key.
///
/// Translations are a mapping of locale to (possibly nested) lines:
///
/// ```toml
/// [en.messages]
/// welcome = "Welcome, :name!"
/// apples = "{0} No apples|{1} One apple|[2,*] :count apples"
/// ```
#[derive(Debug, Clone)]
pub struct Translator {
    translations: Arc<Dict>,
    locale: Arc<str>,
}

impl Default for Translator {
    fn default() -> Self {
        Translator::new(Arc::default(), "en")
    }
}

impl Translator {
    pub fn new(translations: Arc<Dict>, locale: impl Into<Arc<str>>) -> Self {
        Translator { translations, locale: locale.into() }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// The raw line for `key`, trying `locale` first, then the translator's
    /// locale, then [`FALLBACK_LOCALE`].
    pub fn line(&self, key: &str, locale: Option<&str>) -> Option<&str> {
        let find = |locale: &str| {
            let lines = self.translations.get(locale)?;
            lines.get(key).or_else(|| lines.lookup(key))?.as_str()
        };

        locale.and_then(find)
            .or_else(|| find(self.locale()))
            .or_else(|| find(FALLBACK_LOCALE))
    }

    /// The line for `key` with `:placeholders` replaced, or `key` itself.
    ///
    /// ```rust
    /// use antlers::{dict, antlers::Translator};
    ///
    /// let translations = dict! { "en" => dict! { "hi" => "Hi, :name!" } };
    /// let translator = Translator::new(translations.into(), "en");
    /// assert_eq!(translator.get("hi", &dict! { "name" => "ann" }, None), "Hi, ann!");
    /// assert_eq!(translator.get("nope", &dict! {}, None), "nope");
    /// ```
    pub fn get(&self, key: &str, replace: &Dict, locale: Option<&str>) -> String {
        match self.line(key, locale) {
            Some(line) => make_replacements(line, replace),
            None => key.to_string(),
        }
    }

    /// The plural form of `key` for `count`, with `:count` and any other
    /// `:placeholders` replaced.
    pub fn choice(&self, key: &str, count: i64, replace: &Dict, locale: Option<&str>) -> String {
        let Some(line) = self.line(key, locale) else {
            return key.to_string();
        };

        let locale = locale.unwrap_or(&self.locale);
        let mut replace = replace.clone();
        replace.insert("count".into(), Value::from(count));
        make_replacements(select(line, count, locale), &replace)
    }
}

pub(crate) fn register(registry: &mut Registry, translator: Translator) {
    let translator = Arc::new(translator);

    let t = translator.clone();
    registry.register_tag("trans", move |tag: &TagContext<'_>| -> Result<Value> {
        let key = tag.param_str("key").unwrap_or_else(|| tag.method().into());
        let locale = tag.param_str("locale");
        Ok(Value::from(t.get(&key, tag.params(), locale.as_deref())))
    });

    let t = translator;
    registry.register_tag("trans_choice", move |tag: &TagContext<'_>| -> Result<Value> {
        let key = tag.param_str("key").unwrap_or_else(|| tag.method().into());
        let count = tag.param_int("count").unwrap_or(1);
        let locale = tag.param_str("locale");
        Ok(Value::from(t.choice(&key, count, tag.params(), locale.as_deref())))
    });
}

/// Replaces `:key`, `:Key` and `:KEY` with the value of `key`, in the case
/// shown. Longer keys are replaced first.
fn make_replacements(line: &str, replace: &Dict) -> String {
    let mut keys: Vec<_> = replace.iter().collect();
    keys.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));

    let mut line = line.to_string();
    for (key, value) in keys {
        let value = value.render();
        line = line
            .replace(&format!(":{key}"), &value)
            .replace(&format!(":{}", ucfirst(key)), &ucfirst(&value))
            .replace(&format!(":{}", key.to_uppercase()), &value.to_uppercase());
    }

    line
}

fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Picks the segment of a `|`-separated plural line for `count`.
///
/// Segments may be prefixed with an explicit condition: `{n}` for exactly
/// `n`, or `[a,b]` for `a..=b` where either end may be `*`. Otherwise the
/// locale's plural rule indexes into the segments.
fn select<'a>(line: &'a str, count: i64, locale: &str) -> &'a str {
    let segments: Vec<&str> = line.split('|').collect();
    if let Some(value) = segments.iter().find_map(|s| explicit(s.trim(), count)) {
        return value;
    }

    let segments: Vec<&str> = segments.iter().map(|s| strip_condition(s.trim())).collect();
    let index = plural_index(locale, count);
    match segments.len() {
        1 => segments[0],
        _ => segments.get(index).copied().unwrap_or(segments[0]),
    }
}

fn condition(segment: &str) -> Option<(&str, &str)> {
    let rest = segment.strip_prefix(['{', '['])?;
    let end = rest.find(['}', ']'])?;
    let condition = &rest[..end];
    if condition.contains(['{', '[']) {
        return None;
    }

    Some((condition, rest[end + 1..].trim_start()))
}

fn strip_condition(segment: &str) -> &str {
    condition(segment).map_or(segment, |(_, value)| value)
}

fn explicit(segment: &str, count: i64) -> Option<&str> {
    let (condition, value) = condition(segment)?;
    let bound = |s: &str| s.trim().parse::<i64>().ok();
    let matches = match condition.split_once(',') {
        Some((from, to)) => match (from.trim(), to.trim()) {
            (from, "*") => bound(from).map_or(false, |from| count >= from),
            ("*", to) => bound(to).map_or(false, |to| count <= to),
            (from, to) => match (bound(from), bound(to)) {
                (Some(from), Some(to)) => (from..=to).contains(&count),
                _ => false,
            },
        },
        None => bound(condition) == Some(count),
    };

    matches.then_some(value)
}

fn plural_index(locale: &str, count: i64) -> usize {
    let language = locale.split(['_', '-']).next().unwrap_or(locale);
    match language {
        "ja" | "ko" | "zh" | "th" | "tr" | "vi" | "id" | "ms" | "fa" => 0,
        "fr" | "hi" => (count > 1) as usize,
        "pt" if locale != "pt" => (count > 1) as usize,
        "ru" | "uk" | "be" | "sr" | "hr" | "bs" => {
            let (n10, n100) = (count % 10, count % 100);
            if n10 == 1 && n100 != 11 {
                0
            } else if (2..=4).contains(&n10) && !(12..=14).contains(&n100) {
                1
            } else {
                2
            }
        }
        _ => (count != 1) as usize,
    }
}

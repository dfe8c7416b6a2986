use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::antlers::{Context, Evaluator, TemplateNode, Translator};
use crate::error::Result;
use crate::value::{Dict, Value};

/// A template tag: `{{ name:method key="value" }}`.
///
/// Implemented for every `Fn(&TagContext<'_>) -> Result<Value>`.
pub trait Tag: Send + Sync {
    fn call(&self, tag: &TagContext<'_>) -> Result<Value>;
}

impl<F> Tag for F
    where F: Fn(&TagContext<'_>) -> Result<Value> + Send + Sync
{
    #[inline(always)]
    fn call(&self, tag: &TagContext<'_>) -> Result<Value> {
        self(tag)
    }
}

/// A value transformation: `{{ value | name:arg:arg }}`.
///
/// Implemented for every `Fn(Value, &[Arc<str>]) -> Result<Value>`.
pub trait Modifier: Send + Sync {
    fn apply(&self, value: Value, args: &[Arc<str>]) -> Result<Value>;
}

impl<F> Modifier for F
    where F: Fn(Value, &[Arc<str>]) -> Result<Value> + Send + Sync
{
    #[inline(always)]
    fn apply(&self, value: Value, args: &[Arc<str>]) -> Result<Value> {
        self(value, args)
    }
}

/// The tags and modifiers templates can call, by name.
///
/// Built once and then shared read-only across renders.
#[derive(Clone, Default)]
pub struct Registry {
    tags: FxHashMap<Arc<str>, Arc<dyn Tag>>,
    modifiers: FxHashMap<Arc<str>, Arc<dyn Modifier>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Registry::default()
    }

    /// A registry with the built-in modifiers and the `trans` tags, with no
    /// translations. See [`Registry::with_translator()`].
    pub fn with_builtins() -> Self {
        Registry::with_translator(Translator::default())
    }

    /// A registry with the built-in modifiers and `trans` tags backed by
    /// `translator`.
    pub fn with_translator(translator: Translator) -> Self {
        let mut registry = Registry::new();
        crate::antlers::modifiers::register(&mut registry);
        crate::antlers::tags::register(&mut registry, translator);
        registry
    }

    pub fn register_tag<T>(&mut self, name: impl Into<Arc<str>>, tag: T) -> &mut Self
        where T: Tag + 'static
    {
        self.tags.insert(name.into(), Arc::new(tag));
        self
    }

    pub fn register_modifier<M>(&mut self, name: impl Into<Arc<str>>, modifier: M) -> &mut Self
        where M: Modifier + 'static
    {
        self.modifiers.insert(name.into(), Arc::new(modifier));
        self
    }

    /// Adds every tag and modifier in `other`, replacing those with the same
    /// name.
    pub fn extend(&mut self, other: &Registry) -> &mut Self {
        self.tags.extend(other.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.modifiers.extend(other.modifiers.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn tag(&self, name: &str) -> Option<&Arc<dyn Tag>> {
        self.tags.get(name)
    }

    pub fn modifier(&self, name: &str) -> Option<&Arc<dyn Modifier>> {
        self.modifiers.get(name)
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.tags.keys().collect();
        let mut modifiers: Vec<_> = self.modifiers.keys().collect();
        tags.sort();
        modifiers.sort();

        f.debug_struct("Registry")
            .field("tags", &tags)
            .field("modifiers", &modifiers)
            .finish()
    }
}

/// Everything a [`Tag`] sees of its call site.
pub struct TagContext<'a> {
    pub(crate) name: &'a str,
    pub(crate) method: &'a str,
    pub(crate) params: Dict,
    pub(crate) context: &'a Context<'a>,
    pub(crate) body: Option<&'a [TemplateNode]>,
    pub(crate) content: Option<&'a str>,
    pub(crate) evaluator: &'a Evaluator<'a>,
}

impl<'a> TagContext<'a> {
    pub fn name(&self) -> &str {
        self.name
    }

    /// The part after the `:`, or `index`.
    pub fn method(&self) -> &str {
        self.method
    }

    /// Parameters in the order they were written, with references resolved.
    pub fn params(&self) -> &Dict {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn param_str(&self, key: &str) -> Option<Arc<str>> {
        self.param(key).map(|v| match v {
            Value::String(s) => s.clone(),
            v => v.render().into(),
        })
    }

    pub fn param_int(&self, key: &str) -> Option<i64> {
        self.param(key).and_then(|v| v.to_i64())
    }

    pub fn context(&self) -> &Context<'a> {
        self.context
    }

    pub fn is_pair(&self) -> bool {
        self.body.is_some()
    }

    /// The body of a tag pair as written in the template.
    pub fn content(&self) -> Option<&str> {
        self.content
    }

    /// Renders the body of a tag pair once, with `vars` in scope.
    pub fn render_body(&self, vars: Dict) -> String {
        match self.body {
            Some(body) => self.evaluator.evaluate(body, &self.context.child(vars)),
            None => String::new(),
        }
    }

    /// Renders the body of a tag pair once per item. See
    /// [`Evaluator::render_loop()`].
    pub fn parse_loop(&self, items: &[Value], supplement: bool) -> String {
        match self.body {
            Some(body) => self.evaluator.render_loop(body, items, supplement, self.context),
            None => String::new(),
        }
    }
}

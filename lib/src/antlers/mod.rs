//! Antlers templates.
//!
//! Text outside of `{{ }}` markers is emitted as-is. Markers hold variables
//! with optional modifiers, `{{ if }}`/`{{ unless }}` blocks, loops over
//! variable pairs and tag calls:
//!
//! ```rust
//! use antlers::dict;
//! use antlers::antlers::Antlers;
//!
//! let antlers = Antlers::default();
//! let html = antlers.parse(
//!     "{{ title | upper }}: {{ tags }}{{ value }}{{ if !last }}, {{ /if }}{{ /tags }}",
//!     &dict! { "title" => "Post", "tags" => vec!["a", "b"] },
//! ).unwrap();
//!
//! assert_eq!(html, "POST: a, b");
//! ```
//!
//! Parsing either succeeds completely or fails with a
//! [`SyntaxError`](crate::error::SyntaxError) before anything is rendered.
//! Rendering never fails: see [`Evaluator`].

mod ast;
mod context;
mod expr;
mod parser;
mod evaluator;
mod registry;
mod modifiers;
mod tags;

use std::sync::Arc;

pub use ast::*;
pub use context::Context;
pub use expr::{CompareOp, Expr};
pub use parser::Template;
pub use evaluator::Evaluator;
pub use registry::{Modifier, Registry, Tag, TagContext};
pub use tags::{Translator, FALLBACK_LOCALE};

use crate::error::SyntaxError;
use crate::value::{Dict, Value};

/// Parses `source` into its nodes.
pub fn parse(source: &str) -> Result<Vec<TemplateNode>, SyntaxError> {
    Template::parse(source).map(Template::into_nodes)
}

/// Renders `nodes` against `vars`.
pub fn evaluate(nodes: &[TemplateNode], vars: &Dict, registry: &Registry) -> String {
    Evaluator::new(registry).evaluate(nodes, &Context::new(vars.clone()))
}

/// Parses and renders template strings with one registry.
#[derive(Debug, Clone)]
pub struct Antlers {
    registry: Arc<Registry>,
}

impl Default for Antlers {
    fn default() -> Self {
        Antlers::new(Arc::new(Registry::with_builtins()))
    }
}

impl Antlers {
    pub fn new(registry: Arc<Registry>) -> Self {
        Antlers { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn compile(&self, source: &str) -> Result<Template, SyntaxError> {
        Template::parse_with(source, &self.registry)
    }

    /// Renders `source` with `variables` in scope.
    pub fn parse(&self, source: &str, variables: &Dict) -> Result<String, SyntaxError> {
        let template = self.compile(source)?;
        Ok(template.render(&Context::new(variables.clone()), &self.registry))
    }

    /// Renders `content` once per item with the item's keys layered over
    /// `context`, adding loop variables when `supplement` is set.
    pub fn parse_loop(
        &self,
        content: &str,
        items: &[Value],
        supplement: bool,
        context: &Dict,
    ) -> Result<String, SyntaxError> {
        let template = self.compile(content)?;
        let context = Context::new(context.clone());
        Ok(Evaluator::new(&self.registry).render_loop(template.nodes(), items, supplement, &context))
    }
}

#[cfg(test)] static_assertions::assert_impl_all!(Template: Send, Sync);
#[cfg(test)] static_assertions::assert_impl_all!(Registry: Send, Sync);
#[cfg(test)] static_assertions::assert_impl_all!(Antlers: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;

    #[test]
    fn conditional_scenario() {
        let nodes = parse("{{ if foo }}A{{ elseif bar }}B{{ else }}C{{ /if }}").unwrap();
        let registry = Registry::new();
        let render = |vars: Dict| evaluate(&nodes, &vars, &registry);

        assert_eq!(render(dict! { "foo" => true }), "A");
        assert_eq!(render(dict! { "foo" => false, "bar" => true }), "B");
        assert_eq!(render(dict! { "foo" => false, "bar" => false }), "C");
    }

    #[test]
    fn loop_scenario() {
        let nodes = parse("{{ items }}{{ index }}:{{ value }} {{ /items }}").unwrap();
        let items = vec![dict! { "value" => "x" }, dict! { "value" => "y" }];
        let vars = dict! { "items" => items };
        assert_eq!(evaluate(&nodes, &vars, &Registry::new()), "1:x 2:y ");
    }

    #[test]
    fn parse_loop_supplements_on_request() {
        let antlers = Antlers::default();
        let items = vec![
            Value::from(dict! { "name" => "a", "index" => "own" }),
            Value::from(dict! { "name" => "b" }),
        ];

        let context = dict! { "site" => "S" };
        let content = "{{ site }}/{{ name }}/{{ index }};";
        let plain = antlers.parse_loop(content, &items, false, &context).unwrap();
        assert_eq!(plain, "S/a/own;S/b/;");

        let supplemented = antlers.parse_loop(content, &items, true, &context).unwrap();
        assert_eq!(supplemented, "S/a/1;S/b/2;");

        assert_eq!(antlers.parse_loop(content, &[], true, &context).unwrap(), "");
        assert!(antlers.parse_loop("{{ if x }}", &items, true, &context).is_err());
    }

    #[test]
    fn parse_renders_with_registered_tags() {
        let antlers = Antlers::default();
        let out = antlers.parse("{{# hidden #}}{{ name | ucfirst }}", &dict! { "name" => "ann" });
        assert_eq!(out.unwrap(), "Ann");
        assert!(antlers.parse("{{ /name }}", &dict! {}).is_err());
    }
}

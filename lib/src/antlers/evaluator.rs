use std::sync::Arc;

use crate::antlers::ast::*;
use crate::antlers::{Context, Registry, TagContext};
use crate::error::EvaluationError;
use crate::value::{Dict, Value};

/// Walks parsed templates, producing text.
///
/// Evaluation never fails: unknown or failing modifiers and tags are logged
/// as warnings and contribute nothing to the output.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'r> {
    registry: &'r Registry,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Evaluator { registry }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn evaluate(&self, nodes: &[TemplateNode], context: &Context<'_>) -> String {
        let mut out = String::new();
        self.render_into(nodes, context, &mut out);
        out
    }

    fn render_into(&self, nodes: &[TemplateNode], context: &Context<'_>, out: &mut String) {
        for node in nodes {
            match node {
                TemplateNode::Literal(text) => out.push_str(text),
                TemplateNode::Variable(variable) => {
                    out.push_str(&self.variable(variable, context).render());
                }
                TemplateNode::TagCall(tag) => out.push_str(&self.tag(tag, context)),
                TemplateNode::Conditional(cond) => {
                    let body = cond.branches.iter()
                        .find(|(expr, _)| expr.is_true(context))
                        .map(|(_, body)| body)
                        .or(cond.else_body.as_ref());

                    if let Some(body) = body {
                        self.render_into(body, context, out);
                    }
                }
                TemplateNode::Loop(looped) => match self.variable(&looped.source, context) {
                    Value::Array(items) => {
                        out.push_str(&self.render_loop(&looped.body, &items, true, context));
                    }
                    Value::Dict(dict) => {
                        let items: Vec<_> = dict.values().cloned().collect();
                        out.push_str(&self.render_loop(&looped.body, &items, true, context));
                    }
                    scalar if scalar.is_truthy() => self.render_into(&looped.body, context, out),
                    _ => {}
                },
            }
        }
    }

    /// Renders `body` once per item, in order. Each iteration gets its own
    /// scope holding the item's keys (or the item as `value` when it isn't a
    /// mapping) and, if `supplement` is set, the loop variables `first`,
    /// `last`, `index`, `count`, `zero_index` and `total_results`.
    pub fn render_loop(
        &self,
        body: &[TemplateNode],
        items: &[Value],
        supplement: bool,
        context: &Context<'_>,
    ) -> String {
        let mut out = String::new();
        let total = items.len();
        for (i, item) in items.iter().enumerate() {
            let mut vars = match item {
                Value::Dict(dict) => (**dict).clone(),
                value => crate::dict! { "value" => value.clone() },
            };

            if supplement {
                let index = i + 1;
                vars.insert("first".into(), Value::from(index == 1));
                vars.insert("last".into(), Value::from(index == total));
                vars.insert("index".into(), Value::from(index));
                vars.insert("count".into(), Value::from(index));
                vars.insert("zero_index".into(), Value::from(i));
                vars.insert("total_results".into(), Value::from(total));
            }

            self.render_into(body, &context.child(vars), &mut out);
        }

        out
    }

    fn variable(&self, variable: &Variable, context: &Context<'_>) -> Value {
        let value = match context.get(&variable.path) {
            Some(value) => value,
            None if self.registry.has_tag(&variable.path) => {
                let call = self.call_tag(&variable.path, DEFAULT_METHOD, Dict::new(), None, None, context);
                call.unwrap_or_default()
            }
            None => {
                tracing::debug!(path = %variable.path, "missing variable renders nothing");
                Value::Null
            }
        };

        self.apply_modifiers(value, &variable.modifiers)
    }

    fn tag(&self, tag: &TagCall, context: &Context<'_>) -> String {
        let params = resolve_params(&tag.params, context);
        let body = tag.body.as_deref();
        let content = tag.content.as_deref();
        let Some(value) = self.call_tag(&tag.name, &tag.method, params, body, content, context) else {
            return String::new();
        };

        match (body, self.apply_modifiers(value, &tag.modifiers)) {
            (Some(body), Value::Array(items)) => self.render_loop(body, &items, true, context),
            (Some(body), Value::Dict(dict)) => self.evaluate(body, &context.child((*dict).clone())),
            (_, value) => value.render().into_owned(),
        }
    }

    fn call_tag(
        &self,
        name: &str,
        method: &str,
        params: Dict,
        body: Option<&[TemplateNode]>,
        content: Option<&str>,
        context: &Context<'_>,
    ) -> Option<Value> {
        let Some(tag) = self.registry.tag(name) else {
            let error = EvaluationError::UnknownTag(format!("{name}:{method}").into());
            tracing::warn!(%error, "tag renders nothing");
            return None;
        };

        let call = TagContext { name, method, params, context, body, content, evaluator: self };
        match tag.call(&call) {
            Ok(value) => Some(value),
            Err(e) => {
                let message = e.to_string().trim().to_string();
                let error = EvaluationError::TagFailed { name: name.into(), message };
                tracing::warn!(%error, "tag renders nothing");
                None
            }
        }
    }

    /// Applies `modifiers` left to right. Any unknown or failing modifier
    /// makes the whole value `null`.
    fn apply_modifiers(&self, value: Value, modifiers: &[ModifierCall]) -> Value {
        let mut value = value;
        for call in modifiers {
            let Some(modifier) = self.registry.modifier(&call.name) else {
                let error = EvaluationError::UnknownModifier(call.name.clone());
                tracing::warn!(%error, "value renders nothing");
                return Value::Null;
            };

            value = match modifier.apply(value, &call.args) {
                Ok(value) => value,
                Err(e) => {
                    let message = e.to_string().trim().to_string();
                    let error = EvaluationError::ModifierFailed { name: call.name.clone(), message };
                    tracing::warn!(%error, "value renders nothing");
                    return Value::Null;
                }
            };
        }

        value
    }
}

fn resolve_params(params: &Params, context: &Context<'_>) -> Dict {
    params.iter()
        .map(|(key, param)| {
            let value = match param {
                Param::Literal(text) => Value::String(text.clone()),
                Param::Reference(path) => context.get(path).unwrap_or_default(),
            };

            (Arc::clone(key), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::antlers::Template;
    use crate::dict;
    use crate::error::Result;
    use crate::value::{Format, Toml, Value};

    fn render(source: &str, vars: Dict) -> String {
        let registry = Registry::with_builtins();
        let template = Template::parse_with(source, &registry).unwrap();
        template.render(&Context::new(vars), &registry)
    }

    #[test]
    fn conditionals_pick_the_first_true_branch() {
        let source = "{{ if foo }}A{{ elseif bar }}B{{ else }}C{{ /if }}";
        assert_eq!(render(source, dict! { "foo" => true }), "A");
        assert_eq!(render(source, dict! { "foo" => true, "bar" => true }), "A");
        assert_eq!(render(source, dict! { "foo" => false, "bar" => true }), "B");
        assert_eq!(render(source, dict! { "bar" => "" }), "C");
        assert_eq!(render(source, dict! {}), "C");

        assert_eq!(render("{{ unless admin }}guest{{ /unless }}", dict! {}), "guest");
        assert_eq!(render("{{ unless admin }}guest{{ /unless }}", dict! { "admin" => 1 }), "");
    }

    #[test]
    fn loops_over_items() {
        let items = vec![dict! { "value" => "x" }, dict! { "value" => "y" }];
        let source = "{{ items }}{{ index }}:{{ value }} {{ /items }}";
        assert_eq!(render(source, dict! { "items" => items }), "1:x 2:y ");

        let source = "{{ tags }}[{{ value }}]{{ /tags }}";
        assert_eq!(render(source, dict! { "tags" => vec!["a", "b"] }), "[a][b]");
        assert_eq!(render(source, dict! { "tags" => Vec::<Value>::new() }), "");
        assert_eq!(render(source, dict! {}), "");
        assert_eq!(render(source, dict! { "tags" => "solo" }), "[]");

        let source = "{{ foreach:pages }}{{ title }}{{ /foreach }}";
        let pages = dict! { "b" => dict! { "title" => "B" }, "a" => dict! { "title" => "A" } };
        assert_eq!(render(source, dict! { "pages" => pages }), "BA");
    }

    #[test]
    fn loop_metadata() {
        let source = "{{ xs }}{{ first }},{{ last }},{{ index }},{{ count }},\
            {{ zero_index }},{{ total_results }};{{ /xs }}";

        for n in 0..5usize {
            let xs: Vec<Value> = (0..n).map(|i| Value::from(i)).collect();
            let expected: String = (1..=n)
                .map(|i| format!("{},{},{i},{i},{},{n};", i == 1, i == n, i - 1))
                .collect();

            assert_eq!(render(source, dict! { "xs" => xs }), expected);
        }
    }

    #[test]
    fn loop_scopes_do_not_leak() {
        let source = "{{ xs }}{{ title }}{{ /xs }}|{{ title }}|{{ index }}";
        let vars = dict! {
            "title" => "outer",
            "xs" => vec![dict! { "title" => "inner" }, dict! {}],
        };

        assert_eq!(render(source, vars), "innerouter|outer|");
    }

    #[test]
    fn missing_values_render_empty() {
        assert_eq!(render("[{{ nope }}][{{ a.b.c }}]", dict! { "a" => 1 }), "[][]");
        assert_eq!(render("{{ flag }} {{ list }} {{ map }}", dict! {
            "flag" => false,
            "list" => vec![1, 2],
            "map" => dict! { "k" => "v" },
        }), "false 12 ");
    }

    #[test]
    fn modifiers_chain_and_degrade() {
        let vars = dict! { "title" => "hello world" };
        assert_eq!(render("{{ title | upper }}", vars.clone()), "HELLO WORLD");
        assert_eq!(render("{{ title | title | reverse }}", vars.clone()), "dlroW olleH");
        assert_eq!(render("[{{ title | nope | upper }}]", vars.clone()), "[]");
        assert_eq!(render("[{{ title | truncate:x }}]", vars), "[]");
    }

    #[test]
    fn tags_receive_params_and_bodies() {
        let mut registry = Registry::with_builtins();
        registry.register_tag("echo", |tag: &TagContext<'_>| -> Result<Value> {
            let text = tag.params().iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(",");

            Ok(Value::from(format!("{}:{text}", tag.method())))
        });

        registry.register_tag("nav", |tag: &TagContext<'_>| -> Result<Value> {
            Ok(match tag.method() {
                "pages" => Value::from(vec![dict! { "title" => "A" }, dict! { "title" => "B" }]),
                "current" => Value::from(dict! { "title" => "Home" }),
                _ => Value::from(tag.content().unwrap_or_default().len()),
            })
        });

        registry.register_tag("wrap", |tag: &TagContext<'_>| -> Result<Value> {
            Ok(Value::from(format!("<{}>", tag.render_body(dict! { "x" => "1" }))))
        });

        registry.register_tag("fail", |_: &TagContext<'_>| -> Result<Value> { crate::err!("broken") });

        let vars = dict! { "page" => dict! { "slug" => "about" } };
        let render = |source: &str| {
            let template = Template::parse_with(source, &registry).unwrap();
            template.render(&Context::new(vars.clone()), &registry)
        };

        assert_eq!(render(r#"{{ echo a="page.slug" :b="page.slug" }}"#), "index:a=page.slug,b=about");
        assert_eq!(render(r#"{{ echo:go :b="missing" }}"#), "go:b=");
        assert_eq!(render(r#"{{ echo zebra="1" apple="2" mid="3" }}"#), "index:zebra=1,apple=2,mid=3");
        assert_eq!(render("{{ nav:pages }}{{ count }}{{ title }}{{ /nav:pages }}"), "1A2B");
        assert_eq!(render("{{ nav:current }}{{ title }}{{ /nav:current }}"), "Home");
        assert_eq!(render("{{ nav:other }}abc{{ /nav:other }}"), "3");
        assert_eq!(render("{{ wrap }}{{ x }}{{ /wrap }}"), "<1>");
        assert_eq!(render("[{{ fail }}][{{ unknown:tag }}]"), "[][]");
    }

    #[test]
    fn mappings_loop_in_source_order() {
        let config: Dict = Toml::read("[pages]\nzeta = \"Z\"\nalpha = \"A\"\nmid = \"M\"").unwrap();
        let source = "{{ pages }}{{ index }}{{ value }}{{ /pages }}";
        assert_eq!(render(source, config), "1Z2A3M");
    }

    #[test]
    fn evaluation_is_deterministic() {
        let source = "{{ xs }}{{ value | upper }}{{ if last }}.{{ else }}, {{ /if }}{{ /xs }}";
        let vars = dict! { "xs" => vec!["a", "b", "c"] };
        let first = render(source, vars.clone());
        assert_eq!(first, "A, B, C.");
        for _ in 0..10 {
            assert_eq!(render(source, vars.clone()), first);
        }
    }
}

use std::sync::Arc;

use memchr::memmem;

use crate::antlers::ast::*;
use crate::antlers::{Context, Evaluator, Expr, Registry};
use crate::error::{SyntaxError, SyntaxErrorKind};

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: Arc<str>,
    nodes: Vec<TemplateNode>,
}

impl Template {
    /// Parses `source`. Bare names are variables unless they carry
    /// parameters or a `namespace:method`; see [`Template::parse_with()`] to
    /// also recognize bare registered tag names.
    pub fn parse(source: &str) -> Result<Template, SyntaxError> {
        Parser::new(source, None).parse()
    }

    /// Parses `source`, treating bare names registered as tags in
    /// `registry` as tag calls.
    pub fn parse_with(source: &str, registry: &Registry) -> Result<Template, SyntaxError> {
        Parser::new(source, Some(registry)).parse()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<TemplateNode> {
        self.nodes
    }

    pub fn render(&self, context: &Context<'_>, registry: &Registry) -> String {
        Evaluator::new(registry).evaluate(&self.nodes, context)
    }
}

/// Nodes of one block body, with the byte offset where each node's marker
/// ends so that pairs can recover their raw content.
#[derive(Debug, Default)]
struct Body {
    nodes: Vec<TemplateNode>,
    ends: Vec<usize>,
}

impl Body {
    fn push(&mut self, node: TemplateNode, end: usize) {
        self.nodes.push(node);
        self.ends.push(end);
    }
}

#[derive(Debug)]
enum Frame {
    Conditional {
        keyword: &'static str,
        offset: usize,
        done: Vec<(Expr, Vec<TemplateNode>)>,
        /// The open branch: `None` once inside `else`.
        current: (Option<Expr>, Body),
    },
    Foreach {
        name: Arc<str>,
        offset: usize,
        source: Variable,
        body: Body,
    },
}

impl Frame {
    fn body(&mut self) -> &mut Body {
        match self {
            Frame::Conditional { current, .. } => &mut current.1,
            Frame::Foreach { body, .. } => body,
        }
    }

    fn name(&self) -> Arc<str> {
        match self {
            Frame::Conditional { keyword, .. } => (*keyword).into(),
            Frame::Foreach { name, .. } => name.clone(),
        }
    }

    fn offset(&self) -> usize {
        match self {
            Frame::Conditional { offset, .. } | Frame::Foreach { offset, .. } => *offset,
        }
    }

    fn is_closed_by(&self, name: &str) -> bool {
        match self {
            Frame::Conditional { keyword, .. } => *keyword == name,
            Frame::Foreach { name: open, .. } => name == "foreach" || **open == *name,
        }
    }

    fn finish(self) -> TemplateNode {
        match self {
            Frame::Conditional { mut done, current: (expr, body), .. } => {
                let else_body = match expr {
                    Some(expr) => {
                        done.push((expr, body.nodes));
                        None
                    }
                    None => Some(body.nodes),
                };

                TemplateNode::Conditional(Conditional { branches: done, else_body })
            }
            Frame::Foreach { source, body, .. } => {
                TemplateNode::Loop(Loop { source, body: body.nodes })
            }
        }
    }
}

struct Parser<'a> {
    source: &'a str,
    registry: Option<&'a Registry>,
    root: Body,
    stack: Vec<Frame>,
}

fn current<'b>(stack: &'b mut [Frame], root: &'b mut Body) -> &'b mut Body {
    match stack.last_mut() {
        Some(frame) => frame.body(),
        None => root,
    }
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, registry: Option<&'a Registry>) -> Self {
        Parser { source, registry, root: Body::default(), stack: vec![] }
    }

    fn parse(mut self) -> Result<Template, SyntaxError> {
        let source = self.source;
        let bytes = source.as_bytes();
        let mut pos = 0;

        while let Some(start) = memmem::find(&bytes[pos..], b"{{").map(|i| i + pos) {
            if start > pos {
                self.push(TemplateNode::Literal(source[pos..start].to_string()), start);
            }

            let unterminated = SyntaxError::new(SyntaxErrorKind::UnterminatedMarker, start);
            if bytes[start + 2..].starts_with(b"#") {
                let end = memmem::find(&bytes[start + 3..], b"#}}").ok_or(unterminated)?;
                pos = start + 3 + end + 3;
                continue;
            }

            let end = find_marker_end(source, start + 2).ok_or(unterminated)?;
            pos = end + 2;
            self.marker(&source[start + 2..end], start, pos)?;
        }

        if pos < source.len() {
            self.push(TemplateNode::Literal(source[pos..].to_string()), source.len());
        }

        if let Some(frame) = self.stack.pop() {
            let kind = SyntaxErrorKind::UnclosedBlock(frame.name());
            return Err(SyntaxError::new(kind, frame.offset()));
        }

        Ok(Template { source: source.into(), nodes: self.root.nodes })
    }

    fn push(&mut self, node: TemplateNode, end: usize) {
        current(&mut self.stack, &mut self.root).push(node, end);
    }

    /// Handles the inside of one `{{ }}` marker spanning `start..end`.
    fn marker(&mut self, inner: &str, start: usize, end: usize) -> Result<(), SyntaxError> {
        let content = inner.trim();
        if content.is_empty() {
            return Err(SyntaxError::new(SyntaxErrorKind::EmptyMarker, start));
        }

        if let Some(name) = content.strip_prefix('/') {
            return self.close(name.trim(), start, end);
        }

        let split = content.find(|c: char| c.is_whitespace() || c == '(').unwrap_or(content.len());
        let (word, rest) = (&content[..split], &content[split..]);
        match word {
            "if" => self.open_conditional("if", Expr::parse(rest, start)?, start),
            "unless" => {
                let expr = Expr::Not(Box::new(Expr::parse(rest, start)?));
                self.open_conditional("unless", expr, start)
            }
            "elseif" => self.branch(Some(Expr::parse(rest, start)?), "elseif", start),
            "else" => match rest.trim_start().strip_prefix("if") {
                Some(cond) if cond.starts_with(|c: char| c.is_whitespace() || c == '(') => {
                    self.branch(Some(Expr::parse(cond, start)?), "elseif", start)
                }
                _ if rest.trim().is_empty() => self.branch(None, "else", start),
                _ => {
                    let kind = SyntaxErrorKind::MalformedExpression(format!("`{content}`"));
                    Err(SyntaxError::new(kind, start))
                }
            },
            _ if word.starts_with("foreach:") => {
                let source = match parse_call(content, start, None)? {
                    Call::Tag(tag) => Variable { path: tag.method, modifiers: tag.modifiers },
                    Call::Variable(variable) => variable,
                };

                self.stack.push(Frame::Foreach {
                    name: word.into(),
                    offset: start,
                    source,
                    body: Body::default(),
                });

                Ok(())
            }
            _ => {
                let node = match parse_call(content, start, self.registry)? {
                    Call::Variable(variable) => TemplateNode::Variable(variable),
                    Call::Tag(tag) => TemplateNode::TagCall(tag),
                };

                self.push(node, end);
                Ok(())
            }
        }
    }

    fn open_conditional(&mut self, keyword: &'static str, expr: Expr, offset: usize) -> Result<(), SyntaxError> {
        self.stack.push(Frame::Conditional {
            keyword,
            offset,
            done: vec![],
            current: (Some(expr), Body::default()),
        });

        Ok(())
    }

    /// Starts an `elseif` (`Some`) or `else` (`None`) branch.
    fn branch(&mut self, expr: Option<Expr>, keyword: &str, offset: usize) -> Result<(), SyntaxError> {
        match self.stack.last_mut() {
            Some(Frame::Conditional { done, current, .. }) if current.0.is_some() => {
                let (prev_expr, prev_body) = std::mem::replace(current, (expr, Body::default()));
                if let Some(prev_expr) = prev_expr {
                    done.push((prev_expr, prev_body.nodes));
                }

                Ok(())
            }
            _ => Err(SyntaxError::new(SyntaxErrorKind::MisplacedBranch(keyword.into()), offset)),
        }
    }

    /// Closes the innermost block if `name` matches it, or else turns the
    /// most recent matching variable or tag into a pair whose body is
    /// everything after it.
    fn close(&mut self, name: &str, start: usize, end: usize) -> Result<(), SyntaxError> {
        if self.stack.last().map_or(false, |frame| frame.is_closed_by(name)) {
            if let Some(frame) = self.stack.pop() {
                self.push(frame.finish(), end);
            }

            return Ok(());
        }

        let expected = self.stack.last().map(|frame| frame.name());
        let source = self.source;
        let body = current(&mut self.stack, &mut self.root);
        let opener = body.nodes.iter().rposition(|node| match node {
            TemplateNode::Variable(variable) => *variable.path == *name,
            TemplateNode::TagCall(tag) => tag.body.is_none() && tag.is_closed_by(name),
            _ => false,
        });

        let Some(i) = opener else {
            let kind = SyntaxErrorKind::UnbalancedBlock { found: name.into(), expected };
            return Err(SyntaxError::new(kind, start));
        };

        let inner = body.nodes.split_off(i + 1);
        body.ends.truncate(i + 1);
        let content = &source[body.ends[i]..start];
        body.ends[i] = end;

        if let TemplateNode::Variable(variable) = &body.nodes[i] {
            let source = variable.clone();
            body.nodes[i] = TemplateNode::Loop(Loop { source, body: inner });
        } else if let TemplateNode::TagCall(tag) = &mut body.nodes[i] {
            tag.body = Some(inner);
            tag.content = Some(content.into());
        }

        Ok(())
    }
}

/// Finds the `}}` ending a marker whose contents begin at `from`, skipping
/// over quoted strings.
fn find_marker_end(source: &str, from: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut quote = None;
    let mut i = from;
    while i < bytes.len() {
        match (quote, bytes[i]) {
            (Some(q), b'\\') if i + 1 < bytes.len() && bytes[i + 1] == q => i += 1,
            (Some(q), c) if c == q => quote = None,
            (None, c @ (b'"' | b'\'')) => quote = Some(c),
            (None, b'}') if bytes.get(i + 1) == Some(&b'}') => return Some(i),
            _ => {}
        }

        i += 1;
    }

    None
}

/// Splits `input` on `sep` wherever it isn't inside quotes.
fn split_unquoted(input: &str, sep: char) -> Vec<&str> {
    let mut parts = vec![];
    let (mut quote, mut last) = (None, 0);
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (None, '"' | '\'') => quote = Some(c),
            (None, c) if c == sep => {
                parts.push(&input[last..i]);
                last = i + c.len_utf8();
            }
            _ => {}
        }
    }

    parts.push(&input[last..]);
    parts
}

fn unquote(input: &str) -> &str {
    let input = input.trim();
    for q in ['"', '\''] {
        if let Some(inner) = input.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
            return inner;
        }
    }

    input
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

enum Call {
    Variable(Variable),
    Tag(TagCall),
}

fn parse_call(content: &str, offset: usize, registry: Option<&Registry>) -> Result<Call, SyntaxError> {
    let malformed = |kind| SyntaxError::new(kind, offset);
    let segments = split_unquoted(content, '|');
    let head = segments[0].trim();
    let split = head.find(char::is_whitespace).unwrap_or(head.len());
    let (name, params) = (&head[..split], &head[split..]);
    if name.is_empty() || !name.chars().all(is_name_char) {
        return Err(malformed(SyntaxErrorKind::MalformedExpression(format!("`{content}`"))));
    }

    let params = parse_params(params, offset)?;
    let modifiers = segments[1..].iter()
        .map(|segment| parse_modifier(segment, offset))
        .collect::<Result<Vec<_>, _>>()?;

    let is_tag = name.contains(':')
        || !params.is_empty()
        || registry.map_or(false, |r| r.has_tag(name));

    if !is_tag {
        return Ok(Call::Variable(Variable { path: name.into(), modifiers }));
    }

    let (tag, method) = name.split_once(':').unwrap_or((name, DEFAULT_METHOD));
    Ok(Call::Tag(TagCall {
        name: tag.into(),
        method: method.into(),
        params,
        modifiers,
        body: None,
        content: None,
    }))
}

fn parse_params(input: &str, offset: usize) -> Result<Params, SyntaxError> {
    let mut params = Params::new();
    let mut rest = input.trim_start();
    while !rest.is_empty() {
        let token = &rest[..rest.find(char::is_whitespace).unwrap_or(rest.len())];
        let malformed = || {
            SyntaxError::new(SyntaxErrorKind::MalformedParameter(token.to_string()), offset)
        };

        let (reference, body) = match rest.strip_prefix(':') {
            Some(body) => (true, body),
            None => (false, rest),
        };

        let key_len = body.find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.')))
            .unwrap_or(body.len());

        let (key, after) = body.split_at(key_len);
        let after = after.strip_prefix('=').filter(|_| !key.is_empty()).ok_or_else(malformed)?;
        let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'').ok_or_else(malformed)?;

        let mut close = None;
        let mut escaped = false;
        for (i, c) in after.char_indices().skip(1) {
            match c {
                '\\' if !escaped => escaped = true,
                c if c == quote && !escaped => {
                    close = Some(i);
                    break;
                }
                _ => escaped = false,
            }
        }

        let close = close.ok_or_else(malformed)?;
        let escape = format!("\\{quote}");
        let value: Arc<str> = after[1..close].replace(&escape, &quote.to_string()).into();
        let param = match reference {
            true => Param::Reference(value),
            false => Param::Literal(value),
        };

        params.insert(key.into(), param);
        rest = after[close + 1..].trim_start();
    }

    Ok(params)
}

fn parse_modifier(segment: &str, offset: usize) -> Result<ModifierCall, SyntaxError> {
    let parts = split_unquoted(segment.trim(), ':');
    let name = parts[0].trim();
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        let kind = SyntaxErrorKind::MalformedExpression(format!("modifier `{}`", segment.trim()));
        return Err(SyntaxError::new(kind, offset));
    }

    Ok(ModifierCall {
        name: name.into(),
        args: parts[1..].iter().map(|arg| unquote(arg).into()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<TemplateNode> {
        Template::parse(source).unwrap().into_nodes()
    }

    fn error(source: &str) -> SyntaxError {
        Template::parse(source).unwrap_err()
    }

    fn literal(text: &str) -> TemplateNode {
        TemplateNode::Literal(text.into())
    }

    fn var(path: &str) -> TemplateNode {
        TemplateNode::Variable(Variable::new(path))
    }

    #[test]
    fn literals_and_variables() {
        assert_eq!(parse(""), vec![]);
        assert_eq!(parse("plain text"), vec![literal("plain text")]);
        assert_eq!(parse("Hi {{ name }}!"), vec![literal("Hi "), var("name"), literal("!")]);
        assert_eq!(parse("{{author.name}}{{ x }}"), vec![var("author.name"), var("x")]);
        assert_eq!(parse("a{{# ignored {{ x }} #}}b"), vec![literal("a"), literal("b")]);
    }

    #[test]
    fn node_count_covers_spans_and_markers() {
        let source = "A {{ a }} B {{ b | upper }}{{ c }} C";
        let (spans, markers) = (3, 3);
        assert!(parse(source).len() >= spans + markers);
    }

    #[test]
    fn modifiers() {
        let nodes = parse("{{ title | truncate:10:'...' | upper }}");
        let TemplateNode::Variable(variable) = &nodes[0] else { panic!("{nodes:?}") };
        assert_eq!(&*variable.path, "title");
        assert_eq!(variable.modifiers, vec![
            ModifierCall { name: "truncate".into(), args: vec!["10".into(), "...".into()] },
            ModifierCall { name: "upper".into(), args: vec![] },
        ]);
    }

    #[test]
    fn tags_and_params() {
        let nodes = parse(r#"{{ collection:blog limit="5" :sort="order" limit='10' title="a \"b\"" }}"#);
        let TemplateNode::TagCall(tag) = &nodes[0] else { panic!("{nodes:?}") };
        assert_eq!((&*tag.name, &*tag.method), ("collection", "blog"));

        let params: Vec<_> = tag.params.iter().map(|(k, v)| (&**k, v.clone())).collect();
        assert_eq!(params, vec![
            ("limit", Param::Literal("10".into())),
            ("sort", Param::Reference("order".into())),
            ("title", Param::Literal("a \"b\"".into())),
        ]);

        // A bare name with parameters is a tag, too.
        let nodes = parse(r#"{{ trans key="hello" }}"#);
        assert!(matches!(&nodes[0], TemplateNode::TagCall(t) if &*t.method == DEFAULT_METHOD));

        // Bare names are tags only when registered.
        assert_eq!(parse("{{ trans }}"), vec![var("trans")]);
        let registry = Registry::with_builtins();
        let nodes = Template::parse_with("{{ trans }}", &registry).unwrap().into_nodes();
        assert!(matches!(&nodes[0], TemplateNode::TagCall(t) if &*t.name == "trans"));
    }

    #[test]
    fn conditionals() {
        let nodes = parse("{{ if foo }}A{{ elseif bar }}B{{ else }}C{{ /if }}");
        assert_eq!(nodes, vec![TemplateNode::Conditional(Conditional {
            branches: vec![
                (Expr::Path("foo".into()), vec![literal("A")]),
                (Expr::Path("bar".into()), vec![literal("B")]),
            ],
            else_body: Some(vec![literal("C")]),
        })]);

        let nodes = parse("{{ unless foo }}A{{ else if bar }}B{{ /unless }}");
        let TemplateNode::Conditional(cond) = &nodes[0] else { panic!("{nodes:?}") };
        assert_eq!(cond.branches[0].0, Expr::Not(Box::new(Expr::Path("foo".into()))));
        assert_eq!(cond.branches.len(), 2);
        assert_eq!(cond.else_body, None);
    }

    #[test]
    fn pairs() {
        let nodes = parse("{{ items }}{{ index }}:{{ value }} {{ /items }}");
        assert_eq!(nodes, vec![TemplateNode::Loop(Loop {
            source: Variable::new("items"),
            body: vec![var("index"), literal(":"), var("value"), literal(" ")],
        })]);

        let nodes = parse("{{ foreach:tags }}[{{ value }}]{{ /foreach:tags }}");
        assert_eq!(nodes, vec![TemplateNode::Loop(Loop {
            source: Variable::new("tags"),
            body: vec![literal("["), var("value"), literal("]")],
        })]);

        let nodes = parse("{{ nav:main }}<a>{{ title }}</a>{{ /nav:main }}!");
        let TemplateNode::TagCall(tag) = &nodes[0] else { panic!("{nodes:?}") };
        assert_eq!(tag.content.as_deref(), Some("<a>{{ title }}</a>"));
        assert_eq!(tag.body.as_ref().map(|b| b.len()), Some(3));
        assert_eq!(nodes[1], literal("!"));

        // Pairs nest inside conditionals and vice versa.
        let nodes = parse("{{ if a }}{{ xs }}{{ if b }}{{ y }}{{ /if }}{{ /xs }}{{ /if }}");
        let TemplateNode::Conditional(cond) = &nodes[0] else { panic!("{nodes:?}") };
        assert!(matches!(&cond.branches[0].1[0], TemplateNode::Loop(l) if l.body.len() == 1));
    }

    #[test]
    fn syntax_errors() {
        let kind = |source| error(source).kind;
        assert_eq!(kind("Hi {{ name "), SyntaxErrorKind::UnterminatedMarker);
        assert_eq!(kind("{{# note "), SyntaxErrorKind::UnterminatedMarker);
        assert_eq!(kind("{{ }}"), SyntaxErrorKind::EmptyMarker);
        assert_eq!(kind("{{ if a }}x"), SyntaxErrorKind::UnclosedBlock("if".into()));
        assert_eq!(kind("{{ else }}"), SyntaxErrorKind::MisplacedBranch("else".into()));
        assert_eq!(
            kind("{{ if a }}{{ else }}{{ else }}{{ /if }}"),
            SyntaxErrorKind::MisplacedBranch("else".into())
        );
        assert!(matches!(kind("{{ tag a=b }}"), SyntaxErrorKind::MalformedParameter(_)));
        assert!(matches!(kind("{{ tag a=\"b\" c }}"), SyntaxErrorKind::MalformedParameter(_)));
        assert!(matches!(kind("{{ a+b }}"), SyntaxErrorKind::MalformedExpression(_)));
        assert!(matches!(kind("{{ if }}{{ /if }}"), SyntaxErrorKind::MalformedExpression(_)));

        let err = error("ok {{ /items }}");
        assert_eq!(err.offset, 3);
        assert_eq!(err.kind, SyntaxErrorKind::UnbalancedBlock { found: "items".into(), expected: None });

        let err = error("{{ if a }}{{ /unless }}{{ /if }}");
        assert_eq!(err.kind, SyntaxErrorKind::UnbalancedBlock {
            found: "unless".into(),
            expected: Some("if".into()),
        });

        // A pair can't close across an open block.
        assert!(Template::parse("{{ xs }}{{ if a }}{{ /xs }}{{ /if }}").is_err());
    }
}

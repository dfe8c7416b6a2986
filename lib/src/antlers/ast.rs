use std::sync::Arc;

use indexmap::IndexMap;

use crate::antlers::Expr;

/// Tag parameters in source order. A repeated key keeps its last value.
pub type Params = IndexMap<Arc<str>, Param>;

/// A tag parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// `key="text"`: the text, verbatim.
    Literal(Arc<str>),
    /// `:key="path.to.var"`: the value at the path, resolved at call time.
    Reference(Arc<str>),
}

/// `| name:arg:arg` in a variable or loop marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierCall {
    pub name: Arc<str>,
    pub args: Vec<Arc<str>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// Text outside of any marker, emitted verbatim.
    Literal(String),
    Variable(Variable),
    TagCall(TagCall),
    Conditional(Conditional),
    Loop(Loop),
}

/// `{{ path.to.value | modifier:arg }}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub path: Arc<str>,
    pub modifiers: Vec<ModifierCall>,
}

/// `{{ name:method key="value" }}`, optionally paired with a closing
/// `{{ /name:method }}`.
#[derive(Debug, Clone, PartialEq)]
pub struct TagCall {
    pub name: Arc<str>,
    pub method: Arc<str>,
    pub params: Params,
    pub modifiers: Vec<ModifierCall>,
    /// The parsed body of a tag pair.
    pub body: Option<Vec<TemplateNode>>,
    /// The body of a tag pair as written in the source.
    pub content: Option<Arc<str>>,
}

/// `{{ if a }}..{{ elseif b }}..{{ else }}..{{ /if }}`. `unless` blocks are
/// conditionals with a negated first branch.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub branches: Vec<(Expr, Vec<TemplateNode>)>,
    pub else_body: Option<Vec<TemplateNode>>,
}

/// A variable pair, `{{ items }}..{{ /items }}`, or `{{ foreach:items }}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    pub source: Variable,
    pub body: Vec<TemplateNode>,
}

/// The method a tag is called with when none is named.
pub const DEFAULT_METHOD: &str = "index";

impl TagCall {
    /// Whether `{{ /name }}` closes this tag.
    pub fn is_closed_by(&self, name: &str) -> bool {
        match name.split_once(':') {
            Some((tag, method)) => *self.name == *tag && *self.method == *method,
            None => *self.name == *name,
        }
    }
}

impl Variable {
    pub fn new(path: impl Into<Arc<str>>) -> Self {
        Variable { path: path.into(), modifiers: vec![] }
    }
}

use std::sync::Arc;

use crate::value::{Dict, Value};

/// The variables visible while rendering, as a chain of scopes.
///
/// Loops and tag pairs push a fresh child scope per iteration; the parent is
/// only ever borrowed, so nothing a body does leaks into sibling iterations
/// or the enclosing scope.
#[derive(Debug, Clone, Default)]
pub struct Context<'p> {
    parent: Option<&'p Context<'p>>,
    vars: Dict,
}

impl Context<'static> {
    pub fn new(vars: Dict) -> Self {
        Context { parent: None, vars }
    }
}

impl<'p> Context<'p> {
    /// A new scope on top of `self`. Keys in `vars` shadow outer ones.
    pub fn child(&self, vars: Dict) -> Context<'_> {
        Context { parent: Some(self), vars }
    }

    /// The variables of the innermost scope only.
    pub fn vars(&self) -> &Dict {
        &self.vars
    }

    /// Resolves a dotted path. The first segment is looked up from the
    /// innermost scope outwards; the rest walks into the value found.
    pub fn get(&self, path: &str) -> Option<Value> {
        let path = path.trim();
        let (head, rest) = path.split_once('.').unwrap_or((path, ""));
        let mut scope = Some(self);
        while let Some(context) = scope {
            if let Some(value) = context.vars.get(head) {
                return value.lookup(rest).cloned();
            }

            scope = context.parent;
        }

        None
    }

    pub fn contains(&self, key: &str) -> bool {
        let mut scope = Some(self);
        while let Some(context) = scope {
            if context.vars.contains_key(key) {
                return true;
            }

            scope = context.parent;
        }

        false
    }

    /// Every visible variable, merged into a single mapping.
    pub fn flatten(&self) -> Dict {
        let mut dict = self.parent.map(|p| p.flatten()).unwrap_or_default();
        dict.extend(self.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        dict
    }

    pub fn insert(&mut self, key: impl Into<Arc<str>>, value: impl Into<Value>) {
        self.vars.insert(key.into(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;

    #[test]
    fn scopes_shadow_without_leaking() {
        let root = Context::new(dict! { "title" => "Outer", "site" => dict! { "name" => "S" } });
        let mut inner = root.child(dict! { "title" => "Inner" });
        inner.insert("index", 1);

        assert_eq!(inner.get("title"), Some("Inner".into()));
        assert_eq!(inner.get("site.name"), Some("S".into()));
        assert_eq!(inner.get("site.missing"), None);
        assert_eq!(root.get("index"), None);
        assert!(inner.contains("site") && !root.contains("index"));

        let flat = inner.flatten();
        assert_eq!(flat["title"], Value::from("Inner"));
        assert_eq!(flat.len(), 3);
    }
}

use std::sync::Arc;

use crate::error::Result;
use crate::value::{Dict, Value};
use crate::view::{CascadeContent, Environment};

/// A template to render, with its data, optional layout and the content it
/// is about.
///
/// ```rust
/// use antlers::dict;
/// use antlers::config::ConfigStore;
/// use antlers::view::{Environment, MemoryLoader, View};
///
/// let loader = MemoryLoader::new()
///     .with("post.antlers.html", "<h1>{{ title }}</h1>")
///     .with("layout.antlers.html", "<body>{{ template_content }}</body>");
///
/// let env = Environment::new(ConfigStore::default().into(), loader);
/// let html = View::make("post")
///     .with(dict! { "title" => "Hello" })
///     .layout("layout")
///     .render(&env)
///     .unwrap();
///
/// assert_eq!(html, "<body><h1>Hello</h1></body>");
/// ```
#[derive(Debug, Clone, Default)]
pub struct View {
    template: Option<Arc<str>>,
    layout: Option<Arc<str>>,
    data: Dict,
    content: Option<Arc<dyn CascadeContent>>,
}

impl View {
    pub fn make(template: impl Into<Arc<str>>) -> Self {
        View { template: Some(template.into()), ..View::default() }
    }

    /// Replaces the view's explicit data.
    pub fn with(mut self, data: Dict) -> Self {
        self.data = data;
        self
    }

    /// Adds one key to the view's explicit data.
    pub fn with_value(mut self, key: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn layout(mut self, layout: impl Into<Arc<str>>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    pub fn cascade_content<C: CascadeContent + 'static>(mut self, content: C) -> Self {
        self.content = Some(Arc::new(content));
        self
    }

    pub fn template_name(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn layout_name(&self) -> Option<&str> {
        self.layout.as_deref()
    }

    pub fn data(&self) -> &Dict {
        &self.data
    }

    pub fn content(&self) -> Option<&Arc<dyn CascadeContent>> {
        self.content.as_ref()
    }

    /// Renders the view in `env`. See [`Environment::render()`].
    pub fn render(&self, env: &Environment) -> Result<String> {
        env.render(self)
    }
}

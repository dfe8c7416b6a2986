//! Template compilers: turning a loaded template and its data into text.

#[cfg(feature = "jinja")]
pub mod minijinja;

use std::fmt::Debug;
use std::sync::Arc;

use crate::antlers::{Context, Registry, Template};
use crate::error::{Chainable, Result};
use crate::value::Dict;

/// The language a template is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateFormat {
    Antlers,
    Jinja,
    /// Emitted verbatim.
    Plain,
}

impl TemplateFormat {
    /// Recognized extensions, most preferred first.
    pub const fn extensions(self) -> &'static [&'static str] {
        match self {
            TemplateFormat::Antlers => &["antlers.html", "antlers.php"],
            TemplateFormat::Jinja => &["j2", "jinja", "jinja2"],
            TemplateFormat::Plain => &["html", "txt"],
        }
    }

    /// The format implied by a file name's extension. Unrecognized
    /// extensions are [`TemplateFormat::Plain`].
    ///
    /// ```rust
    /// use antlers::templating::TemplateFormat;
    ///
    /// assert_eq!(TemplateFormat::from_path("layout.antlers.html"), TemplateFormat::Antlers);
    /// assert_eq!(TemplateFormat::from_path("partials/nav.j2"), TemplateFormat::Jinja);
    /// assert_eq!(TemplateFormat::from_path("robots.txt"), TemplateFormat::Plain);
    /// assert_eq!(TemplateFormat::from_path("page.blade.php"), TemplateFormat::Plain);
    /// ```
    pub fn from_path(path: &str) -> TemplateFormat {
        let has_ext = |ext: &&str| {
            path.strip_suffix(*ext).map_or(false, |rest| rest.ends_with('.'))
        };

        [TemplateFormat::Antlers, TemplateFormat::Jinja].into_iter()
            .find(|format| format.extensions().iter().any(has_ext))
            .unwrap_or(TemplateFormat::Plain)
    }
}

/// A template's text, ready to be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// The name the template was loaded by, such as `layouts.default`.
    pub name: Arc<str>,
    pub text: Arc<str>,
    pub format: TemplateFormat,
}

impl Source {
    pub fn new(name: impl Into<Arc<str>>, text: impl Into<Arc<str>>, format: TemplateFormat) -> Self {
        Source { name: name.into(), text: text.into(), format }
    }
}

pub trait Compiler: Send + Sync + Debug {
    /// Renders `source` with `data` as its variables. `registry` holds the
    /// tags and modifiers available to Antlers templates.
    fn compile(&self, source: &Source, data: &Dict, registry: &Registry) -> Result<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AntlersCompiler;

impl Compiler for AntlersCompiler {
    fn compile(&self, source: &Source, data: &Dict, registry: &Registry) -> Result<String> {
        if !crate::util::is_template(&source.text) {
            return Ok(source.text.to_string());
        }

        let template = Template::parse_with(&source.text, registry)
            .chain_with(|| error!("failed to parse template", "template" => source.name))?;

        Ok(template.render(&Context::new(data.clone()), registry))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PlainCompiler;

impl Compiler for PlainCompiler {
    fn compile(&self, source: &Source, _: &Dict, _: &Registry) -> Result<String> {
        Ok(source.text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;

    #[test]
    fn antlers_and_plain_compilers() {
        let registry = Registry::with_builtins();
        let data = dict! { "name" => "ann" };

        let source = Source::new("hello", "Hi {{ name | upper }}", TemplateFormat::Antlers);
        assert_eq!(AntlersCompiler.compile(&source, &data, &registry).unwrap(), "Hi ANN");

        let source = Source::new("hello", "Hi {{ name }}", TemplateFormat::Plain);
        assert_eq!(PlainCompiler.compile(&source, &data, &registry).unwrap(), "Hi {{ name }}");

        let source = Source::new("broken", "{{ if x }}", TemplateFormat::Antlers);
        let error = AntlersCompiler.compile(&source, &data, &registry).unwrap_err();
        assert!(error.to_string().contains("broken"));
    }

    #[test]
    fn formats_from_paths() {
        assert_eq!(TemplateFormat::from_path("a.antlers.php"), TemplateFormat::Antlers);
        assert_eq!(TemplateFormat::from_path("a.jinja2"), TemplateFormat::Jinja);
        assert_eq!(TemplateFormat::from_path("antlers.html"), TemplateFormat::Plain);
        assert_eq!(TemplateFormat::from_path("noext"), TemplateFormat::Plain);
    }
}

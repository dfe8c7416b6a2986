use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::antlers::{Modifier, Registry, Tag, Translator};
use crate::config::{Config, ConfigStore};
use crate::error::Result;
use crate::templating::{AntlersCompiler, Compiler, PlainCompiler, Source, TemplateFormat};
use crate::value::{Dict, Value};
use crate::view::{cascade, Loader, RenderObserver, View, ViewRendered};

/// Everything needed to render views: configuration, templates, compilers,
/// extra tags and modifiers, and render observers.
pub struct Environment {
    config: Arc<ConfigStore>,
    loader: Arc<dyn Loader>,
    compilers: FxHashMap<TemplateFormat, Arc<dyn Compiler>>,
    extensions: Registry,
    observers: Vec<Arc<dyn RenderObserver>>,
    /// The registry for the last configuration snapshot seen.
    registry: Mutex<Option<(Arc<Config>, Arc<Registry>)>>,
}

impl Environment {
    pub fn new<L: Loader + 'static>(config: Arc<ConfigStore>, loader: L) -> Self {
        let mut compilers: FxHashMap<TemplateFormat, Arc<dyn Compiler>> = FxHashMap::default();
        compilers.insert(TemplateFormat::Antlers, Arc::new(AntlersCompiler));
        compilers.insert(TemplateFormat::Plain, Arc::new(PlainCompiler));

        #[cfg(feature = "jinja")]
        compilers.insert(TemplateFormat::Jinja, Arc::new(crate::templating::minijinja::MiniJinjaCompiler::new()));

        Environment {
            config,
            loader: Arc::new(loader),
            compilers,
            extensions: Registry::new(),
            observers: vec![],
            registry: Mutex::new(None),
        }
    }

    /// Uses `compiler` for templates in `format`.
    pub fn with_compiler<C: Compiler + 'static>(mut self, format: TemplateFormat, compiler: C) -> Self {
        self.compilers.insert(format, Arc::new(compiler));
        self
    }

    pub fn with_observer<O: RenderObserver + 'static>(mut self, observer: O) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn register_tag<T: Tag + 'static>(mut self, name: &str, tag: T) -> Self {
        self.extensions.register_tag(name, tag);
        *self.registry.get_mut() = None;
        self
    }

    pub fn register_modifier<M: Modifier + 'static>(mut self, name: &str, modifier: M) -> Self {
        self.extensions.register_modifier(name, modifier);
        *self.registry.get_mut() = None;
        self
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn loader(&self) -> &Arc<dyn Loader> {
        &self.loader
    }

    /// The tags and modifiers templates see under `config`: the built-ins,
    /// translations from `config`, and everything registered here.
    pub fn registry(&self, config: &Arc<Config>) -> Arc<Registry> {
        let mut cache = self.registry.lock();
        if let Some((cached, registry)) = &*cache {
            if Arc::ptr_eq(cached, config) {
                return registry.clone();
            }
        }

        let translator = Translator::new(config.translations.clone(), config.site.locale.clone());
        let mut registry = Registry::with_translator(translator);
        registry.extend(&self.extensions);

        let registry = Arc::new(registry);
        *cache = Some((config.clone(), registry.clone()));
        registry
    }

    pub fn compile(&self, source: &Source, data: &Dict, registry: &Registry) -> Result<String> {
        match self.compilers.get(&source.format) {
            Some(compiler) => compiler.compile(source, data, registry),
            None => err!("no compiler for template format",
                "template" => source.name,
                "format" => format!("{:?}", source.format)),
        }
    }

    /// Renders `view`:
    ///
    ///   1. the cascade is resolved for the view's content;
    ///   2. the view's own data is layered over it;
    ///   3. the template is rendered with the result;
    ///   4. if the view has a layout and the template is Antlers, the layout
    ///      is rendered with the same data plus `template_content`, the
    ///      rendered template;
    ///   5. observers are notified.
    pub fn render(&self, view: &View) -> Result<String> {
        let Some(name) = view.template_name() else {
            return err!("view has no template");
        };

        let config = self.config.snapshot();
        let registry = self.registry(&config);
        let mut data = cascade::resolve(&config, view.content().cloned());
        data.extend(view.data().iter().map(|(k, v)| (k.clone(), v.clone())));

        let template = self.loader.load(name)?;
        let mut output = self.compile(&template, &data, &registry)?;
        match (view.layout_name(), template.format) {
            (Some(layout), TemplateFormat::Antlers) => {
                let layout = self.loader.load(layout)?;
                data.insert("template_content".into(), Value::from(output));
                output = self.compile(&layout, &data, &registry)?;
            }
            (Some(layout), format) => {
                tracing::debug!(template = name, layout, ?format, "layout skipped");
            }
            (None, _) => {}
        }

        let event = ViewRendered { view, output: &output };
        for observer in &self.observers {
            observer.view_rendered(&event);
        }

        tracing::debug!(template = name, layout = ?view.layout_name(), bytes = output.len(), "rendered view");
        Ok(output)
    }

    /// Renders every view in parallel, returning results in order.
    pub fn render_all(&self, views: &[View]) -> Vec<Result<String>> {
        crate::time!(views.par_iter().map(|view| self.render(view)).collect())
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats: Vec<_> = self.compilers.keys().collect();
        formats.sort();

        f.debug_struct("Environment")
            .field("config", &self.config)
            .field("loader", &self.loader)
            .field("compilers", &formats)
            .field("extensions", &self.extensions)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)] static_assertions::assert_impl_all!(Environment: Send, Sync);
#[cfg(test)] static_assertions::assert_impl_all!(View: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;
    use crate::view::MemoryLoader;

    #[test]
    fn registry_follows_config_snapshots() {
        let store = Arc::new(ConfigStore::default());
        let env = Environment::new(store.clone(), MemoryLoader::new());

        let first = env.registry(&store.snapshot());
        assert!(Arc::ptr_eq(&first, &env.registry(&store.snapshot())));

        store.reload(Config::default());
        assert!(!Arc::ptr_eq(&first, &env.registry(&store.snapshot())));
    }

    #[test]
    fn missing_templates_and_compilers_fail() {
        let loader = MemoryLoader::new().with("page.antlers.html", "x");
        let env = Environment::new(Arc::default(), loader);
        assert!(env.render(&View::default()).is_err());
        assert!(env.render(&View::make("nope")).is_err());

        let source = Source::new("s", "x", TemplateFormat::Plain);
        let bare = Environment { compilers: FxHashMap::default(), ..env };
        let registry = Registry::new();
        assert!(bare.compile(&source, &dict! {}, &registry).is_err());
    }
}

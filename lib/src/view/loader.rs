use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::Result;
use crate::templating::{Source, TemplateFormat};

/// Finds templates by name.
///
/// Names use dots for directories: `layouts.default` is the template
/// `layouts/default` in whichever supported format exists.
pub trait Loader: Send + Sync + Debug {
    fn load(&self, name: &str) -> Result<Source>;
}

/// The formats, in the order a loader tries them.
const LOAD_ORDER: [TemplateFormat; 3] = [
    TemplateFormat::Antlers,
    TemplateFormat::Jinja,
    TemplateFormat::Plain,
];

/// Loads templates from a directory on disk.
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        FsLoader { root: root.as_ref().to_path_buf() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file `name` refers to, if any exists.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        let exact = self.root.join(name);
        if exact.is_file() && TemplateFormat::from_path(name) != TemplateFormat::Plain {
            return Some(exact);
        }

        let stem = self.root.join(name.replace('.', "/"));
        LOAD_ORDER.iter()
            .flat_map(|format| format.extensions())
            .map(|ext| {
                let mut file = stem.clone().into_os_string();
                file.push(".");
                file.push(ext);
                PathBuf::from(file)
            })
            .find(|path| path.is_file())
            .or_else(|| exact.is_file().then_some(exact))
    }
}

impl Loader for FsLoader {
    fn load(&self, name: &str) -> Result<Source> {
        let Some(path) = self.find(name) else {
            return err!("template not found", "name" => name, "root" => self.root.display());
        };

        let text = std::fs::read_to_string(&path)?;
        let format = TemplateFormat::from_path(&path.to_string_lossy());
        tracing::debug!(name, path = %path.display(), ?format, "loaded template");
        Ok(Source::new(name, text, format))
    }
}

/// Holds templates in memory, keyed by file name.
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    templates: Arc<DashMap<Arc<str>, Source>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        MemoryLoader::default()
    }

    /// Adds a template under its file name, such as `layout.antlers.html`.
    /// It can be loaded by that name or by the name without its extension.
    pub fn insert(&self, file: &str, text: impl Into<Arc<str>>) {
        let format = TemplateFormat::from_path(file);
        let name = format.extensions().iter()
            .find_map(|ext| file.strip_suffix(ext)?.strip_suffix('.'))
            .unwrap_or(file);

        let source = Source::new(name, text, format);
        self.templates.insert(file.into(), source.clone());
        self.templates.insert(name.into(), source);
    }

    pub fn with(self, file: &str, text: impl Into<Arc<str>>) -> Self {
        self.insert(file, text);
        self
    }
}

impl Loader for MemoryLoader {
    fn load(&self, name: &str) -> Result<Source> {
        match self.templates.get(name) {
            Some(source) => Ok(source.clone()),
            None => err!("template not found", "name" => name),
        }
    }
}

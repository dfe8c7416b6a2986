use std::fmt::Debug;
use std::sync::Arc;

use crate::config::Config;
use crate::content::Asset;
use crate::value::{Dict, Value};

/// Content a view can be about: a page, an entry, an asset.
pub trait CascadeContent: Send + Sync + Debug {
    /// Everything the content exposes to templates. Any I/O happens here,
    /// before rendering starts.
    fn to_cascade(&self) -> Dict;
}

impl CascadeContent for Asset {
    fn to_cascade(&self) -> Dict {
        self.to_dict()
    }
}

impl CascadeContent for Dict {
    fn to_cascade(&self) -> Dict {
        self.clone()
    }
}

/// One named source of cascade data.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeLayer {
    pub name: &'static str,
    pub data: Dict,
}

/// The layered data every view starts from.
///
/// Layers, from first to last, with later layers winning on conflicts:
///
///   * `globals`: every global variable from the configuration;
///   * `site`: `site` (the site's settings) and `locale`;
///   * `content`: the content's own keys, and the same again under `page`.
#[derive(Debug, Clone)]
pub struct Cascade {
    config: Arc<Config>,
    content: Option<Arc<dyn CascadeContent>>,
}

impl Cascade {
    pub fn new(config: Arc<Config>) -> Self {
        Cascade { config, content: None }
    }

    pub fn with_content(mut self, content: Option<Arc<dyn CascadeContent>>) -> Self {
        self.content = content;
        self
    }

    pub fn content(&self) -> Option<&Arc<dyn CascadeContent>> {
        self.content.as_ref()
    }

    pub fn layers(&self) -> Vec<CascadeLayer> {
        let globals = self.config.globals.clone();

        let site = &self.config.site;
        let site = crate::dict! {
            "site" => site.to_dict(),
            "locale" => site.locale.clone(),
        };

        let mut content: Dict = Dict::new();
        if let Some(page) = &self.content {
            let page = page.to_cascade();
            content.extend(page.iter().map(|(k, v)| (k.clone(), v.clone())));
            content.insert("page".into(), Value::from(page));
        }

        vec![
            CascadeLayer { name: "globals", data: globals },
            CascadeLayer { name: "site", data: site },
            CascadeLayer { name: "content", data: content },
        ]
    }

    /// Merges every layer into one mapping. Calling this again yields the
    /// same mapping.
    pub fn hydrate(&self) -> Dict {
        let layers = self.layers();
        let mut data: Dict = Dict::new();
        for layer in layers {
            tracing::debug!(layer = layer.name, keys = layer.data.len(), "hydrating cascade");
            data.extend(layer.data);
        }

        data
    }
}

/// Merges the configuration's layers with `content`.
pub fn resolve(config: &Arc<Config>, content: Option<Arc<dyn CascadeContent>>) -> Dict {
    Cascade::new(config.clone()).with_content(content).hydrate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;
    use crate::value::{Format, Toml};

    fn config() -> Arc<Config> {
        let config: Config = Toml::read(r#"
            tagline = "Notes"
            title = "Global title"

            [site]
            name = "Field Notes"
            locale = "fr"
        "#).unwrap();

        Arc::new(config)
    }

    #[test]
    fn later_layers_win() {
        let page: Arc<dyn CascadeContent> = Arc::new(dict! { "title" => "Page title" });
        let data = resolve(&config(), Some(page));

        assert_eq!(data["title"], Value::from("Page title"));
        assert_eq!(data["tagline"], Value::from("Notes"));
        assert_eq!(data["locale"], Value::from("fr"));
        assert_eq!(data["site"].lookup("name"), Some(&Value::from("Field Notes")));
        assert_eq!(data["page"].lookup("title"), Some(&Value::from("Page title")));

        let without = resolve(&config(), None);
        assert_eq!(without["title"], Value::from("Global title"));
        assert!(!without.contains_key("page"));
    }

    #[test]
    fn hydration_is_idempotent() {
        let page: Arc<dyn CascadeContent> = Arc::new(dict! { "a" => 1 });
        let cascade = Cascade::new(config()).with_content(Some(page));
        let names: Vec<_> = cascade.layers().iter().map(|l| l.name).collect();

        assert_eq!(names, ["globals", "site", "content"]);
        assert_eq!(cascade.hydrate(), cascade.hydrate());
    }
}

//! Site configuration and the process-wide snapshot holder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::content::{LocalDisk, Storage};
use crate::error::{Chainable, Result};
use crate::value::{Dict, Format, Json, Toml, Value};

/// The contents of `config.toml`.
///
/// ```toml
/// [site]
/// name = "Field Notes"
/// url = "https://notes.example"
/// locale = "en"
///
/// [disks.assets]
/// root = "assets"
/// url = "/assets"
///
/// [translations.en]
/// greeting = "Hello, :name!"
///
/// # Anything else is a global variable.
/// tagline = "Notes from the field"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: Site,
    /// Locale to translation lines.
    #[serde(default)]
    pub translations: Arc<Dict>,
    #[serde(default)]
    pub disks: IndexMap<Arc<str>, DiskConfig>,
    #[serde(flatten)]
    pub globals: Dict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    #[serde(default = "Site::default_name")]
    pub name: Arc<str>,
    #[serde(default = "Site::default_url")]
    pub url: Arc<str>,
    #[serde(default = "Site::default_locale")]
    pub locale: Arc<str>,
    #[serde(flatten)]
    pub extra: Dict,
}

/// A local directory assets can be stored on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskConfig {
    /// Relative roots are resolved against the configuration file's directory.
    pub root: PathBuf,
    #[serde(default)]
    pub url: Option<Arc<str>>,
}

impl Site {
    fn default_name() -> Arc<str> { "Site".into() }

    fn default_url() -> Arc<str> { "/".into() }

    fn default_locale() -> Arc<str> { "en".into() }

    /// The site as template data: `name`, `url`, `locale` and any extra keys.
    pub fn to_dict(&self) -> Dict {
        let mut dict = self.extra.clone();
        dict.insert("name".into(), Value::from(self.name.clone()));
        dict.insert("url".into(), Value::from(self.url.clone()));
        dict.insert("locale".into(), Value::from(self.locale.clone()));
        dict
    }
}

impl Default for Site {
    fn default() -> Self {
        Site {
            name: Site::default_name(),
            url: Site::default_url(),
            locale: Site::default_locale(),
            extra: Dict::new(),
        }
    }
}

impl DiskConfig {
    pub fn open(&self, base: &Path) -> Arc<dyn Storage> {
        let mut disk = LocalDisk::new(base.join(&self.root));
        if let Some(url) = &self.url {
            disk = disk.with_url(url.to_string());
        }

        Arc::new(disk)
    }
}

impl Config {
    /// Reads a TOML or, for `.json` files, JSON configuration file.
    pub fn read(path: &Path) -> Result<Config> {
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Json::read_file(path),
            _ => Toml::read_file(path),
        };

        config.chain_with(|| error!("invalid configuration", "path" => path.display()))
    }
}

/// Holds the current configuration.
///
/// Readers take cheap, immutable snapshots; a reload swaps in a new snapshot
/// without disturbing renders holding the old one.
#[derive(Debug, Default)]
pub struct ConfigStore {
    current: RwLock<Arc<Config>>,
}

impl ConfigStore {
    pub fn new(config: Config) -> Self {
        ConfigStore { current: RwLock::new(Arc::new(config)) }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(ConfigStore::new(Config::read(path)?))
    }

    pub fn snapshot(&self) -> Arc<Config> {
        self.current.read().clone()
    }

    pub fn reload(&self, config: Config) {
        tracing::info!(site = %config.site.name, "configuration reloaded");
        *self.current.write() = Arc::new(config);
    }

    /// Replaces the configuration with the file at `path`. On error the
    /// current configuration is kept.
    pub fn reload_from(&self, path: &Path) -> Result<()> {
        self.reload(Config::read(path)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        tagline = "Notes"
        nav = ["home", "about"]

        [site]
        name = "Field Notes"
        established = 2020

        [disks.assets]
        root = "assets"
        url = "/assets"

        [translations.en]
        greeting = "Hello"
    "#;

    #[test]
    fn parses_with_defaults() {
        let config: Config = Toml::read(CONFIG).unwrap();
        assert_eq!(&*config.site.name, "Field Notes");
        assert_eq!(&*config.site.url, "/");
        assert_eq!(&*config.site.locale, "en");
        assert_eq!(config.site.to_dict()["established"], Value::from(2020i64));
        assert_eq!(config.globals["tagline"], Value::from("Notes"));
        assert_eq!(config.globals.len(), 2);
        assert_eq!(&*config.disks["assets"].root, Path::new("assets"));
        assert!(config.translations.get("en").is_some());

        let empty: Config = Toml::read("").unwrap();
        assert_eq!(&*empty.site.name, "Site");
        assert!(empty.globals.is_empty());
    }

    #[test]
    fn snapshots_survive_reloads() {
        let store = ConfigStore::new(Toml::read(CONFIG).unwrap());
        let before = store.snapshot();
        store.reload(Config::default());

        assert_eq!(&*before.site.name, "Field Notes");
        assert_eq!(&*store.snapshot().site.name, "Site");
    }

    #[test]
    fn reloads_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, CONFIG).unwrap();

        let store = ConfigStore::default();
        store.reload_from(&path).unwrap();
        assert_eq!(&*store.snapshot().site.name, "Field Notes");

        std::fs::write(&path, "[site\nname = ").unwrap();
        assert!(store.reload_from(&path).is_err());
        assert_eq!(&*store.snapshot().site.name, "Field Notes");
    }
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use antlers::err;
use antlers::config::ConfigStore;
use antlers::content::{Asset, Container, LocalDisk};
use antlers::error::Result;
use antlers::view::{Environment, FsLoader};

use crate::{ASSETS_DIR, CONFIG_FILE, TEMPLATE_DIR};

/// A site directory: `config.toml`, `templates/` and the asset disks.
#[derive(Debug)]
pub struct SiteDir {
    pub root: PathBuf,
    pub config: Arc<ConfigStore>,
    pub containers: Vec<Arc<Container>>,
}

impl SiteDir {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return err!("site must be an existing directory", "path" => root.display());
        }

        let config_file = root.join(CONFIG_FILE);
        let config = match config_file.is_file() {
            true => ConfigStore::load(&config_file)?,
            false => {
                tracing::warn!(path = %config_file.display(), "no configuration file; using defaults");
                ConfigStore::default()
            }
        };

        let snapshot = config.snapshot();
        let mut containers = vec![];
        for (handle, disk) in &snapshot.disks {
            containers.push(Container::new(handle.clone())
                .with_disk(handle.clone(), disk.open(&root))
                .build());
        }

        if containers.is_empty() && root.join(ASSETS_DIR).is_dir() {
            let disk = LocalDisk::new(root.join(ASSETS_DIR)).with_url(format!("/{ASSETS_DIR}"));
            containers.push(Container::new(ASSETS_DIR).with_disk(ASSETS_DIR, Arc::new(disk)).build());
        }

        for container in &containers {
            let loaded = container.load_meta()?;
            let found = container.discover()?;
            tracing::info!(container = %container.handle(), loaded, found, "indexed assets");
        }

        Ok(SiteDir { root, config: Arc::new(config), containers })
    }

    pub fn environment(&self) -> Environment {
        Environment::new(self.config.clone(), FsLoader::new(self.root.join(TEMPLATE_DIR)))
    }

    /// The asset `id`: `container::path`, or just `path` in the first
    /// container.
    pub fn asset(&self, id: &str) -> Result<Asset> {
        let (handle, path) = match id.split_once("::") {
            Some((handle, path)) => (Some(handle), path),
            None => (None, id),
        };

        let container = match handle {
            Some(handle) => self.containers.iter().find(|c| &**c.handle() == handle),
            None => self.containers.first(),
        };

        match container.and_then(|c| c.asset(path)) {
            Some(asset) => Ok(asset),
            None => err!("asset not found", "id" => id),
        }
    }

    pub fn assets(&self) -> impl Iterator<Item = Asset> + '_ {
        self.containers.iter().flat_map(|c| c.assets("", true))
    }
}

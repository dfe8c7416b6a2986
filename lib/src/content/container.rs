use std::sync::Arc;
use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::content::{Asset, Storage};
use crate::content::{normalize, META_DIR};
use crate::error::StorageError;
use crate::value::Dict;

/// A named collection of assets sharing a storage disk and a blueprint.
#[derive(Debug)]
pub struct Container {
    handle: Arc<str>,
    disk: Option<Arc<str>>,
    storage: Option<Arc<dyn Storage>>,
    disk_path: Arc<str>,
    url: Option<Arc<str>>,
    private: bool,
    blueprint: Option<Arc<str>>,
    assets: RwLock<BTreeMap<Arc<str>, Asset>>,
}

/// Builds a [`Container`]. Start with [`Container::new()`].
#[derive(Debug)]
pub struct ContainerBuilder {
    container: Container,
}

impl Container {
    pub fn new(handle: impl Into<Arc<str>>) -> ContainerBuilder {
        ContainerBuilder {
            container: Container {
                handle: handle.into(),
                disk: None,
                storage: None,
                disk_path: "".into(),
                url: None,
                private: false,
                blueprint: None,
                assets: RwLock::new(BTreeMap::new()),
            }
        }
    }

    #[inline(always)]
    pub fn handle(&self) -> &Arc<str> {
        &self.handle
    }

    /// The handle of the disk the container's files live on.
    #[inline(always)]
    pub fn disk(&self) -> Option<&Arc<str>> {
        self.disk.as_ref()
    }

    #[inline(always)]
    pub fn storage(&self) -> Option<&Arc<dyn Storage>> {
        self.storage.as_ref()
    }

    /// The folder on the disk that is the container's root.
    pub fn disk_path(&self) -> &str {
        &self.disk_path
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn blueprint(&self) -> Option<&Arc<str>> {
        self.blueprint.as_ref()
    }

    /// Maps a container-relative path to a disk-relative one.
    pub fn resolve(&self, path: &str) -> String {
        normalize(&format!("{}/{}", self.disk_path, path))
    }

    fn meta_path(&self, path: &str) -> String {
        self.resolve(&format!("{META_DIR}/{path}.json"))
    }

    fn require_storage(&self) -> Result<&Arc<dyn Storage>, StorageError> {
        self.storage.as_ref().ok_or_else(|| StorageError::NoDisk(self.handle.to_string()))
    }

    /// Indexes `asset` by its path, replacing any asset already there.
    /// Assets without a path are ignored.
    pub fn add_asset(&self, asset: Asset) {
        match asset.path() {
            Some(path) => {
                let path: Arc<str> = path.into();
                self.assets.write().insert(path, asset);
            }
            None => tracing::warn!(container = %self.handle, "ignoring asset without a path"),
        }
    }

    pub fn remove_asset(&self, path: &str) -> Option<Asset> {
        self.assets.write().remove(&*normalize(path))
    }

    pub fn asset(&self, path: &str) -> Option<Asset> {
        self.assets.read().get(&*normalize(path)).cloned()
    }

    pub fn len(&self) -> usize {
        self.assets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.read().is_empty()
    }

    /// The indexed assets in `folder`, ordered by path. `"/"` and `""` both
    /// name the container root.
    pub fn assets(&self, folder: &str, recursive: bool) -> Vec<Asset> {
        let folder = normalize(folder);
        self.assets.read()
            .values()
            .filter(|asset| {
                let asset_folder = asset.folder().unwrap_or_default();
                match recursive {
                    true => folder.is_empty()
                        || asset_folder == folder
                        || asset_folder.starts_with(&format!("{folder}/")),
                    false => asset_folder == folder,
                }
            })
            .cloned()
            .collect()
    }

    /// Writes every indexed asset's data to the disk.
    pub fn save(&self) -> Result<(), StorageError> {
        let assets: Vec<Asset> = self.assets.read().values().cloned().collect();
        for asset in &assets {
            self.save_asset(asset)?;
        }

        tracing::debug!(container = %self.handle, assets = assets.len(), "saved container");
        Ok(())
    }

    /// Writes `asset`'s data to `.meta/<path>.json`.
    pub fn save_asset(&self, asset: &Asset) -> Result<(), StorageError> {
        let Some(path) = asset.path() else {
            return Err(StorageError::NotFound(String::new()));
        };

        let meta_path = self.meta_path(path);
        let json = serde_json::to_vec_pretty(&asset.data())
            .map_err(|e| StorageError::Metadata { path: meta_path.clone(), message: e.to_string() })?;

        self.require_storage()?.put(&meta_path, &json)
    }

    /// Deletes the persisted data of the asset at `path`, if there is any.
    pub fn forget_meta(&self, path: &str) -> Result<(), StorageError> {
        let storage = self.require_storage()?;
        let meta_path = self.meta_path(path);
        match storage.exists(&meta_path) {
            true => storage.delete(&meta_path),
            false => Ok(()),
        }
    }

    /// Indexes every asset whose data was persisted by [`Container::save()`].
    /// Returns the number of assets loaded.
    pub fn load_meta(self: &Arc<Self>) -> Result<usize, StorageError> {
        let storage = self.require_storage()?;
        let meta_root = self.resolve(META_DIR);

        let mut loaded = 0;
        for meta_path in meta_files(&**storage, &meta_root)? {
            let Some(path) = meta_path.strip_prefix(&format!("{meta_root}/"))
                .and_then(|p| p.strip_suffix(".json"))
            else {
                continue;
            };

            let bytes = storage.read(&meta_path)?;
            let data: Dict = serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Metadata { path: meta_path.clone(), message: e.to_string() })?;

            self.add_asset(Asset::new().with_container(self).with_path(path).with_data(data));
            loaded += 1;
        }

        Ok(loaded)
    }

    /// Indexes every file on the disk below the container's root that isn't
    /// indexed yet. Returns the number of assets added.
    pub fn discover(self: &Arc<Self>) -> Result<usize, StorageError> {
        let storage = self.require_storage()?;
        let prefix = match self.disk_path.is_empty() {
            true => String::new(),
            false => format!("{}/", self.disk_path),
        };

        let mut added = 0;
        for file in storage.files(&self.disk_path, true)? {
            let path = file.strip_prefix(&prefix).unwrap_or(&file);
            if self.asset(path).is_none() {
                self.add_asset(Asset::new().with_container(self).with_path(path));
                added += 1;
            }
        }

        tracing::debug!(container = %self.handle, added, "discovered assets");
        Ok(added)
    }
}

// Metadata lives in a hidden folder, which `Storage::files` skips.
fn meta_files(storage: &dyn Storage, meta_root: &str) -> Result<Vec<String>, StorageError> {
    let mut files = storage.files_including_hidden(meta_root)?;
    files.retain(|path| path.ends_with(".json"));
    Ok(files)
}

impl ContainerBuilder {
    pub fn with_disk(mut self, handle: impl Into<Arc<str>>, storage: Arc<dyn Storage>) -> Self {
        self.container.disk = Some(handle.into());
        self.container.storage = Some(storage);
        self
    }

    pub fn with_disk_path(mut self, path: impl AsRef<str>) -> Self {
        self.container.disk_path = normalize(path.as_ref()).into();
        self
    }

    pub fn with_url(mut self, url: impl Into<Arc<str>>) -> Self {
        self.container.url = Some(url.into());
        self
    }

    pub fn with_private(mut self, private: bool) -> Self {
        self.container.private = private;
        self
    }

    pub fn with_blueprint(mut self, blueprint: impl Into<Arc<str>>) -> Self {
        self.container.blueprint = Some(blueprint.into());
        self
    }

    pub fn build(self) -> Arc<Container> {
        Arc::new(self.container)
    }
}

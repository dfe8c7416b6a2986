use std::fmt;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};

use crate::content::{Container, Metadata, Storage};
use crate::content::normalize;
use crate::error::StorageError;
use crate::util::{join_url, human_size};
use crate::value::{Dict, Value};

pub const AUDIO_EXTENSIONS: &[&str] = &["aac", "flac", "m4a", "mp3", "ogg", "wav"];

pub const VIDEO_EXTENSIONS: &[&str] = &["h264", "mp4", "m4v", "ogv", "webm"];

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// Extensions the Google Docs previewer can display.
pub const PREVIEWABLE_EXTENSIONS: &[&str] = &[
    "doc", "docx", "pages", "txt", "ai", "psd", "eps", "ps", "css", "html", "php", "c", "cpp",
    "h", "hpp", "js", "ppt", "pptx", "flv", "tiff", "ttf", "dxf", "xps", "zip", "rar", "xls",
    "xlsx",
];

/// A file in a [`Container`], plus a bag of data describing it.
///
/// Every derived property (`filename`, `extension`, `folder`, ...) is a pure
/// function of the asset's path. File properties (`size`, `last_modified`,
/// `dimensions`) are read from the container's disk on demand.
///
/// Clones share their data: writes through one clone are visible through the
/// others, including the copy held in the container's index.
#[derive(Clone, Default)]
pub struct Asset {
    container: Option<Weak<Container>>,
    path: Option<Arc<str>>,
    data: Metadata,
    supplements: Metadata,
}

impl Asset {
    #[inline(always)]
    pub fn new() -> Self {
        Asset::default()
    }

    pub fn with_container(mut self, container: &Arc<Container>) -> Self {
        self.set_container(container);
        self
    }

    pub fn with_path(mut self, path: impl AsRef<str>) -> Self {
        self.set_path(path);
        self
    }

    pub fn with_data(self, data: Dict) -> Self {
        self.set_data(data);
        self
    }

    pub fn set_container(&mut self, container: &Arc<Container>) {
        self.container = Some(Arc::downgrade(container));
    }

    pub fn set_path(&mut self, path: impl AsRef<str>) {
        self.path = Some(normalize(path.as_ref()).into());
    }

    pub fn container(&self) -> Option<Arc<Container>> {
        self.container.as_ref()?.upgrade()
    }

    pub fn container_handle(&self) -> Option<Arc<str>> {
        self.container().map(|c| c.handle().clone())
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// `container::path`, if the asset has both.
    ///
    /// ```rust
    /// use antlers::content::{Asset, Container};
    ///
    /// let container = Container::new("123").build();
    /// let asset = Asset::new().with_container(&container).with_path("path/to/asset.jpg");
    /// assert_eq!(asset.id().as_deref(), Some("123::path/to/asset.jpg"));
    /// assert_eq!(Asset::new().with_path("asset.jpg").id(), None);
    /// ```
    pub fn id(&self) -> Option<String> {
        let (handle, path) = (self.container_handle()?, self.path()?);
        Some(format!("{handle}::{path}"))
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.get_raw(key)
    }

    pub fn get_or(&self, key: &str, fallback: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| fallback.into())
    }

    pub fn set(&self, key: impl Into<Arc<str>>, value: impl Into<Value>) -> &Self {
        let key: Arc<str> = key.into();
        self.data.insert_raw(key, value);
        self
    }

    pub fn has(&self, key: &str) -> bool {
        self.data.get_raw(key).is_some()
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.data.remove_raw(key)
    }

    /// A snapshot of the asset's persisted data.
    pub fn data(&self) -> Dict {
        self.data.to_dict()
    }

    pub fn set_data(&self, data: Dict) -> &Self {
        self.data.replace_all(&data);
        self
    }

    /// Sets a value that shows up in [`Asset::to_dict()`] but is never saved.
    pub fn set_supplement(&self, key: impl Into<Arc<str>>, value: impl Into<Value>) -> &Self {
        let key: Arc<str> = key.into();
        self.supplements.insert_raw(key, value);
        self
    }

    pub fn supplement(&self, key: &str) -> Option<Value> {
        self.supplements.get_raw(key)
    }

    /// The last path segment, e.g. `asset.jpg`.
    pub fn basename(&self) -> Option<&str> {
        let path = self.path()?;
        Some(path.rsplit_once('/').map_or(path, |(_, name)| name))
    }

    /// The basename without its extension, e.g. `asset`.
    pub fn filename(&self) -> Option<&str> {
        let basename = self.basename()?;
        match self.extension() {
            Some(ext) => Some(&basename[..basename.len() - ext.len() - 1]),
            None => Some(basename),
        }
    }

    /// ```rust
    /// use antlers::content::Asset;
    ///
    /// assert_eq!(Asset::new().with_path("asset.jpg").extension(), Some("jpg"));
    /// assert_eq!(Asset::new().with_path("asset").extension(), None);
    /// ```
    pub fn extension(&self) -> Option<&str> {
        match self.basename()?.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }

    /// The path's parent folder; `""` for assets at the container root.
    pub fn folder(&self) -> Option<&str> {
        let path = self.path()?;
        Some(path.rsplit_once('/').map_or("", |(folder, _)| folder))
    }

    pub fn extension_is_one_of(&self, extensions: &[&str]) -> bool {
        self.extension()
            .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    pub fn is_audio(&self) -> bool {
        self.extension_is_one_of(AUDIO_EXTENSIONS)
    }

    pub fn is_video(&self) -> bool {
        self.extension_is_one_of(VIDEO_EXTENSIONS)
    }

    pub fn is_image(&self) -> bool {
        self.extension_is_one_of(IMAGE_EXTENSIONS)
    }

    pub fn is_previewable(&self) -> bool {
        self.extension_is_one_of(PREVIEWABLE_EXTENSIONS)
    }

    /// The disk handle of the owning container.
    pub fn disk(&self) -> Option<Arc<str>> {
        self.container()?.disk().cloned()
    }

    /// The path of the file relative to the disk root.
    pub fn resolved_path(&self) -> Option<String> {
        let path = self.path()?;
        match self.container() {
            Some(container) => Some(container.resolve(path)),
            None => Some(path.to_string()),
        }
    }

    /// The public URL of the asset. Private containers have none.
    pub fn url(&self) -> Option<String> {
        let (container, path) = (self.container()?, self.path()?);
        if container.is_private() {
            return None;
        }

        match container.url() {
            Some(base) => Some(join_url(base, path)),
            None => container.storage()?.url(&container.resolve(path)),
        }
    }

    fn located(&self) -> Result<(Arc<dyn Storage>, String), StorageError> {
        let describe = || self.id().or_else(|| self.path.as_deref().map(String::from));
        let container = self.container()
            .ok_or_else(|| StorageError::NoDisk(describe().unwrap_or_default()))?;

        let storage = container.storage()
            .cloned()
            .ok_or_else(|| StorageError::NoDisk(describe().unwrap_or_default()))?;

        let path = self.path().ok_or_else(|| StorageError::NotFound(String::new()))?;
        Ok((storage, container.resolve(path)))
    }

    pub fn exists(&self) -> bool {
        self.located().map_or(false, |(disk, path)| disk.exists(&path))
    }

    /// The file size in bytes.
    pub fn size(&self) -> Result<u64, StorageError> {
        let (disk, path) = self.located()?;
        disk.size(&path)
    }

    pub fn last_modified(&self) -> Result<DateTime<Utc>, StorageError> {
        let (disk, path) = self.located()?;
        disk.last_modified(&path)
    }

    /// `(width, height)` of an image asset; `None` for other file types or
    /// unrecognized image headers.
    pub fn dimensions(&self) -> Result<Option<(u32, u32)>, StorageError> {
        if !self.is_image() {
            return Ok(None);
        }

        let (disk, path) = self.located()?;
        Ok(super::image::dimensions(&disk.read(&path)?))
    }

    pub fn width(&self) -> Result<Option<u32>, StorageError> {
        Ok(self.dimensions()?.map(|(w, _)| w))
    }

    pub fn height(&self) -> Result<Option<u32>, StorageError> {
        Ok(self.dimensions()?.map(|(_, h)| h))
    }

    /// Adds the asset to its container's index and persists its data.
    pub fn save(&self) -> Result<&Self, StorageError> {
        let container = self.container()
            .ok_or_else(|| StorageError::NoDisk(self.path().unwrap_or_default().into()))?;

        container.add_asset(self.clone());
        container.save_asset(self)?;
        Ok(self)
    }

    /// Deletes the file and removes the asset from its container.
    pub fn delete(&self) -> Result<&Self, StorageError> {
        let (disk, path) = self.located()?;
        disk.delete(&path)?;

        if let (Some(container), Some(path)) = (self.container(), self.path()) {
            container.remove_asset(path);
            container.forget_meta(path)?;
        }

        tracing::debug!(asset = %path, "deleted asset");
        Ok(self)
    }

    /// Moves the file into `folder`, optionally renaming it. The extension
    /// is always kept. Data follows the asset to its new path.
    pub fn move_to(&mut self, folder: &str, filename: Option<&str>) -> Result<&Self, StorageError> {
        let (disk, from) = self.located()?;
        let old_path = self.path.clone().unwrap_or_else(|| "".into());
        let filename = filename.or(self.filename()).unwrap_or_default();
        let basename = match self.extension() {
            Some(ext) => format!("{filename}.{ext}"),
            None => filename.to_string(),
        };

        let new_path = normalize(&format!("{folder}/{basename}"));
        if *old_path == *new_path {
            return Ok(self);
        }

        let container = self.container()
            .ok_or_else(|| StorageError::NoDisk(old_path.to_string()))?;

        disk.move_file(&from, &container.resolve(&new_path))?;
        tracing::debug!(from = &*old_path, to = %new_path, "moved asset");

        container.remove_asset(&old_path);
        container.forget_meta(&old_path)?;
        self.set_path(&new_path);
        container.add_asset(self.clone());
        container.save_asset(self)?;
        Ok(self)
    }

    /// Renames the file in place, keeping its folder and extension.
    pub fn rename(&mut self, filename: &str) -> Result<&Self, StorageError> {
        let folder = self.folder().unwrap_or_default().to_string();
        self.move_to(&folder, Some(filename))
    }

    /// Every property a template can see: derived path properties, data,
    /// supplements and, when the file exists, size and modification time.
    pub fn to_dict(&self) -> Dict {
        let mut dict: Dict = Dict::new();
        let mut put = |key: &str, value: Value| { dict.insert(key.into(), value); };

        put("id", self.id().into());
        put("title", self.get("title").unwrap_or_else(|| self.filename().into()));
        put("path", self.path().into());
        put("filename", self.filename().into());
        put("basename", self.basename().into());
        put("extension", self.extension().into());
        put("folder", self.folder().into());
        put("is_asset", true.into());
        put("is_audio", self.is_audio().into());
        put("is_image", self.is_image().into());
        put("is_video", self.is_video().into());
        put("is_previewable", self.is_previewable().into());
        put("url", self.url().into());

        let container = self.container();
        put("container", container.as_ref().map(|c| c.handle().clone()).into());
        let blueprint = container.as_ref().and_then(|c| c.blueprint().cloned());
        put("blueprint", blueprint.unwrap_or_else(|| "asset".into()).into());

        if self.exists() {
            if let Ok(bytes) = self.size() {
                let kb = bytes as f64 / 1024.0;
                let round = |n: f64| (n * 100.0).round() / 100.0;
                put("size", human_size(bytes).into());
                put("size_bytes", bytes.into());
                put("size_kilobytes", round(kb).into());
                put("size_megabytes", round(kb / 1024.0).into());
                put("size_gigabytes", round(kb / 1024.0 / 1024.0).into());
                put("size_b", bytes.into());
                put("size_kb", round(kb).into());
                put("size_mb", round(kb / 1024.0).into());
                put("size_gb", round(kb / 1024.0 / 1024.0).into());
            }

            if let Ok(modified) = self.last_modified() {
                put("last_modified", modified.format("%Y-%m-%d %H:%M:%S").to_string().into());
                put("last_modified_timestamp", modified.timestamp().into());
                put("last_modified_instance", modified.to_rfc3339().into());
            }

            put("focus_css", self.focus_css().into());
            if let Ok(Some((width, height))) = self.dimensions() {
                put("width", width.into());
                put("height", height.into());
            }
        }

        dict.extend(self.data.to_dict());
        dict.extend(self.supplements.to_dict());
        dict
    }

    /// The CSS `background-position` for the `focus` data key (`"25-75"`).
    fn focus_css(&self) -> String {
        let focus = self.get("focus");
        let mut parts = focus.as_ref()
            .and_then(|v| v.as_str())
            .unwrap_or("50-50")
            .split('-');

        let x = parts.next().unwrap_or("50");
        let y = parts.next().unwrap_or("50");
        format!("{x}% {y}%")
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("container", &self.container_handle())
            .field("path", &self.path)
            .field("data", &self.data.to_dict())
            .finish()
    }
}

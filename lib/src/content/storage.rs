use std::fmt::Debug;
use std::path::{Path, PathBuf, Component};
use std::collections::BTreeMap;
use std::fs;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::StorageError;
use crate::util::join_url;

/// Directory, relative to a disk's root, holding asset metadata files.
pub const META_DIR: &str = ".meta";

/// A storage disk: a flat namespace of files keyed by `/`-separated paths
/// relative to the disk root.
pub trait Storage: Send + Sync + Debug {
    fn exists(&self, path: &str) -> bool;

    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    fn put(&self, path: &str, contents: &[u8]) -> Result<(), StorageError>;

    fn size(&self, path: &str) -> Result<u64, StorageError>;

    fn last_modified(&self, path: &str) -> Result<DateTime<Utc>, StorageError>;

    fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Moves `from` to `to`, creating intermediate folders. Fails if `to`
    /// already exists.
    fn move_file(&self, from: &str, to: &str) -> Result<(), StorageError>;

    /// The public URL of `path`, if the disk is web accessible.
    fn url(&self, path: &str) -> Option<String>;

    /// Every file below `folder`, at any depth, hidden or not. Sorted.
    fn files_including_hidden(&self, folder: &str) -> Result<Vec<String>, StorageError>;

    /// Every file below `folder`, excluding hidden files and folders.
    fn files(&self, folder: &str, recursive: bool) -> Result<Vec<String>, StorageError> {
        let folder = normalize(folder);
        let mut files = self.files_including_hidden(&folder)?;
        files.retain(|path| !is_hidden(path) && in_folder(path, &folder, recursive));
        Ok(files)
    }

    /// Where the disk lives, for display purposes.
    fn location(&self) -> Option<String> {
        None
    }
}

/// Normalizes a disk-relative path: no leading or trailing `/`, no `.`.
pub fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn is_hidden(path: &str) -> bool {
    path.split('/').any(|segment| segment.starts_with('.'))
}

fn in_folder(path: &str, folder: &str, recursive: bool) -> bool {
    let rest = match folder.is_empty() {
        true => path,
        false => match path.strip_prefix(folder).and_then(|r| r.strip_prefix('/')) {
            Some(rest) => rest,
            None => return false,
        }
    };

    recursive || !rest.contains('/')
}

/// A disk backed by a directory on the local file system.
#[derive(Debug, Clone)]
pub struct LocalDisk {
    root: PathBuf,
    url: Option<String>,
}

impl LocalDisk {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        LocalDisk { root: root.as_ref().to_path_buf(), url: None }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = normalize(path);
        if Path::new(&relative).components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(StorageError::io(path, std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path escapes the disk root"
            )));
        }

        Ok(self.root.join(relative))
    }

    fn metadata(&self, path: &str) -> Result<fs::Metadata, StorageError> {
        let full = self.full_path(path)?;
        let metadata = fs::metadata(&full).map_err(|e| StorageError::io(path, e))?;
        match metadata.is_file() {
            true => Ok(metadata),
            false => Err(StorageError::NotFound(path.into())),
        }
    }
}

impl Storage for LocalDisk {
    fn exists(&self, path: &str) -> bool {
        self.full_path(path).map_or(false, |p| p.is_file())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        tracing::debug!(disk = %self.root.display(), path, "reading file");
        fs::read(self.full_path(path)?).map_err(|e| StorageError::io(path, e))
    }

    fn put(&self, path: &str, contents: &[u8]) -> Result<(), StorageError> {
        tracing::debug!(disk = %self.root.display(), path, "writing file");
        let full = self.full_path(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(path, e))?;
        }

        fs::write(full, contents).map_err(|e| StorageError::io(path, e))
    }

    fn size(&self, path: &str) -> Result<u64, StorageError> {
        Ok(self.metadata(path)?.len())
    }

    fn last_modified(&self, path: &str) -> Result<DateTime<Utc>, StorageError> {
        let modified = self.metadata(path)?
            .modified()
            .map_err(|e| StorageError::io(path, e))?;

        Ok(DateTime::<Utc>::from(modified))
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        tracing::debug!(disk = %self.root.display(), path, "deleting file");
        fs::remove_file(self.full_path(path)?).map_err(|e| StorageError::io(path, e))
    }

    fn move_file(&self, from: &str, to: &str) -> Result<(), StorageError> {
        tracing::debug!(disk = %self.root.display(), from, to, "moving file");
        let (source, target) = (self.full_path(from)?, self.full_path(to)?);
        if !source.is_file() {
            return Err(StorageError::NotFound(from.into()));
        }

        if target.exists() {
            return Err(StorageError::AlreadyExists(to.into()));
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(to, e))?;
        }

        fs::rename(source, target).map_err(|e| StorageError::io(from, e))
    }

    fn url(&self, path: &str) -> Option<String> {
        self.url.as_deref().map(|base| join_url(base, &normalize(path)))
    }

    fn files_including_hidden(&self, folder: &str) -> Result<Vec<String>, StorageError> {
        let base = self.full_path(folder)?;
        if !base.is_dir() {
            return Ok(vec![]);
        }

        let walker = jwalk::WalkDir::new(&base)
            .follow_links(true)
            .skip_hidden(false)
            .sort(true);

        let mut files = vec![];
        for entry in walker {
            let entry = entry.map_err(|e| StorageError::io(folder, std::io::Error::other(e.to_string())))?;
            if !entry.file_type.is_file() {
                continue;
            }

            let path = entry.path();
            let Ok(relative) = path.strip_prefix(&self.root) else { continue };
            let relative = relative.components()
                .filter_map(|c| c.as_os_str().to_str())
                .collect::<Vec<_>>()
                .join("/");

            files.push(relative);
        }

        files.sort();
        Ok(files)
    }

    fn location(&self) -> Option<String> {
        Some(self.root.display().to_string())
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    contents: Vec<u8>,
    modified: DateTime<Utc>,
}

/// A disk that keeps everything in memory. Useful for tests and previews.
#[derive(Debug, Default)]
pub struct MemoryDisk {
    files: RwLock<BTreeMap<String, MemoryFile>>,
    url: Option<String>,
}

impl MemoryDisk {
    pub fn new() -> Self {
        MemoryDisk::default()
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Writes `contents` to `path` with an explicit modification time.
    pub fn put_at(&self, path: &str, contents: &[u8], modified: DateTime<Utc>) {
        let file = MemoryFile { contents: contents.to_vec(), modified };
        self.files.write().insert(normalize(path), file);
    }

    fn with_file<T, F>(&self, path: &str, f: F) -> Result<T, StorageError>
        where F: FnOnce(&MemoryFile) -> T
    {
        self.files.read()
            .get(&normalize(path))
            .map(f)
            .ok_or_else(|| StorageError::NotFound(path.into()))
    }
}

impl Storage for MemoryDisk {
    fn exists(&self, path: &str) -> bool {
        self.files.read().contains_key(&normalize(path))
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.with_file(path, |file| file.contents.clone())
    }

    fn put(&self, path: &str, contents: &[u8]) -> Result<(), StorageError> {
        self.put_at(path, contents, Utc::now());
        Ok(())
    }

    fn size(&self, path: &str) -> Result<u64, StorageError> {
        self.with_file(path, |file| file.contents.len() as u64)
    }

    fn last_modified(&self, path: &str) -> Result<DateTime<Utc>, StorageError> {
        self.with_file(path, |file| file.modified)
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.files.write()
            .remove(&normalize(path))
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.into()))
    }

    fn move_file(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let mut files = self.files.write();
        let (from_key, to_key) = (normalize(from), normalize(to));
        if files.contains_key(&to_key) {
            return Err(StorageError::AlreadyExists(to.into()));
        }

        let file = files.remove(&from_key).ok_or_else(|| StorageError::NotFound(from.into()))?;
        files.insert(to_key, file);
        Ok(())
    }

    fn url(&self, path: &str) -> Option<String> {
        self.url.as_deref().map(|base| join_url(base, &normalize(path)))
    }

    fn files_including_hidden(&self, folder: &str) -> Result<Vec<String>, StorageError> {
        let folder = normalize(folder);
        Ok(self.files.read()
            .keys()
            .filter(|path| in_folder(path, &folder, true))
            .cloned()
            .collect())
    }
}

//! Content entities: assets, the containers that own them, and the storage
//! disks their files live on.

mod metadata;
mod storage;
mod image;
mod asset;
mod container;

pub use metadata::*;
pub use storage::{Storage, LocalDisk, MemoryDisk, META_DIR, normalize};
pub use image::dimensions;
pub use asset::*;
pub use container::*;

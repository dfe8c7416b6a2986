//! Views: a template, its data and an optional layout, rendered against the
//! site's configuration.
//!
//! Data reaches a template through the [`Cascade`], lowest precedence first:
//! configured globals, the `site`, and the view's content. The view's own
//! data is layered last and wins over all of them.

mod cascade;
mod loader;
mod events;
#[allow(clippy::module_inception)]
mod view;
mod environment;

pub use cascade::{resolve, Cascade, CascadeContent, CascadeLayer};
pub use loader::{FsLoader, Loader, MemoryLoader};
pub use events::{RenderObserver, ViewRendered};
pub use view::View;
pub use environment::Environment;

pub use crate::templating::{Source, TemplateFormat};

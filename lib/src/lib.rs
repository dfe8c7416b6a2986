#![doc = svgbobdoc::transform!(
//! The core of a flat-file content system: Antlers templates, assets on
//! storage disks, typed fields, and views rendered through a data cascade.
//!
//! # Overview
//!
//! A page is rendered by composing a **view** out of a template, the data
//! the template sees, and an optional layout:
//!
//! ```svgbob
//!  +---------+   +------+   +---------+
//!  | globals |   | site |   | content |  cascade layers
//!  +----+----+   +--+---+   +----+----+
//!       |           |            |
//!       +-----------+------------+
//!                   |
//!                   v          +-----------+
//!              +---------+     | view data |
//!              | cascade |<----+-----------+
//!              +----+----+
//!                   |
//!                   v
//!             +----------+    +--------+
//!             | template +--->| layout +---> html
//!             +----------+    +--------+
//! ```
//!
//! In words:
//!
//!   * The **cascade** merges configured globals, the `site`, and the
//!     content the view is about. The view's own data is applied last and
//!     always wins.
//!
//!   * The **template** is found by name and compiled according to its
//!     format: Antlers, Jinja, or plain text.
//!
//!   * The **layout**, if any, is rendered with the same data plus the
//!     rendered template as `template_content`. Layouts apply to Antlers
//!     templates only.
//!
//! ## Modules
//!
//!   * [`antlers`]: the Antlers parser, evaluator, and the built-in tags and
//!     modifiers.
//!   * [`content`]: assets, asset containers, and the storage disks they live
//!     on.
//!   * [`fields`]: fieldtypes and blueprints, most notably dates.
//!   * [`view`]: views, the cascade, template loaders, and render events.
//!   * [`config`]: site configuration and reloadable snapshots of it.
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod value;
pub mod content;
pub mod fields;
pub mod antlers;
pub mod templating;
pub mod config;
pub mod view;

pub use view::{Environment, View};

pub use tracing;
pub use rayon;

//! Field processing: converting stored values to their runtime form and back.

mod fieldtype;
mod dates;
mod date;
mod basic;
mod blueprint;

pub use fieldtype::{ConfigField, FieldConfig, Fieldtype};
pub use dates::{DateParser, PermissiveParser, translate_format, format_date};
pub use date::{Date, RUNTIME_FORMAT};
pub use basic::{Text, Toggle};
pub use blueprint::{Blueprint, Field, fieldtype};

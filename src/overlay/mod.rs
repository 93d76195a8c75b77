//! Overlay model and template formatting

mod formatter;
mod model;

pub use formatter::{apply_template, coerce_number, format_reading, format_text, render_value};
pub use model::{build_settings_view, resolve_slot};

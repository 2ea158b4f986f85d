//! Utility modules.

pub mod text;

pub use text::{is_present, truncate_chars};

//! Report formatters for a built generator.

pub mod json;
pub mod text;

pub use json::{format_json, ScriptReport};
pub use text::{format_allocations, format_summary};

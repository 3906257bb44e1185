//! Report output
//!
//! - `text`: `word<TAB>count` lines on stdout
//! - `json`: a single JSON document with run metadata

pub mod json;
pub mod text;

pub use json::JsonReport;
pub use text::{format_top_n, write_text_report};

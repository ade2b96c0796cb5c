//! Shared helpers.
//!
//! - [`app_data`] - application data directory and `config.json` settings
//! - [`atomic`] - crash-safe file replacement for the slot store and result cache
//! - [`progress`] - spinner that compiles to a no-op without the `progress` feature
//! - [`tokenizer`] - word tokens of file names, for the name index
//! - [`content`] - text/binary sniffing for content search

pub mod app_data;
pub mod atomic;
pub mod content;
pub mod progress;
pub mod tokenizer;

pub use app_data::*;
pub use atomic::write_atomic;
pub use content::*;
pub use tokenizer::*;

//! Parser infrastructure: language detection, queries, and the registry.

pub mod language;
pub mod queries;
pub mod registry;

pub use language::{Language, detect_language_tag};
pub use queries::{query_source, query_source_for_extension};
pub use registry::{
    LanguageSetup, ParserHandle, ParserRegistry, defensive_copy, split_lines_counted,
};

//! Multi-language source indexer.
//!
//! One pass over a tree-sitter syntax tree produces symbols, blocks,
//! imports, scopes, references, declaration metadata, cyclomatic
//! complexity, type relationships, performance evidence and side-effect
//! evidence. See [`indexing::SourceIndexer`] for the entry point.

pub mod cache;
pub mod content;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod indexing;
pub mod logging;
pub mod parsing;
pub mod symbol;
pub mod types;

pub use content::{ContentStore, InMemoryContentStore};
pub use error::{IndexError, IndexResult};
pub use extractor::{ExtractionResult, ExtractorOptions, ExtractorPool, UnifiedExtractor};
pub use indexing::{FileIndex, SourceIndexer};
pub use parsing::{Language, ParserRegistry};
pub use symbol::{EnhancedSymbol, build_enhanced_symbols};
pub use types::*;

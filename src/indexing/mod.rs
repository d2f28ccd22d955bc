//! Indexing facade.
//!
//! Ties the registry, content store, extractor pool and symbol builder
//! into one entry point. The facade never errors out of a parse: an
//! unknown extension, a store miss, a cancelled context or a native
//! parser crash all degrade to an empty [`FileIndex`] plus a logged
//! diagnostic. Structured errors are reserved for the I/O and config
//! edges of the surrounding pipeline.

use crate::FileId;
use crate::content::ContentStore;
use crate::error::{IndexError, IndexResult};
use crate::extractor::{ExtractionResult, ExtractorOptions, ExtractorPool};
use crate::identity::{EntityIdGenerator, sanitize_name};
use crate::parsing::{Language, ParserRegistry};
use crate::symbol::{EnhancedSymbol, build_enhanced_symbols};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The complete output of indexing one file.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct FileIndex {
    pub path: PathBuf,
    pub file_id: Option<FileId>,
    pub language: Option<Language>,
    pub extraction: ExtractionResult,
    pub symbols: Vec<EnhancedSymbol>,
}

impl FileIndex {
    fn empty(path: &Path, file_id: Option<FileId>) -> Self {
        Self {
            path: path.to_path_buf(),
            file_id,
            language: Language::from_path(path),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.extraction.is_empty() && self.symbols.is_empty()
    }

    /// Serialize the whole index for downstream consumers.
    pub fn to_json_string(&self) -> IndexResult<String> {
        serde_json::to_string(self).map_err(|e| {
            IndexError::indexing("serialize_index", e.to_string())
                .with_source(Box::new(e))
        })
    }

    /// Stable entity ids for every symbol, in emission order.
    pub fn symbol_entity_ids(&self, generator: &EntityIdGenerator) -> Vec<String> {
        self.symbols
            .iter()
            .map(|enhanced| {
                generator.symbol_id(
                    enhanced.symbol.kind,
                    &enhanced.symbol.name,
                    &self.path,
                    enhanced.symbol.span.start_line,
                    enhanced.symbol.span.start_column,
                )
            })
            .collect()
    }

    /// Stable entity ids for every reference. Unresolved edges embed the
    /// sanitized target name; a resolution pass swaps in full symbol ids.
    pub fn reference_entity_ids(&self, generator: &EntityIdGenerator) -> Vec<String> {
        self.extraction
            .references
            .iter()
            .map(|reference| {
                generator.reference_id(
                    reference.kind,
                    &sanitize_name(&reference.referenced_name),
                    &self.path,
                    reference.line,
                    reference.column,
                )
            })
            .collect()
    }
}

/// Parses files and produces [`FileIndex`] records.
///
/// Clones of the registry and store handles are cheap; one indexer can be
/// shared across threads.
pub struct SourceIndexer {
    registry: Arc<ParserRegistry>,
    store: Arc<dyn ContentStore>,
    extractors: ExtractorPool,
    options: ExtractorOptions,
}

impl SourceIndexer {
    pub fn new(registry: Arc<ParserRegistry>, store: Arc<dyn ContentStore>) -> Self {
        Self::with_options(registry, store, ExtractorOptions::default())
    }

    pub fn with_options(
        registry: Arc<ParserRegistry>,
        store: Arc<dyn ContentStore>,
        options: ExtractorOptions,
    ) -> Self {
        Self {
            registry,
            store,
            extractors: ExtractorPool::new(),
            options,
        }
    }

    pub fn registry(&self) -> &Arc<ParserRegistry> {
        &self.registry
    }

    /// Index a file already loaded into the content store.
    pub fn index_file(&self, path: &Path, file_id: FileId) -> FileIndex {
        self.index_file_with_context(path, file_id, &CancellationToken::new())
    }

    pub fn index_file_with_context(
        &self,
        path: &Path,
        file_id: FileId,
        cancel: &CancellationToken,
    ) -> FileIndex {
        match self.store.get(file_id) {
            Some(content) => self.index_content_with_context(path, file_id, &content, cancel),
            None => {
                tracing::debug!(
                    "Content store miss for file id {} ({})",
                    file_id.value(),
                    path.display()
                );
                FileIndex::empty(path, Some(file_id))
            }
        }
    }

    /// Index raw bytes under a path and file id.
    pub fn index_content(&self, path: &Path, file_id: FileId, content: &[u8]) -> FileIndex {
        self.index_content_with_context(path, file_id, content, &CancellationToken::new())
    }

    /// Cancellation is cooperative: the token is checked between phases
    /// (setup, parse, extraction) and a cancelled parse yields empty
    /// results rather than an error.
    pub fn index_content_with_context(
        &self,
        path: &Path,
        file_id: FileId,
        content: &[u8],
        cancel: &CancellationToken,
    ) -> FileIndex {
        let Some(ext) = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
        else {
            return FileIndex::empty(path, Some(file_id));
        };

        if cancel.is_cancelled() {
            return FileIndex::empty(path, Some(file_id));
        }
        if self.registry.setup_for_extension(&ext).is_none() {
            return FileIndex::empty(path, Some(file_id));
        }
        let Some(mut handle) = self.registry.acquire_for_extension(&ext) else {
            return FileIndex::empty(path, Some(file_id));
        };

        if cancel.is_cancelled() {
            self.registry.release(handle);
            return FileIndex::empty(path, Some(file_id));
        }

        let text = String::from_utf8_lossy(content).into_owned();
        let query = handle.query_for(&ext);

        // The native grammar is not crash-safe for every input; a panic
        // inside the C library must not take the process down.
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let tree = handle.parse_defensive(text.as_bytes())?;
            if cancel.is_cancelled() {
                return None;
            }
            let mut extractor = self.extractors.acquire();
            let extraction = extractor.extract(
                &tree,
                &text,
                file_id,
                &ext,
                path,
                query.as_deref(),
                self.options,
            );
            self.extractors.release(extractor);
            Some(extraction)
        }));

        self.registry.release(handle);

        match outcome {
            Ok(Some(extraction)) => {
                let language = Language::from_extension(&ext);
                let symbols = build_enhanced_symbols(&extraction, language);
                FileIndex {
                    path: path.to_path_buf(),
                    file_id: Some(file_id),
                    language,
                    extraction,
                    symbols,
                }
            }
            Ok(None) => FileIndex::empty(path, Some(file_id)),
            Err(panic) => {
                let info = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::warn!("TREE-SITTER PANIC in file {}: {info}", path.display());
                FileIndex::empty(path, Some(file_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::InMemoryContentStore;

    fn indexer_with(content: &str) -> (SourceIndexer, FileId) {
        let store = Arc::new(InMemoryContentStore::new());
        let file_id = store.insert_str(content);
        let indexer = SourceIndexer::new(Arc::new(ParserRegistry::new()), store);
        (indexer, file_id)
    }

    #[test]
    fn test_index_go_file_from_store() {
        let (indexer, file_id) = indexer_with("package main\n\nfunc Run() {}\n");
        let index = indexer.index_file(Path::new("main.go"), file_id);

        assert_eq!(index.language, Some(Language::Go));
        assert!(index.symbols.iter().any(|s| s.symbol.name.as_ref() == "Run"));
    }

    #[test]
    fn test_store_miss_yields_empty() {
        let (indexer, _) = indexer_with("package main\n");
        let missing = FileId::new(42).unwrap();
        let index = indexer.index_file(Path::new("gone.go"), missing);
        assert!(index.is_empty());
    }

    #[test]
    fn test_unknown_extension_yields_empty() {
        let (indexer, file_id) = indexer_with("plain text");
        let index = indexer.index_file(Path::new("notes.txt"), file_id);
        assert!(index.is_empty());
        assert!(index.language.is_none());
    }

    #[test]
    fn test_cancelled_context_yields_empty() {
        let (indexer, file_id) = indexer_with("package main\nfunc Run() {}\n");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let index = indexer.index_file_with_context(Path::new("main.go"), file_id, &cancel);
        assert!(index.is_empty());
    }

    #[test]
    fn test_json_export() {
        let (indexer, file_id) = indexer_with("package main\n\nfunc Run() {}\n");
        let index = indexer.index_file(Path::new("main.go"), file_id);

        let json = index.to_json_string().unwrap();
        assert!(json.contains("\"Run\""));
        assert!(json.contains("\"function\""));
    }

    #[test]
    fn test_invalid_source_still_returns() {
        // Tree-sitter produces a tree with error nodes, never a failure.
        let (indexer, file_id) = indexer_with("func func func {{{");
        let index = indexer.index_file(Path::new("broken.go"), file_id);
        assert_eq!(index.language, Some(Language::Go));
    }
}

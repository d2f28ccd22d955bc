//! Language-keyed parser registry with lazy initialization and pooling.
//!
//! Grammars are installed on first demand per extension, guarded by
//! double-checked locking so concurrent first requests initialize once.
//! A setup that fails (grammar rejection or query compile error) leaves
//! the extension absent: later parse attempts get `None` and the caller
//! degrades to empty output. Failures are logged exactly once.
//!
//! Pooled parser handles carry per-file scratch caches. The content fed
//! to the native parser is always a private defensive copy because the
//! underlying C library may mutate its input buffer.

use super::queries::query_source_for_extension;
use super::Language;
use crate::FileId;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tree_sitter::{Parser, Query, Tree};
use walkdir::WalkDir;

/// Idle handles retained per grammar; extras are dropped on release.
const MAX_POOLED_PER_GRAMMAR: usize = 8;

/// Copy content once before feeding the native parser.
///
/// The shared content store must never be handed to the grammar directly.
pub fn defensive_copy(content: &[u8]) -> Vec<u8> {
    content.to_vec()
}

/// Split content into owned lines with a pre-counted allocation.
pub fn split_lines_counted(content: &str) -> Vec<String> {
    let capacity = content.bytes().filter(|&b| b == b'\n').count() + 1;
    let mut lines = Vec::with_capacity(capacity);
    for line in content.lines() {
        lines.push(line.to_string());
    }
    lines
}

/// One initialized language: grammar plus compiled query.
pub struct LanguageSetup {
    pub language: Language,
    /// Distinguishes grammars that share a language tag (c vs cpp, ts vs tsx).
    pub grammar_key: &'static str,
    pub ts_language: tree_sitter::Language,
    pub query: Arc<Query>,
}

fn grammar_for_extension(ext: &str) -> Option<(Language, &'static str, tree_sitter::Language)> {
    let language = Language::from_extension(ext)?;
    let (key, grammar): (&'static str, tree_sitter::Language) = match (language, ext) {
        (Language::JavaScript, _) => ("javascript", tree_sitter_javascript::LANGUAGE.into()),
        (Language::TypeScript, "tsx") => ("tsx", tree_sitter_typescript::LANGUAGE_TSX.into()),
        (Language::TypeScript, _) => (
            "typescript",
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        ),
        (Language::Go, _) => ("go", tree_sitter_go::LANGUAGE.into()),
        (Language::Python, _) => ("python", tree_sitter_python::LANGUAGE.into()),
        (Language::Rust, _) => ("rust", tree_sitter_rust::LANGUAGE.into()),
        (Language::Cpp, "c") | (Language::Cpp, "h") => ("c", tree_sitter_c::LANGUAGE.into()),
        (Language::Cpp, _) => ("cpp", tree_sitter_cpp::LANGUAGE.into()),
        (Language::Java, _) => ("java", tree_sitter_java::LANGUAGE.into()),
        (Language::CSharp, _) => ("csharp", tree_sitter_c_sharp::LANGUAGE.into()),
        (Language::Zig, _) => ("zig", tree_sitter_zig::LANGUAGE.into()),
        (Language::Php, _) => ("php", tree_sitter_php::LANGUAGE_PHP.into()),
    };
    Some((language, key, grammar))
}

/// A pooled parser plus the scratch state one extraction needs.
pub struct ParserHandle {
    parser: Parser,
    language: Language,
    grammar_key: &'static str,
    /// Extension → compiled query for this handle's language.
    queries: HashMap<String, Arc<Query>>,
    line_cache: HashMap<FileId, Arc<Vec<String>>>,
}

impl ParserHandle {
    pub fn language(&self) -> Language {
        self.language
    }

    pub fn grammar_key(&self) -> &'static str {
        self.grammar_key
    }

    /// The compiled query for an extension, when this handle covers it.
    pub fn query_for(&self, ext: &str) -> Option<Arc<Query>> {
        self.queries.get(ext).cloned()
    }

    /// Parse a private copy of `content`.
    pub fn parse_defensive(&mut self, content: &[u8]) -> Option<Tree> {
        let owned = defensive_copy(content);
        self.parser.parse(&owned, None)
    }

    /// Lines of `content`, computed once per file and reused afterwards.
    pub fn lines_for(&mut self, file_id: FileId, content: &str) -> Arc<Vec<String>> {
        self.line_cache
            .entry(file_id)
            .or_insert_with(|| Arc::new(split_lines_counted(content)))
            .clone()
    }

    fn clear_caches(&mut self) {
        self.line_cache.clear();
    }
}

/// Registry of per-extension parser setups and per-grammar handle pools.
pub struct ParserRegistry {
    /// `None` records a failed setup so it is attempted (and logged) once.
    setups: RwLock<HashMap<String, Option<Arc<LanguageSetup>>>>,
    pools: Mutex<HashMap<&'static str, Vec<ParserHandle>>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self {
            setups: RwLock::new(HashMap::new()),
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Registry initialized only for extensions present under `root`.
    pub fn for_project(root: &Path) -> Self {
        let registry = Self::new();
        let mut seen = HashSet::new();
        for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) else {
                continue;
            };
            let ext = ext.to_lowercase();
            if Language::from_extension(&ext).is_some() && seen.insert(ext.clone()) {
                registry.setup_for_extension(&ext);
            }
        }
        registry
    }

    /// The setup for an extension, initializing it on first demand.
    ///
    /// Double-checked: a shared read resolves the hot path; the first miss
    /// takes the write lock, re-checks, and installs the grammar and query.
    pub fn setup_for_extension(&self, ext: &str) -> Option<Arc<LanguageSetup>> {
        let ext = ext.to_lowercase();
        if let Some(cached) = self.setups.read().get(&ext) {
            return cached.clone();
        }

        let mut setups = self.setups.write();
        if let Some(cached) = setups.get(&ext) {
            return cached.clone();
        }
        let setup = Self::initialize(&ext);
        setups.insert(ext, setup.clone());
        setup
    }

    fn initialize(ext: &str) -> Option<Arc<LanguageSetup>> {
        let (language, grammar_key, ts_language) = grammar_for_extension(ext)?;

        // Validate that the grammar loads into a parser at all.
        let mut probe = Parser::new();
        if let Err(e) = probe.set_language(&ts_language) {
            tracing::warn!("Failed to initialize {} parser for .{ext}: {e}", language);
            return None;
        }

        let source = query_source_for_extension(language, ext);
        let query = match Query::new(&ts_language, source) {
            Ok(query) => Arc::new(query),
            Err(e) => {
                tracing::warn!("Failed to compile {} query for .{ext}: {e}", language);
                return None;
            }
        };

        tracing::debug!("Initialized {} grammar for .{ext}", language);
        Some(Arc::new(LanguageSetup {
            language,
            grammar_key,
            ts_language,
            query,
        }))
    }

    /// Whether an extension has a live setup (without initializing it).
    pub fn is_initialized(&self, ext: &str) -> bool {
        matches!(self.setups.read().get(ext), Some(Some(_)))
    }

    /// Extensions with live setups.
    pub fn initialized_extensions(&self) -> Vec<String> {
        self.setups
            .read()
            .iter()
            .filter(|(_, setup)| setup.is_some())
            .map(|(ext, _)| ext.clone())
            .collect()
    }

    /// Drop setups (and pooled handles) outside the given extension set.
    pub fn prune_to(&self, keep: &HashSet<String>) {
        let mut setups = self.setups.write();
        let removed_keys: HashSet<&'static str> = setups
            .iter()
            .filter(|(ext, setup)| !keep.contains(*ext) && setup.is_some())
            .filter_map(|(_, setup)| setup.as_ref().map(|s| s.grammar_key))
            .collect();
        setups.retain(|ext, _| keep.contains(ext));
        drop(setups);

        let mut pools = self.pools.lock();
        for key in removed_keys {
            pools.remove(key);
        }
    }

    /// Acquire a pooled handle able to parse files with `ext`.
    ///
    /// Re-acquired handles come back with cleared scratch caches.
    pub fn acquire_for_extension(&self, ext: &str) -> Option<ParserHandle> {
        let ext = ext.to_lowercase();
        let setup = self.setup_for_extension(&ext)?;

        if let Some(mut handle) = self
            .pools
            .lock()
            .get_mut(setup.grammar_key)
            .and_then(|idle| idle.pop())
        {
            handle.clear_caches();
            return Some(handle);
        }

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&setup.ts_language) {
            tracing::warn!("Failed to configure pooled {} parser: {e}", setup.language);
            return None;
        }

        let mut queries = HashMap::new();
        for language_ext in setup.language.extensions() {
            if let Some(cached) = self.setups.read().get(*language_ext) {
                if let Some(other) = cached {
                    if other.grammar_key == setup.grammar_key {
                        queries.insert(language_ext.to_string(), other.query.clone());
                    }
                }
            }
        }
        queries.insert(ext, setup.query.clone());

        Some(ParserHandle {
            parser,
            language: setup.language,
            grammar_key: setup.grammar_key,
            queries,
            line_cache: HashMap::new(),
        })
    }

    /// Acquire a handle by language, using its primary extension.
    pub fn acquire(&self, language: Language) -> Option<ParserHandle> {
        let ext = language.extensions().first()?;
        self.acquire_for_extension(ext)
    }

    /// Return a handle to its grammar's pool.
    pub fn release(&self, mut handle: ParserHandle) {
        handle.clear_caches();
        let mut pools = self.pools.lock();
        let idle = pools.entry(handle.grammar_key).or_default();
        if idle.len() < MAX_POOLED_PER_GRAMMAR {
            idle.push(handle);
        }
    }

    /// Idle handles currently pooled for a grammar key.
    pub fn pooled_count(&self, grammar_key: &str) -> usize {
        self.pools
            .lock()
            .get(grammar_key)
            .map(|idle| idle.len())
            .unwrap_or(0)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_setup_and_caching() {
        let registry = ParserRegistry::new();
        assert!(!registry.is_initialized("go"));

        let setup = registry.setup_for_extension("go").unwrap();
        assert_eq!(setup.language, Language::Go);
        assert!(registry.is_initialized("go"));

        // Second demand returns the cached Arc.
        let again = registry.setup_for_extension("go").unwrap();
        assert!(Arc::ptr_eq(&setup, &again));
    }

    #[test]
    fn test_unknown_extension_is_absent_not_error() {
        let registry = ParserRegistry::new();
        assert!(registry.setup_for_extension("txt").is_none());
        assert!(registry.acquire_for_extension("txt").is_none());
    }

    #[test]
    fn test_acquire_release_cycle() {
        let registry = ParserRegistry::new();

        let handle = registry.acquire_for_extension("py").unwrap();
        assert_eq!(handle.language(), Language::Python);
        registry.release(handle);
        assert_eq!(registry.pooled_count("python"), 1);

        // The pooled handle is reused and still serves later acquisitions.
        let handle = registry.acquire_for_extension("py").unwrap();
        assert_eq!(registry.pooled_count("python"), 0);
        registry.release(handle);
        assert_eq!(registry.pooled_count("python"), 1);
    }

    #[test]
    fn test_c_and_cpp_pools_are_distinct() {
        let registry = ParserRegistry::new();
        let c = registry.acquire_for_extension("c").unwrap();
        let cpp = registry.acquire_for_extension("cpp").unwrap();
        assert_eq!(c.grammar_key(), "c");
        assert_eq!(cpp.grammar_key(), "cpp");
        assert_eq!(c.language(), cpp.language());
        registry.release(c);
        registry.release(cpp);
        assert_eq!(registry.pooled_count("c"), 1);
        assert_eq!(registry.pooled_count("cpp"), 1);
    }

    #[test]
    fn test_handle_parses_defensive_copy() {
        let registry = ParserRegistry::new();
        let mut handle = registry.acquire_for_extension("go").unwrap();

        let content = b"package main\nfunc main() {}\n";
        let tree = handle.parse_defensive(content).unwrap();
        assert_eq!(tree.root_node().kind(), "source_file");
        // Caller's buffer is untouched regardless of what the grammar did.
        assert_eq!(&content[..12], b"package main");
    }

    #[test]
    fn test_line_cache_reuse() {
        let registry = ParserRegistry::new();
        let mut handle = registry.acquire_for_extension("go").unwrap();
        let file_id = FileId::new(1).unwrap();

        let first = handle.lines_for(file_id, "a\nb\nc");
        let second = handle.lines_for(file_id, "ignored on second call");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_project_scoped_registry() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.go"), "package main\n").unwrap();
        std::fs::write(dir.path().join("app.py"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello\n").unwrap();

        let registry = ParserRegistry::for_project(dir.path());
        assert!(registry.is_initialized("go"));
        assert!(registry.is_initialized("py"));
        assert!(!registry.is_initialized("rs"));
        assert!(!registry.is_initialized("txt"));
    }

    #[test]
    fn test_prune_to_project_extensions() {
        let registry = ParserRegistry::new();
        registry.setup_for_extension("go");
        registry.setup_for_extension("rs");

        let keep: HashSet<String> = ["go".to_string()].into();
        registry.prune_to(&keep);

        assert!(registry.is_initialized("go"));
        assert!(!registry.is_initialized("rs"));
    }

    #[test]
    fn test_split_lines_counted() {
        assert_eq!(split_lines_counted(""), Vec::<String>::new());
        assert_eq!(split_lines_counted("a"), vec!["a"]);
        assert_eq!(split_lines_counted("a\nb\n"), vec!["a", "b"]);
    }
}

//! Registry behavior under concurrency: idempotent init, shared pools.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use symdex::types::SymbolKind;
use symdex::{FileId, InMemoryContentStore, ParserRegistry, SourceIndexer};

#[test]
fn test_concurrent_first_demand_initializes_once() {
    let registry = Arc::new(ParserRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.setup_for_extension("go").is_some())
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(
        registry
            .initialized_extensions()
            .iter()
            .filter(|e| e.as_str() == "go")
            .count(),
        1
    );
}

#[test]
fn test_parallel_indexing_shares_registry() {
    let registry = Arc::new(ParserRegistry::new());
    let store = Arc::new(InMemoryContentStore::new());
    let indexer = Arc::new(SourceIndexer::new(registry, store));

    let sources = [
        ("a.go", "package a\nfunc A() {}\n"),
        ("b.py", "def b():\n    pass\n"),
        ("c.js", "function c() {}\n"),
        ("d.rs", "fn d() {}\n"),
    ];

    let handles: Vec<_> = sources
        .iter()
        .map(|(path, source)| {
            let indexer = Arc::clone(&indexer);
            let path = path.to_string();
            let source = source.to_string();
            thread::spawn(move || {
                for round in 0..10u32 {
                    let index = indexer.index_content(
                        Path::new(&path),
                        FileId::new(round + 1).unwrap(),
                        source.as_bytes(),
                    );
                    assert!(
                        index
                            .symbols
                            .iter()
                            .any(|s| s.symbol.kind == SymbolKind::Function
                                || s.symbol.kind == SymbolKind::Variable),
                        "no symbols for {path}"
                    );
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_pool_round_trip_preserves_service() {
    let registry = ParserRegistry::new();

    for _ in 0..5 {
        let mut handle = registry.acquire_for_extension("go").expect("go handle");
        let tree = handle
            .parse_defensive(b"package main\nfunc main() {}\n")
            .expect("tree");
        assert!(!tree.root_node().has_error());
        registry.release(handle);
    }
    // The pool retained at most one idle handle for the single grammar.
    assert_eq!(registry.pooled_count("go"), 1);
}

#[test]
fn test_project_scoped_pruning() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/main.go"), "package main\n").unwrap();
    std::fs::write(dir.path().join("src/util.py"), "x = 1\n").unwrap();
    std::fs::write(dir.path().join("Makefile"), "all:\n").unwrap();

    let registry = ParserRegistry::for_project(dir.path());
    let mut initialized = registry.initialized_extensions();
    initialized.sort();
    assert_eq!(initialized, vec!["go", "py"]);
}

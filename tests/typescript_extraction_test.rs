//! TypeScript extraction: interfaces, implements, enums, type aliases.

use std::path::Path;
use std::sync::Arc;
use symdex::types::{RefKind, SymbolKind};
use symdex::{FileId, InMemoryContentStore, ParserRegistry, SourceIndexer};

fn index_ts(source: &str) -> symdex::FileIndex {
    let indexer = SourceIndexer::new(
        Arc::new(ParserRegistry::new()),
        Arc::new(InMemoryContentStore::new()),
    );
    indexer.index_content(Path::new("app.ts"), FileId::new(1).unwrap(), source.as_bytes())
}

#[test]
fn test_interface_and_type_alias_symbols() {
    let index = index_ts(
        r#"interface Shape {
    area(): number;
}

type Point = { x: number; y: number };

enum Color {
    Red,
    Green,
}
"#,
    );

    assert!(
        index
            .symbols
            .iter()
            .any(|s| s.symbol.kind == SymbolKind::Interface && s.symbol.name.as_ref() == "Shape")
    );
    assert!(
        index
            .symbols
            .iter()
            .any(|s| s.symbol.kind == SymbolKind::Type && s.symbol.name.as_ref() == "Point")
    );
    assert!(
        index
            .symbols
            .iter()
            .any(|s| s.symbol.kind == SymbolKind::Enum && s.symbol.name.as_ref() == "Color")
    );
}

#[test]
fn test_class_implements_and_extends() {
    let index = index_ts(
        r#"interface Flyer {
    fly(): void;
}

class Animal {}

class Bird extends Animal implements Flyer {
    fly(): void {}
}
"#,
    );

    let refs = &index.extraction.references;
    let extends: Vec<_> = refs.iter().filter(|r| r.kind == RefKind::Extends).collect();
    let implements: Vec<_> = refs
        .iter()
        .filter(|r| r.kind == RefKind::Implements)
        .collect();

    assert_eq!(extends.len(), 1, "extends: {extends:?}");
    assert_eq!(extends[0].referenced_name.as_ref(), "Animal");
    assert_eq!(implements.len(), 1, "implements: {implements:?}");
    assert_eq!(implements[0].referenced_name.as_ref(), "Flyer");
}

#[test]
fn test_interface_extends_interface() {
    let index = index_ts("interface A {}\ninterface B extends A {}\n");

    let extends: Vec<_> = index
        .extraction
        .references
        .iter()
        .filter(|r| r.kind == RefKind::Extends)
        .collect();
    assert_eq!(extends.len(), 1);
    assert_eq!(extends[0].referenced_name.as_ref(), "A");
}

#[test]
fn test_dual_nature_in_typescript() {
    let index = index_ts("const double = (n: number): number => n * 2;\n");

    let kinds: Vec<SymbolKind> = index
        .symbols
        .iter()
        .filter(|s| s.symbol.name.as_ref() == "double")
        .map(|s| s.symbol.kind)
        .collect();
    assert!(kinds.contains(&SymbolKind::Function));
    assert!(kinds.contains(&SymbolKind::Variable));
    assert_eq!(kinds.len(), 2);
}

#[test]
fn test_tsx_extension_uses_tsx_grammar() {
    let indexer = SourceIndexer::new(
        Arc::new(ParserRegistry::new()),
        Arc::new(InMemoryContentStore::new()),
    );
    let index = indexer.index_content(
        Path::new("view.tsx"),
        FileId::new(1).unwrap(),
        b"export function View() {\n  return <div>hello</div>;\n}\n",
    );

    let view = index
        .symbols
        .iter()
        .find(|s| s.symbol.name.as_ref() == "View")
        .expect("View symbol");
    assert_eq!(view.symbol.kind, SymbolKind::Function);
}

#[test]
fn test_scope_paths_join_with_dots() {
    let index = index_ts(
        r#"class Outer {
    inner(): void {
        const helper = () => 1;
    }
}
"#,
    );

    let method_scope = index
        .extraction
        .scopes
        .iter()
        .find(|s| s.name.as_ref() == "inner")
        .expect("inner scope");
    assert_eq!(method_scope.path.as_ref(), "Outer.inner");
    assert_eq!(method_scope.level, 2);

    let class_scope = index
        .extraction
        .scopes
        .iter()
        .find(|s| s.name.as_ref() == "Outer")
        .expect("Outer scope");
    assert_eq!(class_scope.level, 1);
    assert_eq!(class_scope.language.as_ref(), "typescript");
}

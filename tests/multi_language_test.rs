//! Coverage across the remaining languages: Java, C#, C/C++, PHP, Zig.

use std::path::Path;
use std::sync::Arc;
use symdex::types::{RefKind, RefQuality, SymbolKind};
use symdex::{FileId, InMemoryContentStore, ParserRegistry, SourceIndexer};

fn indexer() -> SourceIndexer {
    SourceIndexer::new(
        Arc::new(ParserRegistry::new()),
        Arc::new(InMemoryContentStore::new()),
    )
}

fn index(path: &str, source: &str) -> symdex::FileIndex {
    indexer().index_content(Path::new(path), FileId::new(1).unwrap(), source.as_bytes())
}

#[test]
fn test_java_extends_and_implements() {
    let result = index(
        "Main.java",
        r#"import java.util.List;

interface Walker {}

class Animal {}

class Dog extends Animal implements Walker {
    private int age;

    Dog(int age) {
        this.age = age;
    }

    void bark() {}
}
"#,
    );

    let refs = &result.extraction.references;
    assert!(
        refs.iter()
            .any(|r| r.kind == RefKind::Extends && r.referenced_name.as_ref() == "Animal")
    );
    assert!(
        refs.iter()
            .any(|r| r.kind == RefKind::Implements && r.referenced_name.as_ref() == "Walker")
    );

    assert!(
        result
            .symbols
            .iter()
            .any(|s| s.symbol.kind == SymbolKind::Constructor && s.symbol.name.as_ref() == "Dog")
    );
    assert!(
        result
            .symbols
            .iter()
            .any(|s| s.symbol.kind == SymbolKind::Method && s.symbol.name.as_ref() == "bark")
    );
    assert!(
        result
            .symbols
            .iter()
            .any(|s| s.symbol.kind == SymbolKind::Field && s.symbol.name.as_ref() == "age")
    );
    assert_eq!(result.extraction.imports.len(), 1);
    assert_eq!(result.extraction.imports[0].path, "java.util.List");
}

#[test]
fn test_csharp_base_list_heuristic() {
    let result = index(
        "Service.cs",
        r#"using System;

namespace App {
    interface IRun {}
    interface ILog {}

    class Base {}

    class Service : Base, IRun, ILog {
        public void Go() {}
    }
}
"#,
    );

    let refs = &result.extraction.references;
    // First base entry reads as Extends, the rest as Implements, all
    // flagged heuristic for the later resolution pass.
    let extends: Vec<_> = refs.iter().filter(|r| r.kind == RefKind::Extends).collect();
    let implements: Vec<_> = refs
        .iter()
        .filter(|r| r.kind == RefKind::Implements)
        .collect();

    assert_eq!(extends.len(), 1, "extends: {extends:?}");
    assert_eq!(extends[0].referenced_name.as_ref(), "Base");
    assert_eq!(extends[0].quality, Some(RefQuality::Heuristic));

    let implement_names: Vec<&str> = implements
        .iter()
        .map(|r| r.referenced_name.as_ref())
        .collect();
    assert_eq!(implement_names, vec!["IRun", "ILog"]);

    assert!(
        result
            .symbols
            .iter()
            .any(|s| s.symbol.kind == SymbolKind::Namespace && s.symbol.name.as_ref() == "App")
    );
    assert_eq!(result.extraction.imports, vec![symdex::types::Import {
        path: "System".to_string(),
        line: 1,
    }]);
}

#[test]
fn test_c_functions_structs_and_includes() {
    let result = index(
        "main.c",
        r#"#include <stdio.h>
#include "local.h"

struct point {
    int x;
    int y;
};

int add(int a, int b) {
    return a + b;
}
"#,
    );

    let paths: Vec<&str> = result
        .extraction
        .imports
        .iter()
        .map(|i| i.path.as_str())
        .collect();
    assert_eq!(paths, vec!["stdio.h", "local.h"]);

    assert!(
        result
            .symbols
            .iter()
            .any(|s| s.symbol.kind == SymbolKind::Struct && s.symbol.name.as_ref() == "point")
    );
    let add = result
        .symbols
        .iter()
        .find(|s| s.symbol.kind == SymbolKind::Function && s.symbol.name.as_ref() == "add")
        .expect("add function");
    assert_eq!(add.complexity, 1);
}

#[test]
fn test_cpp_class_and_namespace() {
    let result = index(
        "engine.cpp",
        r#"#include <vector>

namespace engine {

class Renderer {
public:
    void draw() {}
};

}
"#,
    );

    assert!(
        result
            .symbols
            .iter()
            .any(|s| s.symbol.kind == SymbolKind::Namespace && s.symbol.name.as_ref() == "engine")
    );
    assert!(
        result
            .symbols
            .iter()
            .any(|s| s.symbol.kind == SymbolKind::Class && s.symbol.name.as_ref() == "Renderer")
    );
}

#[test]
fn test_php_inheritance_and_traits() {
    let result = index(
        "App.php",
        r#"<?php

interface Speaker {}

trait Loud {}

class Base {}

class App extends Base implements Speaker {
    use Loud;

    public function run() {}
}
"#,
    );

    let refs = &result.extraction.references;
    assert!(
        refs.iter()
            .any(|r| r.kind == RefKind::Extends && r.referenced_name.as_ref() == "Base")
    );
    assert!(
        refs.iter()
            .any(|r| r.kind == RefKind::Implements && r.referenced_name.as_ref() == "Speaker")
    );
    // Trait composition reads as Extends.
    assert!(
        refs.iter()
            .any(|r| r.kind == RefKind::Extends && r.referenced_name.as_ref() == "Loud")
    );

    assert!(
        result
            .symbols
            .iter()
            .any(|s| s.symbol.kind == SymbolKind::Trait && s.symbol.name.as_ref() == "Loud")
    );
    assert!(
        result
            .symbols
            .iter()
            .any(|s| s.symbol.kind == SymbolKind::Method && s.symbol.name.as_ref() == "run")
    );
}

#[test]
fn test_zig_smoke() {
    // Zig support degrades gracefully if the grammar's node vocabulary
    // shifts; indexing must never error or panic.
    let result = index(
        "main.zig",
        r#"const std = @import("std");

pub fn main() void {}
"#,
    );
    assert_eq!(result.language, Some(symdex::Language::Zig));
}

#[test]
fn test_unknown_language_is_empty_not_error() {
    let result = index("README.md", "# title\n");
    assert!(result.is_empty());
    assert!(result.language.is_none());
}

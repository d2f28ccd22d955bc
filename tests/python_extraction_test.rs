//! Python extraction: inheritance, methods, decorators, purity.

use std::path::Path;
use std::sync::Arc;
use symdex::types::{AttributeKind, RefKind, SideEffects, SymbolKind};
use symdex::{ExtractorOptions, FileId, InMemoryContentStore, ParserRegistry, SourceIndexer};

fn index_py(source: &str) -> symdex::FileIndex {
    let indexer = SourceIndexer::with_options(
        Arc::new(ParserRegistry::new()),
        Arc::new(InMemoryContentStore::new()),
        ExtractorOptions {
            track_side_effects: true,
            include_folder_scope: false,
        },
    );
    indexer.index_content(Path::new("app.py"), FileId::new(1).unwrap(), source.as_bytes())
}

#[test]
fn test_multiple_inheritance_extends() {
    let index = index_py("class Child(Parent1, Parent2, Mixin):\n    pass\n");

    let extends: Vec<_> = index
        .extraction
        .references
        .iter()
        .filter(|r| r.kind == RefKind::Extends)
        .collect();
    assert_eq!(extends.len(), 3, "extends: {extends:?}");
    let names: Vec<&str> = extends.iter().map(|r| r.referenced_name.as_ref()).collect();
    assert!(names.contains(&"Parent1"));
    assert!(names.contains(&"Parent2"));
    assert!(names.contains(&"Mixin"));
}

#[test]
fn test_method_vs_function_kinds() {
    let index = index_py(
        r#"class Service:
    def start(self):
        def helper():
            return 1
        return helper()

def standalone():
    return 2
"#,
    );

    let start = index
        .symbols
        .iter()
        .find(|s| s.symbol.name.as_ref() == "start")
        .expect("start");
    assert_eq!(start.symbol.kind, SymbolKind::Method);

    let standalone = index
        .symbols
        .iter()
        .find(|s| s.symbol.name.as_ref() == "standalone")
        .expect("standalone");
    assert_eq!(standalone.symbol.kind, SymbolKind::Function);

    // A function nested inside a method body is not a method.
    let helper = index
        .symbols
        .iter()
        .find(|s| s.symbol.name.as_ref() == "helper")
        .expect("helper");
    assert_eq!(helper.symbol.kind, SymbolKind::Function);
}

#[test]
fn test_decorator_attribute() {
    let index = index_py("@cached\ndef slow():\n    return 1\n");

    let slow = index
        .symbols
        .iter()
        .find(|s| s.symbol.name.as_ref() == "slow")
        .expect("slow");
    assert!(
        slow.symbol
            .attributes
            .iter()
            .any(|a| a.kind == AttributeKind::Decorator && a.value.contains("cached")),
        "attributes: {:?}",
        slow.symbol.attributes
    );
}

#[test]
fn test_imports_full_text() {
    let index = index_py("import os\nfrom collections import OrderedDict\n");

    let paths: Vec<&str> = index
        .extraction
        .imports
        .iter()
        .map(|i| i.path.as_str())
        .collect();
    assert_eq!(
        paths,
        vec!["import os", "from collections import OrderedDict"]
    );
}

#[test]
fn test_call_and_attribute_references() {
    let index = index_py(
        r#"def run(client):
    client.connect()
    data = client.payload
    return process(data)
"#,
    );

    let refs = &index.extraction.references;
    assert!(
        refs.iter()
            .any(|r| r.kind == RefKind::Call && r.referenced_name.as_ref() == "connect")
    );
    assert!(
        refs.iter()
            .any(|r| r.kind == RefKind::Call && r.referenced_name.as_ref() == "process")
    );
    assert!(
        refs.iter()
            .any(|r| r.kind == RefKind::Usage && r.referenced_name.as_ref() == "payload")
    );
}

#[test]
fn test_raise_and_param_write_effects() {
    let index = index_py(
        r#"def validate(value):
    if value < 0:
        raise ValueError("negative")
    return value

def mutate(items):
    items += [1]
    return items

def pure(a, b):
    total = a + b
    return total
"#,
    );

    let effects = &index.extraction.side_effects;
    let validate = effects
        .values()
        .find(|e| e.function.as_ref() == "validate")
        .expect("validate");
    assert!(validate.effects.contains(SideEffects::THROW));
    assert!(!validate.is_pure);

    let mutate = effects
        .values()
        .find(|e| e.function.as_ref() == "mutate")
        .expect("mutate");
    assert!(mutate.effects.contains(SideEffects::PARAM_WRITE));

    let pure = effects
        .values()
        .find(|e| e.function.as_ref() == "pure")
        .expect("pure");
    assert!(pure.is_pure, "effects: {:?}", pure.effects);
}

#[test]
fn test_ternary_and_boolean_complexity() {
    let index = index_py(
        r#"def pick(a, b, flag):
    result = a if flag and a > 0 else b
    return result
"#,
    );

    let pick = index
        .symbols
        .iter()
        .find(|s| s.symbol.name.as_ref() == "pick")
        .expect("pick");
    // 1 base + conditional expression + `and`.
    assert_eq!(pick.complexity, 3);
}

//! Tree-sitter named-capture queries, one per language.
//!
//! These literals are compiled once per grammar at registry setup and seed
//! extraction (name and import-path resolution). The capture names are a
//! contract with downstream consumers; renaming a capture is a breaking
//! change even when the matched nodes stay the same.

use super::Language;

/// The named-capture query source for a language.
///
/// `.c`/`.h` compile against the C grammar and the remaining C/C++
/// extensions against C++, so the shared patterns below use only node
/// types present in both grammars.
pub fn query_source(language: Language) -> &'static str {
    match language {
        Language::JavaScript => JAVASCRIPT_QUERY,
        Language::TypeScript => TYPESCRIPT_QUERY,
        Language::Go => GO_QUERY,
        Language::Python => PYTHON_QUERY,
        Language::Rust => RUST_QUERY,
        Language::Cpp => CPP_QUERY,
        Language::Java => JAVA_QUERY,
        Language::CSharp => CSHARP_QUERY,
        Language::Zig => ZIG_QUERY,
        Language::Php => PHP_QUERY,
    }
}

/// Query source for one extension; only C/C++ differ per extension.
pub fn query_source_for_extension(language: Language, ext: &str) -> &'static str {
    match (language, ext) {
        (Language::Cpp, "c") | (Language::Cpp, "h") => C_QUERY,
        _ => query_source(language),
    }
}

const JAVASCRIPT_QUERY: &str = r#"
(function_declaration name: (identifier) @function.name) @function
(generator_function_declaration name: (identifier) @function.name) @function
(method_definition name: (property_identifier) @method.name) @method
(class_declaration name: (identifier) @class.name) @class
(variable_declarator name: (identifier) @variable.name) @variable
(import_statement source: (string) @import.source) @import
"#;

const TYPESCRIPT_QUERY: &str = r#"
(function_declaration name: (identifier) @function.name) @function
(generator_function_declaration name: (identifier) @function.name) @function
(method_definition name: (property_identifier) @method.name) @method
(class_declaration name: (type_identifier) @class.name) @class
(interface_declaration name: (type_identifier) @interface.name) @interface
(type_alias_declaration name: (type_identifier) @type.name) @type
(enum_declaration name: (identifier) @enum.name) @enum
(variable_declarator name: (identifier) @variable.name) @variable
(import_statement source: (string) @import.source) @import
"#;

const GO_QUERY: &str = r#"
(function_declaration name: (identifier) @function.name) @function
(method_declaration name: (field_identifier) @method.name) @method
(type_declaration (type_spec name: (type_identifier) @type.name)) @type
(import_spec path: (interpreted_string_literal) @import.path) @import
(package_clause (package_identifier) @package)
"#;

const PYTHON_QUERY: &str = r#"
(function_definition name: (identifier) @function.name) @function
(class_definition name: (identifier) @class.name) @class
(import_statement) @import
(import_from_statement) @import
"#;

const RUST_QUERY: &str = r#"
(function_item name: (identifier) @function.name) @function
(struct_item name: (type_identifier) @struct.name) @struct
(enum_item name: (type_identifier) @enum.name) @enum
(trait_item name: (type_identifier) @trait.name) @trait
(impl_item) @impl
(mod_item name: (identifier) @module.name) @module
(type_item name: (type_identifier) @type.name) @type
(macro_definition name: (identifier) @macro.name) @macro
(use_declaration) @import
"#;

const C_QUERY: &str = r#"
(function_definition declarator: (function_declarator declarator: (identifier) @function.name)) @function
(struct_specifier name: (type_identifier) @struct.name) @struct
(enum_specifier name: (type_identifier) @enum.name) @enum
(type_definition declarator: (type_identifier) @type.name) @type
(preproc_include path: (_) @import.path) @include
"#;

const CPP_QUERY: &str = r#"
(function_definition declarator: (function_declarator declarator: (identifier) @function.name)) @function
(function_definition declarator: (function_declarator declarator: (field_identifier) @method.name)) @method
(class_specifier name: (type_identifier) @class.name) @class
(struct_specifier name: (type_identifier) @struct.name) @struct
(enum_specifier name: (type_identifier) @enum.name) @enum
(type_definition declarator: (type_identifier) @type.name) @type
(namespace_definition name: (namespace_identifier) @namespace.name) @namespace
(template_declaration) @template
(preproc_include path: (_) @import.path) @include
"#;

const JAVA_QUERY: &str = r#"
(class_declaration name: (identifier) @class.name) @class
(interface_declaration name: (identifier) @interface.name) @interface
(enum_declaration name: (identifier) @enum.name) @enum
(record_declaration name: (identifier) @record.name) @record
(method_declaration name: (identifier) @method.name) @method
(constructor_declaration name: (identifier) @constructor.name) @constructor
(annotation_type_declaration name: (identifier) @annotation.name) @annotation
(field_declaration) @field
(import_declaration) @import
"#;

const CSHARP_QUERY: &str = r#"
(class_declaration name: (identifier) @class.name) @class
(interface_declaration name: (identifier) @interface.name) @interface
(struct_declaration name: (identifier) @struct.name) @struct
(enum_declaration name: (identifier) @enum.name) @enum
(record_declaration name: (identifier) @record.name) @record
(method_declaration name: (identifier) @method.name) @method
(constructor_declaration name: (identifier) @constructor.name) @constructor
(namespace_declaration name: (_) @namespace.name) @namespace
(file_scoped_namespace_declaration name: (_) @namespace.name) @namespace
(property_declaration) @property
(event_declaration) @event
(event_field_declaration) @event
(delegate_declaration) @delegate
(enum_member_declaration) @enum_member
(using_directive) @using
"#;

const ZIG_QUERY: &str = r#"
(function_declaration (identifier) @function.name) @function
(variable_declaration (identifier) @variable.name) @variable
"#;

const PHP_QUERY: &str = r#"
(function_definition name: (name) @function.name) @function
(method_declaration name: (name) @method.name) @method
(class_declaration name: (name) @class.name) @class
(interface_declaration name: (name) @interface.name) @interface
(trait_declaration name: (name) @trait.name) @trait
(enum_declaration name: (name) @enum.name) @enum
(namespace_definition name: (namespace_name) @namespace.name) @namespace
(namespace_use_declaration) @import
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_language_has_a_query() {
        for language in Language::all() {
            assert!(
                !query_source(*language).trim().is_empty(),
                "missing query for {language}"
            );
        }
    }

    #[test]
    fn test_c_and_cpp_diverge_per_extension() {
        let c = query_source_for_extension(Language::Cpp, "c");
        let cpp = query_source_for_extension(Language::Cpp, "cpp");
        assert_ne!(c, cpp);
        assert!(!c.contains("class_specifier"));
        assert!(cpp.contains("class_specifier"));
    }

    #[test]
    fn test_capture_vocabulary_stability() {
        // Contract captures that downstream consumers key on.
        assert!(GO_QUERY.contains("@type.name"));
        assert!(GO_QUERY.contains("@import.path"));
        assert!(JAVASCRIPT_QUERY.contains("@import.source"));
        assert!(TYPESCRIPT_QUERY.contains("@interface.name"));
        assert!(RUST_QUERY.contains("@trait.name"));
        assert!(RUST_QUERY.contains("@impl"));
        assert!(CSHARP_QUERY.contains("@using"));
        assert!(CSHARP_QUERY.contains("@enum_member"));
        assert!(PHP_QUERY.contains("@namespace.name"));
    }
}

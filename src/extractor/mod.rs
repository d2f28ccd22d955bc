//! Unified single-pass AST extractor.
//!
//! One recursive walk of the syntax tree produces every output at once:
//! symbols, blocks, imports, scopes, references, declaration metadata,
//! cyclomatic complexity, type relationships, performance evidence and
//! (opt-in) side-effect evidence. Consolidating the walks is the point;
//! adding a second pass for a new output is a regression.
//!
//! Extractors are poolable: `reset` zeroes lengths but keeps capacity, so
//! a reused instance parses without reallocating its scratch state.

mod performance;
mod pool;
mod references;
mod relationships;
mod side_effects;

pub use pool::ExtractorPool;

use crate::parsing::{Language, detect_language_tag, split_lines_counted};
use crate::types::{
    AttributeKind, BlockBoundary, ContextAttribute, DeclarationInfo, FileId, FunctionPerfData,
    Import, LoopInfo, RefKind, RefQuality, RefStrength, Reference, ScopeInfo, ScopeKind,
    SideEffectInfo, Symbol, SymbolKind,
};
use side_effects::EffectFrame;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor, Tree};

/// Memoized node-kind classifications; beyond this the lookup goes direct.
const NODE_PROFILE_CACHE_CAP: usize = 10_000;

/// Maximum recursion depth; deeper subtrees are skipped to protect the stack.
pub const MAX_AST_DEPTH: usize = 500;

/// Extraction switches.
#[derive(Debug, Clone, Copy)]
pub struct ExtractorOptions {
    /// Enable per-function side-effect tracking.
    pub track_side_effects: bool,
    /// Emit a folder scope (level −1) ahead of the file scope.
    pub include_folder_scope: bool,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            track_side_effects: false,
            include_folder_scope: false,
        }
    }
}

/// Everything one extraction produces. Owned by the caller.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct ExtractionResult {
    pub symbols: Vec<Symbol>,
    pub blocks: Vec<BlockBoundary>,
    pub imports: Vec<Import>,
    pub scopes: Vec<ScopeInfo>,
    pub references: Vec<Reference>,
    /// Keyed by tree-sitter's 0-based (row, column); use
    /// [`ExtractionResult::declaration_at`] for 1-based lookups. Not
    /// serialized: the builder folds this into the symbol records.
    #[serde(skip)]
    pub declarations: HashMap<(u32, u32), DeclarationInfo>,
    /// Keyed by 1-based (line, column) of the function start. Not
    /// serialized for the same reason.
    #[serde(skip)]
    pub complexity: HashMap<(u32, u16), u32>,
    pub perf: Vec<FunctionPerfData>,
    /// Keyed by `file:line`.
    pub side_effects: HashMap<String, SideEffectInfo>,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
            && self.references.is_empty()
            && self.imports.is_empty()
            && self.scopes.is_empty()
    }

    /// Declaration metadata at a 1-based position.
    ///
    /// Storage is 0-based (tree-sitter rows); this adapter converts.
    pub fn declaration_at(&self, line: u32, column: u16) -> Option<&DeclarationInfo> {
        let row = line.checked_sub(1)?;
        let col = (column as u32).checked_sub(1)?;
        self.declarations.get(&(row, col))
    }

    /// Cyclomatic complexity recorded at a 1-based function start.
    pub fn complexity_at(&self, line: u32, column: u16) -> u32 {
        self.complexity.get(&(line, column)).copied().unwrap_or(0)
    }
}

/// Role bits for one node kind, memoized per grammar kind id.
#[derive(Debug, Clone, Copy, Default)]
struct NodeProfile {
    function: bool,
    looping: bool,
    decision: bool,
    binary: bool,
    call: bool,
    awaits: bool,
}

fn is_function_kind(kind: &str) -> bool {
    matches!(
        kind,
        "function_declaration"
            | "generator_function_declaration"
            | "function_definition"
            | "function_item"
            | "func_literal"
            | "method_definition"
            | "method_declaration"
            | "arrow_function"
            | "function_expression"
            | "generator_function"
            | "constructor_declaration"
    )
}

fn is_loop_kind(kind: &str) -> bool {
    matches!(
        kind,
        "for_statement"
            | "for_in_statement"
            | "for_of_statement"
            | "while_statement"
            | "do_statement"
            | "for_expression"
            | "while_expression"
            | "loop_expression"
            | "enhanced_for_statement"
            | "foreach_statement"
            | "for_range_loop"
    )
}

fn profile_for_kind(kind: &str) -> NodeProfile {
    let looping = is_loop_kind(kind);
    NodeProfile {
        function: is_function_kind(kind),
        looping,
        decision: looping
            | matches!(
                kind,
                "if_statement"
                    | "if_expression"
                    | "elif_clause"
                    | "conditional_expression"
                    | "ternary_expression"
                    | "switch_case"
                    | "case_statement"
                    | "case_clause"
                    | "expression_case"
                    | "type_case"
                    | "catch_clause"
                    | "except_clause"
            ),
        binary: matches!(kind, "binary_expression" | "boolean_operator"),
        call: matches!(
            kind,
            "call_expression"
                | "call"
                | "method_invocation"
                | "invocation_expression"
                | "function_call_expression"
                | "member_call_expression"
                | "scoped_call_expression"
        ),
        awaits: matches!(kind, "await_expression" | "await"),
    }
}

fn is_import_kind(kind: &str) -> bool {
    matches!(
        kind,
        "import_statement"
            | "import_from_statement"
            | "import_declaration"
            | "import_spec"
            | "use_declaration"
            | "using_directive"
            | "preproc_include"
            | "namespace_use_declaration"
    )
}

fn is_class_kind(kind: &str) -> bool {
    matches!(
        kind,
        "class_declaration" | "class_definition" | "class_specifier" | "abstract_class_declaration"
    )
}

/// One open lexical scope on the traversal stack.
#[derive(Debug, Clone)]
struct ScopeFrame {
    level: i32,
    kind: ScopeKind,
    name: String,
    path: String,
}

/// The single-pass visitor. Construct once, reuse via [`reset`].
///
/// [`reset`]: UnifiedExtractor::reset
pub struct UnifiedExtractor {
    // Per-parse inputs.
    content: String,
    path: PathBuf,
    file_id: FileId,
    language: Option<Language>,
    lang_tag: &'static str,
    options: ExtractorOptions,

    // Outputs.
    symbols: Vec<Symbol>,
    blocks: Vec<BlockBoundary>,
    imports: Vec<Import>,
    scopes: Vec<ScopeInfo>,
    references: Vec<Reference>,
    declarations: HashMap<(u32, u32), DeclarationInfo>,
    complexity: HashMap<(u32, u16), u32>,
    perf: Vec<FunctionPerfData>,
    side_effects: HashMap<String, SideEffectInfo>,

    // Traversal state.
    scope_stack: Vec<ScopeFrame>,
    complexity_stack: Vec<u32>,
    func_pos_stack: Vec<(u32, u16)>,
    loop_stack: Vec<LoopInfo>,
    perf_stack: Vec<FunctionPerfData>,
    effect_stack: Vec<EffectFrame>,
    go_result_types: Vec<Option<String>>,
    handled_nodes: HashSet<usize>,
    in_import: bool,
    in_trait_or_impl: u32,
    in_class_body: u32,
    next_ref_id: u32,

    // Scratch caches.
    node_profiles: HashMap<u16, NodeProfile>,
    lines: Vec<String>,
    lines_ready: bool,
    seeds: HashMap<usize, String>,
}

impl UnifiedExtractor {
    pub fn new() -> Self {
        Self {
            content: String::new(),
            path: PathBuf::new(),
            file_id: FileId::FIRST,
            language: None,
            lang_tag: "unknown",
            options: ExtractorOptions::default(),
            symbols: Vec::new(),
            blocks: Vec::new(),
            imports: Vec::new(),
            scopes: Vec::new(),
            references: Vec::new(),
            declarations: HashMap::new(),
            complexity: HashMap::new(),
            perf: Vec::new(),
            side_effects: HashMap::new(),
            scope_stack: Vec::new(),
            complexity_stack: Vec::new(),
            func_pos_stack: Vec::new(),
            loop_stack: Vec::new(),
            perf_stack: Vec::new(),
            effect_stack: Vec::new(),
            go_result_types: Vec::new(),
            handled_nodes: HashSet::new(),
            in_import: false,
            in_trait_or_impl: 0,
            in_class_body: 0,
            next_ref_id: 1,
            node_profiles: HashMap::new(),
            lines: Vec::new(),
            lines_ready: false,
            seeds: HashMap::new(),
        }
    }

    /// Clear per-parse state, retaining allocated capacity.
    pub fn reset(&mut self) {
        self.content.clear();
        self.path.clear();
        self.file_id = FileId::FIRST;
        self.language = None;
        self.lang_tag = "unknown";
        self.symbols.clear();
        self.blocks.clear();
        self.imports.clear();
        self.scopes.clear();
        self.references.clear();
        self.declarations.clear();
        self.complexity.clear();
        self.perf.clear();
        self.side_effects.clear();
        self.scope_stack.clear();
        self.complexity_stack.clear();
        self.func_pos_stack.clear();
        self.loop_stack.clear();
        self.perf_stack.clear();
        self.effect_stack.clear();
        self.go_result_types.clear();
        self.handled_nodes.clear();
        self.in_import = false;
        self.in_trait_or_impl = 0;
        self.in_class_body = 0;
        self.next_ref_id = 1;
        self.node_profiles.clear();
        self.lines.clear();
        self.lines_ready = false;
        self.seeds.clear();
    }

    /// Walk `tree` once and produce every output.
    ///
    /// `query` seeds name and import-path resolution when present; its
    /// absence only degrades naming fallbacks, never correctness of the
    /// node-kind driven emission.
    pub fn extract(
        &mut self,
        tree: &Tree,
        content: &str,
        file_id: FileId,
        ext: &str,
        path: &Path,
        query: Option<&Query>,
        options: ExtractorOptions,
    ) -> ExtractionResult {
        self.reset();
        self.content.push_str(content);
        self.path.push(path);
        self.file_id = file_id;
        self.language = Language::from_extension(ext);
        self.lang_tag = detect_language_tag(ext);
        self.options = options;

        if let Some(query) = query {
            self.seed_from_query(query, tree);
        }

        let root = tree.root_node();
        self.push_root_scopes(root);
        for child in root.children(&mut root.walk()) {
            self.visit(child, 0);
        }
        self.scope_stack.clear();

        ExtractionResult {
            symbols: std::mem::take(&mut self.symbols),
            blocks: std::mem::take(&mut self.blocks),
            imports: std::mem::take(&mut self.imports),
            scopes: std::mem::take(&mut self.scopes),
            references: std::mem::take(&mut self.references),
            declarations: std::mem::take(&mut self.declarations),
            complexity: std::mem::take(&mut self.complexity),
            perf: std::mem::take(&mut self.perf),
            side_effects: std::mem::take(&mut self.side_effects),
        }
    }

    fn seed_from_query(&mut self, query: &Query, tree: &Tree) {
        let mut seeded = Vec::new();
        {
            let mut cursor = QueryCursor::new();
            let content = self.content.as_bytes();
            let mut matches = cursor.matches(query, tree.root_node(), content);
            while let Some(matched) = matches.next() {
                for capture in matched.captures {
                    let name = query.capture_names()[capture.index as usize];
                    seeded.push((capture.node.id(), name.to_string()));
                }
            }
        }
        self.seeds.extend(seeded);
    }

    fn push_root_scopes(&mut self, root: Node) {
        let start_line = root.start_position().row as u32 + 1;
        let end_line = root.end_position().row as u32 + 1;
        let basename = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if self.options.include_folder_scope {
            let folder = self
                .path
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.scopes.push(ScopeInfo {
                kind: ScopeKind::Folder,
                name: folder.as_str().into(),
                path: "".into(),
                start_line,
                end_line,
                level: -1,
                language: self.lang_tag.into(),
                attributes: Vec::new(),
            });
            self.scope_stack.push(ScopeFrame {
                level: -1,
                kind: ScopeKind::Folder,
                name: folder,
                path: String::new(),
            });
        }

        self.scopes.push(ScopeInfo {
            kind: ScopeKind::File,
            name: basename.as_str().into(),
            path: "".into(),
            start_line,
            end_line,
            level: 0,
            language: self.lang_tag.into(),
            attributes: Vec::new(),
        });
        self.scope_stack.push(ScopeFrame {
            level: 0,
            kind: ScopeKind::File,
            name: basename,
            path: String::new(),
        });
    }

    fn visit(&mut self, node: Node, depth: usize) {
        if depth > MAX_AST_DEPTH {
            tracing::debug!(
                "Maximum AST depth ({MAX_AST_DEPTH}) exceeded at {}:{}; skipping subtree",
                node.start_position().row + 1,
                node.start_position().column + 1
            );
            return;
        }
        let kind = node.kind();
        let profile = self.profile(node);

        // 1. Function entry: complexity base, perf frame, effect frame.
        let opened_function = profile.function;
        if opened_function {
            let key_node = self.complexity_key_node(node);
            self.complexity_stack.push(1);
            self.func_pos_stack.push((
                key_node.start_position().row as u32 + 1,
                key_node.start_position().column as u16 + 1,
            ));
            let name = self.function_display_name(node);
            let is_async = self.has_async_marker(node);
            self.perf_enter_function(node, &name, is_async);
            self.effects_enter_function(node, &name);
            if self.lang_tag == "go" {
                let result = self.go_declared_result(node);
                self.go_result_types.push(result);
            }
        }

        // 2. Complexity counting inside the innermost open function.
        if !self.complexity_stack.is_empty() {
            let increment = profile.decision
                || (profile.binary && self.is_logical_operator(node));
            if increment {
                if let Some(counter) = self.complexity_stack.last_mut() {
                    *counter += 1;
                }
            }
        }

        // 3. Symbol / block / import emission.
        let emitted = self.emit_for_node(node);

        // 4. Scope emission.
        let mut pushed_scope = false;
        if let Some(scope_kind) = self.scope_kind_for(node, emitted.as_ref()) {
            let name = emitted
                .as_ref()
                .map(|(_, n)| n.clone())
                .unwrap_or_else(|| "block".to_string());
            self.push_scope(node, scope_kind, name);
            pushed_scope = true;
        }

        // 5. Declaration metadata.
        if emitted.is_some() {
            self.record_declaration(node);
        }

        // 6. References.
        self.emit_references(node);

        // 7. Type relationships.
        self.emit_relationships(node);

        // 8. Performance tracking.
        let pushed_loop = profile.looping;
        if pushed_loop {
            self.perf_enter_loop(node);
        }
        if profile.awaits {
            self.perf_record_await(node);
        }
        if profile.call {
            let target = node
                .child_by_field_name("function")
                .or_else(|| node.child_by_field_name("name"))
                .map(|f| self.node_text(f).to_string());
            if let Some(target) = target {
                self.perf_record_call(node, &target);
            }
        }

        // 9. Side effects.
        self.track_side_effects(node);

        // Context flags for the subtree.
        let was_in_import = self.in_import;
        if is_import_kind(kind) {
            self.in_import = true;
        }
        let trait_or_impl = matches!(kind, "trait_item" | "impl_item");
        if trait_or_impl {
            self.in_trait_or_impl += 1;
        }
        let class_body = is_class_kind(kind);
        if class_body {
            self.in_class_body += 1;
        }

        // 10. Descend.
        for child in node.children(&mut node.walk()) {
            self.visit(child, depth + 1);
        }

        // 11. Unwind.
        if class_body {
            self.in_class_body -= 1;
        }
        if trait_or_impl {
            self.in_trait_or_impl -= 1;
        }
        self.in_import = was_in_import;
        if pushed_loop {
            self.perf_exit_loop();
        }
        if pushed_scope {
            self.scope_stack.pop();
        }
        if opened_function {
            if let (Some(complexity), Some(pos)) =
                (self.complexity_stack.pop(), self.func_pos_stack.pop())
            {
                self.complexity.insert(pos, complexity);
            }
            self.perf_exit_function();
            self.effects_exit_function();
            if self.lang_tag == "go" {
                self.go_result_types.pop();
            }
        }
    }

    fn profile(&mut self, node: Node) -> NodeProfile {
        let id = node.kind_id();
        if let Some(profile) = self.node_profiles.get(&id) {
            return *profile;
        }
        let profile = profile_for_kind(node.kind());
        if self.node_profiles.len() < NODE_PROFILE_CACHE_CAP {
            self.node_profiles.insert(id, profile);
        }
        profile
    }

    /// Complexity is keyed where the builder will look it up: the
    /// declarator for a function-valued initializer, the node itself
    /// otherwise.
    fn complexity_key_node<'tree>(&self, node: Node<'tree>) -> Node<'tree> {
        if matches!(
            node.kind(),
            "arrow_function" | "function_expression" | "generator_function"
        ) {
            if let Some(parent) = node.parent() {
                if parent.kind() == "variable_declarator" {
                    return parent;
                }
            }
        }
        node
    }

    fn is_logical_operator(&self, node: Node) -> bool {
        if node.kind() == "boolean_operator" {
            return true;
        }
        node.child_by_field_name("operator")
            .map(|op| matches!(self.node_text(op), "&&" | "||" | "and" | "or"))
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Emission
    // ------------------------------------------------------------------

    /// Emit symbols, blocks and imports for one node per the node-kind
    /// table. Returns the primary emitted (kind, name) for scope and
    /// declaration handling.
    fn emit_for_node(&mut self, node: Node) -> Option<(SymbolKind, String)> {
        let lang = self.lang_tag;
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                let name = self.symbol_name_of(node).unwrap_or_else(|| "anonymous".into());
                self.emit_symbol(node, &name, SymbolKind::Function, true, None);
                Some((SymbolKind::Function, name))
            }
            "func_literal" => {
                let name = self.function_display_name(node);
                self.emit_symbol(node, &name, SymbolKind::Function, true, None);
                Some((SymbolKind::Function, name))
            }
            "function_definition" => {
                // Python, C/C++ and PHP share this kind.
                let (kind, name) = match lang {
                    "python" => {
                        let kind = if self.python_is_method(node) {
                            SymbolKind::Method
                        } else {
                            SymbolKind::Function
                        };
                        (kind, self.symbol_name_of(node))
                    }
                    "cpp" => self.c_function_kind_and_name(node),
                    _ => (SymbolKind::Function, self.symbol_name_of(node)),
                };
                let name = name.unwrap_or_else(|| "anonymous".into());
                self.emit_symbol(node, &name, kind, true, None);
                Some((kind, name))
            }
            // Bodiless trait items parse as signature items.
            "function_item" | "function_signature_item" => {
                let kind = if self.rust_is_method(node) {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                };
                let name = self.symbol_name_of(node).unwrap_or_else(|| "anonymous".into());
                self.emit_symbol(node, &name, kind, true, None);
                Some((kind, name))
            }
            "method_definition" | "method_declaration" => {
                let name = self.symbol_name_of(node).unwrap_or_else(|| "anonymous".into());
                self.emit_symbol(node, &name, SymbolKind::Method, true, None);
                Some((SymbolKind::Method, name))
            }
            "constructor_declaration" => {
                let name = self.symbol_name_of(node).unwrap_or_else(|| "constructor".into());
                self.emit_symbol(node, &name, SymbolKind::Constructor, true, None);
                Some((SymbolKind::Constructor, name))
            }

            "variable_declarator" if matches!(lang, "javascript" | "typescript") => {
                let name = self.symbol_name_of(node)?;
                let function_valued = node
                    .child_by_field_name("value")
                    .map(|value| {
                        matches!(
                            value.kind(),
                            "arrow_function" | "function_expression" | "generator_function"
                        )
                    })
                    .unwrap_or(false);
                if function_valued {
                    // Dual nature: one span, two symbols.
                    self.emit_symbol(node, &name, SymbolKind::Function, true, None);
                    self.emit_symbol(node, &name, SymbolKind::Variable, false, None);
                    Some((SymbolKind::Function, name))
                } else {
                    self.emit_symbol(node, &name, SymbolKind::Variable, false, None);
                    Some((SymbolKind::Variable, name))
                }
            }

            "class_declaration" | "class_definition" | "abstract_class_declaration" => {
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Class, true, None);
                Some((SymbolKind::Class, name))
            }
            "class_specifier" => {
                // C++ forward declarations have no body; skip them.
                node.child_by_field_name("body")?;
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Class, true, None);
                Some((SymbolKind::Class, name))
            }
            "interface_declaration" => {
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Interface, true, None);
                Some((SymbolKind::Interface, name))
            }

            "type_declaration" if lang == "go" => self.emit_go_type_declaration(node),
            "type_alias_declaration" | "type_item" => {
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Type, false, None);
                Some((SymbolKind::Type, name))
            }

            "struct_item" | "struct_declaration" => {
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Struct, true, None);
                Some((SymbolKind::Struct, name))
            }
            "struct_specifier" => {
                node.child_by_field_name("body")?;
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Struct, true, None);
                Some((SymbolKind::Struct, name))
            }
            "enum_declaration" | "enum_item" => {
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Enum, true, None);
                Some((SymbolKind::Enum, name))
            }
            "enum_specifier" => {
                node.child_by_field_name("body")?;
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Enum, true, None);
                Some((SymbolKind::Enum, name))
            }
            "trait_item" | "trait_declaration" => {
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Trait, true, None);
                Some((SymbolKind::Trait, name))
            }
            "impl_item" => {
                let name = node
                    .child_by_field_name("type")
                    .map(|t| self.node_text(t).to_string())?;
                self.emit_symbol(node, &name, SymbolKind::Impl, false, None);
                Some((SymbolKind::Impl, name))
            }

            "mod_item" => {
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Module, false, None);
                Some((SymbolKind::Module, name))
            }
            "internal_module" | "module" => {
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Namespace, false, None);
                Some((SymbolKind::Namespace, name))
            }
            "namespace_declaration" | "file_scoped_namespace_declaration"
            | "namespace_definition" => {
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Namespace, false, None);
                Some((SymbolKind::Namespace, name))
            }

            "short_var_declaration" => {
                self.emit_go_name_list(node, "left", SymbolKind::Variable);
                None
            }
            "var_declaration" if lang == "go" => {
                self.emit_go_spec_names(node, "var_spec", SymbolKind::Variable);
                None
            }
            "const_declaration" if lang == "go" => {
                self.emit_go_spec_names(node, "const_spec", SymbolKind::Constant);
                None
            }
            "variable_declaration" if lang == "zig" => self.emit_zig_declaration(node),

            "import_statement" => {
                let path = if lang == "python" {
                    self.node_text(node).to_string()
                } else {
                    node.child_by_field_name("source")
                        .map(|s| self.node_text(s).trim_matches(['"', '\'']).to_string())?
                };
                self.emit_import(node, path);
                None
            }
            "import_from_statement" => {
                let path = self.node_text(node).to_string();
                self.emit_import(node, path);
                None
            }
            "import_spec" => {
                let path = node
                    .child_by_field_name("path")
                    .map(|p| self.node_text(p).trim_matches('"').to_string())
                    .unwrap_or_else(|| self.node_text(node).trim_matches('"').to_string());
                self.emit_import(node, path);
                None
            }
            "using_directive" => {
                let path = node
                    .named_children(&mut node.walk())
                    .find(|c| matches!(c.kind(), "qualified_name" | "identifier"))
                    .map(|c| self.node_text(c).to_string())
                    .unwrap_or_else(|| {
                        self.node_text(node)
                            .trim_start_matches("using")
                            .trim_end_matches(';')
                            .trim()
                            .to_string()
                    });
                self.emit_import(node, path);
                None
            }
            "preproc_include" => {
                let path = node
                    .child_by_field_name("path")
                    .map(|p| self.node_text(p).trim_matches(['"', '<', '>']).to_string())?;
                self.emit_import(node, path);
                None
            }
            "import_declaration" if lang == "java" => {
                let path = self
                    .node_text(node)
                    .trim_start_matches("import")
                    .trim_end_matches(';')
                    .trim()
                    .to_string();
                self.emit_import(node, path);
                None
            }
            "use_declaration" if lang == "rust" => {
                let path = node
                    .child_by_field_name("argument")
                    .map(|a| self.node_text(a).to_string())
                    .unwrap_or_else(|| self.node_text(node).to_string());
                self.emit_import(node, path);
                None
            }
            "namespace_use_declaration" => {
                let path = self
                    .node_text(node)
                    .trim_start_matches("use")
                    .trim_end_matches(';')
                    .trim()
                    .to_string();
                self.emit_import(node, path);
                None
            }

            "property_definition" | "public_field_definition" | "property_declaration" => {
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Property, false, None);
                Some((SymbolKind::Property, name))
            }
            "field_declaration" => {
                self.emit_field_declaration(node);
                None
            }
            "record_declaration" => {
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Record, true, Some(SymbolKind::Class));
                Some((SymbolKind::Record, name))
            }
            "delegate_declaration" => {
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Delegate, false, None);
                Some((SymbolKind::Delegate, name))
            }
            "event_declaration" | "event_field_declaration" => {
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Event, false, None);
                Some((SymbolKind::Event, name))
            }
            "enum_member_declaration" => {
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::EnumMember, false, None);
                Some((SymbolKind::EnumMember, name))
            }
            "annotation_type_declaration" => {
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Annotation, false, None);
                Some((SymbolKind::Annotation, name))
            }
            "macro_definition" => {
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Macro, false, None);
                Some((SymbolKind::Macro, name))
            }

            "object_declaration" => {
                let name = self.symbol_name_of(node)?;
                self.emit_symbol(node, &name, SymbolKind::Object, true, None);
                Some((SymbolKind::Object, name))
            }
            "companion_object" => {
                self.emit_symbol(node, "companion", SymbolKind::Companion, true, None);
                Some((SymbolKind::Companion, "companion".to_string()))
            }

            _ => None,
        }
    }

    fn emit_symbol(
        &mut self,
        node: Node,
        name: &str,
        kind: SymbolKind,
        with_block: bool,
        block_kind: Option<SymbolKind>,
    ) {
        if let Some(name_node) = self.name_node_of(node) {
            self.mark_handled(name_node);
        }
        let attributes = self.detect_attributes(node);
        self.symbols.push(
            Symbol::new(name, kind, self.span_of(node)).with_attributes(attributes),
        );
        if with_block {
            self.blocks.push(BlockBoundary {
                start_row: node.start_position().row as u32,
                end_row: node.end_position().row as u32,
                kind: block_kind.unwrap_or(kind),
                name: name.into(),
            });
        }
    }

    fn emit_import(&mut self, node: Node, path: String) {
        self.imports.push(Import {
            path,
            line: node.start_position().row as u32 + 1,
        });
    }

    /// Go `type` declarations: one symbol per spec, kind by body shape.
    fn emit_go_type_declaration(&mut self, node: Node) -> Option<(SymbolKind, String)> {
        let mut primary = None;
        let mut cursor = node.walk();
        for spec in node.named_children(&mut cursor) {
            if spec.kind() != "type_spec" {
                continue;
            }
            let Some(name) = spec
                .child_by_field_name("name")
                .map(|n| self.node_text(n).to_string())
            else {
                continue;
            };
            let kind = match spec.child_by_field_name("type").map(|t| t.kind()) {
                Some("struct_type") => SymbolKind::Struct,
                Some("interface_type") => SymbolKind::Interface,
                _ => SymbolKind::Type,
            };
            self.emit_symbol(spec, &name, kind, true, None);
            if primary.is_none() {
                primary = Some((kind, name));
            }
        }
        primary
    }

    /// One symbol per identifier on the named side of a Go declaration.
    fn emit_go_name_list(&mut self, node: Node, field: &str, kind: SymbolKind) {
        let Some(list) = node.child_by_field_name(field) else {
            return;
        };
        let mut cursor = list.walk();
        for child in list.named_children(&mut cursor) {
            if child.kind() == "identifier" {
                let name = self.node_text(child).to_string();
                self.mark_handled(child);
                let attributes = self.detect_attributes(node);
                self.symbols.push(
                    Symbol::new(name.as_str(), kind, self.span_of(child))
                        .with_attributes(attributes),
                );
            }
        }
    }

    fn emit_go_spec_names(&mut self, node: Node, spec_kind: &str, kind: SymbolKind) {
        let mut cursor = node.walk();
        for spec in node.named_children(&mut cursor) {
            if spec.kind() != spec_kind {
                continue;
            }
            let mut names = spec.walk();
            for name_node in spec.children_by_field_name("name", &mut names) {
                let name = self.node_text(name_node).to_string();
                self.mark_handled(name_node);
                self.symbols
                    .push(Symbol::new(name.as_str(), kind, self.span_of(name_node)));
            }
        }
    }

    /// Zig `const Foo = struct { ... }` declares a type; anything else is a
    /// plain variable. Both grammar generations are recognized.
    fn emit_zig_declaration(&mut self, node: Node) -> Option<(SymbolKind, String)> {
        let name = self.symbol_name_of(node)?;
        let mut cursor = node.walk();
        let container = node.named_children(&mut cursor).find(|c| {
            let kind = c.kind();
            kind.contains("struct") || kind.contains("union") || kind.contains("container")
        });
        if container.is_some() {
            self.emit_symbol(node, &name, SymbolKind::Struct, true, None);
            Some((SymbolKind::Struct, name))
        } else {
            self.emit_symbol(node, &name, SymbolKind::Variable, false, None);
            Some((SymbolKind::Variable, name))
        }
    }

    /// Field declarations appear in Go, Rust, Java and C#; emit one field
    /// symbol per declared name. Go embedded fields have no name and are
    /// handled by the relationship pass instead.
    fn emit_field_declaration(&mut self, node: Node) {
        let mut emitted = false;
        if let Some(name_node) = node.child_by_field_name("name") {
            let name = self.node_text(name_node).to_string();
            self.mark_handled(name_node);
            self.symbols.push(Symbol::new(
                name.as_str(),
                SymbolKind::Field,
                self.span_of(node),
            ));
            emitted = true;
        }
        if !emitted {
            // Java/C# declare fields through nested variable declarators.
            let mut cursor = node.walk();
            let mut stack: Vec<Node> = node.named_children(&mut cursor).collect();
            while let Some(current) = stack.pop() {
                if current.kind() == "variable_declarator" {
                    if let Some(name_node) = current.child_by_field_name("name") {
                        let name = self.node_text(name_node).to_string();
                        self.mark_handled(name_node);
                        self.symbols.push(Symbol::new(
                            name.as_str(),
                            SymbolKind::Field,
                            self.span_of(current),
                        ));
                    }
                } else {
                    let mut inner = current.walk();
                    stack.extend(current.named_children(&mut inner));
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    fn scope_kind_for(
        &self,
        node: Node,
        emitted: Option<&(SymbolKind, String)>,
    ) -> Option<ScopeKind> {
        if let Some((kind, _)) = emitted {
            return match kind {
                SymbolKind::Function => Some(ScopeKind::Function),
                SymbolKind::Method | SymbolKind::Constructor => Some(ScopeKind::Method),
                SymbolKind::Class
                | SymbolKind::Struct
                | SymbolKind::Record
                | SymbolKind::Impl
                | SymbolKind::Object
                | SymbolKind::Companion => Some(ScopeKind::Class),
                SymbolKind::Interface | SymbolKind::Trait => Some(ScopeKind::Interface),
                _ => None,
            };
        }
        // Bare blocks; a function body belongs to the function scope.
        if matches!(node.kind(), "block" | "statement_block" | "compound_statement") {
            let body_of_function = node
                .parent()
                .is_some_and(|parent| is_function_kind(parent.kind()));
            if !body_of_function {
                return Some(ScopeKind::Block);
            }
        }
        None
    }

    fn push_scope(&mut self, node: Node, kind: ScopeKind, name: String) {
        let level = self.scope_stack.last().map(|f| f.level + 1).unwrap_or(0);
        let mut parts: Vec<&str> = self
            .scope_stack
            .iter()
            .filter(|f| f.level >= 1 && f.kind != ScopeKind::Block)
            .map(|f| f.name.as_str())
            .collect();
        if kind != ScopeKind::Block {
            parts.push(name.as_str());
        }
        let path = parts.join(".");

        self.scopes.push(ScopeInfo {
            kind,
            name: name.as_str().into(),
            path: path.as_str().into(),
            start_line: node.start_position().row as u32 + 1,
            end_line: node.end_position().row as u32 + 1,
            level,
            language: self.lang_tag.into(),
            attributes: self.detect_attributes(node),
        });
        self.scope_stack.push(ScopeFrame {
            level,
            kind,
            name,
            path,
        });
    }

    fn current_scope_path(&self) -> String {
        for frame in self.scope_stack.iter().rev() {
            if !frame.path.is_empty() {
                return frame.path.clone();
            }
        }
        self.scope_stack
            .first()
            .map(|f| f.name.clone())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    /// Store signature and doc comment keyed by the node's 0-based start.
    fn record_declaration(&mut self, node: Node) {
        let key = (
            node.start_position().row as u32,
            node.start_position().column as u32,
        );
        if self.declarations.contains_key(&key) {
            return;
        }

        let start = node.start_byte();
        let end = node
            .child_by_field_name("body")
            .map(|body| body.start_byte())
            .unwrap_or_else(|| {
                let text = self.node_text(node);
                start + text.find('\n').unwrap_or(text.len())
            });
        let signature = self
            .content
            .get(start..end)
            .unwrap_or("")
            .trim_end()
            .trim_end_matches('{')
            .trim_end()
            .to_string();

        let doc_comment = node
            .prev_sibling()
            .filter(|sibling| {
                matches!(sibling.kind(), "comment" | "line_comment" | "block_comment")
            })
            .map(|sibling| self.node_text(sibling).trim().to_string());

        self.declarations
            .insert(key, DeclarationInfo { signature, doc_comment });
    }

    // ------------------------------------------------------------------
    // Naming and attributes
    // ------------------------------------------------------------------

    fn name_node_of<'tree>(&self, node: Node<'tree>) -> Option<Node<'tree>> {
        if let Some(name) = node.child_by_field_name("name") {
            return Some(name);
        }
        // Seeded captures resolve names where the grammar has no field.
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if let Some(capture) = self.seeds.get(&child.id()) {
                if capture.ends_with(".name") {
                    return Some(child);
                }
            }
        }
        // C-style declarator chains.
        if let Some(declarator) = node.child_by_field_name("declarator") {
            return self.declarator_name_node(declarator);
        }
        let mut cursor = node.walk();
        node.named_children(&mut cursor).find(|child| {
            matches!(
                child.kind(),
                "identifier"
                    | "type_identifier"
                    | "field_identifier"
                    | "property_identifier"
                    | "name"
                    | "namespace_identifier"
            )
        })
    }

    fn declarator_name_node<'tree>(&self, node: Node<'tree>) -> Option<Node<'tree>> {
        match node.kind() {
            "identifier" | "field_identifier" | "type_identifier" => Some(node),
            _ => {
                let next = node
                    .child_by_field_name("declarator")
                    .or_else(|| node.named_child(0))?;
                self.declarator_name_node(next)
            }
        }
    }

    fn symbol_name_of(&self, node: Node) -> Option<String> {
        self.name_node_of(node)
            .map(|name| self.node_text(name).to_string())
            .filter(|name| !name.is_empty())
    }

    /// C/C++ function definitions: methods use a field declarator.
    fn c_function_kind_and_name(&self, node: Node) -> (SymbolKind, Option<String>) {
        if let Some(declarator) = node.child_by_field_name("declarator") {
            if let Some(name_node) = self.declarator_name_node(declarator) {
                let kind = if name_node.kind() == "field_identifier" {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                };
                return (kind, Some(self.node_text(name_node).to_string()));
            }
        }
        (SymbolKind::Function, None)
    }

    fn python_is_method(&self, node: Node) -> bool {
        node.parent()
            .filter(|parent| parent.kind() == "block")
            .and_then(|parent| parent.parent())
            .is_some_and(|grandparent| grandparent.kind() == "class_definition")
    }

    fn rust_is_method(&self, node: Node) -> bool {
        node.parent()
            .filter(|parent| parent.kind() == "declaration_list")
            .and_then(|parent| parent.parent())
            .is_some_and(|grandparent| matches!(grandparent.kind(), "impl_item" | "trait_item"))
    }

    /// Display name for perf and effect frames: declared name, assignment
    /// binding, or "anonymous".
    fn function_display_name(&self, node: Node) -> String {
        let anonymous_kind = matches!(
            node.kind(),
            "arrow_function" | "function_expression" | "generator_function" | "func_literal"
        );
        if !anonymous_kind {
            if let Some(name) = self.symbol_name_of(node) {
                return name;
            }
        }
        // Go wraps assignment operands in an expression list.
        let mut parent = node.parent();
        if parent.is_some_and(|p| p.kind() == "expression_list") {
            parent = parent.and_then(|p| p.parent());
        }
        if let Some(parent) = parent {
            if matches!(
                parent.kind(),
                "variable_declarator" | "assignment" | "assignment_expression"
                    | "assignment_statement" | "short_var_declaration" | "var_spec"
            ) {
                if let Some(name) = parent
                    .child_by_field_name("name")
                    .or_else(|| parent.child_by_field_name("left"))
                {
                    let text = self.node_text(name);
                    let first = text.split(',').next().unwrap_or(text).trim();
                    if !first.is_empty() {
                        return first.to_string();
                    }
                }
            }
        }
        "anonymous".to_string()
    }

    fn has_async_marker(&self, node: Node) -> bool {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "async" => return true,
                "function_modifiers" | "modifiers" => {
                    let mut inner = child.walk();
                    if child.children(&mut inner).any(|m| m.kind() == "async") {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }

    /// Go functions declaring a single named result type feed the
    /// `return &Concrete{}` interface-usage rule.
    fn go_declared_result(&self, node: Node) -> Option<String> {
        let result = node.child_by_field_name("result")?;
        match result.kind() {
            "type_identifier" | "qualified_type" => Some(self.node_text(result).to_string()),
            "parameter_list" => {
                let mut cursor = result.walk();
                let declarations: Vec<Node> = result
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() == "parameter_declaration")
                    .collect();
                if let [single] = declarations.as_slice() {
                    let type_node = single.child_by_field_name("type")?;
                    if matches!(type_node.kind(), "type_identifier" | "qualified_type") {
                        return Some(self.node_text(type_node).to_string());
                    }
                }
                None
            }
            _ => None,
        }
    }

    fn detect_attributes(&self, node: Node) -> Vec<ContextAttribute> {
        let mut attributes = Vec::new();
        let line = node.start_position().row as u32 + 1;
        let kind = node.kind();

        let mut push = |attrs: &mut Vec<ContextAttribute>, kind: AttributeKind, value: &str| {
            if !attrs
                .iter()
                .any(|existing: &ContextAttribute| existing.kind == kind)
            {
                attrs.push(ContextAttribute::new(kind, value, line));
            }
        };

        if kind.contains("generator") {
            push(&mut attributes, AttributeKind::Generator, "generator");
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "async" => push(&mut attributes, AttributeKind::Async, "async"),
                "static" => push(&mut attributes, AttributeKind::Static, "static"),
                "abstract" => push(&mut attributes, AttributeKind::Abstract, "abstract"),
                "final" => push(&mut attributes, AttributeKind::Final, "final"),
                "virtual" => push(&mut attributes, AttributeKind::Virtual, "virtual"),
                "const" => push(&mut attributes, AttributeKind::Const, "const"),
                "inline" => push(&mut attributes, AttributeKind::Inline, "inline"),
                "unsafe" => push(&mut attributes, AttributeKind::Unsafe, "unsafe"),
                "*" => push(&mut attributes, AttributeKind::Generator, "generator"),
                "modifiers" | "function_modifiers" => {
                    let mut inner = child.walk();
                    for modifier in child.children(&mut inner) {
                        match modifier.kind() {
                            "async" => push(&mut attributes, AttributeKind::Async, "async"),
                            "static" => push(&mut attributes, AttributeKind::Static, "static"),
                            "abstract" => {
                                push(&mut attributes, AttributeKind::Abstract, "abstract")
                            }
                            "final" => push(&mut attributes, AttributeKind::Final, "final"),
                            "virtual" => push(&mut attributes, AttributeKind::Virtual, "virtual"),
                            "const" => push(&mut attributes, AttributeKind::Const, "const"),
                            "unsafe" => push(&mut attributes, AttributeKind::Unsafe, "unsafe"),
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        // Decorators: wrapped (Python) or leading siblings (TypeScript).
        if let Some(parent) = node.parent() {
            if parent.kind() == "decorated_definition" {
                let mut inner = parent.walk();
                for decorator in parent.named_children(&mut inner) {
                    if decorator.kind() == "decorator" {
                        attributes.push(ContextAttribute::new(
                            AttributeKind::Decorator,
                            self.node_text(decorator).trim(),
                            decorator.start_position().row as u32 + 1,
                        ));
                    }
                }
            }
        }
        let mut sibling = node.prev_sibling();
        while let Some(prev) = sibling {
            if prev.kind() != "decorator" {
                break;
            }
            attributes.push(ContextAttribute::new(
                AttributeKind::Decorator,
                self.node_text(prev).trim(),
                prev.start_position().row as u32 + 1,
            ));
            sibling = prev.prev_sibling();
        }

        // Export wrappers.
        let exported = node
            .parent()
            .is_some_and(|p| p.kind() == "export_statement")
            || node
                .parent()
                .and_then(|p| p.parent())
                .is_some_and(|gp| gp.kind() == "export_statement");
        if exported {
            attributes.push(ContextAttribute::new(AttributeKind::Exported, "export", line));
        }

        // Directive prologue ("use server" and friends) in JS/TS bodies.
        if matches!(self.lang_tag, "javascript" | "typescript") && is_function_kind(kind) {
            if let Some(directive) = self.leading_directive(node) {
                attributes.push(directive);
            }
        }

        attributes
    }

    fn leading_directive(&self, node: Node) -> Option<ContextAttribute> {
        let body = node.child_by_field_name("body")?;
        if body.kind() != "statement_block" {
            return None;
        }
        let first = body.named_child(0)?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let string = first.named_child(0)?;
        if string.kind() != "string" {
            return None;
        }
        let text = self.node_text(string).trim_matches(['"', '\'']).to_string();
        if text.starts_with("use ") {
            return Some(ContextAttribute::new(
                AttributeKind::Directive,
                &text,
                string.start_position().row as u32 + 1,
            ));
        }
        None
    }

    // ------------------------------------------------------------------
    // Shared plumbing
    // ------------------------------------------------------------------

    pub(crate) fn node_text(&self, node: Node) -> &str {
        self.content.get(node.byte_range()).unwrap_or("")
    }

    pub(super) fn is_handled(&self, node: Node) -> bool {
        self.handled_nodes.contains(&node.id())
    }

    pub(super) fn mark_handled(&mut self, node: Node) {
        self.handled_nodes.insert(node.id());
    }

    pub(super) fn mark_handled_subtree(&mut self, node: Node) {
        self.mark_handled(node);
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.mark_handled_subtree(child);
        }
    }

    pub(super) fn push_reference(
        &mut self,
        node: Node,
        kind: RefKind,
        name: &str,
        strength: RefStrength,
        quality: Option<RefQuality>,
    ) {
        let referenced_name = name.rsplit('.').next().unwrap_or(name).trim();
        if referenced_name.is_empty() {
            return;
        }
        let line = node.start_position().row as u32 + 1;
        let column = node.start_position().column as u16 + 1;
        let context = self.context_snippet(line);
        let scope_context = self.current_scope_path();

        let id = self.next_ref_id;
        self.next_ref_id += 1;
        self.references.push(Reference {
            id,
            source_symbol: 0,
            target_symbol: 0,
            file_id: self.file_id,
            line,
            column,
            kind,
            context: context.into(),
            scope_context: scope_context.into(),
            strength,
            referenced_name: referenced_name.into(),
            quality,
        });
    }

    /// ±1 line snippet around a 1-based line, lazily splitting once.
    fn context_snippet(&mut self, line: u32) -> String {
        if !self.lines_ready {
            self.lines = split_lines_counted(&self.content);
            self.lines_ready = true;
        }
        if self.lines.is_empty() {
            return String::new();
        }
        let index = (line as usize).saturating_sub(1).min(self.lines.len() - 1);
        let start = index.saturating_sub(1);
        let end = (index + 1).min(self.lines.len() - 1);
        self.lines[start..=end].join("\n")
    }

    pub(crate) fn language(&self) -> Option<Language> {
        self.language
    }
}

impl Default for UnifiedExtractor {
    fn default() -> Self {
        Self::new()
    }
}

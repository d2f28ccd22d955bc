//! Core data model shared by every stage of the indexer.
//!
//! Everything the extractor emits is built from the types in this module:
//! spans, symbols, scopes, references, imports, and the evidence records
//! for performance and purity analysis.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroU32;

/// Opaque handle into the content store. Stable within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(NonZeroU32);

impl FileId {
    /// The lowest valid id; used as the initial state of pooled extractors.
    pub const FIRST: FileId = FileId(NonZeroU32::MIN);

    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }
}

/// Local symbol identifier assigned by the enhanced-symbol builder.
///
/// Ids start at 1; references use raw `u32` with 0 meaning "unresolved",
/// so the two representations convert losslessly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolId(NonZeroU32);

impl SymbolId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }
}

/// A 1-based (line, column) source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u16,
}

impl Position {
    pub fn new(line: u32, column: u16) -> Self {
        Self { line, column }
    }
}

/// A source span with 1-based line/column endpoints, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub start_column: u16,
    pub end_line: u32,
    pub end_column: u16,
}

impl Span {
    pub fn new(start_line: u32, start_column: u16, end_line: u32, end_column: u16) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    pub fn start(&self) -> Position {
        Position::new(self.start_line, self.start_column)
    }

    pub fn contains(&self, line: u32, column: u16) -> bool {
        if line < self.start_line || line > self.end_line {
            return false;
        }
        if line == self.start_line && column < self.start_column {
            return false;
        }
        if line == self.end_line && column > self.end_column {
            return false;
        }
        true
    }

    pub fn contains_line(&self, line: u32) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

/// Compact owned string used throughout the data model.
pub type CompactString = Box<str>;

pub fn compact_string(s: &str) -> CompactString {
    s.into()
}

/// Every declaration kind the extractor can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Interface,
    Struct,
    Trait,
    Impl,
    Enum,
    EnumMember,
    Type,
    TypeAlias,
    Variable,
    Constant,
    Property,
    Field,
    Event,
    Delegate,
    Namespace,
    Module,
    Record,
    Object,
    Companion,
    Constructor,
    Macro,
    Template,
    Annotation,
}

impl SymbolKind {
    /// Canonical lowercase name, matching the query capture vocabulary.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Struct => "struct",
            Self::Trait => "trait",
            Self::Impl => "impl",
            Self::Enum => "enum",
            Self::EnumMember => "enum_member",
            Self::Type => "type",
            Self::TypeAlias => "type_alias",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::Property => "property",
            Self::Field => "field",
            Self::Event => "event",
            Self::Delegate => "delegate",
            Self::Namespace => "namespace",
            Self::Module => "module",
            Self::Record => "record",
            Self::Object => "object",
            Self::Companion => "companion",
            Self::Constructor => "constructor",
            Self::Macro => "macro",
            Self::Template => "template",
            Self::Annotation => "annotation",
        }
    }

    /// True for the kinds that carry a cyclomatic complexity value.
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function | Self::Method)
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute kinds that alter how a declaration executes or is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Directive,
    Decorator,
    Async,
    Generator,
    Iterator,
    Unsafe,
    Static,
    Const,
    Inline,
    Virtual,
    Abstract,
    Final,
    Exported,
}

/// A context-altering attribute attached to a symbol or scope.
///
/// `value` carries the raw text for directives and decorators (for example
/// `"use server"` or `@staticmethod`); for flag-like attributes it repeats
/// the keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextAttribute {
    pub kind: AttributeKind,
    pub value: CompactString,
    pub line: u32,
}

impl ContextAttribute {
    pub fn new(kind: AttributeKind, value: &str, line: u32) -> Self {
        Self {
            kind,
            value: value.into(),
            line,
        }
    }
}

/// A declared named entity in source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: CompactString,
    pub kind: SymbolKind,
    pub span: Span,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<ContextAttribute>,
}

impl Symbol {
    pub fn new(name: impl Into<CompactString>, kind: SymbolKind, span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            span,
            attributes: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Vec<ContextAttribute>) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Coarse block record used by downstream tooling. Rows are 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBoundary {
    pub start_row: u32,
    pub end_row: u32,
    pub kind: SymbolKind,
    pub name: CompactString,
}

/// One import clause, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub path: String,
    pub line: u32,
}

/// Lexical scope kinds, from the folder wrapper down to plain blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Folder,
    File,
    Class,
    Function,
    Method,
    Interface,
    Block,
}

/// A lexical region contributing to qualified names.
///
/// Level −1 is the folder wrapper, 0 the file scope, and nested scopes
/// count up from 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeInfo {
    pub kind: ScopeKind,
    pub name: CompactString,
    /// Fully-qualified path joining all non-block parent names with `.`.
    pub path: CompactString,
    pub start_line: u32,
    pub end_line: u32,
    pub level: i32,
    pub language: CompactString,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<ContextAttribute>,
}

impl ScopeInfo {
    pub fn contains_line(&self, line: u32) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

/// Reference edge kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Call,
    Usage,
    Import,
    Extends,
    Implements,
}

impl RefKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Usage => "usage",
            Self::Import => "import",
            Self::Extends => "extends",
            Self::Implements => "implements",
        }
    }
}

/// How strongly a reference binds the use-site to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefStrength {
    Tight,
    Loose,
}

/// How a reference edge was inferred. Ordered for merge/deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefQuality {
    Precise,
    Assigned,
    Returned,
    Cast,
    Heuristic,
}

impl RefQuality {
    /// Numeric rank used when merging edges across passes.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Precise => 100,
            Self::Assigned => 95,
            Self::Returned => 90,
            Self::Cast => 85,
            Self::Heuristic => 50,
        }
    }
}

/// Rank of an optional quality tag; unset edges rank 0.
pub fn quality_rank(quality: Option<RefQuality>) -> u8 {
    quality.map(|q| q.rank()).unwrap_or(0)
}

/// An edge from a use-site to a (possibly unresolved) declaration.
///
/// `source_symbol` and `target_symbol` are 0 while unresolved; cross-file
/// linkage is a later stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: u32,
    pub source_symbol: u32,
    pub target_symbol: u32,
    pub file_id: FileId,
    pub line: u32,
    pub column: u16,
    pub kind: RefKind,
    /// ±1 line snippet around the use-site.
    pub context: CompactString,
    /// Qualified name of the innermost enclosing scope.
    pub scope_context: CompactString,
    pub strength: RefStrength,
    pub referenced_name: CompactString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<RefQuality>,
}

impl Reference {
    pub fn is_resolved(&self) -> bool {
        self.source_symbol != 0 && self.target_symbol != 0
    }
}

/// Aggregate reference statistics for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStats {
    pub incoming_count: u32,
    pub outgoing_count: u32,
    pub incoming_files: Vec<FileId>,
    pub outgoing_files: Vec<FileId>,
    /// Allocated only when at least one reference exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_type: Option<HashMap<RefKind, u32>>,
}

/// One loop construct open during traversal, 1-based depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopInfo {
    pub node_kind: CompactString,
    pub span: Span,
    pub depth: u32,
}

/// One await expression inside a function body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwaitInfo {
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_var: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub used_vars: Vec<String>,
}

/// One call site, with loop context at the moment of the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallInfo {
    pub target: String,
    pub line: u32,
    pub in_loop: bool,
    pub loop_depth: u32,
    pub loop_line: u32,
}

/// Performance-tracking evidence for one function, sealed on function exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionPerfData {
    pub name: CompactString,
    pub span: Span,
    pub is_async: bool,
    pub language: CompactString,
    pub loops: Vec<LoopInfo>,
    pub awaits: Vec<AwaitInfo>,
    pub calls: Vec<CallInfo>,
}

bitflags! {
    /// Side-effect categories observed inside a function body.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SideEffects: u16 {
        const PARAM_WRITE = 1 << 0;
        const GLOBAL_WRITE = 1 << 1;
        const IO = 1 << 2;
        const THROW = 1 << 3;
        const DYNAMIC_CALL = 1 << 4;
        const CHANNEL = 1 << 5;
        const DEFER = 1 << 6;
        const TRY_FINALLY = 1 << 7;
    }
}

impl Default for SideEffects {
    fn default() -> Self {
        Self::empty()
    }
}

/// Purity evidence for one function, keyed by `file:line`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideEffectInfo {
    pub function: CompactString,
    pub is_pure: bool,
    pub effects: SideEffects,
    pub confidence: f32,
}

impl SideEffectInfo {
    pub fn key(file_id: FileId, line: u32) -> String {
        format!("{}:{}", file_id.value(), line)
    }
}

/// Signature and doc comment captured at a declaration site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclarationInfo {
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_rejects_zero() {
        assert!(FileId::new(0).is_none());
        assert_eq!(FileId::new(7).unwrap().value(), 7);
    }

    #[test]
    fn test_span_contains() {
        let span = Span::new(10, 5, 15, 20);

        assert!(span.contains(12, 10));
        assert!(span.contains(10, 5));
        assert!(span.contains(15, 20));

        assert!(!span.contains(9, 10));
        assert!(!span.contains(16, 10));
        assert!(!span.contains(10, 4));
        assert!(!span.contains(15, 21));
    }

    #[test]
    fn test_symbol_builder() {
        let symbol = Symbol::new("process", SymbolKind::Function, Span::new(1, 1, 4, 2))
            .with_attributes(vec![ContextAttribute::new(AttributeKind::Async, "async", 1)]);

        assert_eq!(symbol.name.as_ref(), "process");
        assert!(symbol.kind.is_callable());
        assert_eq!(symbol.attributes.len(), 1);
    }

    #[test]
    fn test_quality_ranking() {
        assert_eq!(quality_rank(Some(RefQuality::Precise)), 100);
        assert_eq!(quality_rank(Some(RefQuality::Assigned)), 95);
        assert_eq!(quality_rank(Some(RefQuality::Returned)), 90);
        assert_eq!(quality_rank(Some(RefQuality::Cast)), 85);
        assert_eq!(quality_rank(Some(RefQuality::Heuristic)), 50);
        assert_eq!(quality_rank(None), 0);
    }

    #[test]
    fn test_side_effects_purity() {
        let mut effects = SideEffects::empty();
        assert!(effects.is_empty());

        effects |= SideEffects::IO | SideEffects::DEFER;
        assert!(effects.contains(SideEffects::IO));
        assert!(!effects.contains(SideEffects::THROW));
    }

    #[test]
    fn test_side_effect_key_format() {
        let file_id = FileId::new(3).unwrap();
        assert_eq!(SideEffectInfo::key(file_id, 42), "3:42");
    }

    #[test]
    fn test_reference_resolution_state() {
        let reference = Reference {
            id: 1,
            source_symbol: 0,
            target_symbol: 4,
            file_id: FileId::new(1).unwrap(),
            line: 10,
            column: 3,
            kind: RefKind::Call,
            context: "".into(),
            scope_context: "".into(),
            strength: RefStrength::Tight,
            referenced_name: "run".into(),
            quality: None,
        };
        assert!(!reference.is_resolved());
    }

    #[test]
    fn test_kind_serialization_names() {
        let json = serde_json::to_string(&SymbolKind::EnumMember).unwrap();
        assert_eq!(json, "\"enum_member\"");
        let json = serde_json::to_string(&RefKind::Implements).unwrap();
        assert_eq!(json, "\"implements\"");
    }
}

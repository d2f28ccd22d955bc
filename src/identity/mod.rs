//! Stable, parseable entity identifiers.
//!
//! Every exported record gets a textual id that is deterministic across
//! runs: `module:...`, `file:...`, `symbol:...` or `reference:...`.
//! The symbol and reference forms carry five colon-separated parts
//! (`head:ident:file:line:column`); module and file ids carry three.
//! Ids survive a build → parse round trip for all valid inputs.

use crate::types::{RefKind, SymbolKind};
use std::path::{Path, PathBuf};

/// Builds entity ids relative to one repository root.
#[derive(Debug, Clone)]
pub struct EntityIdGenerator {
    root: PathBuf,
}

impl EntityIdGenerator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `module:{sanitized_name}:{rel_path}`
    pub fn module_id(&self, name: &str, abs_path: &Path) -> String {
        format!("module:{}:{}", sanitize_name(name), self.rel_path(abs_path))
    }

    /// `file:{basename}:{rel_path}`
    pub fn file_id(&self, abs_path: &Path) -> String {
        format!("file:{}:{}", basename(abs_path), self.rel_path(abs_path))
    }

    /// `symbol:{norm_kind}_{sanitized_name}:{basename}:{line}:{col}`
    pub fn symbol_id(
        &self,
        kind: SymbolKind,
        name: &str,
        abs_path: &Path,
        line: u32,
        column: u16,
    ) -> String {
        format!(
            "symbol:{}_{}:{}:{}:{}",
            normalize_kind(kind),
            sanitize_name(name),
            basename(abs_path),
            line,
            column
        )
    }

    /// `reference:{ref_kind}_{symbol_id_string}:{basename}:{line}:{col}`
    pub fn reference_id(
        &self,
        ref_kind: RefKind,
        symbol_id: &str,
        abs_path: &Path,
        line: u32,
        column: u16,
    ) -> String {
        format!(
            "reference:{}_{}:{}:{}:{}",
            ref_kind.as_str(),
            symbol_id,
            basename(abs_path),
            line,
            column
        )
    }

    fn rel_path(&self, abs_path: &Path) -> String {
        let rel = abs_path.strip_prefix(&self.root).unwrap_or(abs_path);
        rel.to_string_lossy().replace('\\', "/")
    }
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Sanitize an identifier for embedding in an entity id.
///
/// Keeps letters, digits and underscores; maps spaces, `-` and `.` to
/// `_`; drops everything else. A leading digit gets an `_` prefix and an
/// empty result becomes `unnamed`. Idempotent.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() || c == '_' {
            out.push(c);
        } else if c == ' ' || c == '-' || c == '.' {
            out.push('_');
        }
    }
    if out.is_empty() {
        return "unnamed".to_string();
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Short kind tag used in symbol ids.
///
/// Tags never contain underscores so the id's kind/name boundary stays
/// unambiguous.
pub fn normalize_kind(kind: SymbolKind) -> &'static str {
    match kind {
        SymbolKind::Function => "func",
        SymbolKind::Variable => "var",
        SymbolKind::Constant => "const",
        SymbolKind::EnumMember => "enummember",
        SymbolKind::TypeAlias => "typealias",
        SymbolKind::Method => "method",
        SymbolKind::Class => "class",
        SymbolKind::Interface => "interface",
        SymbolKind::Struct => "struct",
        SymbolKind::Trait => "trait",
        SymbolKind::Impl => "impl",
        SymbolKind::Enum => "enum",
        SymbolKind::Type => "type",
        SymbolKind::Property => "property",
        SymbolKind::Field => "field",
        SymbolKind::Event => "event",
        SymbolKind::Delegate => "delegate",
        SymbolKind::Namespace => "namespace",
        SymbolKind::Module => "module",
        SymbolKind::Record => "record",
        SymbolKind::Object => "object",
        SymbolKind::Companion => "companion",
        SymbolKind::Constructor => "constructor",
        SymbolKind::Macro => "macro",
        SymbolKind::Template => "template",
        SymbolKind::Annotation => "annotation",
    }
}

/// A parsed entity id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityId {
    Module {
        name: String,
        path: String,
    },
    File {
        name: String,
        path: String,
    },
    Symbol {
        kind: String,
        name: String,
        file: String,
        line: u32,
        column: u16,
    },
    Reference {
        kind: String,
        ident: String,
        file: String,
        line: u32,
        column: u16,
    },
}

/// Parse an entity id back into its parts.
///
/// Five-part forms are split from the right (line and column are the last
/// two segments) so identifiers that themselves contain `:` still parse.
/// The kind/name boundary inside the ident is the first `_`.
pub fn parse(id: &str) -> Option<EntityId> {
    let (head, rest) = id.split_once(':')?;
    match head {
        "module" | "file" => {
            let (ident, path) = rest.split_once(':')?;
            if ident.is_empty() || path.is_empty() || path.contains(':') {
                return None;
            }
            Some(match head {
                "module" => EntityId::Module {
                    name: ident.to_string(),
                    path: path.to_string(),
                },
                _ => EntityId::File {
                    name: ident.to_string(),
                    path: path.to_string(),
                },
            })
        }
        "symbol" | "reference" => {
            let (rest, col) = rest.rsplit_once(':')?;
            let (rest, line) = rest.rsplit_once(':')?;
            let (ident, file) = rest.rsplit_once(':')?;
            let line: u32 = line.parse().ok()?;
            let column: u16 = col.parse().ok()?;
            let (kind, name) = ident.split_once('_')?;
            if kind.is_empty() || name.is_empty() || file.is_empty() {
                return None;
            }
            Some(if head == "symbol" {
                EntityId::Symbol {
                    kind: kind.to_string(),
                    name: name.to_string(),
                    file: file.to_string(),
                    line,
                    column,
                }
            } else {
                EntityId::Reference {
                    kind: kind.to_string(),
                    ident: name.to_string(),
                    file: file.to_string(),
                    line,
                    column,
                }
            })
        }
        _ => None,
    }
}

/// Whether an id is a well-formed 3-part or 5-part entity id.
pub fn is_valid(id: &str) -> bool {
    parse(id).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn generator() -> EntityIdGenerator {
        EntityIdGenerator::new("/repo")
    }

    #[test]
    fn test_symbol_id_round_trip() {
        let id = generator().symbol_id(
            SymbolKind::Function,
            "CalculateMetrics",
            Path::new("/repo/pkg/foo.go"),
            45,
            18,
        );
        assert_eq!(id, "symbol:func_CalculateMetrics:foo.go:45:18");

        match parse(&id).unwrap() {
            EntityId::Symbol {
                kind,
                name,
                file,
                line,
                column,
            } => {
                assert_eq!(kind, "func");
                assert_eq!(name, "CalculateMetrics");
                assert_eq!(file, "foo.go");
                assert_eq!(line, 45);
                assert_eq!(column, 18);
            }
            other => panic!("expected symbol id, got {other:?}"),
        }
    }

    #[test]
    fn test_module_and_file_ids() {
        let generator = generator();
        assert_eq!(
            generator.module_id("my pkg", Path::new("/repo/pkg/mod.rs")),
            "module:my_pkg:pkg/mod.rs"
        );
        assert_eq!(
            generator.file_id(Path::new("/repo/pkg/mod.rs")),
            "file:mod.rs:pkg/mod.rs"
        );
    }

    #[test]
    fn test_reference_id_embeds_symbol() {
        let generator = generator();
        let symbol = generator.symbol_id(
            SymbolKind::Function,
            "Handler",
            Path::new("/repo/a.go"),
            3,
            1,
        );
        let id = generator.reference_id(RefKind::Call, &symbol, Path::new("/repo/b.go"), 9, 5);
        assert!(id.starts_with("reference:call_symbol:func_Handler"));
        assert!(id.ends_with(":b.go:9:5"));
        assert!(is_valid(&id));
    }

    #[test]
    fn test_sanitize_rules() {
        assert_eq!(sanitize_name("foo-bar.baz qux"), "foo_bar_baz_qux");
        assert_eq!(sanitize_name("a<b>"), "ab");
        assert_eq!(sanitize_name("3rd"), "_3rd");
        assert_eq!(sanitize_name("<>"), "unnamed");
        assert_eq!(sanitize_name(""), "unnamed");
    }

    #[test]
    fn test_sanitize_idempotent() {
        let once = sanitize_name("3rd-party.mod name");
        assert_eq!(sanitize_name(&once), once);
    }

    #[test]
    fn test_is_valid_rejects_garbage() {
        assert!(!is_valid(""));
        assert!(!is_valid("symbol"));
        assert!(!is_valid("thing:func_X:foo.go:1:2"));
        assert!(!is_valid("symbol:funcX:foo.go:1:2"));
        assert!(!is_valid("symbol:func_X:foo.go:one:2"));
        assert!(is_valid("module:core:src/core.rs"));
        assert!(is_valid("file:core.rs:src/core.rs"));
    }

    #[test]
    fn test_path_outside_root_keeps_absolute() {
        let id = generator().file_id(Path::new("/elsewhere/x.py"));
        assert_eq!(id, "file:x.py:/elsewhere/x.py");
    }
}

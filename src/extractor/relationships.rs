//! Language-dispatched type-relationship edges.
//!
//! Extends and Implements references, with `referenced_name` naming the
//! base type or interface. Go additionally tags interface *usage* sites
//! (assignment, return, type assertion) with a quality marker so a later
//! resolution pass can rank competing edges.

use super::UnifiedExtractor;
use crate::types::{RefKind, RefQuality, RefStrength};
use tree_sitter::Node;

impl UnifiedExtractor {
    /// Emit type-relationship references for one node.
    pub(super) fn emit_relationships(&mut self, node: Node) {
        match self.lang_tag {
            "go" => self.go_relationships(node),
            "javascript" | "typescript" => self.js_relationships(node),
            "python" => self.python_relationships(node),
            "rust" => self.rust_relationships(node),
            "java" => self.java_relationships(node),
            "csharp" => self.csharp_relationships(node),
            "php" => self.php_relationships(node),
            _ => {}
        }
    }

    fn go_relationships(&mut self, node: Node) {
        match node.kind() {
            "type_declaration" => {
                for spec in node.named_children(&mut node.walk()) {
                    if spec.kind() != "type_spec" {
                        continue;
                    }
                    let Some(body) = spec.child_by_field_name("type") else {
                        continue;
                    };
                    match body.kind() {
                        "interface_type" => self.go_interface_embeds(body),
                        "struct_type" => self.go_struct_embeds(body),
                        _ => {}
                    }
                }
            }
            // var x Iface = &Concrete{}
            "var_spec" => {
                let declared = spec_declared_type(node);
                if let (Some(type_node), Some(value)) = (declared, node.child_by_field_name("value"))
                {
                    if contains_composite_literal(value) {
                        let name = self.node_text(type_node).to_string();
                        self.emit_edge(
                            type_node,
                            RefKind::Implements,
                            &name,
                            Some(RefQuality::Assigned),
                        );
                    }
                }
            }
            // return &Concrete{} in a function declared to return Iface
            "return_statement" => {
                let declared = self
                    .go_result_types
                    .last()
                    .and_then(|t| t.clone());
                if let Some(iface) = declared {
                    if contains_composite_literal(node) {
                        self.emit_edge(node, RefKind::Implements, &iface, Some(RefQuality::Returned));
                    }
                }
            }
            // x.(Iface)
            "type_assertion_expression" => {
                if let Some(asserted) = node.child_by_field_name("type") {
                    let name = self.node_text(asserted).to_string();
                    self.mark_handled_subtree(asserted);
                    self.emit_edge(asserted, RefKind::Implements, &name, Some(RefQuality::Cast));
                }
            }
            _ => {}
        }
    }

    /// Embedded interfaces inside an `interface_type` body.
    fn go_interface_embeds(&mut self, body: Node) {
        for child in body.named_children(&mut body.walk()) {
            match child.kind() {
                "type_identifier" | "qualified_type" => {
                    let name = self.node_text(child).to_string();
                    self.mark_handled_subtree(child);
                    self.emit_edge(child, RefKind::Extends, &name, None);
                }
                // Newer grammars wrap embedded types in a type_elem.
                "type_elem" => {
                    for embed in child.named_children(&mut child.walk()) {
                        if matches!(embed.kind(), "type_identifier" | "qualified_type") {
                            let name = self.node_text(embed).to_string();
                            self.mark_handled_subtree(embed);
                            self.emit_edge(embed, RefKind::Extends, &name, None);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Anonymous struct fields: a field declaration with a type but no name.
    fn go_struct_embeds(&mut self, body: Node) {
        let Some(fields) = body
            .named_children(&mut body.walk())
            .find(|c| c.kind() == "field_declaration_list")
        else {
            return;
        };
        for field in fields.named_children(&mut fields.walk()) {
            if field.kind() != "field_declaration" {
                continue;
            }
            if field.child_by_field_name("name").is_some() {
                continue;
            }
            if let Some(embedded) = field.child_by_field_name("type") {
                let name = self.node_text(embedded).trim_start_matches('*').to_string();
                self.mark_handled_subtree(embedded);
                self.emit_edge(embedded, RefKind::Extends, &name, None);
            }
        }
    }

    fn js_relationships(&mut self, node: Node) {
        match node.kind() {
            "class_declaration" | "abstract_class_declaration" => {
                let Some(heritage) = node
                    .children(&mut node.walk())
                    .find(|c| c.kind() == "class_heritage")
                else {
                    return;
                };
                let mut saw_clause = false;
                for clause in heritage.named_children(&mut heritage.walk()) {
                    match clause.kind() {
                        "extends_clause" => {
                            saw_clause = true;
                            self.emit_edges_for_type_names(clause, RefKind::Extends, None);
                        }
                        "implements_clause" => {
                            saw_clause = true;
                            self.emit_edges_for_type_names(clause, RefKind::Implements, None);
                        }
                        _ => {}
                    }
                }
                // Plain JavaScript: the heritage holds the base expression
                // directly, with no clause wrapper.
                if !saw_clause {
                    self.emit_edges_for_type_names(heritage, RefKind::Extends, None);
                }
            }
            "interface_declaration" => {
                if let Some(extends) = node
                    .children(&mut node.walk())
                    .find(|c| c.kind() == "extends_type_clause")
                {
                    self.emit_edges_for_type_names(extends, RefKind::Extends, None);
                }
            }
            _ => {}
        }
    }

    fn python_relationships(&mut self, node: Node) {
        if node.kind() != "class_definition" {
            return;
        }
        let Some(bases) = node.child_by_field_name("superclasses") else {
            return;
        };
        for base in bases.named_children(&mut bases.walk()) {
            match base.kind() {
                "identifier" | "attribute" => {
                    let name = trailing_segment(self.node_text(base)).to_string();
                    self.mark_handled_subtree(base);
                    self.emit_edge(base, RefKind::Extends, &name, None);
                }
                // keyword arguments (metaclass=...) are not bases
                _ => {}
            }
        }
    }

    fn rust_relationships(&mut self, node: Node) {
        if node.kind() != "impl_item" {
            return;
        }
        // `impl Trait for Type`; inherent impls carry no trait field and
        // produce no edge.
        let Some(trait_node) = node.child_by_field_name("trait") else {
            return;
        };
        let name = trailing_colon_segment(self.node_text(trait_node)).to_string();
        self.emit_edge(trait_node, RefKind::Implements, &name, None);
    }

    fn java_relationships(&mut self, node: Node) {
        match node.kind() {
            "class_declaration" => {
                if let Some(superclass) = node.child_by_field_name("superclass") {
                    self.emit_edges_for_type_names(superclass, RefKind::Extends, None);
                }
                if let Some(interfaces) = node.child_by_field_name("interfaces") {
                    self.emit_edges_for_type_names(interfaces, RefKind::Implements, None);
                }
            }
            "interface_declaration" => {
                if let Some(extends) = node
                    .children(&mut node.walk())
                    .find(|c| c.kind() == "extends_interfaces")
                {
                    self.emit_edges_for_type_names(extends, RefKind::Extends, None);
                }
            }
            _ => {}
        }
    }

    fn csharp_relationships(&mut self, node: Node) {
        let is_interface = node.kind() == "interface_declaration";
        if !matches!(
            node.kind(),
            "class_declaration" | "struct_declaration" | "record_declaration"
                | "interface_declaration"
        ) {
            return;
        }
        let Some(bases) = node
            .children(&mut node.walk())
            .find(|c| c.kind() == "base_list")
        else {
            return;
        };

        // Single-inheritance heuristic: the first base of a class or struct
        // is its superclass, the rest are interfaces. Interface bases are
        // all Extends. A later resolution pass corrects interface-first
        // lists, which is why the class edges carry the heuristic quality.
        let mut first = true;
        for base in bases.named_children(&mut bases.walk()) {
            let name = trailing_segment(self.node_text(base)).to_string();
            if name.is_empty() {
                continue;
            }
            self.mark_handled_subtree(base);
            let kind = if is_interface || first {
                RefKind::Extends
            } else {
                RefKind::Implements
            };
            let quality = if is_interface {
                None
            } else {
                Some(RefQuality::Heuristic)
            };
            self.emit_edge(base, kind, &name, quality);
            first = false;
        }
    }

    fn php_relationships(&mut self, node: Node) {
        match node.kind() {
            "class_declaration" | "interface_declaration" => {
                for clause in node.named_children(&mut node.walk()) {
                    match clause.kind() {
                        "base_clause" => {
                            self.emit_edges_for_type_names(clause, RefKind::Extends, None)
                        }
                        "class_interface_clause" => {
                            self.emit_edges_for_type_names(clause, RefKind::Implements, None)
                        }
                        _ => {}
                    }
                }
            }
            // Trait composition inside a class body.
            "use_declaration" => {
                let in_class_body = node
                    .parent()
                    .and_then(|p| p.parent())
                    .is_some_and(|grandparent| grandparent.kind() == "class_declaration");
                if in_class_body {
                    self.emit_edges_for_type_names(node, RefKind::Extends, None);
                }
            }
            _ => {}
        }
    }

    /// Emit one edge per type name found under `node`.
    fn emit_edges_for_type_names(
        &mut self,
        node: Node,
        kind: RefKind,
        quality: Option<RefQuality>,
    ) {
        let mut names = Vec::new();
        collect_type_name_nodes(node, &mut names);
        for name_node in names {
            let name = trailing_segment(self.node_text(name_node)).to_string();
            if name.is_empty() {
                continue;
            }
            self.mark_handled_subtree(name_node);
            self.emit_edge(name_node, kind, &name, quality);
        }
    }

    pub(super) fn emit_edge(
        &mut self,
        node: Node,
        kind: RefKind,
        name: &str,
        quality: Option<RefQuality>,
    ) {
        let bare = trailing_segment(trailing_colon_segment(name));
        self.push_reference(node, kind, bare, RefStrength::Tight, quality);
    }
}

/// Type-name leaves under a heritage clause, skipping keywords and
/// type-argument lists.
fn collect_type_name_nodes<'tree>(node: Node<'tree>, out: &mut Vec<Node<'tree>>) {
    match node.kind() {
        "identifier" | "type_identifier" | "name" | "qualified_name" | "scoped_identifier"
        | "scoped_type_identifier" | "member_expression" | "attribute" | "qualified_type" => {
            out.push(node);
        }
        "generic_type" | "generic_name" => {
            // `Base<T>`: the base name is the first named child.
            if let Some(base) = node.named_child(0) {
                collect_type_name_nodes(base, out);
            }
        }
        "type_arguments" | "type_parameters" | "argument_list" if !out.is_empty() => {
            // Type arguments of an already-collected base are not bases.
        }
        _ => {
            for child in node.named_children(&mut node.walk()) {
                collect_type_name_nodes(child, out);
            }
        }
    }
}

/// `pkg.Name` → `Name`.
fn trailing_segment(text: &str) -> &str {
    text.rsplit('.').next().unwrap_or(text).trim()
}

/// `path::Name` → `Name`.
fn trailing_colon_segment(text: &str) -> &str {
    text.rsplit("::").next().unwrap_or(text).trim()
}

/// The declared type of a Go var spec, when it is a plain named type.
fn spec_declared_type(node: Node) -> Option<Node> {
    let type_node = node.child_by_field_name("type")?;
    matches!(type_node.kind(), "type_identifier" | "qualified_type").then_some(type_node)
}

/// Whether a subtree constructs a value (`Concrete{}` or `&Concrete{}`).
fn contains_composite_literal(node: Node) -> bool {
    if node.kind() == "composite_literal" {
        return true;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if contains_composite_literal(child) {
            return true;
        }
    }
    false
}

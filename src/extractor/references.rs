//! Language-dispatched reference extraction.
//!
//! Calls and imports bind tight, identifier and member usages bind loose.
//! `referenced_name` always carries the bare symbol name (the trailing
//! segment when the target is qualified). Nodes absorbed by a parent
//! visitor (a callee, a member property, a declaration name) are marked
//! handled so the bare-identifier fallback does not double-count them.

use super::UnifiedExtractor;
use crate::types::{RefKind, RefStrength};
use tree_sitter::Node;

impl UnifiedExtractor {
    /// Emit reference records for one node, per the active language.
    pub(super) fn emit_references(&mut self, node: Node) {
        match self.lang_tag {
            "go" => self.go_references(node),
            "javascript" | "typescript" => self.js_references(node),
            "python" => self.python_references(node),
            _ => {}
        }
    }

    fn go_references(&mut self, node: Node) {
        match node.kind() {
            "call_expression" => {
                if let Some(function) = node.child_by_field_name("function") {
                    let target = self.node_text(function).to_string();
                    self.mark_handled_subtree(function);
                    self.push_reference(
                        function,
                        RefKind::Call,
                        &target,
                        RefStrength::Tight,
                        None,
                    );
                }
            }
            "selector_expression" => {
                if self.is_handled(node) {
                    return;
                }
                if let Some(field) = node.child_by_field_name("field") {
                    if !self.is_handled(field) {
                        let name = self.node_text(field).to_string();
                        self.mark_handled(field);
                        self.push_reference(field, RefKind::Usage, &name, RefStrength::Loose, None);
                    }
                }
            }
            "type_identifier" | "field_identifier" => {
                if !self.is_handled(node) {
                    let name = self.node_text(node).to_string();
                    self.mark_handled(node);
                    self.push_reference(node, RefKind::Usage, &name, RefStrength::Loose, None);
                }
            }
            _ => {}
        }
    }

    fn js_references(&mut self, node: Node) {
        match node.kind() {
            "call_expression" => {
                if let Some(function) = node.child_by_field_name("function") {
                    let target = self.node_text(function).to_string();
                    // Mark the callee only: the receiver of a member callee
                    // still counts as a plain usage.
                    self.mark_handled(function);
                    self.push_reference(
                        function,
                        RefKind::Call,
                        &target,
                        RefStrength::Tight,
                        None,
                    );
                }
            }
            "member_expression" => {
                if self.is_handled(node) {
                    return;
                }
                if let Some(property) = node.child_by_field_name("property") {
                    if !self.is_handled(property) {
                        let name = self.node_text(property).to_string();
                        self.mark_handled(property);
                        self.push_reference(
                            property,
                            RefKind::Usage,
                            &name,
                            RefStrength::Loose,
                            None,
                        );
                    }
                }
            }
            "import_statement" => {
                if let Some(source) = node.child_by_field_name("source") {
                    let path = self.node_text(source).trim_matches(['"', '\'']).to_string();
                    self.push_reference(source, RefKind::Import, &path, RefStrength::Tight, None);
                }
            }
            "identifier" => {
                if !self.is_handled(node) && !self.in_import {
                    let name = self.node_text(node).to_string();
                    self.push_reference(node, RefKind::Usage, &name, RefStrength::Loose, None);
                }
            }
            _ => {}
        }
    }

    fn python_references(&mut self, node: Node) {
        match node.kind() {
            "call" => {
                if let Some(function) = node.child_by_field_name("function") {
                    let target = self.node_text(function).to_string();
                    self.mark_handled(function);
                    // The attribute leaf of a method callee is part of the
                    // call edge, not a separate usage.
                    if function.kind() == "attribute" {
                        if let Some(attribute) = function.child_by_field_name("attribute") {
                            self.mark_handled(attribute);
                        }
                    }
                    self.push_reference(
                        function,
                        RefKind::Call,
                        &target,
                        RefStrength::Tight,
                        None,
                    );
                }
            }
            "attribute" => {
                if self.is_handled(node) {
                    return;
                }
                if let Some(attribute) = node.child_by_field_name("attribute") {
                    if !self.is_handled(attribute) {
                        let name = self.node_text(attribute).to_string();
                        self.mark_handled(attribute);
                        self.push_reference(
                            attribute,
                            RefKind::Usage,
                            &name,
                            RefStrength::Loose,
                            None,
                        );
                    }
                }
            }
            "identifier" => {
                if !self.is_handled(node) && !self.in_import {
                    let name = self.node_text(node).to_string();
                    self.push_reference(node, RefKind::Usage, &name, RefStrength::Loose, None);
                }
            }
            _ => {}
        }
    }
}

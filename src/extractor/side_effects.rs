//! Side-effect tracking (opt-in).
//!
//! While enabled, each open function carries a frame with its parameter
//! names, receiver, and locals. Writes, opaque calls, channel operations,
//! throws and cleanup constructs accumulate category bits; the frame is
//! sealed into a [`SideEffectInfo`] keyed `file:line` on function exit.
//! A function is pure iff its category set stays empty.

use super::UnifiedExtractor;
use crate::types::{SideEffectInfo, SideEffects};
use std::collections::HashSet;
use tree_sitter::Node;

/// Per-open-function side-effect state.
#[derive(Debug, Default)]
pub(super) struct EffectFrame {
    pub name: String,
    pub line: u32,
    pub params: Vec<String>,
    pub receiver: Option<String>,
    pub locals: HashSet<String>,
    pub effects: SideEffects,
    pub saw_opaque_call: bool,
}

/// Call targets treated as I/O regardless of receiver shape.
const IO_TARGETS: &[&str] = &[
    "print", "println", "eprintln", "eprint", "printf", "console.log", "console.error",
    "console.warn", "console.info", "fmt.Println", "fmt.Printf", "fmt.Print", "fmt.Fprintf",
    "os.WriteFile", "os.ReadFile", "open", "write", "read",
];

impl UnifiedExtractor {
    /// Open an effect frame for a function node, capturing parameters and
    /// receiver by language convention.
    pub(super) fn effects_enter_function(&mut self, node: Node, name: &str) {
        if !self.options.track_side_effects {
            return;
        }
        let mut frame = EffectFrame {
            name: name.to_string(),
            line: node.start_position().row as u32 + 1,
            ..EffectFrame::default()
        };

        if let Some(params) = node
            .child_by_field_name("parameters")
            .or_else(|| node.child_by_field_name("parameter_list"))
        {
            self.collect_param_names(params, &mut frame.params);
        }
        // Go methods declare an explicit receiver; Python passes self first.
        if let Some(receiver) = node.child_by_field_name("receiver") {
            let mut names = Vec::new();
            self.collect_param_names(receiver, &mut names);
            frame.receiver = names.into_iter().next();
        } else if self.lang_tag == "python" {
            if frame.params.first().map(String::as_str) == Some("self") {
                frame.receiver = Some(frame.params.remove(0));
            }
        }

        self.effect_stack.push(frame);
    }

    /// Seal the innermost effect frame on function exit.
    pub(super) fn effects_exit_function(&mut self) {
        if !self.options.track_side_effects {
            return;
        }
        if let Some(frame) = self.effect_stack.pop() {
            let confidence = if frame.saw_opaque_call { 0.6 } else { 0.9 };
            let key = format!("{}:{}", self.file_id.value(), frame.line);
            self.side_effects.insert(
                key,
                SideEffectInfo {
                    function: frame.name.into(),
                    is_pure: frame.effects.is_empty(),
                    effects: frame.effects,
                    confidence,
                },
            );
        }
    }

    /// Classify one node against the side-effect rules.
    pub(super) fn track_side_effects(&mut self, node: Node) {
        if !self.options.track_side_effects || self.effect_stack.is_empty() {
            return;
        }

        match node.kind() {
            // Local declarations extend the frame's local set.
            "variable_declarator" | "var_spec" | "const_spec" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let text = self.node_text(name).to_string();
                    if let Some(frame) = self.effect_stack.last_mut() {
                        frame.locals.insert(text);
                    }
                }
            }
            "short_var_declaration" => {
                if let Some(left) = node.child_by_field_name("left") {
                    let mut names = Vec::new();
                    self.collect_param_names(left, &mut names);
                    if let Some(frame) = self.effect_stack.last_mut() {
                        frame.locals.extend(names);
                    }
                }
            }

            "assignment" | "assignment_statement" | "assignment_expression"
            | "augmented_assignment" | "augmented_assignment_expression"
            | "compound_assignment_expr" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.classify_write(left);
                }
            }
            "update_expression" | "inc_statement" | "dec_statement" => {
                let target = node
                    .child_by_field_name("argument")
                    .or_else(|| node.named_child(0));
                if let Some(target) = target {
                    self.classify_write(target);
                }
            }

            "call_expression" | "call" | "method_invocation" | "invocation_expression"
            | "function_call_expression" | "member_call_expression" => {
                self.classify_call(node);
            }

            "defer_statement" => self.add_effect(SideEffects::DEFER),
            "send_statement" | "receive_expression" | "select_statement" => {
                self.add_effect(SideEffects::CHANNEL)
            }
            "unary_expression" => {
                // Go channel receive is the unary `<-ch`.
                if self.lang_tag == "go" && self.node_text(node).starts_with("<-") {
                    self.add_effect(SideEffects::CHANNEL);
                }
            }

            "throw_statement" | "throw_expression" | "raise_statement" => {
                self.add_effect(SideEffects::THROW)
            }

            "try_statement" => {
                let has_finalizer = node.child_by_field_name("finalizer").is_some()
                    || node
                        .children(&mut node.walk())
                        .any(|c| c.kind() == "finally_clause");
                if has_finalizer {
                    self.add_effect(SideEffects::TRY_FINALLY);
                }
            }

            _ => {}
        }
    }

    /// Classify an assignment target by its base identifier.
    fn classify_write(&mut self, target: Node) {
        let bare_identifier = matches!(target.kind(), "identifier" | "name");
        let base = self.base_identifier(target);
        let Some(base) = base else { return };
        let python = self.lang_tag == "python";

        let Some(frame) = self.effect_stack.last_mut() else {
            return;
        };
        if frame.receiver.as_deref() == Some(base.as_str()) || frame.params.contains(&base) {
            frame.effects |= SideEffects::PARAM_WRITE;
        } else if frame.locals.contains(&base) {
            // Local writes are invisible outside the function.
        } else if python && bare_identifier {
            // Python binds bare names locally on first assignment.
            frame.locals.insert(base);
        } else {
            frame.effects |= SideEffects::GLOBAL_WRITE;
        }
    }

    fn classify_call(&mut self, node: Node) {
        let function = node
            .child_by_field_name("function")
            .or_else(|| node.child_by_field_name("name"));
        let Some(function) = function else { return };

        let target = self.node_text(function).to_string();
        if target == "panic" {
            self.add_effect(SideEffects::THROW);
            return;
        }
        if IO_TARGETS.iter().any(|io| target == *io || target.starts_with(&format!("{io}."))) {
            self.add_effect(SideEffects::IO);
            return;
        }

        // A receiver that is itself a call result or parenthesized
        // expression cannot be classified; the call is dynamic.
        let opaque = match function.kind() {
            "call_expression" | "call" | "parenthesized_expression" => true,
            "member_expression" | "selector_expression" | "attribute" | "field_expression" => {
                function
                    .named_child(0)
                    .is_some_and(|receiver| {
                        matches!(
                            receiver.kind(),
                            "call_expression" | "call" | "parenthesized_expression"
                        )
                    })
            }
            _ => false,
        };
        if opaque {
            self.add_effect(SideEffects::DYNAMIC_CALL);
            if let Some(frame) = self.effect_stack.last_mut() {
                frame.saw_opaque_call = true;
            }
        }
    }

    /// The leftmost identifier of an lvalue chain (`a.b.c[0]` → `a`).
    fn base_identifier(&self, node: Node) -> Option<String> {
        match node.kind() {
            "identifier" | "field_identifier" | "property_identifier" | "name"
            | "variable_name" => Some(self.node_text(node).to_string()),
            _ => {
                let first = node.named_child(0)?;
                self.base_identifier(first)
            }
        }
    }

    fn add_effect(&mut self, effect: SideEffects) {
        if let Some(frame) = self.effect_stack.last_mut() {
            frame.effects |= effect;
        }
    }

    fn collect_param_names(&self, node: Node, out: &mut Vec<String>) {
        match node.kind() {
            "identifier" | "name" | "variable_name" => {
                let text = self.node_text(node).to_string();
                if !out.contains(&text) {
                    out.push(text);
                }
            }
            // Type positions inside parameters must not contribute names.
            "type" | "type_identifier" | "primitive_type" | "pointer_type" | "qualified_type"
            | "generic_type" | "predefined_type" | "type_annotation" | "package_identifier" => {}
            _ => {
                for child in node.children(&mut node.walk()) {
                    self.collect_param_names(child, out);
                }
            }
        }
    }
}

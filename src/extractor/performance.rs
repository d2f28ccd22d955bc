//! Performance-tracking visitor steps.
//!
//! Loops, awaits and calls are recorded against the function currently
//! open on the traversal stack; the frame is sealed into a
//! [`FunctionPerfData`] when the function exits. Trackers are inert while
//! no function is open (top-level code is not a perf subject).

use super::UnifiedExtractor;
use crate::types::{AwaitInfo, CallInfo, FunctionPerfData, LoopInfo, Span};
use tree_sitter::Node;

impl UnifiedExtractor {
    /// Open a perf frame for a function node.
    pub(super) fn perf_enter_function(&mut self, node: Node, name: &str, is_async: bool) {
        self.perf_stack.push(FunctionPerfData {
            name: name.into(),
            span: self.span_of(node),
            is_async,
            language: self.lang_tag.into(),
            loops: Vec::new(),
            awaits: Vec::new(),
            calls: Vec::new(),
        });
    }

    /// Seal the innermost perf frame on function exit.
    pub(super) fn perf_exit_function(&mut self) {
        if let Some(frame) = self.perf_stack.pop() {
            self.perf.push(frame);
        }
    }

    /// Push a loop onto the loop stack and record it in the open frame.
    pub(super) fn perf_enter_loop(&mut self, node: Node) {
        let info = LoopInfo {
            node_kind: node.kind().into(),
            span: self.span_of(node),
            depth: self.loop_stack.len() as u32 + 1,
        };
        if let Some(frame) = self.perf_stack.last_mut() {
            frame.loops.push(info.clone());
        }
        self.loop_stack.push(info);
    }

    pub(super) fn perf_exit_loop(&mut self) {
        self.loop_stack.pop();
    }

    /// Record an await expression: target call, assignment binding, and the
    /// variables feeding its arguments.
    pub(super) fn perf_record_await(&mut self, node: Node) {
        if self.perf_stack.is_empty() {
            return;
        }

        let call_target = self
            .find_child_of_kinds(node, &["call_expression", "call"])
            .and_then(|call| call.child_by_field_name("function"))
            .map(|f| self.node_text(f).to_string());

        let assigned_var = node.parent().and_then(|parent| match parent.kind() {
            "variable_declarator" | "assignment" | "assignment_expression" => parent
                .child_by_field_name("name")
                .or_else(|| parent.child_by_field_name("left"))
                .map(|n| self.node_text(n).to_string()),
            _ => None,
        });

        let mut used_vars = Vec::new();
        self.collect_identifiers(node, &mut used_vars);
        // The call target itself is not an input variable.
        if let Some(target) = &call_target {
            used_vars.retain(|v| v != target);
        }

        let info = AwaitInfo {
            line: node.start_position().row as u32 + 1,
            assigned_var,
            call_target,
            used_vars,
        };
        if let Some(frame) = self.perf_stack.last_mut() {
            frame.awaits.push(info);
        }
    }

    /// Record a call site with its loop context.
    pub(super) fn perf_record_call(&mut self, node: Node, target: &str) {
        if self.perf_stack.is_empty() {
            return;
        }
        let (loop_depth, loop_line) = match self.loop_stack.last() {
            Some(open) => (self.loop_stack.len() as u32, open.span.start_line),
            None => (0, 0),
        };
        let info = CallInfo {
            target: target.to_string(),
            line: node.start_position().row as u32 + 1,
            in_loop: !self.loop_stack.is_empty(),
            loop_depth,
            loop_line,
        };
        if let Some(frame) = self.perf_stack.last_mut() {
            frame.calls.push(info);
        }
    }

    pub(super) fn span_of(&self, node: Node) -> Span {
        Span::new(
            node.start_position().row as u32 + 1,
            node.start_position().column as u16 + 1,
            node.end_position().row as u32 + 1,
            node.end_position().column as u16 + 1,
        )
    }

    fn collect_identifiers(&self, node: Node, out: &mut Vec<String>) {
        if node.kind() == "identifier" {
            let text = self.node_text(node).to_string();
            if !out.contains(&text) {
                out.push(text);
            }
            return;
        }
        for child in node.children(&mut node.walk()) {
            self.collect_identifiers(child, out);
        }
    }

    fn find_child_of_kinds<'tree>(
        &self,
        node: Node<'tree>,
        kinds: &[&str],
    ) -> Option<Node<'tree>> {
        for child in node.children(&mut node.walk()) {
            if kinds.contains(&child.kind()) {
                return Some(child);
            }
        }
        None
    }
}

//! Enhanced symbol records.
//!
//! The builder joins raw extractor output into per-symbol records:
//! outgoing references, scope chain, aggregate stats, signature, doc
//! comment, exported flag and complexity. Incoming references stay empty
//! here; filling them needs cross-file resolution, which is a later
//! stage.

use crate::extractor::ExtractionResult;
use crate::parsing::Language;
use crate::types::{Reference, ReferenceStats, ScopeInfo, Symbol, SymbolId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A symbol joined with everything the extractor learned about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedSymbol {
    pub id: SymbolId,
    pub symbol: Symbol,
    pub incoming_refs: Vec<Reference>,
    pub outgoing_refs: Vec<Reference>,
    /// Containing scopes ordered by increasing level.
    pub scope_chain: Vec<ScopeInfo>,
    pub stats: ReferenceStats,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_comment: Option<String>,
    pub is_exported: bool,
    pub complexity: u32,
}

/// Join extractor output into enhanced symbol records.
pub fn build_enhanced_symbols(
    result: &ExtractionResult,
    language: Option<Language>,
) -> Vec<EnhancedSymbol> {
    let outgoing = index_outgoing_references(result);
    // Symbols sharing a line share one scope chain; cache by line.
    let mut chains_by_line: HashMap<u32, Vec<ScopeInfo>> = HashMap::new();

    result
        .symbols
        .iter()
        .enumerate()
        .map(|(index, symbol)| {
            let outgoing_refs = outgoing.get(&index).cloned().unwrap_or_default();
            let scope_chain = chains_by_line
                .entry(symbol.span.start_line)
                .or_insert_with(|| scope_chain_for_line(&result.scopes, symbol.span.start_line))
                .clone();
            let stats = build_stats(&outgoing_refs);

            let (signature, doc_comment) = result
                .declaration_at(symbol.span.start_line, symbol.span.start_column)
                .map(|decl| (decl.signature.clone(), decl.doc_comment.clone()))
                .unwrap_or_default();

            let complexity = if symbol.kind.is_callable() {
                result
                    .complexity_at(symbol.span.start_line, symbol.span.start_column)
                    .max(1)
            } else {
                0
            };

            EnhancedSymbol {
                id: SymbolId::new(index as u32 + 1).expect("symbol ids start at 1"),
                symbol: symbol.clone(),
                incoming_refs: Vec::new(),
                outgoing_refs,
                scope_chain,
                stats,
                signature,
                doc_comment,
                is_exported: is_exported(&symbol.name, language),
                complexity,
            }
        })
        .collect()
}

/// Group references under the innermost symbol whose span contains them.
fn index_outgoing_references(result: &ExtractionResult) -> HashMap<usize, Vec<Reference>> {
    let mut outgoing: HashMap<usize, Vec<Reference>> = HashMap::new();
    for reference in &result.references {
        let mut owner: Option<(usize, u32)> = None;
        for (index, symbol) in result.symbols.iter().enumerate() {
            if !symbol.span.contains(reference.line, reference.column) {
                continue;
            }
            let extent = symbol.span.end_line - symbol.span.start_line;
            let tighter = match owner {
                Some((_, best)) => extent < best,
                None => true,
            };
            if tighter {
                owner = Some((index, extent));
            }
        }
        if let Some((index, _)) = owner {
            outgoing.entry(index).or_default().push(reference.clone());
        }
    }
    outgoing
}

/// The scopes containing a line, ordered by increasing level.
fn scope_chain_for_line(scopes: &[ScopeInfo], line: u32) -> Vec<ScopeInfo> {
    let mut chain: Vec<ScopeInfo> = scopes
        .iter()
        .filter(|scope| scope.contains_line(line))
        .cloned()
        .collect();
    chain.sort_by_key(|scope| scope.level);
    chain
}

fn build_stats(outgoing: &[Reference]) -> ReferenceStats {
    let mut stats = ReferenceStats {
        outgoing_count: outgoing.len() as u32,
        ..ReferenceStats::default()
    };
    for reference in outgoing {
        if !stats.outgoing_files.contains(&reference.file_id) {
            stats.outgoing_files.push(reference.file_id);
        }
        // The histogram allocates only once a reference exists.
        let by_type = stats.by_type.get_or_insert_with(HashMap::new);
        *by_type.entry(reference.kind).or_insert(0) += 1;
    }
    stats
}

/// Export rule: Go capitalization wins; otherwise `_`/`#` prefixes hide a
/// symbol and everything else is visible.
fn is_exported(name: &str, language: Option<Language>) -> bool {
    if language == Some(Language::Go) {
        return name.chars().next().is_some_and(|c| c.is_uppercase());
    }
    !(name.starts_with('_') || name.starts_with('#'))
}

/// Position-keyed symbol lookup across an extraction. Dual-nature
/// symbols share a position, so each slot holds the symbol indices.
pub fn symbols_by_position(symbols: &[Symbol]) -> HashMap<(u32, u16), Vec<usize>> {
    let mut index: HashMap<(u32, u16), Vec<usize>> = HashMap::new();
    for (i, symbol) in symbols.iter().enumerate() {
        index
            .entry((symbol.span.start_line, symbol.span.start_column))
            .or_default()
            .push(i);
    }
    index
}

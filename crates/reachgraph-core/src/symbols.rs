//! Cross-file symbol table used by the two-pass extraction design (§9).
//!
//! Pass 1 populates `symbols` (symbol name → node id) and `aliases`
//! (re-exported/imported name → the canonical name it points at). Pass 2
//! walks bodies and resolves every reference through `resolve`, which
//! follows the alias chain before the final lookup — this is what routes
//! `import { foo } from './reexport'` back to the file that actually
//! declares `foo` (§4.2.1 "Re-exports", scenario S6) instead of creating a
//! second, alias-only node.

use dashmap::DashMap;

use crate::model::NodeId;

/// Read-after-construction once pass 2 begins (§5 "Shared resources"), so
/// a `DashMap` buys safe concurrent writes during pass 1 without needing a
/// second synchronization scheme for the read-only pass 2 phase.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: DashMap<String, NodeId>,
    aliases: DashMap<String, String>,
    file_symbols: DashMap<String, Vec<String>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Declare a symbol (pass 1). `qualified_name` is the full symbol key
    /// extractors look it up by, e.g. `src/a.ts:validate`.
    pub fn declare(&self, qualified_name: String, node_id: NodeId, file_path: &str) {
        self.symbols.insert(qualified_name.clone(), node_id);
        self.file_symbols
            .entry(file_path.to_string())
            .or_default()
            .push(qualified_name);
    }

    /// Record that `alias` refers to `canonical` (re-export / import binding).
    /// Both are symbol-table keys, not node ids — the chain is followed at
    /// resolution time so declaration order between the two calls does not
    /// matter.
    pub fn alias(&self, alias: String, canonical: String) {
        self.aliases.insert(alias, canonical);
    }

    /// Resolve a symbol name to a node id, following the alias chain to
    /// its canonical declaration first. Returns `None` for out-of-project
    /// symbols, which callers drop per §4.2's "silently dropped" rule.
    ///
    /// Alias chains are bounded to guard against a cyclic re-export
    /// declaration (`a` re-exports `b`, `b` re-exports `a`) looping forever.
    pub fn resolve(&self, name: &str) -> Option<NodeId> {
        let mut current = name.to_string();
        let mut hops = 0;
        loop {
            if let Some(id) = self.symbols.get(&current) {
                return Some(id.value().clone());
            }
            match self.aliases.get(&current) {
                Some(next) if hops < 64 => {
                    current = next.value().clone();
                    hops += 1;
                }
                _ => return None,
            }
        }
    }

    /// Direct lookup with no alias-chain following, for callers that
    /// already hold a canonical symbol name.
    pub fn lookup(&self, qualified_name: &str) -> Option<NodeId> {
        self.symbols.get(qualified_name).map(|r| r.value().clone())
    }

    pub fn symbols_in_file(&self, file_path: &str) -> Vec<NodeId> {
        self.file_symbols
            .get(file_path)
            .map(|r| {
                r.value()
                    .iter()
                    .filter_map(|name| self.symbols.get(name).map(|n| n.value().clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_direct_symbol() {
        let table = SymbolTable::new();
        table.declare("a.ts:validate".into(), NodeId::from("a.ts:validate"), "a.ts");
        assert_eq!(
            table.resolve("a.ts:validate"),
            Some(NodeId::from("a.ts:validate"))
        );
    }

    #[test]
    fn follows_reexport_chain_to_canonical_declaration() {
        let table = SymbolTable::new();
        table.declare("a.ts:validate".into(), NodeId::from("a.ts:validate"), "a.ts");
        table.alias("reexport.ts:validate".into(), "a.ts:validate".into());
        table.alias("c.ts:validate".into(), "reexport.ts:validate".into());

        assert_eq!(
            table.resolve("c.ts:validate"),
            Some(NodeId::from("a.ts:validate"))
        );
    }

    #[test]
    fn unknown_symbol_resolves_to_none() {
        let table = SymbolTable::new();
        assert_eq!(table.resolve("nowhere.ts:ghost"), None);
    }

    #[test]
    fn cyclic_alias_chain_terminates() {
        let table = SymbolTable::new();
        table.alias("a".into(), "b".into());
        table.alias("b".into(), "a".into());
        assert_eq!(table.resolve("a"), None);
    }
}

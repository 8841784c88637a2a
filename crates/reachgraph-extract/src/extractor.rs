//! The shared extractor contract (§4.2, two-pass design from §9).
//!
//! Grounded on the teacher's `LanguageExtractor` trait (single `extract`
//! method over one file) generalized to the whole-project, two-pass shape
//! the corpus's `LanguageResolver` trait models: declarations are
//! enumerated into a shared symbol table before any call site is
//! resolved, because cross-file references need the whole-program map
//! before pass 2 can run (§9 "Cross-module symbol resolution").

use reachgraph_core::{DiagnosticSink, Edge, Node, ResolvedConfig, SymbolTable};

/// Per-language extraction result (§4.2: "returns `{nodes, edges,
/// filesAnalyzed, diagnostics}`" — diagnostics flow through the shared
/// sink rather than a return value here).
pub struct ExtractionOutput {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub files_analyzed: usize,
}

/// One implementation per supported language (TypeScript, Go, Python).
/// The graph assembler holds a boxed variant, per §9 "Polymorphism for
/// extractors".
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    /// Pass 1: enumerate every function-like declaration across `files`
    /// and register it (and any alias it introduces) in `symbols`. No
    /// call-site resolution happens here.
    fn declare(&self, config: &ResolvedConfig, files: &[String], symbols: &SymbolTable, diagnostics: &DiagnosticSink);

    /// Pass 2: walk each file's body, resolving every call/reference
    /// through the now-complete `symbols` table, and return the final
    /// node and edge sets.
    async fn extract(
        &self,
        config: &ResolvedConfig,
        files: &[String],
        symbols: &SymbolTable,
        diagnostics: &DiagnosticSink,
    ) -> anyhow::Result<ExtractionOutput>;
}

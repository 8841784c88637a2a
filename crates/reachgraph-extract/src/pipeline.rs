//! Wires `discovery` + the per-language `Extractor`s + the core assembler
//! into the single entry point the CLI driver and the watcher both call
//! (§4.8's "sequences the components").

use std::time::Instant;

use reachgraph_core::{assemble, CodeGraph, DiagnosticSink, ExtractionResult, Language, ReachError, ResolvedConfig, SymbolTable};

use crate::extractor::Extractor;
use crate::parser_pool::create_parser_pool;
use crate::{discover_files, GoExtractor, PythonExtractor, TypescriptExtractor};

/// Runs one full analysis pass: discovers files, runs the configured
/// language's extractor over them, and assembles the artifact. Fails with
/// `FileDiscoveryEmpty` only as an empty-artifact path (non-fatal per
/// §4.1); all other failures propagate as `ReachError`.
pub async fn run_pipeline(config: &ResolvedConfig) -> Result<CodeGraph, ReachError> {
    let started = Instant::now();
    let diagnostics = DiagnosticSink::new();
    let symbols = SymbolTable::new();

    let files = discover_files(config).map_err(|e| ReachError::ConfigInvalid(e.to_string()))?;
    if files.is_empty() {
        diagnostics.push(reachgraph_core::Diagnostic::warning(
            "FileDiscoveryEmpty",
            "no files matched the configured include/exclude patterns",
        ));
    }

    let pool = create_parser_pool();
    let extractor: Box<dyn Extractor> = match config.language {
        Language::Typescript => Box::new(TypescriptExtractor::new(pool)),
        Language::Go => Box::new(GoExtractor::new(pool)),
        Language::Python => Box::new(PythonExtractor::new(pool)),
    };

    extractor.declare(config, &files, &symbols, &diagnostics);
    let output = extractor
        .extract(config, &files, &symbols, &diagnostics)
        .await
        .map_err(|e| ReachError::ExtractorParseError {
            file: config.project_root.clone(),
            message: e.to_string(),
        })?;

    let extraction = ExtractionResult {
        nodes: output.nodes,
        edges: output.edges,
        files_analyzed: output.files_analyzed,
    };

    let mut graph = assemble(extraction, config.clone(), &diagnostics)?;
    graph.metadata.analysis_time_ms = started.elapsed().as_millis() as u64;
    Ok(graph)
}

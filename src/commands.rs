//! CLI command implementations: builds a `ResolvedConfig` from flags (and
//! optionally a config file) and drives the `reachgraph-extract` pipeline,
//! either once (`analyze`) or continuously behind a watcher and transport
//! (`serve`).

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use reachgraph_core::{Language, ResolvedConfig};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Project root to analyze
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Language to analyze: typescript, go, or python
    #[arg(short, long)]
    language: String,

    /// Glob patterns to include (defaults to everything under the root)
    #[arg(long)]
    include: Vec<String>,

    /// Glob patterns to exclude
    #[arg(long)]
    exclude: Vec<String>,

    /// Path to a JSON `ResolvedConfig` document; CLI flags above are
    /// merged in, taking precedence over the file's include/exclude/output
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the CodeGraph artifact (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Project root to watch
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Language to analyze: typescript, go, or python
    #[arg(short, long)]
    language: String,

    /// Glob patterns to include
    #[arg(long)]
    include: Vec<String>,

    /// Glob patterns to exclude
    #[arg(long)]
    exclude: Vec<String>,

    /// Path to a JSON `ResolvedConfig` document
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "7890")]
    port: u16,
}

fn parse_language(s: &str) -> anyhow::Result<Language> {
    match s.to_ascii_lowercase().as_str() {
        "typescript" | "ts" => Ok(Language::Typescript),
        "go" => Ok(Language::Go),
        "python" | "py" => Ok(Language::Python),
        other => anyhow::bail!("unrecognized language '{other}': expected typescript, go, or python"),
    }
}

/// Resolves a `ResolvedConfig` from an optional base file plus CLI
/// overrides. The file (if given) supplies the full shape — entry points,
/// per-language sub-config — while the flags override include/exclude
/// when the caller passed any.
fn resolve_config(
    root: &PathBuf,
    language: &str,
    include: Vec<String>,
    exclude: Vec<String>,
    config_path: Option<&PathBuf>,
    output: Option<&PathBuf>,
) -> anyhow::Result<ResolvedConfig> {
    let language = parse_language(language)?;
    let project_root = root.canonicalize().unwrap_or_else(|_| root.clone()).to_string_lossy().to_string();

    let mut config = match config_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;
            serde_json::from_str::<ResolvedConfig>(&raw)
                .map_err(|e| anyhow::anyhow!("invalid config file {}: {e}", path.display()))?
        }
        None => ResolvedConfig::new(language, project_root.clone()),
    };

    config.language = language;
    config.project_root = project_root;
    if !include.is_empty() {
        config.include = include;
    }
    if !exclude.is_empty() {
        config.exclude = exclude;
    }
    if let Some(output) = output {
        config.output = Some(output.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Runs the pipeline once and writes the resulting artifact to
/// `--output` (or stdout), pretty-printed.
pub async fn analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let config = resolve_config(
        &args.root,
        &args.language,
        args.include,
        args.exclude,
        args.config.as_ref(),
        args.output.as_ref(),
    )?;

    tracing::info!("analyzing {} ({})", config.project_root, config.language);
    let graph = reachgraph_extract::run_pipeline(&config).await?;
    tracing::info!(
        "done: {} nodes, {} edges, {} dead functions",
        graph.nodes.len(),
        graph.edges.len(),
        graph.stats.dead_functions.count
    );

    let json = reachgraph_core::codec::encode(&graph)?;
    match &args.output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}

/// Starts the debounced watcher and the HTTP/WebSocket transport, running
/// the pipeline once immediately and again on every subsequent change.
pub async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = resolve_config(&args.root, &args.language, args.include, args.exclude, args.config.as_ref(), None)?;

    tracing::info!("serving {} on {}:{}", config.project_root, args.host, args.port);

    let (watcher, mut updates) = reachgraph_watch::WatcherService::new(config);
    let state = reachgraph_server::ServerState::new(None, watcher.sender());

    let forward_state = Arc::clone(&state);
    tokio::spawn(async move {
        while let Ok(message) = updates.recv().await {
            if let Ok(update) = serde_json::from_str::<serde_json::Value>(&message) {
                if let Some(graph) = update.get("graph") {
                    if let Ok(graph) = serde_json::from_value(graph.clone()) {
                        *forward_state.graph.write().await = Some(graph);
                    }
                }
            }
        }
    });

    let watcher_task = tokio::spawn(async move {
        if let Err(e) = watcher.run().await {
            tracing::error!("watcher stopped: {e}");
        }
    });

    reachgraph_server::router::serve(state, &args.host, args.port).await?;
    watcher_task.abort();
    Ok(())
}

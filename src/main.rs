//! reachgraph CLI entry point

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "reachgraph")]
#[command(about = "Static call-graph reachability analysis for TypeScript, Go, and Python", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a project once and write the resulting CodeGraph artifact
    Analyze(commands::AnalyzeArgs),
    /// Watch a project and serve live graph updates over HTTP/WebSocket
    Serve(commands::ServeArgs),
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("reachgraph={log_level}")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("reachgraph v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Analyze(args) => commands::analyze(args).await,
        Commands::Serve(args) => commands::serve(args).await,
        Commands::Version => {
            println!("reachgraph v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

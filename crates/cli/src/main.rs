use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use goon_code_chunker::{Chunk, ParseFailurePolicy};
use goon_graph::{AssemblyStrategy, ContextAssembler, ReferenceGraph};
use goon_indexer::{
    find_function, FindFunctionQuery, IndexStats, IndexerConfig, RepositoryIndexer,
};
use serde::Serialize;
use std::io;
use std::path::PathBuf;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    print_stdout(&text)
}

#[derive(Parser)]
#[command(name = "goon")]
#[command(about = "Decompose Go repositories into declarations and their references", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every chunk with its resolved references
    Chunks(IndexArgs),

    /// Print the reference graph
    Graph(IndexArgs),

    /// Print the run report only
    Stats(IndexArgs),

    /// Print a declaration together with the declarations it reaches
    Context(ContextArgs),

    /// Print the source of a function or method
    Find(FindArgs),
}

#[derive(Args)]
struct IndexArgs {
    /// Repository root (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Directory tasks run at once (overrides GOON_INDEX_CONCURRENCY)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Stop unit work after this many milliseconds (overrides GOON_INDEX_TIME_BUDGET_MS)
    #[arg(long)]
    time_budget_ms: Option<u64>,

    /// Apply .gitignore rules during discovery
    #[arg(long)]
    respect_gitignore: bool,

    /// Also index vendor/ and testdata/ directories
    #[arg(long)]
    include_vendor: bool,

    /// Skip a whole package when any of its files fails to parse
    #[arg(long)]
    strict_units: bool,
}

impl IndexArgs {
    fn config(&self) -> IndexerConfig {
        let mut config = IndexerConfig::from_env();
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(ms) = self.time_budget_ms {
            config.time_budget_ms = (ms > 0).then_some(ms);
        }
        if self.respect_gitignore {
            config.scan.respect_gitignore = true;
        }
        if self.include_vendor {
            config.scan.skip_dirs.clear();
        }
        if self.strict_units {
            config.chunker.parse_failure_policy = ParseFailurePolicy::SkipUnit;
        }
        config
    }

    fn indexer(&self) -> Result<RepositoryIndexer> {
        RepositoryIndexer::new(&self.path, self.config())
            .with_context(|| format!("Failed to open repository {}", self.path.display()))
    }
}

#[derive(Args)]
struct ContextArgs {
    #[command(flatten)]
    index: IndexArgs,

    /// Fully-qualified name, e.g. `rag.(Store).Save`
    #[arg(long)]
    fqn: String,

    /// Reference hops to follow
    #[arg(long, default_value_t = 1)]
    depth: usize,
}

#[derive(Args)]
struct FindArgs {
    /// Repository root (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Package clause name
    #[arg(long)]
    package: String,

    /// Function or method name
    #[arg(long)]
    name: String,
}

#[derive(Serialize)]
struct ChunksOutput {
    chunks: Vec<Chunk>,
    stats: IndexStats,
}

#[derive(Serialize)]
struct GraphOutput {
    graph: ReferenceGraph,
    stats: IndexStats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Chunks(args) => {
            let run = args.indexer()?.produce_chunks().await?;
            print_json(
                &ChunksOutput {
                    chunks: run.chunks,
                    stats: run.stats,
                },
                cli.pretty,
            )?;
        }
        Commands::Graph(args) => {
            let run = args.indexer()?.produce_graph().await?;
            print_json(
                &GraphOutput {
                    graph: run.graph,
                    stats: run.stats,
                },
                cli.pretty,
            )?;
        }
        Commands::Stats(args) => {
            let run = args.indexer()?.produce_graph().await?;
            print_json(&run.stats, cli.pretty)?;
        }
        Commands::Context(args) => {
            let run = args.index.indexer()?.produce_graph().await?;
            let assembler = ContextAssembler::new(&run.graph, &run.chunks);
            let context = assembler
                .assemble(&args.fqn, AssemblyStrategy::Custom(args.depth))
                .with_context(|| format!("No declaration named {}", args.fqn))?;
            print_json(&context, cli.pretty)?;
        }
        Commands::Find(args) => {
            let query = FindFunctionQuery {
                name: args.name,
                package: args.package,
            };
            let path = args.path;
            let found = tokio::task::spawn_blocking(move || find_function(&path, &query))
                .await
                .context("find task failed")??;
            print_json(&found, cli.pretty)?;
        }
    }

    Ok(())
}

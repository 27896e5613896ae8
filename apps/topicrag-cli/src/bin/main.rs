use std::env;
use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use topicrag_core::config::{Config, Settings};
use topicrag_core::{Error, ScoredItem, Segmenter};
use topicrag_embed::get_default_embedder;
use topicrag_llm::GenerationClient;
use topicrag_rag::{RagPipeline, RetrievalCoordinator};
use topicrag_vector::open_index;

#[derive(Parser)]
#[command(name = "topicrag", version, about = "Topic-partitioned retrieval-augmented generation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Segment, embed and index files (directories are walked recursively)
    Ingest {
        #[arg(short, long)]
        topic: String,
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List topics
    Topics,
    /// Ranked context from one topic
    Context {
        #[arg(short, long)]
        topic: String,
        query: String,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Ranked context across every topic
    Search {
        query: String,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Retrieve context and generate a grounded answer
    Ask {
        query: String,
        #[arg(short, long)]
        topic: Option<String>,
        /// Use these passages instead of retrieving
        #[arg(long = "context")]
        context: Vec<String>,
        #[arg(short, long)]
        limit: Option<usize>,
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            // caller mistakes (bad topic, unsupported file) get a distinct code
            if e.downcast_ref::<Error>().is_some_and(Error::is_client_error) {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    let settings = config.settings()?;
    info!(env = config.env_name(), "configuration loaded");

    match cli.command {
        Command::Topics => {
            let index = open_index(&settings.index, &env::current_dir()?).await?;
            let mut topics = index.list_partitions().await?;
            topics.sort();
            for topic in topics {
                let count = index.item_count(&topic).await?;
                println!("{topic}\t{count}");
            }
        }
        Command::Ingest { topic, paths } => {
            let rag = build(&settings).await?;
            ingest(rag.coordinator(), &topic, &paths).await?;
        }
        Command::Context { topic, query, limit } => {
            let rag = build(&settings).await?;
            let limit = limit.unwrap_or(settings.retrieval.default_limit);
            let context = rag.get_context(&query, Some(&topic), limit).await?;
            for (rank, text) in context.iter().enumerate() {
                println!("[{}] {}\n", rank + 1, text);
            }
        }
        Command::Search { query, limit } => {
            let rag = build(&settings).await?;
            let limit = limit.unwrap_or(settings.retrieval.default_limit);
            let hits = rag.coordinator().retrieve(&query, None, limit).await?;
            print_hits(&hits);
        }
        Command::Ask { query, topic, context, limit, model } => {
            let mut rag = build(&settings).await?;
            if let Some(model) = model {
                rag.generator_mut().set_model(model);
            }
            if context.is_empty() {
                let limit = limit.unwrap_or(settings.retrieval.default_limit);
                let response = rag.process_query(&query, topic.as_deref(), limit).await?;
                print_answer(&response.answer);
                println!("\n{} context chunk(s) used", response.count);
            } else {
                print_answer(&rag.generate_answer(&query, Some(context)).await?);
            }
        }
    }
    Ok(())
}

async fn build(settings: &Settings) -> anyhow::Result<RagPipeline> {
    let embedder = get_default_embedder(&settings.embedding)?;
    let index = open_index(&settings.index, &env::current_dir()?).await?;
    let segmenter = Segmenter::new(settings.segment.clone())?;
    let coordinator = RetrievalCoordinator::new(embedder, index, segmenter)
        .with_allowed_topics(settings.retrieval.allowed_topics.clone())
        .with_embed_batch_size(settings.embedding.batch_size);
    let generator = GenerationClient::from_settings(&settings.generation)?;
    Ok(RagPipeline::new(Arc::new(coordinator), generator, settings.retrieval.default_limit))
}

/// Files under `paths` paired with the name they are indexed under.
fn collect_files(paths: &[PathBuf]) -> anyhow::Result<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();
    for root in paths {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.with_context(|| format!("walking {}", root.display()))?;
            if entry.file_type().is_file() {
                let name = ingest_name(root, entry.path());
                files.push((entry.into_path(), name));
            }
        }
    }
    Ok(files)
}

/// Path of `path` from the walk root's parent, `/`-separated, so
/// `docs/a/README.md` and `docs/b/README.md` keep distinct chunk ids.
fn ingest_name(root: &Path, path: &Path) -> String {
    let base = root.parent().unwrap_or_else(|| Path::new(""));
    let relative = path.strip_prefix(base).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();
    if parts.is_empty() { path.display().to_string() } else { parts.join("/") }
}

async fn ingest(rag: &RetrievalCoordinator, topic: &str, paths: &[PathBuf]) -> anyhow::Result<()> {
    rag.check_topic(topic)?;
    let files = collect_files(paths)?;
    let pb = ProgressBar::new(files.len() as u64);
    let template = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}";
    pb.set_style(ProgressStyle::with_template(template)?.progress_chars("#>-"));

    let mut total = 0usize;
    for (path, filename) in &files {
        pb.set_message(filename.clone());
        let content = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        match rag.ingest_file(&content, filename, topic).await {
            Ok(report) => {
                total += report.chunk_count;
                pb.println(format!("{}: {} chunks", report.filename, report.chunk_count));
            }
            Err(Error::UnsupportedFormat(_)) => pb.println(format!("{filename}: unsupported type")),
            Err(e) => {
                pb.abandon();
                return Err(e.into());
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");
    println!("Ingested {} file(s), {} chunk(s) into '{}'", files.len(), total, topic);
    Ok(())
}

fn print_hits(hits: &[ScoredItem]) {
    if hits.is_empty() {
        println!("No relevant context found.");
    }
    for (rank, hit) in hits.iter().enumerate() {
        println!("[{}] {:.3} {} ({})\n{}\n", rank + 1, hit.score, hit.partition, hit.id, hit.text);
    }
}

fn print_answer(answer: &Result<String, topicrag_llm::GenerationError>) {
    match answer {
        Ok(text) => println!("{text}"),
        Err(e) => println!("Error: {e}"),
    }
}

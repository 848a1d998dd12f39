use crate::app::App;
use crate::config::AppConfig;
use crate::output::{self, IndexStats, OutputFormat};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use hidaya_corpus::{CorpusData, RecordId};
use hidaya_pg_store::PgStore;
use hidaya_retrieval::{SearchStrategy, SemanticIndex};
use hidaya_vector_store::{IndexKind, PrebuiltIndex};
use owo_colors::OwoColorize;
use std::path::PathBuf;

/// Search a verse corpus by exact, fuzzy, lexical and semantic match.
#[derive(Debug, Parser)]
#[command(name = "hidaya", version, about)]
pub struct Cli {
    /// Config file (defaults to ./hidaya.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search the corpus
    Search(SearchArgs),

    /// Embed record texts and store the vectors
    Embed(EmbedArgs),

    /// Answer a question with cited passages
    Ask(AskArgs),

    /// Build or inspect prebuilt similarity indexes
    #[command(subcommand)]
    Index(IndexCommand),

    /// Show a chapter (`2`) or a verse (`2:255`)
    Show(ShowArgs),

    /// Load a JSON corpus into PostgreSQL
    Ingest(IngestArgs),
}

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Search query
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Language of the searched text
    #[arg(short, long, default_value = "en")]
    pub language: String,

    /// exact, fuzzy, lexical, semantic, hybrid or auto
    #[arg(short, long, default_value = "auto")]
    pub strategy: SearchStrategy,

    /// Number of results to return
    #[arg(short = 'n', long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Debug, Parser)]
pub struct EmbedArgs {
    /// Language of the texts to embed
    #[arg(short, long, default_value = "en")]
    pub language: String,

    /// Only these record ids (comma separated); all records by default
    #[arg(long, value_delimiter = ',')]
    pub ids: Option<Vec<RecordId>>,
}

#[derive(Debug, Parser)]
pub struct AskArgs {
    #[arg(value_name = "QUESTION")]
    pub question: String,

    #[arg(short, long, default_value = "en")]
    pub language: String,

    /// Number of passages to cite
    #[arg(short = 'n', long, default_value_t = 5)]
    pub limit: usize,
}

#[derive(Debug, Subcommand)]
pub enum IndexCommand {
    /// Build a prebuilt index from stored vectors and save it
    Build(IndexBuildArgs),

    /// Show embedding and index statistics
    Stats(IndexStatsArgs),
}

#[derive(Debug, Parser)]
pub struct IndexBuildArgs {
    #[arg(short, long, default_value = "en")]
    pub language: String,

    /// Use an IVF index instead of the configured kind
    #[arg(long)]
    pub ivf: bool,

    /// IVF lists (defaults to the configured `ivf_lists`)
    #[arg(long)]
    pub lists: Option<usize>,

    /// IVF lists probed per query (defaults to the configured `ivf_probes`)
    #[arg(long)]
    pub probes: Option<usize>,
}

#[derive(Debug, Parser)]
pub struct IndexStatsArgs {
    #[arg(short, long, default_value = "en")]
    pub language: String,
}

#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// `parent` or `parent:sequence`
    #[arg(value_name = "REFERENCE")]
    pub reference: String,

    /// Only show translations in this language
    #[arg(short, long)]
    pub language: Option<String>,
}

#[derive(Debug, Parser)]
pub struct IngestArgs {
    /// Corpus JSON file (defaults to the configured `corpus_path`)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = AppConfig::load(self.config.as_deref())?;
        let format = if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        };

        if let Command::Ingest(args) = self.command {
            return run_ingest(config, args).await;
        }

        let app = App::open(config).await?;
        match self.command {
            Command::Search(args) => run_search(&app, args, format).await,
            Command::Embed(args) => run_embed(&app, args, format).await,
            Command::Ask(args) => run_ask(&app, args, format).await,
            Command::Index(IndexCommand::Build(args)) => run_index_build(&app, args, format).await,
            Command::Index(IndexCommand::Stats(args)) => run_index_stats(&app, args, format).await,
            Command::Show(args) => run_show(&app, args, format).await,
            // Handled before the stores are opened.
            Command::Ingest(_) => Ok(()),
        }
    }
}

async fn run_search(app: &App, args: SearchArgs, format: OutputFormat) -> Result<()> {
    let engine = app.engine_for(&args.query, args.strategy).await?;
    let response = engine
        .search(&args.query, &args.language, args.strategy, args.limit)
        .await
        .context("Search failed")?;
    match format {
        OutputFormat::Json => println!("{}", output::json(&response)?),
        OutputFormat::Text => println!("{}", output::search(&response, &args.language)),
    }
    Ok(())
}

async fn run_embed(app: &App, args: EmbedArgs, format: OutputFormat) -> Result<()> {
    let engine = app.engine().await?;
    let model = app
        .embedder()
        .await?
        .map(|embedder| embedder.identifier().to_string())
        .unwrap_or_else(|| "no backend".to_string());
    let report = engine
        .embed_and_store(args.ids.as_deref(), &args.language)
        .await
        .context("Embedding failed")?;
    match format {
        OutputFormat::Json => println!("{}", output::json(&report)?),
        OutputFormat::Text => println!(
            "{}",
            output::embed_report(&report, &model, &args.language)
        ),
    }
    Ok(())
}

async fn run_ask(app: &App, args: AskArgs, format: OutputFormat) -> Result<()> {
    let answers = app.answers().await?;
    let answer = answers
        .answer(&args.question, &args.language, args.limit)
        .await
        .context("Question answering failed")?;
    match format {
        OutputFormat::Json => println!("{}", output::json(&answer)?),
        OutputFormat::Text => print!("{}", output::answer(&answer)),
    }
    Ok(())
}

async fn run_index_build(app: &App, args: IndexBuildArgs, format: OutputFormat) -> Result<()> {
    let Some(embedder) = app.embedder().await? else {
        bail!("No embedding backend is active; there is nothing to index");
    };
    let retrieval = &app.config().retrieval;
    let lists = args.lists.unwrap_or(retrieval.ivf_lists);
    let probes = args.probes.unwrap_or(retrieval.ivf_probes);
    let kind = if args.ivf || args.lists.is_some() {
        IndexKind::Ivf { lists, probes }
    } else {
        retrieval.index_kind().unwrap_or_default()
    };

    let model = embedder.identifier();
    let language = args.language.trim().to_ascii_lowercase();
    let vectors = app
        .vectors()
        .vectors(model, &language)
        .await
        .context("Failed to read stored vectors")?;
    if vectors.is_empty() {
        bail!("No {language} vectors stored for {model}. Run 'hidaya embed' first.");
    }

    let index = PrebuiltIndex::build(model, &language, embedder.dimension(), &vectors, kind)
        .context("Failed to build index")?;
    let path = app.index_path(model, &language);
    index.save(&path).await.context("Failed to save index")?;

    if let Some(pg) = app.postgres() {
        pg.create_vector_index(embedder.dimension(), lists)
            .await
            .context("Failed to create database vector index")?;
    }

    match format {
        OutputFormat::Json => println!(
            "{}",
            output::json(&serde_json::json!({
                "model": model,
                "language": language,
                "vectors": index.len(),
                "kind": index.kind(),
                "path": path,
            }))?
        ),
        OutputFormat::Text => println!(
            "{} Built {:?} index over {} vectors for {model}/{language} at {}",
            "✓".bright_green(),
            index.kind(),
            index.len().bright_cyan(),
            path.display()
        ),
    }
    Ok(())
}

async fn run_index_stats(app: &App, args: IndexStatsArgs, format: OutputFormat) -> Result<()> {
    let language = args.language.trim().to_ascii_lowercase();
    let total_vectors = app.vectors().count(None, None).await?;
    let embedder = app.embedder().await?;

    let (model, model_vectors, saved_index) = match &embedder {
        Some(embedder) => {
            let model = embedder.identifier();
            let count = app.vectors().count(Some(model), Some(&language)).await?;
            let path = app.index_path(model, &language);
            let saved = path.exists().then(|| path.display().to_string());
            (Some(model.to_string()), count, saved)
        }
        None => (None, 0, None),
    };
    let semantic_index = match app.config().retrieval.semantic_index {
        SemanticIndex::Relational => "relational",
        SemanticIndex::Flat => "flat",
        SemanticIndex::Ivf => "ivf",
    };

    let stats = IndexStats {
        total_vectors,
        model,
        language,
        model_vectors,
        saved_index,
        semantic_index: semantic_index.to_string(),
    };
    match format {
        OutputFormat::Json => println!("{}", output::json(&stats)?),
        OutputFormat::Text => print!("{}", output::index_stats(&stats)),
    }
    Ok(())
}

async fn run_show(app: &App, args: ShowArgs, format: OutputFormat) -> Result<()> {
    let language = args.language.as_deref();
    match parse_reference(&args.reference)? {
        (parent, Some(sequence)) => {
            let Some(view) = app.store().record_by_reference(parent, sequence).await? else {
                bail!("No record at {parent}:{sequence}");
            };
            match format {
                OutputFormat::Json => println!("{}", output::json(&view)?),
                OutputFormat::Text => print!("{}", output::record(&view, language)),
            }
        }
        (number, None) => {
            let Some((parent, views)) = app.store().parent(number).await? else {
                bail!("No parent group {number}");
            };
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    output::json(&serde_json::json!({
                        "parent": parent,
                        "records": views,
                    }))?
                ),
                OutputFormat::Text => print!("{}", output::parent(&parent, &views, language)),
            }
        }
    }
    Ok(())
}

async fn run_ingest(config: AppConfig, args: IngestArgs) -> Result<()> {
    let Some(url) = &config.database_url else {
        bail!("Ingestion needs a database; set DATABASE_URL or database_url in the config");
    };
    let path = args.path.unwrap_or_else(|| config.corpus_path.clone());
    let content = tokio::fs::read(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let data: CorpusData = serde_json::from_slice(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let (records, translations) = (data.records.len(), data.translations.len());

    let mut store = PgStore::connect(url).await?;
    store.init_schema().await?;
    store.ingest(data).await.context("Ingestion failed")?;

    println!(
        "{} Ingested {} records and {} translations from {}",
        "✓".bright_green(),
        records.bright_cyan(),
        translations.bright_cyan(),
        path.display()
    );
    Ok(())
}

/// `"2"` or `"2:255"`
fn parse_reference(reference: &str) -> Result<(u32, Option<u32>)> {
    let invalid =
        || format!("Invalid reference `{reference}`, expected `parent` or `parent:sequence`");
    match reference.trim().split_once(':') {
        Some((parent, sequence)) => Ok((
            parent.trim().parse().with_context(invalid)?,
            Some(sequence.trim().parse().with_context(invalid)?),
        )),
        None => Ok((reference.trim().parse().with_context(invalid)?, None)),
    }
}

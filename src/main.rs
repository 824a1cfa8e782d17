use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use synapse_core::config::{Config, ProviderKind};
use synapse_core::pipeline::builtin::{LlmGenerator, LlmGrader};
use synapse_core::pipeline::{
    CascadePolicy, IndexUnavailable, Orchestrator, Outcome, PipelineConfig, PipelineError,
};
use synapse_core::profiler::SuggestionProfiler;
use synapse_index::chunker::ChunkerConfig;
use synapse_index::indexer::{Indexer, IndexerConfig, ProjectPaths};
use synapse_index::repo;
use synapse_index::retriever::VectorRetriever;
use synapse_index::store::{self, FragmentStore};
use synapse_llm::any::AnyProvider;
use synapse_llm::ollama::OllamaProvider;
use synapse_llm::openai::OpenAiProvider;

/// Ask questions about a git repository.
#[derive(Parser, Debug)]
#[command(name = "synapse", version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SYNAPSE_CONFIG_PATH", default_value = "config/default.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Clone a repository and index it
    Ingest {
        /// HTTPS or SSH git URL
        url: String,
        /// Re-clone and re-index even if the project is already ingested
        #[arg(long)]
        force: bool,
    },
    /// List ingested projects
    Projects,
    /// Suggest starter questions for a project
    Suggest { project: String },
    /// Answer a question about a project
    Ask {
        project: String,
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_subscriber();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    config.validate()?;

    match cli.command {
        Commands::Ingest { url, force } => ingest(&config, &url, force).await,
        Commands::Projects => {
            for project in repo::list_projects(&config.index.data_root)? {
                println!("{project}");
            }
            Ok(())
        }
        Commands::Suggest { project } => {
            let provider = create_generator(&config, config.profiler.temperature)?;
            let profiler = SuggestionProfiler::new(
                Arc::new(provider),
                project_paths(&config),
                config.profiler.clone(),
            );
            for question in profiler.suggestions(&project).await {
                println!("{question}");
            }
            Ok(())
        }
        Commands::Ask { project, question } => ask(&config, &project, &question.join(" ")).await,
    }
}

fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("SYNAPSE_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn project_paths(config: &Config) -> ProjectPaths {
    ProjectPaths {
        source_root: config.index.source_root.clone(),
        data_root: config.index.data_root.clone(),
    }
}

/// Grader and embedder share one local Ollama client.
fn create_local_provider(config: &Config) -> OllamaProvider {
    OllamaProvider::new(
        &config.ollama.base_url,
        config.ollama.grader_model.clone(),
        config.ollama.embedding_model.clone(),
    )
}

fn create_generator(config: &Config, temperature: f32) -> anyhow::Result<AnyProvider> {
    let generator = &config.generator;
    let mut provider = match generator.provider {
        ProviderKind::Ollama => AnyProvider::Ollama(OllamaProvider::new(
            &config.ollama.base_url,
            generator.model.clone(),
            config.ollama.embedding_model.clone(),
        )),
        ProviderKind::OpenAi => {
            let api_key = generator
                .api_key
                .as_ref()
                .context("generator API key missing: set SYNAPSE_GENERATOR_API_KEY or OPENAI_API_KEY")?;
            AnyProvider::OpenAi(
                OpenAiProvider::new(
                    api_key.expose().to_owned(),
                    generator.base_url.clone(),
                    generator.model.clone(),
                    generator.max_tokens,
                )
                .with_temperature(temperature),
            )
        }
    };

    let (status_tx, mut status_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    provider.set_status_tx(status_tx);
    tokio::spawn(async move {
        while let Some(status) = status_rx.recv().await {
            eprintln!("[generator] {status}");
        }
    });
    Ok(provider)
}

async fn health_check(provider: &OllamaProvider) {
    match provider.health_check().await {
        Ok(()) => tracing::info!("ollama health check passed"),
        Err(e) => tracing::warn!("ollama health check failed: {e:#}"),
    }
}

fn project_store(config: &Config, project: &str) -> anyhow::Result<FragmentStore> {
    let qdrant = store::connect(&config.index.qdrant_url)
        .with_context(|| format!("invalid Qdrant URL {}", config.index.qdrant_url))?;
    Ok(FragmentStore::new(
        qdrant,
        store::collection_name(&config.index.collection_prefix, project),
    ))
}

async fn ingest(config: &Config, url: &str, force: bool) -> anyhow::Result<()> {
    let project = repo::project_name(url)?;
    let embedder = create_local_provider(config);
    health_check(&embedder).await;

    let indexer = Indexer::new(
        project_store(config, &project)?,
        Arc::new(embedder),
        IndexerConfig {
            chunker: ChunkerConfig {
                chunk_size: config.index.chunk_size,
                chunk_overlap: config.index.chunk_overlap,
            },
            ..IndexerConfig::default()
        },
    );
    let report = indexer.ingest(url, &project_paths(config), force).await?;

    if report.cached {
        println!("{}: already ingested (use --force to rebuild)", report.project);
    } else {
        println!(
            "{}: {} files, {} chunks in {} ms",
            report.project, report.files_scanned, report.chunks_stored, report.duration_ms
        );
        for err in &report.errors {
            eprintln!("  skipped: {err}");
        }
    }
    Ok(())
}

async fn ask(config: &Config, project: &str, question: &str) -> anyhow::Result<()> {
    let store = project_store(config, project)?;
    require_ingested(project, store.exists().await)?;

    let local = Arc::new(create_local_provider(config));
    health_check(&local).await;

    let orchestrator = Arc::new(Orchestrator::new(
        PipelineConfig::new(
            VectorRetriever::new(store, Arc::clone(&local), config.index.top_k),
            LlmGrader::new(local),
            LlmGenerator::new(Arc::new(create_generator(
                config,
                config.generator.temperature,
            )?)),
        )
        .with_policy(CascadePolicy {
            partial_support_limit: config.pipeline.partial_support_limit,
            floor_size: config.pipeline.floor_size,
        })
        .with_grade_concurrency(config.pipeline.grade_concurrency),
    ));

    let (mut events, handle) = orchestrator.stream(question);
    while let Some(event) = events.recv().await {
        eprintln!("[{}] {event}", event.stage());
    }

    match handle.await.context("pipeline task panicked")? {
        Ok(Outcome::Answer(answer)) => println!("{answer}"),
        Ok(Outcome::Empty) => println!("no relevant context found in {project}"),
        Err(e) => return Err(pipeline_failure(&e)),
    }
    Ok(())
}

/// An unreachable store reports like any other retrieve-stage failure.
fn require_ingested(project: &str, exists: synapse_index::Result<bool>) -> anyhow::Result<()> {
    match exists {
        Ok(true) => Ok(()),
        Ok(false) => bail!("project {project:?} is not ingested; run `synapse ingest <url>` first"),
        Err(e) => Err(pipeline_failure(&PipelineError::from(IndexUnavailable::new(e)))),
    }
}

fn pipeline_failure(e: &PipelineError) -> anyhow::Error {
    anyhow::anyhow!("{} failed at stage {}: {e}", e.kind(), e.stage())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn defaults() -> Config {
        Config::load(Path::new("/nonexistent")).unwrap()
    }

    #[test]
    fn cli_parses_ask_with_multiword_question() {
        let cli = Cli::try_parse_from(["synapse", "ask", "requests", "how", "are", "retries", "configured?"])
            .unwrap();
        match cli.command {
            Commands::Ask { project, question } => {
                assert_eq!(project, "requests");
                assert_eq!(question.join(" "), "how are retries configured?");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_parses_ingest_force() {
        let cli = Cli::try_parse_from([
            "synapse",
            "--config",
            "custom.toml",
            "ingest",
            "https://github.com/psf/requests.git",
            "--force",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert!(matches!(cli.command, Commands::Ingest { force: true, .. }));
    }

    #[test]
    fn cli_requires_a_question() {
        assert!(Cli::try_parse_from(["synapse", "ask", "requests"]).is_err());
    }

    #[tokio::test]
    async fn openai_generator_requires_api_key() {
        let mut config = defaults();
        config.generator.provider = ProviderKind::OpenAi;
        config.generator.api_key = None;
        let err = create_generator(&config, 0.3).unwrap_err();
        assert!(err.to_string().contains("API key missing"));
    }

    #[tokio::test]
    async fn ollama_generator_needs_no_key() {
        let mut config = defaults();
        config.generator.provider = ProviderKind::Ollama;
        let provider = create_generator(&config, 0.3).unwrap();
        assert!(matches!(provider, AnyProvider::Ollama(_)));
    }

    #[test]
    fn store_outage_is_reported_as_retrieve_failure() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "qdrant down");
        let err = require_ingested("requests", Err(io.into())).unwrap_err().to_string();
        assert!(err.starts_with("IndexUnavailable failed at stage retrieve"));
        assert!(err.contains("qdrant down"));
    }

    #[test]
    fn missing_collection_asks_for_ingest() {
        let err = require_ingested("requests", Ok(false)).unwrap_err().to_string();
        assert!(err.contains("not ingested"));
        assert!(require_ingested("requests", Ok(true)).is_ok());
    }

    #[test]
    fn project_paths_follow_config() {
        let mut config = defaults();
        config.index.source_root = PathBuf::from("/srv/src");
        config.index.data_root = PathBuf::from("/srv/data");
        let paths = project_paths(&config);
        assert_eq!(paths.source_dir("demo"), PathBuf::from("/srv/src/demo"));
        assert_eq!(paths.data_dir("demo"), PathBuf::from("/srv/data/demo"));
    }
}

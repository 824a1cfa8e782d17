//! Project ingestion: clone → walk → chunk → embed → store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use synapse_llm::provider::LlmProvider;

use crate::chunker::{ChunkerConfig, TextChunk, chunk_text};
use crate::error::{IndexError, Result};
use crate::repo;
use crate::store::FragmentStore;

/// File extensions worth indexing for code Q&A.
const INDEXABLE_EXTENSIONS: &[&str] = &[
    "py", "md", "js", "ts", "java", "go", "txt", "yaml", "yml", "rs", "toml",
];

/// Indexer configuration.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub chunker: ChunkerConfig,
    /// Chunks per `Qdrant` upsert.
    pub batch_size: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            batch_size: 64,
        }
    }
}

/// Where checkouts and per-project data live.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub source_root: PathBuf,
    pub data_root: PathBuf,
}

impl ProjectPaths {
    #[must_use]
    pub fn source_dir(&self, project: &str) -> PathBuf {
        self.source_root.join(project)
    }

    #[must_use]
    pub fn data_dir(&self, project: &str) -> PathBuf {
        self.data_root.join(project)
    }
}

/// Summary of an ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub project: String,
    /// The collection already existed and `force` was not set; nothing was done.
    pub cached: bool,
    pub files_scanned: usize,
    pub chunks_stored: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

/// Whether `path` has one of the indexable extensions.
#[must_use]
pub fn is_indexable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| INDEXABLE_EXTENSIONS.contains(&ext))
}

/// Orchestrates ingestion of one project into its collection.
pub struct Indexer<P: LlmProvider> {
    store: FragmentStore,
    provider: Arc<P>,
    config: IndexerConfig,
}

impl<P: LlmProvider> Indexer<P> {
    #[must_use]
    pub fn new(store: FragmentStore, provider: Arc<P>, config: IndexerConfig) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    /// Clone `url` and index it, unless the project is already ingested and `force` is unset.
    ///
    /// # Errors
    ///
    /// Returns an error for rejected URLs, clone failures, repositories with no
    /// indexable text, and embedding or `Qdrant` failures.
    pub async fn ingest(&self, url: &str, paths: &ProjectPaths, force: bool) -> Result<IngestReport> {
        if !repo::is_valid_git_url(url) {
            return Err(IndexError::InvalidUrl(url.to_owned()));
        }
        let project = repo::project_name(url)?;
        let data_dir = paths.data_dir(&project);

        if !force && data_dir.is_dir() && self.store.exists().await? {
            tracing::info!(%project, "project already ingested, skipping");
            return Ok(IngestReport {
                project,
                cached: true,
                ..IngestReport::default()
            });
        }

        let source_dir = paths.source_dir(&project);
        repo::clone_repo(url, &source_dir).await?;

        let mut report = self.index_tree(&source_dir).await?;
        tokio::fs::create_dir_all(&data_dir).await?;
        report.project = project;
        Ok(report)
    }

    /// Index every indexable file under `root` into a freshly recreated collection.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::NoDocuments` if nothing indexable is found, or an error
    /// if embedding or `Qdrant` operations fail.
    pub async fn index_tree(&self, root: &Path) -> Result<IngestReport> {
        let start = std::time::Instant::now();
        let mut report = IngestReport::default();

        let entries: Vec<_> = ignore::WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .build()
            .flatten()
            .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()) && is_indexable(e.path()))
            .collect();

        let mut chunks: Vec<TextChunk> = Vec::new();
        for entry in &entries {
            report.files_scanned += 1;
            let rel_path = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .to_string();

            match tokio::fs::read_to_string(entry.path()).await {
                Ok(source) => chunks.extend(chunk_text(&source, &rel_path, &self.config.chunker)),
                Err(e) => report.errors.push(format!("{rel_path}: {e}")),
            }
        }

        if chunks.is_empty() {
            return Err(IndexError::NoDocuments(root.display().to_string()));
        }
        tracing::info!(
            files = report.files_scanned,
            chunks = chunks.len(),
            "chunking complete, embedding"
        );

        let mut collection_ready = false;
        for batch in chunks.chunks(self.config.batch_size.max(1)) {
            let mut vectors = Vec::with_capacity(batch.len());
            for chunk in batch {
                vectors.push(self.provider.embed(&chunk.content).await?);
            }
            if !collection_ready {
                let vector_size = u64::try_from(vectors.first().map_or(0, Vec::len))?;
                self.store.recreate(vector_size).await?;
                collection_ready = true;
            }
            report.chunks_stored += self.store.upsert(batch, vectors).await?;
            tracing::debug!(stored = report.chunks_stored, total = chunks.len(), "upserted batch");
        }

        report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        tracing::info!(
            collection = self.store.collection(),
            chunks = report.chunks_stored,
            duration_ms = report.duration_ms,
            "indexing complete"
        );
        Ok(report)
    }
}

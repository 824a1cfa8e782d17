//! Per-project `Qdrant` collection of text chunks.

use std::collections::HashMap;
use std::sync::Arc;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, ScoredPoint, SearchPointsBuilder,
    UpsertPointsBuilder, Value, VectorParamsBuilder,
};

use crate::chunker::TextChunk;
use crate::error::Result;

/// A search result from `Qdrant` with decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub content: String,
    pub file_path: String,
    pub line_range: (usize, usize),
    pub score: f32,
}

/// Handle on one project's collection. Cheap to clone; the client is shared.
#[derive(Clone)]
pub struct FragmentStore {
    qdrant: Arc<Qdrant>,
    collection: String,
}

impl std::fmt::Debug for FragmentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentStore")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

/// Connect a shared `Qdrant` client.
///
/// # Errors
///
/// Returns an error if the client cannot be built from `url`.
pub fn connect(url: &str) -> Result<Arc<Qdrant>> {
    Ok(Arc::new(Qdrant::from_url(url).build()?))
}

/// Collection name for a project: `prefix` + project name with anything outside
/// `[A-Za-z0-9_-]` replaced by `_`.
#[must_use]
pub fn collection_name(prefix: &str, project: &str) -> String {
    let sanitized: String = project
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{prefix}{sanitized}")
}

impl FragmentStore {
    #[must_use]
    pub fn new(qdrant: Arc<Qdrant>, collection: impl Into<String>) -> Self {
        Self {
            qdrant,
            collection: collection.into(),
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// # Errors
    ///
    /// Returns an error if `Qdrant` is unreachable.
    pub async fn exists(&self) -> Result<bool> {
        Ok(self.qdrant.collection_exists(&self.collection).await?)
    }

    /// Drop the collection if present and create an empty one with cosine distance.
    ///
    /// # Errors
    ///
    /// Returns an error if `Qdrant` operations fail.
    pub async fn recreate(&self, vector_size: u64) -> Result<()> {
        if self.exists().await? {
            tracing::info!(collection = %self.collection, "dropping previous collection");
            self.qdrant.delete_collection(&self.collection).await?;
        }
        self.qdrant
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
            )
            .await?;
        Ok(())
    }

    /// Upsert a batch of chunks with their embeddings (zipped pairwise).
    ///
    /// # Errors
    ///
    /// Returns an error if payload conversion or the `Qdrant` upsert fails.
    pub async fn upsert(&self, chunks: &[TextChunk], vectors: Vec<Vec<f32>>) -> Result<usize> {
        let mut points = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.iter().zip(vectors) {
            let id = uuid::Uuid::new_v4().to_string();
            points.push(PointStruct::new(id, vector, chunk_payload(chunk)?));
        }
        let count = points.len();
        if count == 0 {
            return Ok(0);
        }

        self.qdrant
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await?;
        Ok(count)
    }

    /// Top-`limit` chunks by cosine similarity, best first.
    ///
    /// # Errors
    ///
    /// Returns an error if `Qdrant` search fails.
    pub async fn search(&self, query_vector: Vec<f32>, limit: usize) -> Result<Vec<SearchHit>> {
        let builder = SearchPointsBuilder::new(&self.collection, query_vector, limit as u64)
            .with_payload(true);

        let results = self.qdrant.search_points(builder).await?;

        Ok(results
            .result
            .iter()
            .filter_map(SearchHit::from_scored_point)
            .collect())
    }
}

fn chunk_payload(chunk: &TextChunk) -> Result<HashMap<String, Value>> {
    Ok(serde_json::from_value(serde_json::json!({
        "content": chunk.content,
        "file_path": chunk.file_path,
        "line_start": chunk.line_range.0,
        "line_end": chunk.line_range.1,
        "content_hash": chunk.content_hash,
    }))?)
}

impl SearchHit {
    fn from_scored_point(point: &ScoredPoint) -> Option<Self> {
        let p = &point.payload;
        let get_str = |key: &str| p.get(key).and_then(Value::as_str).cloned();
        let get_int = |key: &str| {
            p.get(key)
                .and_then(Value::as_integer)
                .and_then(|v| usize::try_from(v).ok())
        };

        Some(Self {
            content: get_str("content")?,
            file_path: get_str("file_path")?,
            line_range: (
                get_int("line_start").unwrap_or_default(),
                get_int("line_end").unwrap_or_default(),
            ),
            score: point.score,
        })
    }
}

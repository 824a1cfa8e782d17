//! Top-K similarity retrieval over a project's collection.

use std::sync::Arc;

use synapse_llm::provider::LlmProvider;

use crate::error::Result;
use crate::store::{FragmentStore, SearchHit};

/// Default number of candidates fetched per question.
pub const DEFAULT_TOP_K: usize = 50;

/// Embeds a question and returns the `top_k` nearest chunks, best first.
pub struct VectorRetriever<P: LlmProvider> {
    store: FragmentStore,
    provider: Arc<P>,
    top_k: usize,
}

impl<P: LlmProvider> VectorRetriever<P> {
    #[must_use]
    pub fn new(store: FragmentStore, provider: Arc<P>, top_k: usize) -> Self {
        Self {
            store,
            provider,
            top_k,
        }
    }

    /// Retrieve candidate chunks for `query`. No hits is an empty vec, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding the query or the `Qdrant` search fails.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let query_vector = self.provider.embed(query).await?;
        let mut hits = self.store.search(query_vector, self.top_k).await?;
        hits.truncate(self.top_k);
        tracing::debug!(collection = self.store.collection(), hits = hits.len(), "vector search");
        Ok(hits)
    }
}

//! Stage implementations backed by the vector index and LLM providers.

use std::sync::Arc;

use serde::Deserialize;
use synapse_index::retriever::VectorRetriever;
use synapse_index::store::SearchHit;
use synapse_llm::provider::{LlmProvider, Message};

use super::prompt::{GENERATOR_SYSTEM_PROMPT, build_generator_prompt, build_grader_prompt};
use super::step::{Generator, Grader, Retriever};
use super::types::{Fragment, Verdict};
use super::{GenerationFailed, GradingUnavailable, IndexUnavailable};

impl From<SearchHit> for Fragment {
    fn from(hit: SearchHit) -> Self {
        let (start, end) = hit.line_range;
        Self {
            locator: format!("{}:{start}-{end}", hit.file_path),
            content: hit.content,
        }
    }
}

impl<P: LlmProvider> Retriever for VectorRetriever<P> {
    async fn retrieve(&self, question: &str) -> Result<Vec<Fragment>, IndexUnavailable> {
        let hits = self.search(question).await.map_err(IndexUnavailable::new)?;
        Ok(hits.into_iter().map(Fragment::from).collect())
    }
}

/// Grades with a JSON-mode chat call returning `{"score": "yes" | "partial" | "no"}`.
pub struct LlmGrader<P: LlmProvider> {
    provider: Arc<P>,
}

impl<P: LlmProvider> LlmGrader<P> {
    #[must_use]
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

impl<P: LlmProvider> Grader for LlmGrader<P> {
    async fn grade(&self, question: &str, fragment: &str) -> Result<Verdict, GradingUnavailable> {
        let messages = [Message::user(build_grader_prompt(question, fragment))];
        let raw = self
            .provider
            .chat_json(&messages)
            .await
            .map_err(|e| GradingUnavailable::new(e.to_string()))?;
        parse_verdict(&raw)
    }
}

#[derive(Deserialize)]
struct ScoreReply {
    score: String,
}

/// Parse a grader reply. Tolerates prose around the JSON object.
///
/// # Errors
///
/// Returns `GradingUnavailable` when no object with a known `score` is present.
pub fn parse_verdict(raw: &str) -> Result<Verdict, GradingUnavailable> {
    let json = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => return Err(GradingUnavailable::new(format!("no JSON object in reply: {raw:?}"))),
    };
    let reply: ScoreReply = serde_json::from_str(json)
        .map_err(|e| GradingUnavailable::new(format!("malformed verdict: {e}")))?;
    match reply.score.trim().to_ascii_lowercase().as_str() {
        "yes" => Ok(Verdict::Relevant),
        "partial" => Ok(Verdict::Partial),
        "no" => Ok(Verdict::Irrelevant),
        other => Err(GradingUnavailable::new(format!("unknown score: {other:?}"))),
    }
}

/// Answers from context with a single chat call.
pub struct LlmGenerator<P: LlmProvider> {
    provider: Arc<P>,
}

impl<P: LlmProvider> LlmGenerator<P> {
    #[must_use]
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

impl<P: LlmProvider> Generator for LlmGenerator<P> {
    async fn generate(&self, question: &str, context: &str) -> Result<String, GenerationFailed> {
        let messages = [
            Message::system(GENERATOR_SYSTEM_PROMPT),
            Message::user(build_generator_prompt(question, context)),
        ];
        self.provider
            .chat(&messages)
            .await
            .map_err(GenerationFailed::new)
    }
}

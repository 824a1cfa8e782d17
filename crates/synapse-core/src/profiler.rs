//! Starter-question suggestions per project, cached on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use synapse_index::indexer::ProjectPaths;
use synapse_llm::provider::{LlmProvider, Message};

use crate::config::ProfilerConfig;

pub const CACHE_FILE: &str = "questions.json";

pub const README_CANDIDATES: [&str; 5] = [
    "README.md",
    "readme.md",
    "README.rst",
    "README.txt",
    "README_en.md",
];

/// Returned when the project has no README.
pub const DEFAULT_QUESTIONS: [&str; 3] = [
    "How do I install the dependencies?",
    "Which file is the main entry point?",
    "How do I run the tests?",
];

/// Returned when the LLM call fails. Not cached.
pub const FALLBACK_QUESTIONS: [&str; 2] = [
    "What is the main purpose of this project?",
    "How do I get started quickly?",
];

pub const SUGGESTION_PROMPT_TEMPLATE: &str = "\
You are an experienced open-source project analyst. Based on the README below, propose \
{count} of the most valuable getting-started technical questions a developer would ask.

Focus on installation and configuration, core feature usage, architecture, or deployment. \
Output only the questions, one per line, without numbering or any other text.

---
README excerpt:
{readme}
---
Suggested questions:";

#[must_use]
pub fn build_suggestion_prompt(readme: &str, count: usize) -> String {
    SUGGESTION_PROMPT_TEMPLATE
        .replace("{count}", &count.to_string())
        .replace("{readme}", readme)
}

/// Strip a leading `-`, `*`, `•`, `1.` or `1)` list marker.
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix(['-', '*', '•']) {
        return rest.trim_start();
    }
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0
        && let Some(rest) = line[digits..].strip_prefix(['.', ')'])
    {
        return rest.trim_start();
    }
    line
}

/// One question per non-blank line, markers removed, at most `limit`.
#[must_use]
pub fn parse_suggestions(raw: &str, limit: usize) -> Vec<String> {
    raw.lines()
        .map(strip_list_marker)
        .filter(|q| !q.is_empty())
        .take(limit)
        .map(str::to_owned)
        .collect()
}

pub struct SuggestionProfiler<P: LlmProvider> {
    provider: Arc<P>,
    paths: ProjectPaths,
    config: ProfilerConfig,
}

impl<P: LlmProvider> SuggestionProfiler<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, paths: ProjectPaths, config: ProfilerConfig) -> Self {
        Self {
            provider,
            paths,
            config,
        }
    }

    #[must_use]
    pub fn cache_path(&self, project: &str) -> PathBuf {
        self.paths.data_dir(project).join(CACHE_FILE)
    }

    /// Starter questions for `project`. Never fails; degrades to canned questions.
    pub async fn suggestions(&self, project: &str) -> Vec<String> {
        let cache_path = self.cache_path(project);
        if let Some(cached) = read_cache(&cache_path).await {
            tracing::debug!(project, "loaded cached suggestions");
            return cached;
        }

        let Some(readme) = self.read_readme(project).await else {
            tracing::info!(project, "no README found, using default suggestions");
            return DEFAULT_QUESTIONS.iter().map(|q| (*q).to_owned()).collect();
        };

        let prompt = build_suggestion_prompt(&readme, self.config.max_suggestions);
        let raw = match self.provider.chat(&[Message::user(prompt)]).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(project, "suggestion generation failed: {e}");
                return FALLBACK_QUESTIONS.iter().map(|q| (*q).to_owned()).collect();
            }
        };

        let questions = parse_suggestions(&raw, self.config.max_suggestions);
        if let Err(e) = write_cache(&cache_path, &questions).await {
            tracing::warn!(path = %cache_path.display(), "failed to write suggestion cache: {e}");
        }
        questions
    }

    async fn read_readme(&self, project: &str) -> Option<String> {
        let dir = self.paths.source_dir(project);
        for name in README_CANDIDATES {
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    return Some(content.chars().take(self.config.readme_max_chars).collect());
                }
                Err(e) => tracing::debug!(path = %path.display(), "skipping unreadable README: {e}"),
            }
        }
        None
    }
}

async fn read_cache(path: &Path) -> Option<Vec<String>> {
    let content = tokio::fs::read_to_string(path).await.ok()?;
    match serde_json::from_str(&content) {
        Ok(questions) => Some(questions),
        Err(e) => {
            tracing::warn!(path = %path.display(), "unreadable suggestion cache, regenerating: {e}");
            None
        }
    }
}

async fn write_cache(path: &Path, questions: &[String]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string(questions)?;
    tokio::fs::write(path, json).await
}

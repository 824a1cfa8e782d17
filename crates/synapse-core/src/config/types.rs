use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Credential wrapper that never prints its value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub profiler: ProfilerConfig,
}

/// Backend used for answer and suggestion generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    #[default]
    OpenAi,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_ollama_url() -> String {
    "http://127.0.0.1:11434".into()
}

fn default_grader_model() -> String {
    "qwen2.5:7b".into()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_grader_model")]
    pub grader_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            grader_model: default_grader_model(),
            embedding_model: default_embedding_model(),
        }
    }
}

fn default_generator_url() -> String {
    "https://api.moonshot.cn/v1".into()
}

fn default_generator_model() -> String {
    "moonshot-v1-8k".into()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_generator_temperature() -> f32 {
    0.3
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_generator_url")]
    pub base_url: String,
    #[serde(default = "default_generator_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_generator_temperature")]
    pub temperature: f32,
    /// Environment only.
    #[serde(skip)]
    pub api_key: Option<Secret>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: default_generator_url(),
            model: default_generator_model(),
            max_tokens: default_max_tokens(),
            temperature: default_generator_temperature(),
            api_key: None,
        }
    }
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".into()
}

fn default_collection_prefix() -> String {
    "synapse_".into()
}

fn default_top_k() -> usize {
    50
}

fn default_chunk_size() -> usize {
    1500
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_source_root() -> PathBuf {
    PathBuf::from("./source_code")
}

fn default_data_root() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,
    #[serde(default = "default_collection_prefix")]
    pub collection_prefix: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Where repositories are cloned.
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,
    /// One directory per ingested project (suggestion cache lives here).
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            qdrant_url: default_qdrant_url(),
            collection_prefix: default_collection_prefix(),
            top_k: default_top_k(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            source_root: default_source_root(),
            data_root: default_data_root(),
        }
    }
}

fn default_grade_concurrency() -> usize {
    4
}

fn default_partial_support_limit() -> usize {
    2
}

fn default_floor_size() -> usize {
    3
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineSettings {
    #[serde(default = "default_grade_concurrency")]
    pub grade_concurrency: usize,
    #[serde(default = "default_partial_support_limit")]
    pub partial_support_limit: usize,
    #[serde(default = "default_floor_size")]
    pub floor_size: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            grade_concurrency: default_grade_concurrency(),
            partial_support_limit: default_partial_support_limit(),
            floor_size: default_floor_size(),
        }
    }
}

fn default_max_suggestions() -> usize {
    4
}

fn default_readme_max_chars() -> usize {
    3000
}

fn default_profiler_temperature() -> f32 {
    0.5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfilerConfig {
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    #[serde(default = "default_readme_max_chars")]
    pub readme_max_chars: usize,
    #[serde(default = "default_profiler_temperature")]
    pub temperature: f32,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            max_suggestions: default_max_suggestions(),
            readme_max_chars: default_readme_max_chars(),
            temperature: default_profiler_temperature(),
        }
    }
}

use super::{Config, Secret};

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_llm();
        self.apply_env_overrides_index();
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("SYNAPSE_OLLAMA_BASE_URL").or_else(|_| std::env::var("OLLAMA_BASE_URL")) {
            self.ollama.base_url = v;
        }
        if let Ok(v) = std::env::var("SYNAPSE_GRADER_MODEL") {
            self.ollama.grader_model = v;
        }
        if let Ok(v) = std::env::var("SYNAPSE_EMBEDDING_MODEL") {
            self.ollama.embedding_model = v;
        }
        if let Ok(v) = std::env::var("SYNAPSE_GENERATOR_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.generator.provider = kind;
            } else {
                tracing::warn!("ignoring invalid SYNAPSE_GENERATOR_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SYNAPSE_GENERATOR_BASE_URL").or_else(|_| std::env::var("OPENAI_API_BASE")) {
            self.generator.base_url = v;
        }
        if let Ok(v) = std::env::var("SYNAPSE_GENERATOR_MODEL") {
            self.generator.model = v;
        }
        if let Ok(v) = std::env::var("SYNAPSE_GENERATOR_MAX_TOKENS")
            && let Ok(n) = v.parse::<u32>()
        {
            self.generator.max_tokens = n;
        }
        if let Ok(v) = std::env::var("SYNAPSE_GENERATOR_TEMPERATURE")
            && let Ok(t) = v.parse::<f32>()
        {
            self.generator.temperature = t;
        }
        if let Ok(v) = std::env::var("SYNAPSE_GENERATOR_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY"))
            && !v.is_empty()
        {
            self.generator.api_key = Some(Secret::new(v));
        }
    }

    fn apply_env_overrides_index(&mut self) {
        if let Ok(v) = std::env::var("SYNAPSE_QDRANT_URL") {
            self.index.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("SYNAPSE_TOP_K")
            && let Ok(k) = v.parse::<usize>()
        {
            self.index.top_k = k;
        }
        if let Ok(v) = std::env::var("SYNAPSE_SOURCE_ROOT") {
            self.index.source_root = v.into();
        }
        if let Ok(v) = std::env::var("SYNAPSE_DATA_ROOT") {
            self.index.data_root = v.into();
        }
        if let Ok(v) = std::env::var("SYNAPSE_GRADE_CONCURRENCY")
            && let Ok(n) = v.parse::<usize>()
        {
            self.pipeline.grade_concurrency = n;
        }
    }
}

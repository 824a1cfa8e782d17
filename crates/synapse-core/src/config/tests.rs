use std::io::Write;

use serial_test::serial;

use super::*;

const ENV_KEYS: [&str; 19] = [
    "SYNAPSE_OLLAMA_BASE_URL",
    "OLLAMA_BASE_URL",
    "SYNAPSE_GRADER_MODEL",
    "SYNAPSE_EMBEDDING_MODEL",
    "SYNAPSE_GENERATOR_PROVIDER",
    "SYNAPSE_GENERATOR_BASE_URL",
    "OPENAI_API_BASE",
    "SYNAPSE_GENERATOR_MODEL",
    "SYNAPSE_GENERATOR_MAX_TOKENS",
    "SYNAPSE_GENERATOR_TEMPERATURE",
    "SYNAPSE_GENERATOR_API_KEY",
    "OPENAI_API_KEY",
    "SYNAPSE_QDRANT_URL",
    "SYNAPSE_TOP_K",
    "SYNAPSE_SOURCE_ROOT",
    "SYNAPSE_DATA_ROOT",
    "SYNAPSE_GRADE_CONCURRENCY",
    "SYNAPSE_CONFIG_PATH",
    "SYNAPSE_LOG",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

#[test]
#[serial]
fn defaults_when_file_missing() {
    clear_env();
    let config = Config::load(std::path::Path::new("/nonexistent/synapse.toml")).unwrap();

    assert_eq!(config.ollama.base_url, "http://127.0.0.1:11434");
    assert_eq!(config.ollama.grader_model, "qwen2.5:7b");
    assert_eq!(config.ollama.embedding_model, "nomic-embed-text");
    assert_eq!(config.generator.provider, ProviderKind::OpenAi);
    assert_eq!(config.generator.model, "moonshot-v1-8k");
    assert!((config.generator.temperature - 0.3).abs() < f32::EPSILON);
    assert_eq!(config.index.top_k, 50);
    assert_eq!(config.index.chunk_size, 1500);
    assert_eq!(config.index.chunk_overlap, 200);
    assert_eq!(config.pipeline.partial_support_limit, 2);
    assert_eq!(config.pipeline.floor_size, 3);
    assert_eq!(config.profiler.max_suggestions, 4);
    assert!(config.generator.api_key.is_none());
    config.validate().unwrap();
}

#[test]
#[serial]
fn parse_partial_toml() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("synapse.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    write!(
        f,
        r#"
[generator]
provider = "ollama"
model = "llama3.1:8b"

[index]
qdrant_url = "http://qdrant:6334"
top_k = 20

[pipeline]
grade_concurrency = 8
floor_size = 5
"#
    )
    .unwrap();

    let config = Config::load(&path).unwrap();

    assert_eq!(config.generator.provider, ProviderKind::Ollama);
    assert_eq!(config.generator.model, "llama3.1:8b");
    assert_eq!(config.generator.max_tokens, 2048);
    assert_eq!(config.index.qdrant_url, "http://qdrant:6334");
    assert_eq!(config.index.top_k, 20);
    assert_eq!(config.index.chunk_size, 1500);
    assert_eq!(config.pipeline.grade_concurrency, 8);
    assert_eq!(config.pipeline.partial_support_limit, 2);
    assert_eq!(config.pipeline.floor_size, 5);
    assert_eq!(config.ollama.grader_model, "qwen2.5:7b");
}

#[test]
#[serial]
fn invalid_toml_is_an_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[index\ntop_k = ").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("failed to parse config file"));
}

#[test]
#[serial]
fn env_overrides() {
    clear_env();
    unsafe {
        std::env::set_var("SYNAPSE_QDRANT_URL", "http://remote:6334");
        std::env::set_var("SYNAPSE_TOP_K", "12");
        std::env::set_var("SYNAPSE_GRADER_MODEL", "qwen2.5:14b");
        std::env::set_var("SYNAPSE_GENERATOR_PROVIDER", "ollama");
        std::env::set_var("SYNAPSE_GRADE_CONCURRENCY", "not-a-number");
    }
    let mut config = Config::default();
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.index.qdrant_url, "http://remote:6334");
    assert_eq!(config.index.top_k, 12);
    assert_eq!(config.ollama.grader_model, "qwen2.5:14b");
    assert_eq!(config.generator.provider, ProviderKind::Ollama);
    assert_eq!(config.pipeline.grade_concurrency, 4);
}

#[test]
#[serial]
fn generator_credentials_fall_back_to_openai_vars() {
    clear_env();
    unsafe {
        std::env::set_var("OPENAI_API_KEY", "sk-fallback");
        std::env::set_var("OPENAI_API_BASE", "https://api.example.com/v1");
    }
    let mut config = Config::default();
    config.apply_env_overrides();
    assert_eq!(config.generator.api_key.as_ref().unwrap().expose(), "sk-fallback");
    assert_eq!(config.generator.base_url, "https://api.example.com/v1");

    unsafe { std::env::set_var("SYNAPSE_GENERATOR_API_KEY", "sk-primary") };
    let mut config = Config::default();
    config.apply_env_overrides();
    clear_env();
    assert_eq!(config.generator.api_key.as_ref().unwrap().expose(), "sk-primary");
}

#[test]
#[serial]
fn invalid_provider_is_ignored() {
    clear_env();
    unsafe { std::env::set_var("SYNAPSE_GENERATOR_PROVIDER", "claude") };
    let mut config = Config::default();
    config.apply_env_overrides();
    clear_env();
    assert_eq!(config.generator.provider, ProviderKind::OpenAi);
}

#[test]
fn validate_rejects_bad_settings() {
    let mut config = Config::default();
    config.index.top_k = 0;
    assert!(config.validate().unwrap_err().to_string().contains("top_k"));

    let mut config = Config::default();
    config.pipeline.grade_concurrency = 0;
    assert!(config.validate().unwrap_err().to_string().contains("grade_concurrency"));

    let mut config = Config::default();
    config.index.chunk_overlap = config.index.chunk_size;
    assert!(config.validate().unwrap_err().to_string().contains("chunk_overlap"));

    let mut config = Config::default();
    config.generator.model = "  ".into();
    assert!(config.validate().unwrap_err().to_string().contains("generator.model"));
}

#[test]
fn secret_is_redacted() {
    let mut config = Config::default();
    config.generator.api_key = Some(Secret::new("sk-live-123"));
    let debug = format!("{config:?}");
    assert!(!debug.contains("sk-live-123"));
    assert!(debug.contains("[REDACTED]"));
    assert_eq!(Secret::new("x").to_string(), "[REDACTED]");
}

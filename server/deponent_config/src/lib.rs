//! # Deponent Config
//!
//! Configuration for the deposition analysis pipeline.
//!
//! # Configuration Schema
//!
//! The configuration file (`deponent.toml`) supports the following sections:
//! - `[analysis]`: candidate ranking and classification pacing
//! - `[llm]`: chat-completions endpoint used for claim extraction and pair classification
//! - `[embeddings]`: embeddings endpoint used for the semantic candidate signal
//! - `[logging]`: log level and output format
//!
//! # Environment Variable Overrides
//!
//! Every field can be overridden with the `DEPONENT_` prefix and `_` as the
//! section separator:
//! - `DEPONENT_ANALYSIS_TOP_K` → `analysis.top_k`
//! - `DEPONENT_ANALYSIS_SIMILARITY_THRESHOLD` → `analysis.similarity_threshold`
//! - `DEPONENT_LLM_MODEL` → `llm.model`
//! - `DEPONENT_EMBEDDINGS_BATCH_SIZE` → `embeddings.batch_size`
//! - `DEPONENT_LOGGING_LOG_LEVEL` → `logging.log_level`
//! - etc.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Parsed from `deponent.toml` or constructed programmatically.
/// Environment variables with the `DEPONENT_` prefix override TOML values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeponentConfig {
    /// Candidate ranking and classification pacing.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Chat-completions provider.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Embeddings provider.
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Candidate generation and orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Maximum candidates compared per claim (default: 5).
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Minimum cosine similarity for a semantic candidate (default: 0.75).
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    /// Delay between successive pair classifications in ms (default: 200).
    #[serde(default = "default_classify_delay_ms")]
    pub classify_delay_ms: u64,
    /// Fixed score for shared-entity candidates (default: 0.8).
    #[serde(default = "default_entity_score")]
    pub entity_score: f32,
    /// Fixed score for shared-topic candidates (default: 0.7).
    #[serde(default = "default_topic_score")]
    pub topic_score: f32,
    /// Fixed score for shared-year candidates (default: 0.75).
    #[serde(default = "default_temporal_score")]
    pub temporal_score: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
            classify_delay_ms: default_classify_delay_ms(),
            entity_score: default_entity_score(),
            topic_score: default_topic_score(),
            temporal_score: default_temporal_score(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_similarity_threshold() -> f32 {
    0.75
}
fn default_classify_delay_ms() -> u64 {
    200
}
fn default_entity_score() -> f32 {
    0.8
}
fn default_topic_score() -> f32 {
    0.7
}
fn default_temporal_score() -> f32 {
    0.75
}

/// OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API base URL (default: "https://api.openai.com/v1").
    #[serde(default = "default_api_base")]
    pub endpoint: String,
    /// Model name (default: "gpt-4o-mini").
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Name of the environment variable holding the API key (default: "OPENAI_API_KEY").
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Sampling temperature (default: 0.0).
    #[serde(default)]
    pub temperature: f32,
    /// Maximum completion tokens (default: 1024).
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request timeout in seconds (default: 60).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_api_base(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        read_key(&self.api_key_env)
    }
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_timeout_secs() -> u64 {
    60
}

/// OpenAI-compatible embeddings endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// Whether to compute embeddings at all (default: true).
    /// When disabled, only the entity/topic/temporal signals run.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// API base URL (default: "https://api.openai.com/v1").
    #[serde(default = "default_api_base")]
    pub endpoint: String,
    /// Model name (default: "text-embedding-3-small").
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Name of the environment variable holding the API key (default: "OPENAI_API_KEY").
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Maximum texts per request (default: 96).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Delay between batch requests in ms (default: 100).
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    /// Request timeout in seconds (default: 60).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_api_base(),
            model: default_embedding_model(),
            api_key_env: default_api_key_env(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingsConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        read_key(&self.api_key_env)
    }
}

fn default_true() -> bool {
    true
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_batch_size() -> usize {
    96
}
fn default_batch_delay_ms() -> u64 {
    100
}

/// Logging output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (default: "info"). `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log format: "text" (default) or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

fn read_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|k| !k.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl DeponentConfig {
    /// Load configuration from a TOML file, then apply environment variable overrides.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path, e))?;
        Self::parse_toml(&contents)
    }

    /// Parse configuration from a TOML string, apply env overrides, then validate.
    pub fn parse_toml(toml_str: &str) -> anyhow::Result<Self> {
        let mut config: DeponentConfig = toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, validated. Used when no file is given.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Unparseable numeric or boolean values are ignored.
    pub fn apply_env_overrides(&mut self) {
        // Analysis overrides
        if let Some(n) = env_parse::<usize>("DEPONENT_ANALYSIS_TOP_K") {
            self.analysis.top_k = n;
        }
        if let Some(t) = env_parse::<f32>("DEPONENT_ANALYSIS_SIMILARITY_THRESHOLD") {
            self.analysis.similarity_threshold = t;
        }
        if let Some(ms) = env_parse::<u64>("DEPONENT_ANALYSIS_CLASSIFY_DELAY_MS") {
            self.analysis.classify_delay_ms = ms;
        }
        if let Some(s) = env_parse::<f32>("DEPONENT_ANALYSIS_ENTITY_SCORE") {
            self.analysis.entity_score = s;
        }
        if let Some(s) = env_parse::<f32>("DEPONENT_ANALYSIS_TOPIC_SCORE") {
            self.analysis.topic_score = s;
        }
        if let Some(s) = env_parse::<f32>("DEPONENT_ANALYSIS_TEMPORAL_SCORE") {
            self.analysis.temporal_score = s;
        }

        // LLM overrides
        if let Ok(v) = std::env::var("DEPONENT_LLM_ENDPOINT") {
            self.llm.endpoint = v;
        }
        if let Ok(v) = std::env::var("DEPONENT_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("DEPONENT_LLM_API_KEY_ENV") {
            self.llm.api_key_env = v;
        }
        if let Some(t) = env_parse::<f32>("DEPONENT_LLM_TEMPERATURE") {
            self.llm.temperature = t;
        }
        if let Some(n) = env_parse::<u32>("DEPONENT_LLM_MAX_TOKENS") {
            self.llm.max_tokens = n;
        }
        if let Some(s) = env_parse::<u64>("DEPONENT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = s;
        }

        // Embeddings overrides
        if let Some(b) = env_parse::<bool>("DEPONENT_EMBEDDINGS_ENABLED") {
            self.embeddings.enabled = b;
        }
        if let Ok(v) = std::env::var("DEPONENT_EMBEDDINGS_ENDPOINT") {
            self.embeddings.endpoint = v;
        }
        if let Ok(v) = std::env::var("DEPONENT_EMBEDDINGS_MODEL") {
            self.embeddings.model = v;
        }
        if let Ok(v) = std::env::var("DEPONENT_EMBEDDINGS_API_KEY_ENV") {
            self.embeddings.api_key_env = v;
        }
        if let Some(n) = env_parse::<usize>("DEPONENT_EMBEDDINGS_BATCH_SIZE") {
            self.embeddings.batch_size = n;
        }
        if let Some(ms) = env_parse::<u64>("DEPONENT_EMBEDDINGS_BATCH_DELAY_MS") {
            self.embeddings.batch_delay_ms = ms;
        }
        if let Some(s) = env_parse::<u64>("DEPONENT_EMBEDDINGS_TIMEOUT_SECS") {
            self.embeddings.timeout_secs = s;
        }

        // Logging overrides
        if let Ok(v) = std::env::var("DEPONENT_LOGGING_LOG_LEVEL") {
            self.logging.log_level = v;
        }
        if let Ok(v) = std::env::var("DEPONENT_LOGGING_LOG_FORMAT") {
            self.logging.log_format = v;
        }
    }

    /// Validate configuration values with detailed error messages.
    pub fn validate(&self) -> anyhow::Result<()> {
        // --- Analysis validation ---
        if self.analysis.top_k == 0 {
            anyhow::bail!(
                "analysis.top_k must be > 0 (got 0). Set it in deponent.toml or via DEPONENT_ANALYSIS_TOP_K env var."
            );
        }
        if !(0.0..=1.0).contains(&self.analysis.similarity_threshold) {
            anyhow::bail!(
                "analysis.similarity_threshold must be between 0.0 and 1.0 (got {}).",
                self.analysis.similarity_threshold
            );
        }
        for (name, score) in [
            ("entity_score", self.analysis.entity_score),
            ("topic_score", self.analysis.topic_score),
            ("temporal_score", self.analysis.temporal_score),
        ] {
            if !(0.0..=1.0).contains(&score) {
                anyhow::bail!(
                    "analysis.{} must be between 0.0 and 1.0 (got {}).",
                    name,
                    score
                );
            }
        }

        // --- LLM validation ---
        if self.llm.endpoint.trim().is_empty() {
            anyhow::bail!("llm.endpoint must not be empty.");
        }
        if self.llm.model.trim().is_empty() {
            anyhow::bail!("llm.model must not be empty.");
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            anyhow::bail!(
                "llm.temperature must be between 0.0 and 2.0 (got {}).",
                self.llm.temperature
            );
        }
        if self.llm.max_tokens == 0 {
            anyhow::bail!("llm.max_tokens must be > 0.");
        }
        if self.llm.timeout_secs == 0 {
            anyhow::bail!("llm.timeout_secs must be > 0.");
        }

        // --- Embeddings validation ---
        if self.embeddings.enabled {
            if self.embeddings.endpoint.trim().is_empty() {
                anyhow::bail!("embeddings.endpoint must not be empty when embeddings are enabled.");
            }
            if self.embeddings.model.trim().is_empty() {
                anyhow::bail!("embeddings.model must not be empty when embeddings are enabled.");
            }
            if self.embeddings.batch_size == 0 {
                anyhow::bail!(
                    "embeddings.batch_size must be > 0 (got 0). Set it in deponent.toml or via DEPONENT_EMBEDDINGS_BATCH_SIZE env var."
                );
            }
            if self.embeddings.timeout_secs == 0 {
                anyhow::bail!("embeddings.timeout_secs must be > 0.");
            }
        }

        // --- Logging validation ---
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.log_level.as_str()) {
            anyhow::bail!(
                "logging.log_level must be one of: {} (got '{}').",
                valid_log_levels.join(", "),
                self.logging.log_level
            );
        }
        let valid_log_formats = ["text", "json"];
        if !valid_log_formats.contains(&self.logging.log_format.as_str()) {
            anyhow::bail!(
                "logging.log_format must be one of: {} (got '{}').",
                valid_log_formats.join(", "),
                self.logging.log_format
            );
        }

        Ok(())
    }

    /// Generate an example configuration as a TOML string (plain, no comments).
    pub fn example_toml() -> String {
        let config = DeponentConfig::default();
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| "# Failed to generate example".to_string())
    }

    /// Generate a fully commented example configuration file.
    ///
    /// This is the `deponent --init-config` output.
    pub fn example_toml_commented() -> String {
        let d = DeponentConfig::default();
        format!(
            r#"# =============================================================================
# Deponent Configuration File
# =============================================================================
# All values shown below are defaults.
#
# Environment variables override TOML values. Use the DEPONENT_ prefix:
#   DEPONENT_ANALYSIS_TOP_K=8 deponent analyze --input depo.txt

# -----------------------------------------------------------------------------
# [analysis]: candidate ranking and classification pacing
# -----------------------------------------------------------------------------
[analysis]
# Maximum number of candidate claims compared against each claim.
top_k = {top_k}
# Minimum cosine similarity for a semantic candidate (0.0-1.0).
similarity_threshold = {threshold}
# Delay between successive pair classification calls, in milliseconds.
classify_delay_ms = {delay}
# Fixed scores assigned to candidates found by shared entities, topics, years.
entity_score = {entity}
topic_score = {topic}
temporal_score = {temporal}

# -----------------------------------------------------------------------------
# [llm]: chat-completions provider (claim extraction, pair classification)
# -----------------------------------------------------------------------------
[llm]
# OpenAI-compatible API base URL.
endpoint = "{llm_endpoint}"
model = "{llm_model}"
# Environment variable that holds the API key. The key itself never goes here.
api_key_env = "{llm_key_env}"
temperature = {temperature:.1}
max_tokens = {max_tokens}
timeout_secs = {llm_timeout}

# -----------------------------------------------------------------------------
# [embeddings]: embeddings provider (semantic candidate signal)
# -----------------------------------------------------------------------------
[embeddings]
# Set to false to rank candidates by entities, topics and years only.
enabled = {emb_enabled}
endpoint = "{emb_endpoint}"
model = "{emb_model}"
api_key_env = "{emb_key_env}"
# Maximum texts per request, and the pause between requests in milliseconds.
batch_size = {batch_size}
batch_delay_ms = {batch_delay}
timeout_secs = {emb_timeout}

# -----------------------------------------------------------------------------
# [logging]
# -----------------------------------------------------------------------------
[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG takes precedence)
log_level = "{log_level}"
# Log format: "text" (human-readable) or "json" (structured)
log_format = "{log_format}"
"#,
            top_k = d.analysis.top_k,
            threshold = d.analysis.similarity_threshold,
            delay = d.analysis.classify_delay_ms,
            entity = d.analysis.entity_score,
            topic = d.analysis.topic_score,
            temporal = d.analysis.temporal_score,
            llm_endpoint = d.llm.endpoint,
            llm_model = d.llm.model,
            llm_key_env = d.llm.api_key_env,
            temperature = d.llm.temperature,
            max_tokens = d.llm.max_tokens,
            llm_timeout = d.llm.timeout_secs,
            emb_enabled = d.embeddings.enabled,
            emb_endpoint = d.embeddings.endpoint,
            emb_model = d.embeddings.model,
            emb_key_env = d.embeddings.api_key_env,
            batch_size = d.embeddings.batch_size,
            batch_delay = d.embeddings.batch_delay_ms,
            emb_timeout = d.embeddings.timeout_secs,
            log_level = d.logging.log_level,
            log_format = d.logging.log_format,
        )
    }
}

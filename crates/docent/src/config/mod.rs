use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Docent
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Upload and index storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Upstream generation provider configuration
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Retrieval and chunking configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:8077")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Maximum accepted upload size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:8077".to_string()
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

/// Upload and index storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Base directory for the vector index
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory for raw uploaded files
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            uploads_dir: default_uploads_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".docent"))
        .unwrap_or_else(|| PathBuf::from(".docent"))
}

fn default_uploads_dir() -> PathBuf {
    default_data_dir().join("uploads")
}

/// Upstream generation provider configuration (OpenAI-compatible)
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// API base URL (e.g., "https://api.openai.com/v1")
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Environment variable name for the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Model used for answering prompts
    #[serde(default = "default_answer_model")]
    pub answer_model: String,
    /// Model used for question mining
    #[serde(default = "default_question_model")]
    pub question_model: String,
    /// Sampling temperature for answer generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key_env: default_api_key_env(),
            answer_model: default_answer_model(),
            question_model: default_question_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "DOCENT_API_KEY".to_string()
}

fn default_answer_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_question_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    180
}

/// Retrieval and chunking configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    /// Target chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
        }
    }
}

fn default_chunk_size() -> usize {
    2000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    4
}

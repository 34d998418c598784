use serde::Deserialize;

fn default_http_addr() -> String {
    "0.0.0.0:8080".into()
}

fn default_max_document_bytes() -> usize {
    1_000_000
}

fn default_max_batch_ops() -> usize {
    10_000
}

fn default_log_format() -> String {
    "text".into()
}

/// Process configuration, loaded from `DOCUHUB_*` environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,

    #[serde(default = "default_max_batch_ops")]
    pub max_batch_ops: usize,

    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(envy::prefixed("DOCUHUB_").from_env::<Config>()?)
    }
}

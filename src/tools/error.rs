use crate::knowledge::KnowledgeError;
use crate::provider::ProviderError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("tool `{tool}` is not enabled for this bot")]
    NotEnabled { tool: String },
    #[error("invalid input for `{tool}`: {reason}")]
    InvalidInput { tool: String, reason: String },
    #[error("tool `{tool}` is unavailable: {reason}")]
    Unavailable { tool: String, reason: String },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to generate a random file name: {0}")]
    Random(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
}

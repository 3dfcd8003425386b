use crate::provider::ProviderError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported file type `{extension}` for {source_name}")]
    UnsupportedFileType {
        source_name: String,
        extension: String,
    },
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("document {source_name} has no text to index")]
    EmptyDocument { source_name: String },
    #[error("failed to create knowledge database parent {path}: {source}")]
    CreateParent {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("sqlite open failed at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("sqlite statement failed: {source}")]
    Sql {
        #[source]
        source: rusqlite::Error,
    },
    #[error("stored embedding for chunk {doc_id}#{ordinal} is corrupt")]
    InvalidEmbedding { doc_id: String, ordinal: i64 },
    #[error("document `{doc_id}` not found")]
    DocumentNotFound { doc_id: String },
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

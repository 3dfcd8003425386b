//! Retrieval over documents attached to a bot.

pub mod base;
pub mod chunker;
pub mod config;
pub mod error;
pub mod loader;
pub mod search;
pub mod store;

pub use base::{AddOutcome, KnowledgeBase, NO_KNOWLEDGE_FOUND};
pub use chunker::chunk_words;
pub use config::KnowledgeConfig;
pub use error::KnowledgeError;
pub use loader::{load_document, LoadedDocument, SUPPORTED_EXTENSIONS};
pub use search::SearchHit;
pub use store::{DocumentRecord, KnowledgeStore};

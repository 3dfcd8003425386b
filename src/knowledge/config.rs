use serde::{Deserialize, Serialize};

pub const DEFAULT_EMBED_MODEL: &str = "embed-multilingual-v3.0";
pub const DEFAULT_RERANK_MODEL: &str = "rerank-multilingual-v3.0";

/// Retrieval settings shared by every bot's knowledge base.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_embed_model")]
    pub embed_model: String,
    #[serde(default = "default_rerank_model")]
    pub rerank_model: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_initial_search_k")]
    pub initial_search_k: usize,
    #[serde(default = "default_rerank_top_n")]
    pub rerank_top_n: usize,
    #[serde(default = "default_max_queries")]
    pub max_queries: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            embed_model: default_embed_model(),
            rerank_model: default_rerank_model(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            initial_search_k: default_initial_search_k(),
            rerank_top_n: default_rerank_top_n(),
            max_queries: default_max_queries(),
        }
    }
}

impl KnowledgeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.embed_model.trim().is_empty() {
            return Err("knowledge.embed_model must be non-empty".to_string());
        }
        if self.rerank_model.trim().is_empty() {
            return Err("knowledge.rerank_model must be non-empty".to_string());
        }
        if self.chunk_size == 0 {
            return Err("knowledge.chunk_size must be greater than 0".to_string());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(format!(
                "knowledge.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }
        if self.initial_search_k == 0 || self.rerank_top_n == 0 || self.max_queries == 0 {
            return Err(
                "knowledge.initial_search_k, rerank_top_n and max_queries must be greater than 0"
                    .to_string(),
            );
        }
        Ok(())
    }
}

fn default_embed_model() -> String {
    DEFAULT_EMBED_MODEL.to_string()
}

fn default_rerank_model() -> String {
    DEFAULT_RERANK_MODEL.to_string()
}

fn default_chunk_size() -> usize {
    100
}

fn default_chunk_overlap() -> usize {
    20
}

fn default_initial_search_k() -> usize {
    100
}

fn default_rerank_top_n() -> usize {
    5
}

fn default_max_queries() -> usize {
    3
}

use super::chunker::chunk_words;
use super::config::KnowledgeConfig;
use super::error::KnowledgeError;
use super::loader::load_document;
use super::search::{distance_ranked, nearest_candidates, rerank_candidates, SearchHit};
use super::store::{content_hash, DocumentRecord, KnowledgeStore};
use crate::provider::{EmbedInputType, Embedder, Reranker};
use crate::shared::logging::EventLog;
use crate::shared::time::now_secs;
use serde_json::Value;
use std::path::Path;

pub const NO_KNOWLEDGE_FOUND: &str = "No relevant information found in the knowledge base.";
const EMBED_BATCH_SIZE: usize = 96;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(DocumentRecord),
    AlreadyIndexed(DocumentRecord),
}

impl AddOutcome {
    pub fn record(&self) -> &DocumentRecord {
        match self {
            Self::Added(record) | Self::AlreadyIndexed(record) => record,
        }
    }
}

/// One bot's retrieval pipeline: store, embedder and reranker.
pub struct KnowledgeBase {
    store: KnowledgeStore,
    embedder: Box<dyn Embedder>,
    reranker: Box<dyn Reranker>,
    config: KnowledgeConfig,
    log: EventLog,
}

impl KnowledgeBase {
    pub fn open(
        db_path: &Path,
        embedder: Box<dyn Embedder>,
        reranker: Box<dyn Reranker>,
        config: KnowledgeConfig,
        log: EventLog,
    ) -> Result<Self, KnowledgeError> {
        let store = KnowledgeStore::open(db_path)?;
        store.ensure_schema()?;
        Ok(Self {
            store,
            embedder,
            reranker,
            config,
            log,
        })
    }

    pub fn config(&self) -> &KnowledgeConfig {
        &self.config
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    /// Loads a file path or URL and indexes it.
    pub fn add_source(&self, source: &str) -> Result<AddOutcome, KnowledgeError> {
        let document = load_document(source)?;
        self.add_text(&document.source, &document.text)
    }

    /// Indexes `text` unless identical content is already stored.
    pub fn add_text(&self, source: &str, text: &str) -> Result<AddOutcome, KnowledgeError> {
        let hash = content_hash(text);
        if let Some(existing) = self.store.find_by_hash(&hash)? {
            self.log.info(
                "knowledge.document_cached",
                &[
                    ("source", Value::from(source)),
                    ("doc_id", Value::from(existing.doc_id.as_str())),
                ],
            );
            return Ok(AddOutcome::AlreadyIndexed(existing));
        }

        let chunks = chunk_words(text, self.config.chunk_size, self.config.chunk_overlap);
        if chunks.is_empty() {
            return Err(KnowledgeError::EmptyDocument {
                source_name: source.to_string(),
            });
        }

        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            embeddings.extend(self.embedder.embed(batch, EmbedInputType::SearchDocument)?);
        }

        let record = self
            .store
            .insert_document(source, &hash, now_secs(), &chunks, &embeddings)?;
        self.log.info(
            "knowledge.document_added",
            &[
                ("source", Value::from(source)),
                ("doc_id", Value::from(record.doc_id.as_str())),
                ("chunks", Value::from(record.chunk_count)),
            ],
        );
        Ok(AddOutcome::Added(record))
    }

    pub fn list_documents(&self) -> Result<Vec<DocumentRecord>, KnowledgeError> {
        self.store.list_documents()
    }

    pub fn remove_document(&self, doc_id: &str) -> Result<(), KnowledgeError> {
        self.store.remove_document(doc_id)?;
        self.log.info(
            "knowledge.document_removed",
            &[("doc_id", Value::from(doc_id))],
        );
        Ok(())
    }

    /// Embeds the queries, scans for the nearest chunks and reranks them.
    /// A failed rerank falls back to distance order.
    pub fn search(&self, queries: &[String]) -> Result<Vec<SearchHit>, KnowledgeError> {
        let queries: Vec<String> = queries
            .iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let chunks = self.store.load_chunks()?;
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_embeddings = self.embedder.embed(&queries, EmbedInputType::SearchQuery)?;
        let candidates =
            nearest_candidates(&chunks, &query_embeddings, self.config.initial_search_k);

        match rerank_candidates(
            self.reranker.as_ref(),
            &queries,
            &candidates,
            self.config.rerank_top_n,
        ) {
            Ok(hits) => Ok(hits),
            Err(err) => {
                self.log.warn(
                    "knowledge.rerank_failed",
                    &[
                        ("reason", Value::String(err.to_string())),
                        ("candidates", Value::from(candidates.len())),
                    ],
                );
                Ok(distance_ranked(&candidates, self.config.rerank_top_n))
            }
        }
    }

    /// Texts of the best matches, or a single "nothing found" line.
    pub fn knowledge_for(&self, queries: &[String]) -> Result<Vec<String>, KnowledgeError> {
        let hits = self.search(queries)?;
        if hits.is_empty() {
            return Ok(vec![NO_KNOWLEDGE_FOUND.to_string()]);
        }
        Ok(hits.into_iter().map(|hit| hit.text).collect())
    }
}

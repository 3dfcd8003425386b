use super::error::KnowledgeError;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub doc_id: String,
    pub source: String,
    pub content_hash: String,
    pub created_at: i64,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    pub doc_id: String,
    pub ordinal: i64,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// SQLite-backed document and chunk store for one bot.
pub struct KnowledgeStore {
    db_path: PathBuf,
}

impl KnowledgeStore {
    pub fn open(db_path: &Path) -> Result<Self, KnowledgeError> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).map_err(|source| KnowledgeError::CreateParent {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let store = Self {
            db_path: db_path.to_path_buf(),
        };
        let _ = store.connect()?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn ensure_schema(&self) -> Result<(), KnowledgeError> {
        let connection = self.connect()?;
        connection
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS documents (
                    doc_id TEXT PRIMARY KEY,
                    source TEXT NOT NULL,
                    content_hash TEXT NOT NULL UNIQUE,
                    created_at INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS chunks (
                    doc_id TEXT NOT NULL,
                    ordinal INTEGER NOT NULL,
                    text TEXT NOT NULL,
                    embedding BLOB NOT NULL,
                    PRIMARY KEY (doc_id, ordinal),
                    FOREIGN KEY (doc_id) REFERENCES documents(doc_id) ON DELETE CASCADE
                );
                ",
            )
            .map_err(|source| KnowledgeError::Sql { source })
    }

    pub fn find_by_hash(&self, content_hash: &str) -> Result<Option<DocumentRecord>, KnowledgeError> {
        let connection = self.connect()?;
        connection
            .query_row(
                "
                SELECT d.doc_id, d.source, d.content_hash, d.created_at, COUNT(c.ordinal)
                FROM documents d
                LEFT JOIN chunks c ON c.doc_id = d.doc_id
                WHERE d.content_hash = ?1
                GROUP BY d.doc_id
                ",
                params![content_hash],
                map_document_row,
            )
            .optional()
            .map_err(|source| KnowledgeError::Sql { source })
    }

    /// Inserts a document and its embedded chunks in one transaction.
    pub fn insert_document(
        &self,
        source: &str,
        content_hash: &str,
        created_at: i64,
        chunks: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<DocumentRecord, KnowledgeError> {
        let doc_id = document_id(content_hash);
        let mut connection = self.connect()?;
        let tx = connection
            .transaction()
            .map_err(|source| KnowledgeError::Sql { source })?;
        tx.execute(
            "INSERT INTO documents (doc_id, source, content_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![doc_id, source, content_hash, created_at],
        )
        .map_err(|source| KnowledgeError::Sql { source })?;
        for (ordinal, (text, embedding)) in chunks.iter().zip(embeddings).enumerate() {
            tx.execute(
                "INSERT INTO chunks (doc_id, ordinal, text, embedding) VALUES (?1, ?2, ?3, ?4)",
                params![doc_id, ordinal as i64, text, encode_embedding(embedding)],
            )
            .map_err(|source| KnowledgeError::Sql { source })?;
        }
        tx.commit()
            .map_err(|source| KnowledgeError::Sql { source })?;

        Ok(DocumentRecord {
            doc_id,
            source: source.to_string(),
            content_hash: content_hash.to_string(),
            created_at,
            chunk_count: chunks.len().min(embeddings.len()),
        })
    }

    pub fn list_documents(&self) -> Result<Vec<DocumentRecord>, KnowledgeError> {
        let connection = self.connect()?;
        let mut statement = connection
            .prepare(
                "
                SELECT d.doc_id, d.source, d.content_hash, d.created_at, COUNT(c.ordinal)
                FROM documents d
                LEFT JOIN chunks c ON c.doc_id = d.doc_id
                GROUP BY d.doc_id
                ORDER BY d.created_at ASC, d.doc_id ASC
                ",
            )
            .map_err(|source| KnowledgeError::Sql { source })?;
        let rows = statement
            .query_map([], map_document_row)
            .map_err(|source| KnowledgeError::Sql { source })?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|source| KnowledgeError::Sql { source })
    }

    pub fn remove_document(&self, doc_id: &str) -> Result<(), KnowledgeError> {
        let connection = self.connect()?;
        let removed = connection
            .execute("DELETE FROM documents WHERE doc_id = ?1", params![doc_id])
            .map_err(|source| KnowledgeError::Sql { source })?;
        if removed == 0 {
            return Err(KnowledgeError::DocumentNotFound {
                doc_id: doc_id.to_string(),
            });
        }
        Ok(())
    }

    /// Every stored chunk in document insertion order.
    pub fn load_chunks(&self) -> Result<Vec<StoredChunk>, KnowledgeError> {
        let connection = self.connect()?;
        let mut statement = connection
            .prepare(
                "
                SELECT c.doc_id, c.ordinal, c.text, c.embedding
                FROM chunks c
                JOIN documents d ON d.doc_id = c.doc_id
                ORDER BY d.created_at ASC, c.doc_id ASC, c.ordinal ASC
                ",
            )
            .map_err(|source| KnowledgeError::Sql { source })?;
        let rows = statement
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })
            .map_err(|source| KnowledgeError::Sql { source })?;

        let mut out = Vec::new();
        for row in rows {
            let (doc_id, ordinal, text, blob) =
                row.map_err(|source| KnowledgeError::Sql { source })?;
            let embedding = decode_embedding(&blob).ok_or_else(|| {
                KnowledgeError::InvalidEmbedding {
                    doc_id: doc_id.clone(),
                    ordinal,
                }
            })?;
            out.push(StoredChunk {
                doc_id,
                ordinal,
                text,
                embedding,
            });
        }
        Ok(out)
    }

    fn connect(&self) -> Result<Connection, KnowledgeError> {
        let connection =
            Connection::open(&self.db_path).map_err(|source| KnowledgeError::Open {
                path: self.db_path.display().to_string(),
                source,
            })?;
        connection
            .execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|source| KnowledgeError::Sql { source })?;
        Ok(connection)
    }
}

fn map_document_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRecord> {
    Ok(DocumentRecord {
        doc_id: row.get(0)?,
        source: row.get(1)?,
        content_hash: row.get(2)?,
        created_at: row.get(3)?,
        chunk_count: row.get::<_, i64>(4)?.max(0) as usize,
    })
}

pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    to_hex(&digest)
}

pub fn document_id(content_hash: &str) -> String {
    let prefix: String = content_hash.chars().take(12).collect();
    format!("doc-{prefix}")
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    const HEX: &[u8; 16] = b"0123456789abcdef";
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

fn encode_embedding(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|value| value.to_le_bytes()).collect()
}

fn decode_embedding(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn documents_round_trip_with_chunk_counts() {
        let dir = tempdir().expect("tempdir");
        let store = KnowledgeStore::open(&dir.path().join("kb/guide.sqlite3")).expect("open");
        store.ensure_schema().expect("schema");

        let hash = content_hash("alpha beta");
        assert!(store.find_by_hash(&hash).expect("find").is_none());

        let record = store
            .insert_document(
                "faq.txt",
                &hash,
                42,
                &["alpha".to_string(), "beta".to_string()],
                &[vec![1.0, 0.0], vec![0.0, -2.5]],
            )
            .expect("insert");
        assert_eq!(record.doc_id, document_id(&hash));
        assert_eq!(record.chunk_count, 2);
        assert_eq!(store.find_by_hash(&hash).expect("find"), Some(record.clone()));
        assert_eq!(store.list_documents().expect("list"), vec![record.clone()]);

        let chunks = store.load_chunks().expect("chunks");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].embedding, vec![0.0, -2.5]);

        store.remove_document(&record.doc_id).expect("remove");
        assert!(store.load_chunks().expect("chunks").is_empty());
        assert!(matches!(
            store.remove_document(&record.doc_id),
            Err(KnowledgeError::DocumentNotFound { .. })
        ));
    }

    #[test]
    fn content_hash_is_sha256_hex() {
        assert_eq!(
            content_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(document_id(&content_hash("abc")), "doc-ba7816bf8f01");
    }
}
